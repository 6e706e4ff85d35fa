//! Inventory of resources shared out through AWS RAM.
//!
//! Pages through `ListResources(resourceOwner=SELF)` in every enabled
//! region, buffering the results, then prints one line per shared
//! resource. Anything listed here is visible to whatever principals the
//! owning resource shares name; this report is the starting point for
//! reviewing those shares.
//!
//! # Usage
//!
//! ```bash
//! aws-exposure ram
//! ```

use crate::aws::{AwsSession, RegionSelection};
use anyhow::{Context, Result};
use aws_sdk_ram::types::ResourceOwner;

/// One resource this account shares through RAM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedResource {
    pub arn: String,
    pub resource_type: String,
    pub region_scope: String,
}

pub async fn run(aws: &AwsSession) -> Result<()> {
    let regions = aws.regions(RegionSelection::Enabled).await?;

    let mut all_resources = Vec::new();
    for region in &regions {
        println!("Scanning region: {region}");
        let client = aws_sdk_ram::Client::new(&aws.region_config(region));
        all_resources.extend(collect_shared_resources(&client).await?);
    }

    for resource in &all_resources {
        println!(
            "Resource ARN: {}, Type: {}, Region: {}",
            resource.arn, resource.resource_type, resource.region_scope
        );
    }
    Ok(())
}

/// Drain every page of resources this account owns and shares, in page
/// order.
pub async fn collect_shared_resources(
    client: &aws_sdk_ram::Client,
) -> Result<Vec<SharedResource>> {
    let mut resources = Vec::new();
    let mut next_token: Option<String> = None;
    loop {
        let mut request = client
            .list_resources()
            .resource_owner(ResourceOwner::from("SELF"));
        if let Some(token) = &next_token {
            request = request.next_token(token);
        }
        let page = request
            .send()
            .await
            .context("failed to list RAM resources")?;

        resources.extend(page.resources().iter().map(|resource| SharedResource {
            arn: resource.arn().unwrap_or("unknown").to_string(),
            resource_type: resource.r#type().unwrap_or("unknown").to_string(),
            region_scope: resource
                .resource_region_scope()
                .map(|scope| scope.as_str().to_string())
                .unwrap_or_else(|| "unknown".to_string()),
        }));

        next_token = page.next_token().map(str::to_string);
        if next_token.is_none() {
            break;
        }
    }
    Ok(resources)
}
