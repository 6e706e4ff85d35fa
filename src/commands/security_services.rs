//! Security-service coverage per region.
//!
//! Probes every opted-in region (including ones the account has not
//! enabled, via the `AllRegions` listing) for AWS Config recorders,
//! SecurityHub, GuardDuty detectors, and non-organization CloudTrail
//! trails, then prints one summary line per region. A probe that fails
//! for any reason counts as "not enabled" there.
//!
//! # Usage
//!
//! ```bash
//! aws-exposure security-services
//! ```
//!
//! # Output
//!
//! ```text
//! eu-west-1: Config=Yes, SecurityHub=No, GuardDuty=Yes, CloudTrails=management-events
//! ```

use crate::aws::{AwsSession, RegionSelection};
use anyhow::Result;

struct RegionStatus {
    region: String,
    config: bool,
    security_hub: bool,
    guard_duty: bool,
    cloud_trails: Vec<String>,
}

pub async fn run(aws: &AwsSession) -> Result<()> {
    let regions = aws.regions(RegionSelection::AllOptedIn).await?;
    println!("Checking {} enabled regions...", regions.len());

    let mut results = Vec::new();
    for region in &regions {
        let config = aws.region_config(region);
        results.push(RegionStatus {
            region: region.clone(),
            config: config_enabled(&aws_sdk_config::Client::new(&config)).await,
            security_hub: security_hub_enabled(&aws_sdk_securityhub::Client::new(&config)).await,
            guard_duty: guard_duty_enabled(&aws_sdk_guardduty::Client::new(&config)).await,
            cloud_trails: custom_trails(&aws_sdk_cloudtrail::Client::new(&config)).await,
        });
    }

    println!("\nSummary:");
    for status in &results {
        let trail_names = if status.cloud_trails.is_empty() {
            "None".to_string()
        } else {
            status.cloud_trails.join(", ")
        };
        println!(
            "{}: Config={}, SecurityHub={}, GuardDuty={}, CloudTrails={}",
            status.region,
            yes_no(status.config),
            yes_no(status.security_hub),
            yes_no(status.guard_duty),
            trail_names
        );
    }
    Ok(())
}

fn yes_no(enabled: bool) -> &'static str {
    if enabled {
        "Yes"
    } else {
        "No"
    }
}

async fn config_enabled(client: &aws_sdk_config::Client) -> bool {
    match client.describe_configuration_recorders().send().await {
        Ok(output) => !output.configuration_recorders().is_empty(),
        Err(_) => false,
    }
}

async fn security_hub_enabled(client: &aws_sdk_securityhub::Client) -> bool {
    // Hub state is probed the cheap way: any successful findings query
    // means the service is enabled in this region.
    client.get_findings().send().await.is_ok()
}

async fn guard_duty_enabled(client: &aws_sdk_guardduty::Client) -> bool {
    match client.list_detectors().send().await {
        Ok(output) => !output.detector_ids().is_empty(),
        Err(_) => false,
    }
}

/// Names of trails homed in this region, excluding organization trails.
async fn custom_trails(client: &aws_sdk_cloudtrail::Client) -> Vec<String> {
    match client
        .describe_trails()
        .include_shadow_trails(false)
        .send()
        .await
    {
        Ok(output) => output
            .trail_list()
            .iter()
            .filter(|trail| !trail.is_organization_trail().unwrap_or(false))
            .filter_map(|trail| trail.name())
            .map(str::to_string)
            .collect(),
        Err(_) => Vec::new(),
    }
}
