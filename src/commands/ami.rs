//! AMIs with cross-account or public launch permissions.
//!
//! Enumerates the images owned by this account in every opted-in region
//! and inspects their `launchPermission` attribute. Images created by AWS
//! Backup are excluded: sharing on those is managed by the backup plan,
//! not by hand, and reporting them would drown the signal.
//!
//! # Usage
//!
//! ```bash
//! aws-exposure ami
//! ```
//!
//! Unexpected API errors abort the run; this audit is expected to see
//! every image or say nothing.

use crate::aws::{AwsSession, RegionSelection};
use anyhow::{Context, Result};
use aws_sdk_ec2::types::{Image, ImageAttributeName, PermissionGroup};

pub async fn run(aws: &AwsSession) -> Result<()> {
    let account_id = aws.account_id().await?;
    let regions = aws.regions(RegionSelection::OptedIn).await?;

    let mut findings = Vec::new();
    for region in &regions {
        let client = aws_sdk_ec2::Client::new(&aws.region_config(region));
        findings.extend(audit_region(&client, region, &account_id).await?);
    }

    if findings.is_empty() {
        println!("No AMIs with cross-account or public permissions found in any active region.");
    } else {
        for finding in findings {
            println!("{finding}");
        }
    }
    Ok(())
}

async fn audit_region(
    client: &aws_sdk_ec2::Client,
    region: &str,
    account_id: &str,
) -> Result<Vec<String>> {
    let images = client
        .describe_images()
        .owners(account_id)
        .send()
        .await
        .with_context(|| format!("failed to describe images in {region}"))?;

    let mut findings = Vec::new();
    for image in images.images() {
        if is_backup_managed(image) {
            continue;
        }
        let Some(ami_id) = image.image_id() else {
            continue;
        };

        let attribute = client
            .describe_image_attribute()
            .image_id(ami_id)
            .attribute(ImageAttributeName::LaunchPermission)
            .send()
            .await
            .with_context(|| format!("failed to read launch permissions of {ami_id}"))?;

        let mut shared_accounts = Vec::new();
        let mut is_public = false;
        for permission in attribute.launch_permissions() {
            if let Some(user_id) = permission.user_id() {
                shared_accounts.push(user_id.to_string());
            }
            if permission.group() == Some(&PermissionGroup::All) {
                is_public = true;
            }
        }

        if !shared_accounts.is_empty() || is_public {
            let mut finding = format!("[{region}] AMI {ami_id} is shared:");
            if !shared_accounts.is_empty() {
                finding.push_str(&format!(
                    "\n  With accounts: {}",
                    shared_accounts.join(", ")
                ));
            }
            if is_public {
                finding.push_str("\n  Publicly accessible!");
            }
            findings.push(finding);
        }
    }
    Ok(findings)
}

/// Whether an image was created and is managed by AWS Backup.
fn is_backup_managed(image: &Image) -> bool {
    if image
        .tags()
        .iter()
        .any(|tag| tag.key() == Some("aws:backup:source-resource"))
    {
        return true;
    }
    image
        .description()
        .is_some_and(|description| description.contains("AWS Backup"))
}
