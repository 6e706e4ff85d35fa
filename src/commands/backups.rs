//! Recovery points copied in from other accounts.
//!
//! Walks every backup vault in every enabled region and reports recovery
//! points whose source vault belongs to a different account. Vaults the
//! caller cannot access are reported and skipped; unexpected errors while
//! listing recovery points abort the run.
//!
//! # Usage
//!
//! ```bash
//! aws-exposure backups
//! ```

use crate::aws::{AwsSession, RegionSelection};
use crate::policy::account_id_from_arn;
use anyhow::{Context, Result};

pub async fn run(aws: &AwsSession) -> Result<()> {
    let account_id = aws.account_id().await?;
    let regions = aws.regions(RegionSelection::Enabled).await?;
    println!("Found {} active regions: {:?}", regions.len(), regions);

    for region in &regions {
        let client = aws_sdk_backup::Client::new(&aws.region_config(region));
        audit_region(&client, region, &account_id).await?;
    }
    Ok(())
}

async fn audit_region(
    client: &aws_sdk_backup::Client,
    region: &str,
    account_id: &str,
) -> Result<()> {
    let vaults = match client.list_backup_vaults().send().await {
        Ok(output) => output.backup_vault_list().to_vec(),
        Err(err) => {
            println!("  Could not access Backup in {region}: {err}");
            return Ok(());
        }
    };

    if vaults.is_empty() {
        println!("\nRegion: {region} | No backup vaults found.");
        return Ok(());
    }

    for vault in &vaults {
        let Some(vault_name) = vault.backup_vault_name() else {
            continue;
        };
        println!("\nRegion: {region} | Vault: {vault_name}");

        let mut cross_account_found = false;
        let mut next_token: Option<String> = None;
        loop {
            let mut request = client
                .list_recovery_points_by_backup_vault()
                .backup_vault_name(vault_name);
            if let Some(token) = &next_token {
                request = request.next_token(token);
            }
            let page = request
                .send()
                .await
                .with_context(|| format!("failed to list recovery points in vault {vault_name}"))?;

            for recovery_point in page.recovery_points() {
                let source_account = recovery_point
                    .source_backup_vault_arn()
                    .and_then(account_id_from_arn);
                if let Some(source_account) = source_account {
                    if source_account != account_id {
                        cross_account_found = true;
                        println!("  Cross-account backup found:");
                        println!(
                            "    RecoveryPointArn: {}",
                            recovery_point.recovery_point_arn().unwrap_or("unknown")
                        );
                        println!("    SourceAccountId: {source_account}");
                        if let Some(created) = recovery_point.creation_date() {
                            println!("    CreationDate: {created}");
                        }
                    }
                }
            }

            next_token = page.next_token().map(str::to_string);
            if next_token.is_none() {
                break;
            }
        }

        if !cross_account_found {
            println!("  No cross-account backups found in this vault.");
        }
    }
    Ok(())
}
