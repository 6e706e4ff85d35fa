//! KMS key policies with cross-account or cross-organization grants.
//!
//! Pages through every key in every opted-in region, fetches the `default`
//! key policy, and reports statements granting access to a foreign account
//! (or `*`) or scoped to a foreign organization. Prints a running account
//! of what it checked and a final summary.
//!
//! # Usage
//!
//! ```bash
//! aws-exposure kms
//! ```
//!
//! # Output
//!
//! ```text
//! Detected AWS Account ID: 111111111111
//! Detected AWS Organization ID: o-abc12345
//! ...
//! Checking region: eu-west-1
//!   Found 12 KMS keys.
//!     [Cross-Account] KMS Key 1234… in eu-west-1 has cross-account access: ["arn:aws:iam::999999999999:root"]
//!
//! === SUMMARY ===
//! ```

use crate::aws::{AwsSession, RegionSelection};
use crate::policy::{
    is_cross_account_principal, is_cross_org_condition, parse_policy, OrgConditionRule,
    WildcardPrincipal,
};
use anyhow::{Context, Result};

/// What one region's scan saw. Findings are printed as they are found;
/// the totals feed the end-of-run summary.
#[derive(Debug, Default, PartialEq)]
pub struct RegionScan {
    pub keys_checked: usize,
    pub cross_account: Vec<String>,
    pub cross_org: Vec<String>,
}

pub async fn run(aws: &AwsSession) -> Result<()> {
    let account_id = aws.account_id().await?;
    let org_id = aws.organization_id().await;

    println!("Detected AWS Account ID: {account_id}");
    match &org_id {
        Some(org_id) => println!("Detected AWS Organization ID: {org_id}"),
        None => println!("No AWS Organization detected or insufficient permissions."),
    }

    let regions = aws.regions(RegionSelection::OptedIn).await?;
    println!("Enabled regions: {regions:?}");

    let mut total_keys = 0;
    let mut cross_account_findings = 0;
    let mut cross_org_findings = 0;

    for region in &regions {
        println!("\nChecking region: {region}");
        let client = aws_sdk_kms::Client::new(&aws.region_config(region));
        let scan = scan_region(&client, region, &account_id, org_id.as_deref()).await?;
        total_keys += scan.keys_checked;
        cross_account_findings += scan.cross_account.len();
        cross_org_findings += scan.cross_org.len();
    }

    println!("\n=== SUMMARY ===");
    println!("Total regions checked: {}", regions.len());
    println!("Total KMS keys checked: {total_keys}");
    println!("Cross-account findings: {cross_account_findings}");
    println!("Cross-organization findings: {cross_org_findings}");
    if cross_account_findings == 0 && cross_org_findings == 0 {
        println!("No cross-account or cross-organization access detected in any KMS key policies.");
    }
    Ok(())
}

/// Scan every key in one region, printing findings as they appear.
pub async fn scan_region(
    client: &aws_sdk_kms::Client,
    region: &str,
    account_id: &str,
    org_id: Option<&str>,
) -> Result<RegionScan> {
    let mut key_ids = Vec::new();
    let mut marker: Option<String> = None;
    loop {
        let mut request = client.list_keys();
        if let Some(m) = &marker {
            request = request.marker(m);
        }
        let page = request
            .send()
            .await
            .with_context(|| format!("failed to list KMS keys in {region}"))?;
        key_ids.extend(
            page.keys()
                .iter()
                .filter_map(|key| key.key_id())
                .map(str::to_string),
        );
        marker = page.next_marker().map(str::to_string);
        if marker.is_none() {
            break;
        }
    }
    println!("  Found {} KMS keys.", key_ids.len());

    let mut scan = RegionScan {
        keys_checked: key_ids.len(),
        ..RegionScan::default()
    };

    for key_id in &key_ids {
        let policy_json = match client
            .get_key_policy()
            .key_id(key_id)
            .policy_name("default")
            .send()
            .await
        {
            Ok(output) => match output.policy() {
                Some(policy) => policy.to_string(),
                None => continue,
            },
            Err(err) => {
                println!("    Could not get policy for key {key_id}: {err}");
                continue;
            }
        };

        let document = match parse_policy(&policy_json) {
            Ok(document) => document,
            Err(err) => {
                println!("    Could not parse policy for key {key_id}: {err}");
                continue;
            }
        };

        for statement in &document.statements {
            if let Some(principal) = &statement.principal {
                if !principal.aws_identifiers().is_empty()
                    && is_cross_account_principal(
                        principal,
                        account_id,
                        WildcardPrincipal::CrossAccount,
                    )
                {
                    let finding = format!(
                        "    [Cross-Account] KMS Key {key_id} in {region} has cross-account access: {:?}",
                        principal.aws_identifiers()
                    );
                    println!("{finding}");
                    scan.cross_account.push(finding);
                }
            }
            if let Some(condition) = &statement.condition {
                if is_cross_org_condition(condition, org_id, OrgConditionRule::DifferentOrg) {
                    let finding = format!(
                        "    [Cross-Org] KMS Key {key_id} in {region} has cross-organization access: {}",
                        serde_json::to_string(condition)?
                    );
                    println!("{finding}");
                    scan.cross_org.push(finding);
                }
            }
        }
    }
    Ok(scan)
}
