//! Event buses granting cross-account or cross-organization access.
//!
//! Fetches the resource policy of every event bus in every enabled region
//! and reports statements that either name a principal outside this
//! account or scope access to a foreign organization. Buses without a
//! policy are skipped.
//!
//! # Usage
//!
//! ```bash
//! aws-exposure event-bridge
//! ```

use crate::aws::{AwsSession, RegionSelection};
use crate::policy::{
    is_cross_account_principal, is_cross_org_condition, parse_policy, OrgConditionRule, Statement,
    WildcardPrincipal,
};
use anyhow::Result;
use tracing::warn;

pub async fn run(aws: &AwsSession) -> Result<()> {
    let account_id = aws.account_id().await?;
    let org_id = aws.organization_id().await;
    let regions = aws.regions(RegionSelection::Enabled).await?;

    for region in &regions {
        println!("\nRegion: {region}");
        let client = aws_sdk_eventbridge::Client::new(&aws.region_config(region));

        let buses = client.list_event_buses().send().await?;
        for bus in buses.event_buses() {
            let Some(bus_name) = bus.name() else {
                continue;
            };
            let Some(policy) = bus_policy(&client, bus_name).await? else {
                continue;
            };
            let document = match parse_policy(&policy) {
                Ok(document) => document,
                Err(err) => {
                    warn!("skipping unparseable policy on bus {bus_name}: {err}");
                    continue;
                }
            };

            for statement in &document.statements {
                if statement_grants_outside_access(statement, &account_id, org_id.as_deref()) {
                    println!("  Event bus '{bus_name}' has cross-account or org policy:");
                    println!("{}", serde_json::to_string_pretty(statement)?);
                }
            }
        }
    }
    Ok(())
}

async fn bus_policy(
    client: &aws_sdk_eventbridge::Client,
    bus_name: &str,
) -> Result<Option<String>> {
    match client.describe_event_bus().name(bus_name).send().await {
        Ok(output) => Ok(output.policy().map(str::to_string)),
        Err(err)
            if err
                .as_service_error()
                .is_some_and(|e| e.is_resource_not_found_exception()) =>
        {
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

fn statement_grants_outside_access(
    statement: &Statement,
    account_id: &str,
    org_id: Option<&str>,
) -> bool {
    if let Some(principal) = &statement.principal {
        if is_cross_account_principal(principal, account_id, WildcardPrincipal::CrossAccount) {
            return true;
        }
    }
    if let Some(condition) = &statement.condition {
        if is_cross_org_condition(condition, org_id, OrgConditionRule::DifferentOrg) {
            return true;
        }
    }
    false
}
