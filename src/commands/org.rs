//! AWS Organizations inventory reports.
//!
//! Three small read-only reports against the management (or a delegated
//! admin) account:
//!
//! ```bash
//! # Accounts holding delegated administration, and for which services
//! aws-exposure org delegated-admins
//!
//! # Which policy types (SCP, tag policy, ...) are enabled at the root
//! aws-exposure org policy-types
//!
//! # Services with organization-wide trusted access enabled
//! aws-exposure org trusted-access
//! ```
//!
//! These run against the Organizations endpoint directly; there is no
//! region loop. Errors (including "not in an organization") propagate.

use crate::aws::AwsSession;
use anyhow::{Context, Result};
use aws_sdk_organizations::types::PolicyTypeStatus;

pub async fn delegated_admins(aws: &AwsSession) -> Result<()> {
    let client = aws_sdk_organizations::Client::new(aws.config());

    let admins = client
        .list_delegated_administrators()
        .send()
        .await
        .context("failed to list delegated administrators")?;

    println!("Delegated Administrator Accounts and Their Services:");
    for admin in admins.delegated_administrators() {
        let account_id = admin.id().unwrap_or("unknown");
        let email = admin.email().unwrap_or("unknown");
        println!("\nAccount ID: {account_id} | Email: {email}");

        let services = client
            .list_delegated_services_for_account()
            .account_id(account_id)
            .send()
            .await
            .with_context(|| format!("failed to list delegated services for {account_id}"))?;

        let services = services.delegated_services();
        if services.is_empty() {
            println!("  - No delegated services found.");
        } else {
            for service in services {
                println!(
                    "  - Service: {}",
                    service.service_principal().unwrap_or("unknown")
                );
            }
        }
    }
    Ok(())
}

pub async fn policy_types(aws: &AwsSession) -> Result<()> {
    let client = aws_sdk_organizations::Client::new(aws.config());

    let roots = client
        .list_roots()
        .send()
        .await
        .context("failed to list organization roots")?;
    let root = roots
        .roots()
        .first()
        .context("organization has no roots")?;

    println!("Enabled AWS Organizations Policy Types:");
    for policy_type in root.policy_types() {
        if policy_type.status() == Some(&PolicyTypeStatus::Enabled) {
            if let Some(kind) = policy_type.r#type() {
                println!("- {}", kind.as_str());
            }
        }
    }
    Ok(())
}

pub async fn trusted_access(aws: &AwsSession) -> Result<()> {
    let client = aws_sdk_organizations::Client::new(aws.config());

    let mut enabled = Vec::new();
    let mut next_token: Option<String> = None;
    loop {
        let mut request = client.list_aws_service_access_for_organization();
        if let Some(token) = &next_token {
            request = request.next_token(token);
        }
        let page = request
            .send()
            .await
            .context("failed to list trusted service access")?;
        enabled.extend(page.enabled_service_principals().to_vec());
        next_token = page.next_token().map(str::to_string);
        if next_token.is_none() {
            break;
        }
    }

    println!("Services with trusted access enabled:");
    for service in &enabled {
        let principal = service.service_principal().unwrap_or("unknown");
        match service.date_enabled() {
            Some(date) => println!("- Service Principal: {principal}, Enabled At: {date}"),
            None => println!("- Service Principal: {principal}"),
        }
    }
    Ok(())
}
