//! Roles assumable from foreign accounts or organizations.
//!
//! Pages through every role in the account and inspects the trust policy
//! (`AssumeRolePolicyDocument`). Allow statements naming an IAM principal
//! in another account, or an `arn:aws:organizations` principal, are
//! reported. IAM is a global service; no region loop.
//!
//! # Usage
//!
//! ```bash
//! aws-exposure iam
//! ```

use crate::aws::AwsSession;
use crate::policy::{account_id_from_arn, org_id_from_arn, parse_trust_policy, PolicyDocument};
use anyhow::{Context, Result};
use tracing::warn;

pub async fn run(aws: &AwsSession) -> Result<()> {
    let account_id = aws.account_id().await?;
    let org_id = aws.organization_id().await;
    println!(
        "Current Account: {}, Organization: {}",
        account_id,
        org_id.as_deref().unwrap_or("none")
    );

    let client = aws_sdk_iam::Client::new(aws.config());
    let mut marker: Option<String> = None;
    loop {
        let mut request = client.list_roles();
        if let Some(m) = &marker {
            request = request.marker(m);
        }
        let page = request.send().await.context("failed to list IAM roles")?;

        for role in page.roles() {
            let role_name = role.role_name();
            let Some(raw_document) = role.assume_role_policy_document() else {
                continue;
            };
            let trust_policy = match parse_trust_policy(raw_document) {
                Ok(document) => document,
                Err(err) => {
                    warn!("skipping role {role_name}: unparseable trust policy: {err}");
                    continue;
                }
            };
            for finding in classify_trust_policy(
                role_name,
                &trust_policy,
                &account_id,
                org_id.as_deref(),
            ) {
                println!("{finding}");
            }
        }

        marker = page.marker().map(str::to_string);
        if marker.is_none() {
            break;
        }
    }
    Ok(())
}

/// Findings for a single role's trust policy, in statement order.
fn classify_trust_policy(
    role_name: &str,
    trust_policy: &PolicyDocument,
    account_id: &str,
    org_id: Option<&str>,
) -> Vec<String> {
    let mut findings = Vec::new();
    for statement in &trust_policy.statements {
        if !statement.allows() {
            continue;
        }
        let Some(principal) = &statement.principal else {
            continue;
        };
        for arn in principal.aws_identifiers() {
            if arn.starts_with("arn:aws:iam::") {
                if let Some(account) = account_id_from_arn(arn) {
                    if account != account_id {
                        findings.push(format!(
                            "Role '{role_name}' can be assumed by account {account} (cross-account)"
                        ));
                    }
                }
            } else if arn.starts_with("arn:aws:organizations::") {
                if let Some(principal_org) = org_id_from_arn(arn) {
                    if Some(principal_org) != org_id {
                        findings.push(format!(
                            "Role '{role_name}' can be assumed by organization {principal_org} (cross-organization)"
                        ));
                    } else {
                        findings.push(format!(
                            "Role '{role_name}' can be assumed by another account in this organization (cross-org, same org)"
                        ));
                    }
                }
            }
        }
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::parse_policy;

    fn trust_policy(principals: &str) -> PolicyDocument {
        parse_policy(&format!(
            r#"{{
                "Version": "2012-10-17",
                "Statement": [{{
                    "Effect": "Allow",
                    "Principal": {{"AWS": {principals}}},
                    "Action": "sts:AssumeRole"
                }}]
            }}"#
        ))
        .unwrap()
    }

    #[test]
    fn test_foreign_account_principal() {
        let policy = trust_policy(r#""arn:aws:iam::999999999999:root""#);
        let findings =
            classify_trust_policy("Deploy", &policy, "111111111111", Some("o-abc12345"));
        assert_eq!(
            findings,
            vec!["Role 'Deploy' can be assumed by account 999999999999 (cross-account)"]
        );
    }

    #[test]
    fn test_own_account_principal_is_quiet() {
        let policy = trust_policy(r#""arn:aws:iam::111111111111:root""#);
        let findings =
            classify_trust_policy("Deploy", &policy, "111111111111", Some("o-abc12345"));
        assert!(findings.is_empty());
    }

    #[test]
    fn test_foreign_org_principal() {
        let policy =
            trust_policy(r#""arn:aws:organizations::999999999999:organization/o-xyz99999""#);
        let findings =
            classify_trust_policy("Deploy", &policy, "111111111111", Some("o-abc12345"));
        assert_eq!(
            findings,
            vec!["Role 'Deploy' can be assumed by organization o-xyz99999 (cross-organization)"]
        );
    }

    #[test]
    fn test_same_org_principal_is_noted() {
        let policy =
            trust_policy(r#""arn:aws:organizations::111111111111:organization/o-abc12345""#);
        let findings =
            classify_trust_policy("Deploy", &policy, "111111111111", Some("o-abc12345"));
        assert_eq!(findings.len(), 1);
        assert!(findings[0].contains("cross-org, same org"));
    }

    #[test]
    fn test_deny_statements_are_ignored() {
        let policy = parse_policy(
            r#"{
                "Statement": [{
                    "Effect": "Deny",
                    "Principal": {"AWS": "arn:aws:iam::999999999999:root"},
                    "Action": "sts:AssumeRole"
                }]
            }"#,
        )
        .unwrap();
        assert!(
            classify_trust_policy("Deploy", &policy, "111111111111", None).is_empty()
        );
    }

    #[test]
    fn test_service_principals_are_quiet() {
        let policy = parse_policy(
            r#"{
                "Statement": [{
                    "Effect": "Allow",
                    "Principal": {"Service": "ec2.amazonaws.com"},
                    "Action": "sts:AssumeRole"
                }]
            }"#,
        )
        .unwrap();
        assert!(
            classify_trust_policy("AppRole", &policy, "111111111111", None).is_empty()
        );
    }
}
