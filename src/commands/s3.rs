//! S3 bucket policies, bucket ACLs, and sampled object ACLs.
//!
//! For every bucket: the bucket policy is checked for statements granting
//! access outside this account or conditioned on `aws:PrincipalOrgID`;
//! the bucket ACL and the ACLs of the first 1000 objects are checked for
//! grants to canonical users other than the owner or to the AllUsers /
//! AuthenticatedUsers groups.
//!
//! A bare `*` principal in the bucket policy is deliberately not reported
//! here: that is public access, a different risk category, and it
//! surfaces through the ACL checks instead.
//!
//! # Usage
//!
//! ```bash
//! aws-exposure s3
//! ```
//!
//! Per-bucket errors become findings text and scanning continues; object
//! ACL errors skip the object.

use crate::aws::AwsSession;
use crate::policy::{
    is_cross_account_principal, is_cross_org_condition, parse_policy, OrgConditionRule,
    Statement, WildcardPrincipal,
};
use anyhow::Result;
use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::types::{Grant, Type};

const ALL_USERS_URI: &str = "http://acs.amazonaws.com/groups/global/AllUsers";
const AUTHENTICATED_USERS_URI: &str = "http://acs.amazonaws.com/groups/global/AuthenticatedUsers";

pub async fn run(aws: &AwsSession) -> Result<()> {
    let account_id = aws.account_id().await?;
    let client = aws_sdk_s3::Client::new(aws.config());

    let buckets = client.list_buckets().send().await?;
    let buckets = buckets.buckets();
    let mut findings_found = false;

    println!("Scanning S3 buckets for cross-account and organization permissions...\n");
    for bucket in buckets {
        let Some(bucket_name) = bucket.name() else {
            continue;
        };
        let bucket_findings = audit_bucket(&client, bucket_name, &account_id).await;
        if !bucket_findings.is_empty() {
            findings_found = true;
            println!("\nBucket: {bucket_name}");
            for finding in bucket_findings {
                println!("{finding}");
            }
        }
    }

    println!("\nScan complete. Buckets scanned: {}", buckets.len());
    if !findings_found {
        println!("No cross-account, organization, or group ACL findings detected in any bucket.");
    }
    Ok(())
}

async fn audit_bucket(
    client: &aws_sdk_s3::Client,
    bucket_name: &str,
    account_id: &str,
) -> Vec<String> {
    let mut bucket_findings = Vec::new();

    // Bucket policy
    match client.get_bucket_policy().bucket(bucket_name).send().await {
        Ok(output) => {
            if let Some(policy_json) = output.policy() {
                match parse_policy(policy_json) {
                    Ok(document) => {
                        for statement in &document.statements {
                            if statement_grants_outside_access(statement, account_id) {
                                let rendered = serde_json::to_string_pretty(statement)
                                    .unwrap_or_else(|err| format!("<unrenderable: {err}>"));
                                bucket_findings.push(format!(
                                    "  [!] Cross-account or organization permission in bucket policy:\n{rendered}"
                                ));
                            }
                        }
                    }
                    Err(err) => {
                        bucket_findings.push(format!("  Error accessing policy: {err}"));
                    }
                }
            }
        }
        Err(err) => {
            if err.as_service_error().and_then(|e| e.code()) != Some("NoSuchBucketPolicy") {
                bucket_findings.push(format!("  Error accessing policy: {err}"));
            }
        }
    }

    // Bucket ACL
    match client.get_bucket_acl().bucket(bucket_name).send().await {
        Ok(acl) => {
            let owner_id = acl.owner().and_then(|owner| owner.id()).unwrap_or("");
            let grants = cross_account_acl_grants(acl.grants(), owner_id);
            if !grants.is_empty() {
                let listed: Vec<String> =
                    grants.iter().map(|grant| format!("      - {grant}")).collect();
                bucket_findings.push(format!(
                    "  [!] Cross-account or group permissions in bucket ACL:\n{}",
                    listed.join("\n")
                ));
            }
        }
        Err(err) => {
            bucket_findings.push(format!("  Error accessing bucket ACL: {err}"));
        }
    }

    // Object ACLs, sampled: first 1000 objects
    match client
        .list_objects_v2()
        .bucket(bucket_name)
        .max_keys(1000)
        .send()
        .await
    {
        Ok(listing) => {
            for object in listing.contents() {
                let Some(key) = object.key() else {
                    continue;
                };
                let Ok(object_acl) = client
                    .get_object_acl()
                    .bucket(bucket_name)
                    .key(key)
                    .send()
                    .await
                else {
                    continue;
                };
                let owner_id = object_acl.owner().and_then(|owner| owner.id()).unwrap_or("");
                let grants = cross_account_acl_grants(object_acl.grants(), owner_id);
                if !grants.is_empty() {
                    let listed: Vec<String> =
                        grants.iter().map(|grant| format!("      - {grant}")).collect();
                    bucket_findings.push(format!(
                        "  [!] Object '{key}' has cross-account or group permissions in ACL:\n{}",
                        listed.join("\n")
                    ));
                }
            }
        }
        Err(err) => {
            bucket_findings.push(format!("  Error listing objects: {err}"));
        }
    }

    bucket_findings
}

fn statement_grants_outside_access(statement: &Statement, account_id: &str) -> bool {
    if let Some(principal) = &statement.principal {
        // Public (`*`) is not a cross-account finding here.
        if is_cross_account_principal(principal, account_id, WildcardPrincipal::Ignored) {
            return true;
        }
    }
    if let Some(condition) = &statement.condition {
        if is_cross_org_condition(condition, None, OrgConditionRule::KeyPresence) {
            return true;
        }
    }
    false
}

/// ACL grants that reach outside the owning account: foreign canonical
/// users and the global group URIs.
fn cross_account_acl_grants(grants: &[Grant], owner_id: &str) -> Vec<String> {
    let mut findings = Vec::new();
    for grant in grants {
        let Some(grantee) = grant.grantee() else {
            continue;
        };
        match grantee.r#type() {
            Type::CanonicalUser => {
                if let Some(id) = grantee.id() {
                    if !id.is_empty() && id != owner_id {
                        findings.push(format!("CanonicalUser: {id}"));
                    }
                }
            }
            Type::Group => {
                if let Some(uri) = grantee.uri() {
                    if uri == ALL_USERS_URI || uri == AUTHENTICATED_USERS_URI {
                        findings.push(format!("Group: {uri}"));
                    }
                }
            }
            _ => {}
        }
    }
    findings
}
