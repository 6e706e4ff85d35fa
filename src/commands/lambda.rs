//! Lambda function policies with cross-account grants.
//!
//! Pages through the functions of every enabled region and fetches each
//! function's resource policy. Statements whose principal resolves to an
//! account other than the caller's (or to `*`) are reported with the full
//! statement JSON. Functions without a policy are the common case and are
//! skipped silently; other per-function errors are reported and skipped.
//!
//! # Usage
//!
//! ```bash
//! aws-exposure lambda
//! ```

use crate::aws::{AwsSession, RegionSelection};
use crate::policy::{
    is_cross_account_principal, parse_policy, Statement, WildcardPrincipal,
};
use anyhow::Result;

pub async fn run(aws: &AwsSession) -> Result<()> {
    let account_id = aws.account_id().await?;
    let regions = aws.regions(RegionSelection::Enabled).await?;

    for region in &regions {
        println!("Checking region: {region}");
        let client = aws_sdk_lambda::Client::new(&aws.region_config(region));

        let mut marker: Option<String> = None;
        loop {
            let mut request = client.list_functions();
            if let Some(m) = &marker {
                request = request.marker(m);
            }
            let page = match request.send().await {
                Ok(page) => page,
                Err(err) => {
                    println!("Error listing functions in region {region}: {err}");
                    break;
                }
            };

            for function in page.functions() {
                let Some(function_name) = function.function_name() else {
                    continue;
                };
                audit_function(&client, region, function_name, &account_id).await;
            }

            marker = page.next_marker().map(str::to_string);
            if marker.is_none() {
                break;
            }
        }
    }
    Ok(())
}

async fn audit_function(
    client: &aws_sdk_lambda::Client,
    region: &str,
    function_name: &str,
    account_id: &str,
) {
    let policy_json = match client
        .get_policy()
        .function_name(function_name)
        .send()
        .await
    {
        Ok(output) => match output.policy() {
            Some(policy) => policy.to_string(),
            None => return,
        },
        Err(err)
            if err
                .as_service_error()
                .is_some_and(|e| e.is_resource_not_found_exception()) =>
        {
            // No policy attached.
            return;
        }
        Err(err) => {
            println!("Error processing function {function_name} in {region}: {err}");
            return;
        }
    };

    let document = match parse_policy(&policy_json) {
        Ok(document) => document,
        Err(err) => {
            println!("Error processing function {function_name} in {region}: {err}");
            return;
        }
    };

    for statement in &document.statements {
        if statement_is_cross_account(statement, account_id) {
            match serde_json::to_string(statement) {
                Ok(rendered) => println!(
                    "Region: {region} | Function: {function_name} | Cross-account/org policy: {rendered}"
                ),
                Err(err) => {
                    println!("Error processing function {function_name} in {region}: {err}")
                }
            }
        }
    }
}

fn statement_is_cross_account(statement: &Statement, account_id: &str) -> bool {
    statement
        .principal
        .as_ref()
        .is_some_and(|principal| {
            is_cross_account_principal(principal, account_id, WildcardPrincipal::CrossAccount)
        })
}
