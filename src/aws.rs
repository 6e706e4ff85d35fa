//! Ambient AWS session handling shared by every command.
//!
//! Credentials, profile, and default region come from the environment the
//! way the AWS CLI resolves them. Commands receive an [`AwsSession`] and
//! derive per-region clients from it instead of reading the environment
//! themselves, which keeps the audit logic testable.

use anyhow::{Context, Result};
use aws_config::{BehaviorVersion, Region, SdkConfig};
use tracing::{debug, warn};

/// Which regions a command scans.
///
/// The audit procedures intentionally differ here and the differences are
/// preserved: unifying them would silently change which regions get
/// scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionSelection {
    /// Every region the account has enabled (the `DescribeRegions`
    /// default listing), unfiltered.
    Enabled,
    /// The default listing filtered to opted-in regions.
    OptedIn,
    /// The `AllRegions=true` listing filtered to opted-in regions.
    AllOptedIn,
}

/// Handle over the ambient AWS configuration.
#[derive(Debug, Clone)]
pub struct AwsSession {
    base: SdkConfig,
}

impl AwsSession {
    /// Load ambient configuration, optionally pinned to a named profile.
    pub async fn connect(profile: Option<&str>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(profile) = profile {
            loader = loader.profile_name(profile);
        }
        let base = loader.load().await;
        debug!(region = ?base.region(), "loaded ambient AWS configuration");
        Self { base }
    }

    /// The base configuration (default region, ambient credentials).
    pub fn config(&self) -> &SdkConfig {
        &self.base
    }

    /// The base configuration re-targeted at a specific region.
    pub fn region_config(&self, region: &str) -> SdkConfig {
        self.base
            .to_builder()
            .region(Region::new(region.to_string()))
            .build()
    }

    /// The caller's 12-digit account id, via STS.
    pub async fn account_id(&self) -> Result<String> {
        let sts = aws_sdk_sts::Client::new(&self.base);
        let identity = sts
            .get_caller_identity()
            .send()
            .await
            .context("failed to resolve caller identity")?;
        identity
            .account()
            .map(str::to_string)
            .context("caller identity did not include an account id")
    }

    /// The caller's organization id, if the account belongs to one.
    ///
    /// Any failure (standalone account, missing `organizations:Describe*`
    /// permission) yields `None`; org-based checks downstream then report
    /// nothing rather than erroring out.
    pub async fn organization_id(&self) -> Option<String> {
        let org = aws_sdk_organizations::Client::new(&self.base);
        match org.describe_organization().send().await {
            Ok(output) => output
                .organization()
                .and_then(|o| o.id())
                .map(str::to_string),
            Err(err) => {
                warn!("could not determine organization id: {err}");
                None
            }
        }
    }

    /// Discover the regions to scan, per the command's selection variant.
    pub async fn regions(&self, selection: RegionSelection) -> Result<Vec<String>> {
        let all = selection == RegionSelection::AllOptedIn;
        // The AllRegions listing is served everywhere; pin it to a region
        // that exists regardless of the ambient default.
        let ec2 = if all {
            aws_sdk_ec2::Client::new(&self.region_config("us-east-1"))
        } else {
            aws_sdk_ec2::Client::new(&self.base)
        };
        let output = ec2
            .describe_regions()
            .all_regions(all)
            .send()
            .await
            .context("failed to describe regions")?;
        let regions = match selection {
            RegionSelection::Enabled => output
                .regions()
                .iter()
                .filter_map(|r| r.region_name())
                .map(str::to_string)
                .collect(),
            RegionSelection::OptedIn | RegionSelection::AllOptedIn => {
                opted_in_region_names(output.regions())
            }
        };
        Ok(regions)
    }
}

/// Names of the regions that are active for this account, in the order the
/// API returned them.
pub fn opted_in_region_names(regions: &[aws_sdk_ec2::types::Region]) -> Vec<String> {
    regions
        .iter()
        .filter(|r| {
            matches!(
                r.opt_in_status(),
                Some("opt-in-not-required") | Some("opted-in")
            )
        })
        .filter_map(|r| r.region_name())
        .map(str::to_string)
        .collect()
}
