//! # AWS Exposure Tools
//!
//! Command-line tools for auditing cross-account, cross-organization, and
//! public exposure of AWS resources.
//!
//! ## Overview
//!
//! This crate bundles a set of independent, single-purpose audit procedures
//! behind one binary. Each subcommand queries one AWS service, applies a
//! per-resource classification rule, and prints findings as it goes:
//!
//! ```bash
//! # Which of my AMIs are shared with other accounts or public?
//! aws-exposure ami
//!
//! # Which KMS key policies grant access outside this account/organization?
//! aws-exposure kms
//!
//! # Full Identity Center assignment report, written as CSV
//! aws-exposure sso-report --output assignments.csv
//! ```
//!
//! ## Commands
//!
//! - `ami` - AMIs with cross-account or public launch permissions
//! - `backups` - recovery points copied in from other accounts
//! - `event-bridge` - event buses granting cross-account/org access
//! - `iam` - roles assumable from foreign accounts or organizations
//! - `kms` - key policies with cross-account/org grants
//! - `lambda` - function policies with cross-account grants
//! - `org` - Organizations inventory (delegated admins, policy types,
//!   trusted service access)
//! - `ram` - resources shared out through AWS RAM
//! - `region-usage` - most active regions/services by last month's cost
//! - `s3` - bucket policies, bucket ACLs, and sampled object ACLs
//! - `security-services` - Config/SecurityHub/GuardDuty/CloudTrail status
//!   per region
//! - `sso-report` - Identity Center assignment inventory (CSV export)
//!
//! ## Architecture
//!
//! - [`aws`] - ambient credential/config handle, caller identity, region
//!   discovery
//! - [`policy`] - resource-policy data model and the shared
//!   cross-account/cross-org classification predicates
//! - [`commands`] - one module per audit procedure
//!
//! Execution is strictly sequential: regions are visited one at a time,
//! resources within a region one at a time, nested lookups awaited in
//! order. Findings go to stdout; diagnostics go to stderr via `tracing`.
//!
//! ## Credentials
//!
//! All commands rely on ambient AWS configuration (environment, shared
//! config/credentials files, instance metadata). Use `--profile` to select
//! a named profile.

pub mod aws;
pub mod commands;
pub mod policy;
