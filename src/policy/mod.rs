//! Resource-policy data model and classification predicates.
//!
//! Every audit in this crate ultimately answers the same question about a
//! policy document attached to some resource: does it grant access to a
//! principal outside this account, outside this organization, or to the
//! world? The scripts this crate grew out of each re-implemented that
//! check with small variations; here the variations are explicit
//! parameters of one shared predicate family:
//!
//! - [`types`] - serde model of policy documents as the AWS APIs return
//!   them (statements as object or array, principals as string, list, or
//!   map, conditions as operator maps)
//! - [`classify`] - ARN account/org extraction and the cross-account /
//!   cross-organization predicates

pub mod classify;
pub mod types;

pub use classify::{
    account_id_from_arn, is_cross_account_principal, is_cross_org_condition, org_id_from_arn,
    OrgConditionRule, WildcardPrincipal,
};
pub use types::{
    parse_policy, parse_trust_policy, ConditionMap, ConditionValue, PolicyDocument, PolicyError,
    Principal, PrincipalEntry, Statement,
};
