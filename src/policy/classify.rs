//! Cross-account and cross-organization classification predicates.
//!
//! One predicate family, parameterized by the per-command behavioral
//! differences instead of re-implemented per command:
//!
//! - wildcard principals (`*`) count as cross-account everywhere except
//!   the S3 bucket-policy check, which reports public access through ACLs
//!   instead ([`WildcardPrincipal`]);
//! - `aws:PrincipalOrgID` conditions are a finding when they name a
//!   foreign organization, except in the S3 check where any use of the
//!   key is surfaced ([`OrgConditionRule`]).

use super::types::{ConditionMap, Principal};

/// The condition key that scopes a grant to an organization.
pub const PRINCIPAL_ORG_ID: &str = "aws:PrincipalOrgID";

/// How a bare `*` principal is classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WildcardPrincipal {
    /// `*` is reported as a cross-account grant.
    CrossAccount,
    /// `*` is skipped; public access is a separate risk category reported
    /// elsewhere.
    Ignored,
}

/// How `aws:PrincipalOrgID` conditions are classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrgConditionRule {
    /// A finding only when the condition names an organization other than
    /// the caller's. With no own organization the check is indeterminate
    /// and reports nothing.
    DifferentOrg,
    /// A finding whenever the key appears, regardless of value.
    KeyPresence,
}

/// The account id embedded in an ARN, when its fifth colon-separated
/// field is a 12-digit account number.
///
/// Covers `arn:aws:iam::123456789012:root` and every other
/// account-qualified ARN shape.
pub fn account_id_from_arn(arn: &str) -> Option<&str> {
    let account = arn.split(':').nth(4)?;
    (account.len() == 12 && account.bytes().all(|b| b.is_ascii_digit())).then_some(account)
}

/// The organization id of an `arn:aws:organizations::…:organization/o-…`
/// principal.
pub fn org_id_from_arn(arn: &str) -> Option<&str> {
    if !arn.contains(":organization/") {
        return None;
    }
    arn.rsplit('/').next()
}

/// True when any identifier in the principal refers to an account other
/// than the caller's, or is a wildcard under the `CrossAccount` rule.
///
/// Recurses through the list and map forms. Identifiers that carry no
/// account (service principals, federated providers) never match.
pub fn is_cross_account_principal(
    principal: &Principal,
    own_account_id: &str,
    wildcard: WildcardPrincipal,
) -> bool {
    principal
        .identifiers()
        .into_iter()
        .any(|id| identifier_is_cross_account(id, own_account_id, wildcard))
}

fn identifier_is_cross_account(
    id: &str,
    own_account_id: &str,
    wildcard: WildcardPrincipal,
) -> bool {
    if id == "*" {
        return wildcard == WildcardPrincipal::CrossAccount;
    }
    // Policies may name an account bare, without the ARN wrapper.
    if id.len() == 12 && id.bytes().all(|b| b.is_ascii_digit()) {
        return id != own_account_id;
    }
    account_id_from_arn(id).is_some_and(|account| account != own_account_id)
}

/// True when the statement's condition block restricts access to an
/// organization per the given rule.
pub fn is_cross_org_condition(
    condition: &ConditionMap,
    own_org_id: Option<&str>,
    rule: OrgConditionRule,
) -> bool {
    match rule {
        OrgConditionRule::KeyPresence => condition
            .values()
            .any(|keys| keys.contains_key(PRINCIPAL_ORG_ID)),
        OrgConditionRule::DifferentOrg => {
            let Some(own) = own_org_id else {
                return false;
            };
            condition
                .values()
                .filter_map(|keys| keys.get(PRINCIPAL_ORG_ID))
                .any(|value| value.strings().any(|org| org != own))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(json: &str) -> Principal {
        serde_json::from_str(json).unwrap()
    }

    fn condition(json: &str) -> ConditionMap {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_account_id_from_arn() {
        assert_eq!(
            account_id_from_arn("arn:aws:iam::111111111111:root"),
            Some("111111111111")
        );
        assert_eq!(
            account_id_from_arn("arn:aws:iam::123456789012:role/Deploy"),
            Some("123456789012")
        );
        assert_eq!(
            account_id_from_arn("arn:aws:backup:eu-west-1:222222222222:backup-vault:main"),
            Some("222222222222")
        );
        assert_eq!(account_id_from_arn("arn:aws:s3:::bucket"), None);
        assert_eq!(account_id_from_arn("*"), None);
        assert_eq!(account_id_from_arn("lambda.amazonaws.com"), None);
    }

    #[test]
    fn test_org_id_from_arn() {
        assert_eq!(
            org_id_from_arn("arn:aws:organizations::123456789012:organization/o-abc12345"),
            Some("o-abc12345")
        );
        assert_eq!(org_id_from_arn("arn:aws:iam::123456789012:root"), None);
    }

    #[test]
    fn test_foreign_root_arn_is_cross_account() {
        let p = principal(r#""arn:aws:iam::111111111111:root""#);
        assert!(is_cross_account_principal(
            &p,
            "222222222222",
            WildcardPrincipal::CrossAccount
        ));
    }

    #[test]
    fn test_own_account_is_not_cross_account() {
        let p = principal(r#""arn:aws:iam::111111111111:root""#);
        assert!(!is_cross_account_principal(
            &p,
            "111111111111",
            WildcardPrincipal::CrossAccount
        ));
    }

    #[test]
    fn test_wildcard_rules() {
        let p = principal(r#""*""#);
        assert!(is_cross_account_principal(
            &p,
            "111111111111",
            WildcardPrincipal::CrossAccount
        ));
        assert!(!is_cross_account_principal(
            &p,
            "111111111111",
            WildcardPrincipal::Ignored
        ));

        // The map-wrapped spelling follows the same rule.
        let wrapped = principal(r#"{"AWS": "*"}"#);
        assert!(!is_cross_account_principal(
            &wrapped,
            "111111111111",
            WildcardPrincipal::Ignored
        ));
    }

    #[test]
    fn test_recursion_through_map_and_list() {
        let p = principal(
            r#"{"AWS": ["arn:aws:iam::111111111111:root", "arn:aws:iam::999999999999:root"]}"#,
        );
        assert!(is_cross_account_principal(
            &p,
            "111111111111",
            WildcardPrincipal::CrossAccount
        ));

        let same_only = principal(r#"{"AWS": ["arn:aws:iam::111111111111:root"]}"#);
        assert!(!is_cross_account_principal(
            &same_only,
            "111111111111",
            WildcardPrincipal::CrossAccount
        ));
    }

    #[test]
    fn test_service_principals_never_match() {
        let p = principal(r#"{"Service": "events.amazonaws.com"}"#);
        assert!(!is_cross_account_principal(
            &p,
            "111111111111",
            WildcardPrincipal::CrossAccount
        ));
    }

    #[test]
    fn test_bare_account_id_is_compared() {
        let p = principal(r#"{"AWS": "999999999999"}"#);
        assert!(is_cross_account_principal(
            &p,
            "111111111111",
            WildcardPrincipal::CrossAccount
        ));
        let own = principal(r#"{"AWS": "111111111111"}"#);
        assert!(!is_cross_account_principal(
            &own,
            "111111111111",
            WildcardPrincipal::CrossAccount
        ));
    }

    #[test]
    fn test_same_org_condition_is_not_cross_org() {
        let c = condition(r#"{"StringEquals": {"aws:PrincipalOrgID": "o-abc12345"}}"#);
        assert!(!is_cross_org_condition(
            &c,
            Some("o-abc12345"),
            OrgConditionRule::DifferentOrg
        ));
    }

    #[test]
    fn test_foreign_org_condition_is_cross_org() {
        let c = condition(r#"{"StringEquals": {"aws:PrincipalOrgID": "o-abc12345"}}"#);
        assert!(is_cross_org_condition(
            &c,
            Some("o-xyz99999"),
            OrgConditionRule::DifferentOrg
        ));
    }

    #[test]
    fn test_org_list_values_any_foreign() {
        let c = condition(
            r#"{"StringEquals": {"aws:PrincipalOrgID": ["o-abc12345", "o-xyz99999"]}}"#,
        );
        assert!(is_cross_org_condition(
            &c,
            Some("o-abc12345"),
            OrgConditionRule::DifferentOrg
        ));
    }

    #[test]
    fn test_unknown_own_org_is_indeterminate() {
        let c = condition(r#"{"StringEquals": {"aws:PrincipalOrgID": "o-abc12345"}}"#);
        assert!(!is_cross_org_condition(
            &c,
            None,
            OrgConditionRule::DifferentOrg
        ));
    }

    #[test]
    fn test_key_presence_rule_flags_any_org_condition() {
        let c = condition(r#"{"StringEquals": {"aws:PrincipalOrgID": "o-abc12345"}}"#);
        assert!(is_cross_org_condition(
            &c,
            Some("o-abc12345"),
            OrgConditionRule::KeyPresence
        ));
        assert!(is_cross_org_condition(&c, None, OrgConditionRule::KeyPresence));

        let unrelated = condition(r#"{"StringEquals": {"aws:SourceAccount": "111111111111"}}"#);
        assert!(!is_cross_org_condition(
            &unrelated,
            Some("o-abc12345"),
            OrgConditionRule::KeyPresence
        ));
    }
}
