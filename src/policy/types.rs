//! Serde model of AWS resource policy documents.
//!
//! These types mirror the JSON that `GetKeyPolicy`, `GetBucketPolicy`,
//! `DescribeEventBus`, `GetPolicy`, and `ListRoles` hand back. The model is
//! deliberately tolerant: statements may be a single object or an array,
//! principals come in four shapes, and condition values may be a string or
//! a list.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Why a policy document could not be parsed.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("invalid policy document JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to percent-decode policy document: {0}")]
    Decode(#[from] std::string::FromUtf8Error),
}

/// A resource policy document.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PolicyDocument {
    #[serde(rename = "Version", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(rename = "Id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "Statement", default, deserialize_with = "statement_list")]
    pub statements: Vec<Statement>,
}

/// One statement within a policy document.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Statement {
    #[serde(rename = "Sid", default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    #[serde(rename = "Effect", default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<String>,
    #[serde(
        rename = "Principal",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub principal: Option<Principal>,
    #[serde(rename = "Action", default, skip_serializing_if = "Option::is_none")]
    pub action: Option<serde_json::Value>,
    #[serde(rename = "Resource", default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<serde_json::Value>,
    #[serde(
        rename = "Condition",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub condition: Option<ConditionMap>,
}

impl Statement {
    /// Whether this statement grants (rather than denies) access.
    pub fn allows(&self) -> bool {
        self.effect.as_deref() == Some("Allow")
    }
}

/// The `Principal` element of a statement: `"*"`, a single identifier, a
/// list of identifiers, or a map from provider (`AWS`, `Service`,
/// `Federated`) to identifier(s).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Principal {
    Id(String),
    Ids(Vec<String>),
    Map(HashMap<String, PrincipalEntry>),
}

/// Identifier(s) under one provider key of a principal map.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PrincipalEntry {
    One(String),
    Many(Vec<String>),
}

impl PrincipalEntry {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let slice: &[String] = match self {
            PrincipalEntry::One(id) => std::slice::from_ref(id),
            PrincipalEntry::Many(ids) => ids.as_slice(),
        };
        slice.iter().map(String::as_str)
    }
}

impl Principal {
    /// All identifiers contained in this principal, regardless of
    /// provider key.
    pub fn identifiers(&self) -> Vec<&str> {
        match self {
            Principal::Id(id) => vec![id.as_str()],
            Principal::Ids(ids) => ids.iter().map(String::as_str).collect(),
            Principal::Map(map) => map.values().flat_map(PrincipalEntry::iter).collect(),
        }
    }

    /// Identifiers granted to AWS accounts: the `AWS` key of a principal
    /// map, or the bare string/list forms.
    pub fn aws_identifiers(&self) -> Vec<&str> {
        match self {
            Principal::Id(id) => vec![id.as_str()],
            Principal::Ids(ids) => ids.iter().map(String::as_str).collect(),
            Principal::Map(map) => map
                .get("AWS")
                .map(|entry| entry.iter().collect())
                .unwrap_or_default(),
        }
    }
}

/// The `Condition` element: operator -> condition key -> value(s).
pub type ConditionMap = HashMap<String, HashMap<String, ConditionValue>>;

/// A condition value. Strings and string lists are what the org predicate
/// cares about; anything else (booleans, numbers) is carried but ignored.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ConditionValue {
    One(String),
    Many(Vec<String>),
    Other(serde_json::Value),
}

impl ConditionValue {
    pub fn strings(&self) -> impl Iterator<Item = &str> {
        let slice: &[String] = match self {
            ConditionValue::One(value) => std::slice::from_ref(value),
            ConditionValue::Many(values) => values.as_slice(),
            ConditionValue::Other(_) => &[],
        };
        slice.iter().map(String::as_str)
    }
}

/// Parse a policy document from raw JSON.
pub fn parse_policy(raw: &str) -> Result<PolicyDocument, PolicyError> {
    Ok(serde_json::from_str(raw)?)
}

/// Parse a percent-encoded trust policy, as `iam:ListRoles` returns them.
pub fn parse_trust_policy(raw: &str) -> Result<PolicyDocument, PolicyError> {
    let decoded = urlencoding::decode(raw)?;
    Ok(serde_json::from_str(&decoded)?)
}

// The Statement element is an array in almost every document the APIs
// return, but a single object is legal and does occur.
fn statement_list<'de, D>(deserializer: D) -> Result<Vec<Statement>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(Box<Statement>),
        Many(Vec<Statement>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(statement) => vec![*statement],
        OneOrMany::Many(statements) => statements,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_policy_with_statement_array() {
        let json = r#"{
            "Version": "2012-10-17",
            "Statement": [
                {
                    "Effect": "Allow",
                    "Principal": {"AWS": "arn:aws:iam::111111111111:root"},
                    "Action": "kms:*",
                    "Resource": "*"
                },
                {
                    "Effect": "Deny",
                    "Principal": "*",
                    "Action": "kms:Decrypt",
                    "Resource": "*"
                }
            ]
        }"#;

        let policy = parse_policy(json).unwrap();
        assert_eq!(policy.version.as_deref(), Some("2012-10-17"));
        assert_eq!(policy.statements.len(), 2);
        assert!(policy.statements[0].allows());
        assert!(!policy.statements[1].allows());
    }

    #[test]
    fn test_parse_policy_with_single_statement_object() {
        let json = r#"{
            "Version": "2012-10-17",
            "Statement": {
                "Effect": "Allow",
                "Principal": {"Service": "events.amazonaws.com"},
                "Action": "lambda:InvokeFunction"
            }
        }"#;

        let policy = parse_policy(json).unwrap();
        assert_eq!(policy.statements.len(), 1);
        assert!(policy.statements[0].allows());
    }

    #[test]
    fn test_principal_forms() {
        let wildcard: Principal = serde_json::from_str(r#""*""#).unwrap();
        assert_eq!(wildcard.identifiers(), vec!["*"]);

        let list: Principal =
            serde_json::from_str(r#"["arn:aws:iam::111111111111:root", "*"]"#).unwrap();
        assert_eq!(list.identifiers().len(), 2);

        let map: Principal = serde_json::from_str(
            r#"{"AWS": ["arn:aws:iam::222222222222:root"], "Service": "sns.amazonaws.com"}"#,
        )
        .unwrap();
        assert_eq!(
            map.aws_identifiers(),
            vec!["arn:aws:iam::222222222222:root"]
        );
        assert_eq!(map.identifiers().len(), 2);
    }

    #[test]
    fn test_principal_map_without_aws_key() {
        let map: Principal =
            serde_json::from_str(r#"{"Service": "logs.amazonaws.com"}"#).unwrap();
        assert!(map.aws_identifiers().is_empty());
        assert_eq!(map.identifiers(), vec!["logs.amazonaws.com"]);
    }

    #[test]
    fn test_condition_values() {
        let json = r#"{
            "Effect": "Allow",
            "Principal": "*",
            "Condition": {
                "StringEquals": {"aws:PrincipalOrgID": "o-abc12345"},
                "Bool": {"aws:SecureTransport": true}
            }
        }"#;

        let statement: Statement = serde_json::from_str(json).unwrap();
        let condition = statement.condition.unwrap();
        let org_values: Vec<&str> = condition["StringEquals"]["aws:PrincipalOrgID"]
            .strings()
            .collect();
        assert_eq!(org_values, vec!["o-abc12345"]);
        // Non-string values parse but contribute no strings.
        assert_eq!(condition["Bool"]["aws:SecureTransport"].strings().count(), 0);
    }

    #[test]
    fn test_parse_trust_policy_decodes_percent_encoding() {
        let encoded = "%7B%22Version%22%3A%222012-10-17%22%2C%22Statement%22%3A%5B%7B%22Effect%22%3A%22Allow%22%2C%22Principal%22%3A%7B%22AWS%22%3A%22arn%3Aaws%3Aiam%3A%3A999999999999%3Aroot%22%7D%2C%22Action%22%3A%22sts%3AAssumeRole%22%7D%5D%7D";

        let policy = parse_trust_policy(encoded).unwrap();
        assert_eq!(policy.statements.len(), 1);
        assert_eq!(
            policy.statements[0].principal.as_ref().unwrap().aws_identifiers(),
            vec!["arn:aws:iam::999999999999:root"]
        );
    }

    #[test]
    fn test_parse_policy_rejects_garbage() {
        assert!(parse_policy("not json").is_err());
    }

    #[test]
    fn test_statement_serializes_back_to_policy_json() {
        let json = r#"{
            "Sid": "AllowCrossAccount",
            "Effect": "Allow",
            "Principal": {"AWS": "arn:aws:iam::999999999999:root"},
            "Action": "s3:GetObject",
            "Resource": "arn:aws:s3:::bucket/*"
        }"#;

        let statement: Statement = serde_json::from_str(json).unwrap();
        let rendered = serde_json::to_string(&statement).unwrap();
        assert!(rendered.contains("\"Sid\":\"AllowCrossAccount\""));
        assert!(rendered.contains("999999999999"));
        // Absent elements stay absent.
        assert!(!rendered.contains("Condition"));
    }
}
