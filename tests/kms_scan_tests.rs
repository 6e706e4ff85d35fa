// End-to-end KMS scan against a mocked client: pagination across two
// key pages, exactly one cross-account finding, and idempotence of the
// scan over the same responses.

use aws_exposure_tools::commands::kms;
use aws_sdk_kms::operation::get_key_policy::GetKeyPolicyOutput;
use aws_sdk_kms::operation::list_keys::ListKeysOutput;
use aws_sdk_kms::types::KeyListEntry;
use aws_smithy_mocks::{mock, mock_client, RuleMode};

const CROSS_ACCOUNT_POLICY: &str = r#"{
    "Version": "2012-10-17",
    "Statement": [{
        "Effect": "Allow",
        "Principal": {"AWS": "arn:aws:iam::999999999999:root"},
        "Action": "kms:Decrypt",
        "Resource": "*"
    }]
}"#;

const OWN_ACCOUNT_POLICY: &str = r#"{
    "Version": "2012-10-17",
    "Statement": [{
        "Effect": "Allow",
        "Principal": {"AWS": "arn:aws:iam::111111111111:root"},
        "Action": "kms:*",
        "Resource": "*"
    }]
}"#;

fn mocked_kms_client() -> aws_sdk_kms::Client {
    let list_page_one = mock!(aws_sdk_kms::Client::list_keys)
        .match_requests(|req| req.marker().is_none())
        .then_output(|| {
            ListKeysOutput::builder()
                .keys(KeyListEntry::builder().key_id("key-1").build())
                .next_marker("page-2")
                .build()
        });
    let list_page_two = mock!(aws_sdk_kms::Client::list_keys)
        .match_requests(|req| req.marker() == Some("page-2"))
        .then_output(|| {
            ListKeysOutput::builder()
                .keys(KeyListEntry::builder().key_id("key-2").build())
                .build()
        });
    let policy_key_one = mock!(aws_sdk_kms::Client::get_key_policy)
        .match_requests(|req| req.key_id() == Some("key-1"))
        .then_output(|| {
            GetKeyPolicyOutput::builder()
                .policy(CROSS_ACCOUNT_POLICY)
                .build()
        });
    let policy_key_two = mock!(aws_sdk_kms::Client::get_key_policy)
        .match_requests(|req| req.key_id() == Some("key-2"))
        .then_output(|| {
            GetKeyPolicyOutput::builder()
                .policy(OWN_ACCOUNT_POLICY)
                .build()
        });

    mock_client!(
        aws_sdk_kms,
        RuleMode::MatchAny,
        [
            &list_page_one,
            &list_page_two,
            &policy_key_one,
            &policy_key_two
        ]
    )
}

#[tokio::test]
async fn test_scan_concatenates_pages_and_finds_one_cross_account_grant() {
    let client = mocked_kms_client();

    let scan = kms::scan_region(&client, "us-east-1", "111111111111", Some("o-abc12345"))
        .await
        .unwrap();

    // Both pages were drained, in page order.
    assert_eq!(scan.keys_checked, 2);
    // Exactly one finding, naming the key and the foreign account.
    assert_eq!(scan.cross_account.len(), 1);
    assert!(scan.cross_account[0].contains("key-1"));
    assert!(scan.cross_account[0].contains("999999999999"));
    assert!(scan.cross_org.is_empty());
}

#[tokio::test]
async fn test_scan_is_idempotent_over_identical_responses() {
    let client = mocked_kms_client();

    let first = kms::scan_region(&client, "us-east-1", "111111111111", None)
        .await
        .unwrap();
    let second = kms::scan_region(&client, "us-east-1", "111111111111", None)
        .await
        .unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_scan_with_foreign_caller_flags_both_keys() {
    let client = mocked_kms_client();

    let scan = kms::scan_region(&client, "us-east-1", "555555555555", None)
        .await
        .unwrap();

    assert_eq!(scan.keys_checked, 2);
    assert_eq!(scan.cross_account.len(), 2);
}
