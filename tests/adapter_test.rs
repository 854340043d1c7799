//! Integration tests for the action dispatch surface
//!
//! These run without a directory server. Validation-stage failures must
//! short-circuit before any network call, and when a bind is required the
//! session points at a port nothing listens on, so the connect is rejected
//! locally.

use std::str::FromStr;

use serde_json::json;

use adldap::dispatch::{self, Action};
use adldap::{handle_action, AssetConfig, DirectorySession};

/// A session whose bind can never succeed: nothing listens on port 1.
fn unreachable_session() -> DirectorySession {
    let config = AssetConfig::from_value(json!({
        "server": "127.0.0.1",
        "username": "CORP\\svc_soar",
        "password": "hunter2",
        "ssl_port": 1,
        "connect_timeout_secs": 2,
    }))
    .unwrap();
    DirectorySession::new(config)
}

mod connectivity {
    use super::*;

    #[test]
    fn test_connectivity_reports_failure_against_unreachable_server() {
        let mut session = unreachable_session();
        let outcome = handle_action(&mut session, Action::TestConnectivity, &json!({}));
        assert!(!outcome.success);
        assert!(outcome.message.starts_with("Test Connectivity Failed"));
    }
}

mod validation_before_network {
    use super::*;

    #[test]
    fn set_password_mismatch_fails_locally() {
        // The exact mismatch message proves the handler never reached the
        // bind stage; a network attempt would have produced a bind error.
        let mut session = unreachable_session();
        let outcome = handle_action(
            &mut session,
            Action::SetPassword,
            &json!({
                "user": "cn=Alice,ou=Users,dc=corp,dc=example",
                "password": "NewPass1!",
                "confirm_password": "NewPass2!",
            }),
        );
        assert!(!outcome.success);
        assert_eq!(outcome.message, "Passwords do not match");
        assert_eq!(outcome.summary["set"], json!(false));
        assert_eq!(outcome.data, vec![json!({"set": false})]);
    }

    #[test]
    fn set_attribute_add_without_value_fails_locally() {
        let mut session = unreachable_session();
        let outcome = handle_action(
            &mut session,
            Action::SetAttribute,
            &json!({
                "user": "cn=Alice,ou=Users,dc=corp,dc=example",
                "attribute": "mail",
                "action": "ADD",
            }),
        );
        assert!(!outcome.success);
        assert!(outcome
            .message
            .contains("Value parameter must be filled when using ADD action"));
        assert_eq!(outcome.summary["message"], json!("Failed"));
        assert_eq!(outcome.data, vec![json!({"message": "Failed"})]);
    }

    #[test]
    fn set_attribute_replace_with_null_value_fails_locally() {
        let mut session = unreachable_session();
        let outcome = handle_action(
            &mut session,
            Action::SetAttribute,
            &json!({
                "user": "cn=Alice,ou=Users,dc=corp,dc=example",
                "attribute": "mail",
                "value": null,
                "action": "REPLACE",
            }),
        );
        assert!(!outcome.success);
        assert!(outcome
            .message
            .contains("Value parameter must be filled when using REPLACE action"));
    }

    #[test]
    fn missing_parameters_fail_as_validation() {
        let mut session = unreachable_session();
        let outcome = handle_action(&mut session, Action::UnlockAccount, &json!({}));
        assert!(!outcome.success);
        assert!(outcome.message.contains("Invalid action parameters"));
    }

    #[test]
    fn run_query_requires_attributes() {
        let mut session = unreachable_session();
        let outcome = handle_action(
            &mut session,
            Action::RunQuery,
            &json!({
                "filter": "(objectClass=user)",
                "attributes": " ; ",
            }),
        );
        assert!(!outcome.success);
        assert!(outcome.message.contains("at least one attribute"));
    }
}

mod network_failures_become_outcomes {
    use super::*;

    #[test]
    fn group_membership_fails_with_bind_error() {
        let mut session = unreachable_session();
        let outcome = handle_action(
            &mut session,
            Action::AddGroupMembers,
            &json!({
                "members": "cn=Alice,ou=Users,dc=corp,dc=example",
                "groups": "cn=Admins,ou=Groups,dc=corp,dc=example",
            }),
        );
        assert!(!outcome.success);
        assert!(outcome.message.contains("Bind failed"));
    }

    #[test]
    fn move_object_failure_carries_moved_flag() {
        let mut session = unreachable_session();
        let outcome = handle_action(
            &mut session,
            Action::MoveObject,
            &json!({
                "object": "cn=Alice,ou=Users,dc=corp,dc=example",
                "destination_ou": "ou=Disabled,dc=corp,dc=example",
            }),
        );
        assert!(!outcome.success);
        assert_eq!(outcome.summary["moved"], json!(false));
        assert_eq!(outcome.data, vec![json!({"moved": false})]);
    }
}

mod sanitization {
    use super::*;

    #[test]
    fn dispatch_sanitizes_nul_in_outgoing_message() {
        // An unknown attribute action is echoed into the failure message.
        // Smuggling a NUL through it exercises the final sanitization pass.
        let mut session = unreachable_session();
        let outcome = handle_action(
            &mut session,
            Action::SetAttribute,
            &json!({
                "user": "cn=Alice,ou=Users,dc=corp,dc=example",
                "attribute": "mail",
                "value": "x",
                "action": "UPSERT\u{0000}",
            }),
        );
        assert!(!outcome.success);
        assert!(!outcome.message.contains('\u{0000}'));
        assert!(outcome.message.contains("UPSERT\\u0000"));
    }
}

mod action_identifiers {
    use super::*;

    #[test]
    fn the_closed_set_round_trips() {
        for id in [
            "test_connectivity",
            "run_query",
            "add_group_members",
            "remove_group_members",
            "unlock_account",
            "disable_account",
            "enable_account",
            "move_object",
            "get_attributes",
            "set_attribute",
            "reset_password",
            "set_password",
            "rename_object",
        ] {
            assert_eq!(Action::from_str(id).unwrap().as_str(), id);
        }
    }

    #[test]
    fn unknown_identifiers_are_rejected() {
        let err = Action::from_str("nuke_domain").unwrap_err();
        assert_eq!(err, dispatch::UnknownAction("nuke_domain".to_string()));
    }
}
