//! Action dispatch and result normalization
//!
//! Routes an incoming action identifier to its handler and sanitizes the
//! outgoing record once before it is returned to the host. The identifier
//! set is closed; the host framework validates it against the declared
//! capability set before invoking, so an unknown identifier never reaches
//! a handler.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::handlers::{account, attribute, group, object, password};
use crate::outcome::OutcomeRecord;
use crate::session::DirectorySession;

/// The closed set of action identifiers this adapter serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    TestConnectivity,
    RunQuery,
    AddGroupMembers,
    RemoveGroupMembers,
    UnlockAccount,
    DisableAccount,
    EnableAccount,
    MoveObject,
    GetAttributes,
    SetAttribute,
    ResetPassword,
    SetPassword,
    RenameObject,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::TestConnectivity => "test_connectivity",
            Action::RunQuery => "run_query",
            Action::AddGroupMembers => "add_group_members",
            Action::RemoveGroupMembers => "remove_group_members",
            Action::UnlockAccount => "unlock_account",
            Action::DisableAccount => "disable_account",
            Action::EnableAccount => "enable_account",
            Action::MoveObject => "move_object",
            Action::GetAttributes => "get_attributes",
            Action::SetAttribute => "set_attribute",
            Action::ResetPassword => "reset_password",
            Action::SetPassword => "set_password",
            Action::RenameObject => "rename_object",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an identifier outside the declared capability set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAction(pub String);

impl fmt::Display for UnknownAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown action identifier: {}", self.0)
    }
}

impl std::error::Error for UnknownAction {}

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(Value::String(s.to_string()))
            .map_err(|_| UnknownAction(s.to_string()))
    }
}

/// Runs one action to completion and returns its sanitized outcome. This
/// is the whole adapter surface the host calls per invocation.
pub fn handle_action(
    session: &mut DirectorySession,
    action: Action,
    params: &Value,
) -> OutcomeRecord {
    debug!(action = %action, "dispatching action");

    let outcome = match action {
        Action::TestConnectivity => test_connectivity(session),
        Action::RunQuery => attribute::run_query(session, params),
        Action::AddGroupMembers => group::add_members(session, params),
        Action::RemoveGroupMembers => group::remove_members(session, params),
        Action::UnlockAccount => account::unlock(session, params),
        Action::DisableAccount => account::disable(session, params),
        Action::EnableAccount => account::enable(session, params),
        Action::MoveObject => object::move_object(session, params),
        Action::GetAttributes => attribute::get_attributes(session, params),
        Action::SetAttribute => attribute::set_attribute(session, params),
        Action::ResetPassword => password::reset_password(session, params),
        Action::SetPassword => password::set_password(session, params),
        Action::RenameObject => object::rename_object(session, params),
    };

    // Sanitization is a return-value transform applied exactly once, here.
    outcome.sanitized()
}

/// A pure bind attempt; success or failure is the entire outcome.
fn test_connectivity(session: &mut DirectorySession) -> OutcomeRecord {
    match session.ensure_bound() {
        Ok(()) => OutcomeRecord::succeeded("Test Connectivity Passed"),
        Err(e) => {
            debug!(error = %e, "test connectivity failed");
            OutcomeRecord::failed(format!("Test Connectivity Failed: {}", e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_identifier_parses() {
        let identifiers = [
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
        ];
        for id in identifiers {
            let action = Action::from_str(id).unwrap();
            assert_eq!(action.as_str(), id);
        }
    }

    #[test]
    fn unknown_identifier_is_rejected() {
        let err = Action::from_str("delete_forest").unwrap_err();
        assert_eq!(err, UnknownAction("delete_forest".to_string()));
        assert!(err.to_string().contains("delete_forest"));
    }

    #[test]
    fn display_matches_wire_form() {
        assert_eq!(Action::SetPassword.to_string(), "set_password");
    }
}
