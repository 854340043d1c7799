//! Password handlers: reset and set
//!
//! Reset forces a password change at next logon by zeroing pwdLastSet.
//! Set writes a new password through the unicodePwd attribute, which the
//! directory requires as a UTF-16LE encoding of the quoted password over a
//! secure connection. A mismatched confirmation fails locally, before any
//! directory call.

use std::collections::HashSet;

use ldap3::Mod;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::handlers;
use crate::outcome::OutcomeRecord;
use crate::session::DirectorySession;

#[derive(Debug, Deserialize)]
struct ResetPasswordParams {
    user: String,
    #[serde(default)]
    use_samaccountname: bool,
}

#[derive(Debug, Deserialize)]
struct SetPasswordParams {
    user: String,
    password: String,
    confirm_password: String,
    #[serde(default)]
    use_samaccountname: bool,
}

/// unicodePwd value: the password wrapped in double quotes, encoded as
/// UTF-16LE bytes.
pub(crate) fn encode_password(password: &str) -> Vec<u8> {
    let quoted = format!("\"{}\"", password);
    quoted
        .encode_utf16()
        .flat_map(|unit| unit.to_le_bytes())
        .collect()
}

pub fn reset_password(session: &mut DirectorySession, params: &Value) -> OutcomeRecord {
    let p: ResetPasswordParams = match handlers::parse(params) {
        Ok(p) => p,
        Err(e) => return OutcomeRecord::failed(e.to_string()),
    };
    let user = p.user.to_lowercase();

    let resolved = match handlers::resolve_principal(session, &user, p.use_samaccountname) {
        Ok(Some(r)) => r,
        Ok(None) => {
            let mut outcome = OutcomeRecord::failed("No users found");
            outcome.set_summary("reset", false);
            outcome.add_data(json!({"reset": false}));
            return outcome;
        }
        Err(e) => return OutcomeRecord::failed(e.to_string()),
    };
    let mut data = resolved.data;

    if let Err(e) = session.ensure_bound() {
        data.insert("reset".into(), json!(false));
        let mut outcome = OutcomeRecord::failed(e.to_string());
        outcome.set_summary("reset", false);
        outcome.add_data(Value::Object(data));
        return outcome;
    }

    debug!(user_dn = %resolved.dn, "forcing password expiry");
    let change = Mod::Replace("pwdlastset".to_string(), HashSet::from(["0".to_string()]));
    match session.modify(&resolved.dn, vec![change]) {
        Ok(()) => {
            data.insert("reset".into(), json!(true));
            let mut outcome = OutcomeRecord::succeeded("Password reset");
            outcome.set_summary("reset", true);
            outcome.add_data(Value::Object(data));
            outcome
        }
        Err(e) => {
            data.insert("reset".into(), json!(false));
            let mut outcome = OutcomeRecord::failed(e.to_string());
            outcome.set_summary("reset", false);
            outcome.add_data(Value::Object(data));
            outcome
        }
    }
}

pub fn set_password(session: &mut DirectorySession, params: &Value) -> OutcomeRecord {
    let p: SetPasswordParams = match handlers::parse(params) {
        Ok(p) => p,
        Err(e) => return OutcomeRecord::failed(e.to_string()),
    };
    let user = p.user.to_lowercase();

    // Byte-for-byte confirmation check, before any network call.
    if p.password != p.confirm_password {
        let mut outcome = OutcomeRecord::failed("Passwords do not match");
        outcome.set_summary("set", false);
        outcome.add_data(json!({"set": false}));
        return outcome;
    }

    if let Err(e) = session.ensure_bound() {
        let mut outcome = OutcomeRecord::failed(e.to_string());
        outcome.set_summary("set", false);
        outcome.add_data(json!({"set": false}));
        return outcome;
    }

    let resolved = match handlers::resolve_principal(session, &user, p.use_samaccountname) {
        Ok(Some(r)) => r,
        Ok(None) => {
            let mut outcome = OutcomeRecord::failed("No users found");
            outcome.set_summary("set", false);
            outcome.add_data(json!({"set": false}));
            return outcome;
        }
        Err(e) => return OutcomeRecord::failed(e.to_string()),
    };
    let mut data = resolved.data;

    debug!(user_dn = %resolved.dn, "attempting password set");
    let change = Mod::Replace(b"unicodePwd".to_vec(), HashSet::from([encode_password(&p.password)]));
    match session.modify_bytes(&resolved.dn, vec![change]) {
        Ok(()) => {
            info!(user_dn = %resolved.dn, "password set");
            data.insert("set".into(), json!(true));
            let mut outcome = OutcomeRecord::succeeded("Password set");
            outcome.set_summary("set", true);
            outcome.add_data(Value::Object(data));
            outcome
        }
        Err(e) => {
            data.insert("set".into(), json!(false));
            let mut outcome = OutcomeRecord::failed(format!(
                "{}. Also, please make sure that the account in asset has permissions \
                 to Set Password and password meets complexity requirements",
                e
            ));
            outcome.set_summary("set", false);
            outcome.add_data(Value::Object(data));
            outcome
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_password_quotes_and_widens() {
        let encoded = encode_password("Pa1");
        // "Pa1" with quotes is 5 UTF-16 units, little-endian.
        assert_eq!(
            encoded,
            vec![b'"', 0, b'P', 0, b'a', 0, b'1', 0, b'"', 0]
        );
    }

    #[test]
    fn encode_password_handles_non_ascii() {
        let encoded = encode_password("ä");
        assert_eq!(encoded, vec![b'"', 0, 0xE4, 0, b'"', 0]);
    }

    #[test]
    fn encode_password_empty_is_just_quotes() {
        assert_eq!(encode_password(""), vec![b'"', 0, b'"', 0]);
    }
}
