//! Account state handlers: unlock, enable, disable
//!
//! Enable/disable reads the current userAccountControl value, records the
//! starting status, and flips only the ACCOUNTDISABLE bit (0x02). No other
//! control bit is ever touched.

use std::collections::HashSet;

use ldap3::Mod;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::handlers;
use crate::ldap_utils::escape_ldap_filter;
use crate::outcome::OutcomeRecord;
use crate::query::{self, QuerySpec};
use crate::session::DirectorySession;

/// The ACCOUNTDISABLE flag within userAccountControl.
const UF_ACCOUNT_DISABLE: u32 = 0x02;

#[derive(Debug, Deserialize)]
struct UserParams {
    user: String,
    #[serde(default)]
    use_samaccountname: bool,
}

/// Clears the lockout marker on the account, releasing a lockout without
/// touching the password or any control bits.
pub fn unlock(session: &mut DirectorySession, params: &Value) -> OutcomeRecord {
    let p: UserParams = match handlers::parse(params) {
        Ok(p) => p,
        Err(e) => return OutcomeRecord::failed(e.to_string()),
    };
    let user = p.user.to_lowercase();

    let resolved = match handlers::resolve_principal(session, &user, p.use_samaccountname) {
        Ok(Some(r)) => r,
        Ok(None) => {
            let mut outcome = OutcomeRecord::failed("No users found");
            outcome.set_summary("unlocked", false);
            outcome.add_data(json!({"unlocked": false}));
            return outcome;
        }
        Err(e) => return OutcomeRecord::failed(e.to_string()),
    };
    let mut data = resolved.data;

    if let Err(e) = session.ensure_bound() {
        data.insert("unlocked".into(), json!(false));
        let mut outcome = OutcomeRecord::failed(e.to_string());
        outcome.set_summary("unlocked", false);
        outcome.add_data(Value::Object(data));
        return outcome;
    }

    let change = Mod::Replace("lockoutTime".to_string(), HashSet::from(["0".to_string()]));
    match session.modify(&resolved.dn, vec![change]) {
        Ok(()) => {
            info!(user_dn = %resolved.dn, "account unlocked");
            data.insert("unlocked".into(), json!(true));
            let mut outcome = OutcomeRecord::succeeded("Account unlocked");
            outcome.set_summary("unlocked", true);
            outcome.add_data(Value::Object(data));
            outcome
        }
        Err(e) => {
            data.insert("unlocked".into(), json!(false));
            let mut outcome = OutcomeRecord::failed(e.to_string());
            outcome.set_summary("unlocked", false);
            outcome.add_data(Value::Object(data));
            outcome
        }
    }
}

pub fn disable(session: &mut DirectorySession, params: &Value) -> OutcomeRecord {
    debug!("disabling an account");
    set_account_status(session, params, true)
}

pub fn enable(session: &mut DirectorySession, params: &Value) -> OutcomeRecord {
    debug!("enabling an account");
    set_account_status(session, params, false)
}

/// Sets or clears exactly the ACCOUNTDISABLE bit, preserving every other
/// control bit.
pub(crate) fn toggle_disabled_bit(uac: u32, disable: bool) -> u32 {
    if disable {
        uac | UF_ACCOUNT_DISABLE
    } else {
        uac & !UF_ACCOUNT_DISABLE
    }
}

pub(crate) fn status_label(uac: u32) -> &'static str {
    if uac & UF_ACCOUNT_DISABLE != 0 {
        "disabled"
    } else {
        "enabled"
    }
}

fn set_account_status(session: &mut DirectorySession, params: &Value, disable: bool) -> OutcomeRecord {
    let p: UserParams = match handlers::parse(params) {
        Ok(p) => p,
        Err(e) => return OutcomeRecord::failed(e.to_string()),
    };

    if let Err(e) = session.ensure_bound() {
        return OutcomeRecord::failed(e.to_string());
    }

    let user = p.user.to_lowercase();
    let resolved = match handlers::resolve_principal(session, &user, p.use_samaccountname) {
        Ok(Some(r)) => r,
        Ok(None) => return OutcomeRecord::failed("No users found"),
        Err(e) => return OutcomeRecord::failed(e.to_string()),
    };
    let mut data = resolved.data;

    // Read the current control value through the normal query path so the
    // response shape matches every other search.
    let spec = QuerySpec::new(
        format!("(distinguishedname={})", escape_ldap_filter(&resolved.dn)),
        vec!["useraccountcontrol".to_string()],
    );
    let document = match query::run(session, &spec) {
        Ok(doc) => doc,
        Err(e) => return OutcomeRecord::failed(e.to_string()),
    };

    let uac = match document
        .entries
        .first()
        .and_then(|entry| entry.first_value_ci("userAccountControl"))
        .and_then(|v| v.parse::<u32>().ok())
    {
        Some(uac) => uac,
        None => return OutcomeRecord::failed("No user found"),
    };

    data.insert("starting_status".into(), json!(status_label(uac)));
    let new_uac = toggle_disabled_bit(uac, disable);

    let change = Mod::Replace(
        "userAccountControl".to_string(),
        HashSet::from([new_uac.to_string()]),
    );
    if let Err(e) = session.modify(&resolved.dn, vec![change]) {
        return OutcomeRecord::failed(e.to_string());
    }

    let status = if disable { "disabled" } else { "enabled" };
    info!(user_dn = %resolved.dn, uac, new_uac, status, "account status changed");

    let mut outcome = OutcomeRecord::succeeded(format!("Account {}", status));
    outcome.set_summary("account_status", status);
    outcome.add_data(Value::Object(data));
    outcome
}
