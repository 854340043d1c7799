//! Object placement handlers: move and rename
//!
//! Both are modify-DN operations. Move keeps the object's relative name and
//! changes its parent container; rename changes the relative name in place.

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::handlers;
use crate::ldap_utils::leaf_rdn;
use crate::outcome::OutcomeRecord;
use crate::session::DirectorySession;

#[derive(Debug, Deserialize)]
struct MoveParams {
    object: String,
    destination_ou: String,
}

#[derive(Debug, Deserialize)]
struct RenameParams {
    object: String,
    new_name: String,
    #[serde(default)]
    use_samaccountname: bool,
}

pub fn move_object(session: &mut DirectorySession, params: &Value) -> OutcomeRecord {
    let p: MoveParams = match handlers::parse(params) {
        Ok(p) => p,
        Err(e) => return OutcomeRecord::failed(e.to_string()),
    };
    debug!(object = %p.object, destination = %p.destination_ou, "moving an object");

    if let Err(e) = session.ensure_bound() {
        return move_failed(e.to_string());
    }

    let rdn = match leaf_rdn(&p.object) {
        Some(rdn) => rdn.to_string(),
        None => {
            return move_failed(format!(
                "Unable to determine the relative name of '{}'",
                p.object
            ))
        }
    };

    if let Err(e) = session.modify_dn(&p.object, &rdn, true, Some(&p.destination_ou)) {
        return move_failed(e.to_string());
    }

    info!(object = %p.object, destination = %p.destination_ou, "object moved");
    let mut outcome = OutcomeRecord::succeeded("Object moved");
    outcome.set_summary("moved", true);
    outcome.add_data(json!({
        "source_object": p.object,
        "destination_container": p.destination_ou,
    }));
    outcome
}

fn move_failed(message: String) -> OutcomeRecord {
    let mut outcome = OutcomeRecord::failed(message);
    outcome.set_summary("moved", false);
    outcome.add_data(json!({"moved": false}));
    outcome
}

pub fn rename_object(session: &mut DirectorySession, params: &Value) -> OutcomeRecord {
    let p: RenameParams = match handlers::parse(params) {
        Ok(p) => p,
        Err(e) => return OutcomeRecord::failed(e.to_string()),
    };
    let user = p.object.to_lowercase();

    if let Err(e) = session.ensure_bound() {
        return rename_failed(e.to_string());
    }

    let resolved = match handlers::resolve_principal(session, &user, p.use_samaccountname) {
        Ok(Some(r)) => r,
        Ok(None) => return rename_failed("No users found".to_string()),
        Err(e) => return OutcomeRecord::failed(e.to_string()),
    };

    debug!(user_dn = %resolved.dn, new_name = %p.new_name, "renaming object");
    if let Err(e) = session.modify_dn(&resolved.dn, &p.new_name, true, None) {
        return rename_failed(e.to_string());
    }

    let mut outcome = OutcomeRecord::succeeded("Successfully Renamed Object");
    outcome.set_summary("summary", "Successfully Renamed Object");
    outcome.add_data(json!({"message": "Success"}));
    outcome
}

fn rename_failed(message: String) -> OutcomeRecord {
    let mut outcome = OutcomeRecord::failed(message);
    outcome.set_summary("message", "Failed");
    outcome.add_data(json!({"message": "Failed"}));
    outcome
}
