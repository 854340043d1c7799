//! Group membership handlers
//!
//! Adds or removes members across the full cross product of the supplied
//! member and group lists. When short-name resolution is requested, both
//! lists are resolved in one batch each and the operation only proceeds if
//! at least one member and one group resolved. Each group's membership is
//! read before editing; pairs already in the requested state are skipped
//! rather than surfacing the server's already-exists or no-such-attribute
//! rejection.

use std::collections::HashSet;

use ldap3::Mod;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::errors::{AdapterError, Result};
use crate::handlers;
use crate::ldap_utils::escape_ldap_filter;
use crate::outcome::OutcomeRecord;
use crate::query::{self, QuerySpec};
use crate::resolver;
use crate::session::DirectorySession;

const INVALID_DN_HINT: &str = "LDAPInvalidDnError: If 'use samaccountname' is unchecked, \
     member(s) and group(s) values must be in distinguishedName format";

#[derive(Debug, Deserialize)]
struct GroupMembersParams {
    members: String,
    groups: String,
    #[serde(default)]
    use_samaccountname: bool,
}

pub fn add_members(session: &mut DirectorySession, params: &Value) -> OutcomeRecord {
    debug!("adding objects to groups");
    membership(session, params, true)
}

pub fn remove_members(session: &mut DirectorySession, params: &Value) -> OutcomeRecord {
    debug!("removing objects from groups");
    membership(session, params, false)
}

/// At least one member and one group must have resolved, per list. This is
/// an all-or-nothing gate for the whole operation, not per pair.
pub(crate) fn enough_to_proceed(members: &[String], groups: &[String]) -> bool {
    !members.is_empty() && !groups.is_empty()
}

/// Whether the directory needs a modify for this pair. An add of a member
/// already present, or a removal of one already absent, is a no-op.
pub(crate) fn change_needed(existing: &HashSet<String>, member: &str, add: bool) -> bool {
    let present = existing.contains(&member.to_lowercase());
    if add {
        !present
    } else {
        present
    }
}

/// The group's current `member` values, lowercased for comparison. A group
/// that does not come back from the search yields an empty set; the modify
/// that follows reports the real failure.
fn current_members(session: &mut DirectorySession, group: &str) -> Result<HashSet<String>> {
    let spec = QuerySpec::new(
        format!("(distinguishedname={})", escape_ldap_filter(group)),
        vec!["member".to_string()],
    );
    let document = query::run(session, &spec)?;
    let mut members = HashSet::new();
    if let Some(entry) = document.entries.first() {
        if let Some((_, values)) = entry
            .attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("member"))
        {
            members.extend(values.iter().map(|v| v.to_lowercase()));
        }
    }
    Ok(members)
}

fn membership(session: &mut DirectorySession, params: &Value, add: bool) -> OutcomeRecord {
    let p: GroupMembersParams = match handlers::parse(params) {
        Ok(p) => p,
        Err(e) => return OutcomeRecord::failed(e.to_string()),
    };

    if let Err(e) = session.ensure_bound() {
        return OutcomeRecord::failed(e.to_string());
    }

    let mut members = handlers::split_list(&p.members);
    let mut groups = handlers::split_list(&p.groups);
    let mut summary = Map::new();

    if p.use_samaccountname {
        let member_map = match resolver::resolve_many(session, &members) {
            Ok(map) => map,
            Err(e) => return OutcomeRecord::failed(e.to_string()),
        };
        let (found_members, missing_members) = resolver::partition_resolved(&member_map);
        summary.insert("requested_user_records".into(), json!(members.len()));
        summary.insert("found_user_records".into(), json!(found_members.len()));

        let group_map = match resolver::resolve_many(session, &groups) {
            Ok(map) => map,
            Err(e) => {
                let mut outcome = OutcomeRecord::failed(e.to_string());
                outcome.summary = summary;
                return outcome;
            }
        };
        let (found_groups, missing_groups) = resolver::partition_resolved(&group_map);

        if !enough_to_proceed(&found_members, &found_groups) {
            debug!(?missing_members, ?missing_groups, "resolution gate failed");
            let mut outcome = OutcomeRecord::failed("Not enough groups or members");
            outcome.summary = summary;
            return outcome;
        }
        members = found_members;
        groups = found_groups;
    }

    let function = if add { "added" } else { "removed" };

    for group in &groups {
        let existing = match current_members(session, group) {
            Ok(set) => set,
            Err(e) => {
                let mut outcome = OutcomeRecord::failed(e.to_string());
                outcome.summary = summary;
                return outcome;
            }
        };
        for member in &members {
            if !change_needed(&existing, member, add) {
                debug!(member = %member, group = %group, "membership already in the requested state");
                continue;
            }
            let change = if add {
                Mod::Add("member".to_string(), HashSet::from([member.clone()]))
            } else {
                Mod::Delete("member".to_string(), HashSet::from([member.clone()]))
            };
            if let Err(e) = session.modify(group, vec![change]) {
                let message = match e {
                    AdapterError::InvalidDn(_) => INVALID_DN_HINT.to_string(),
                    other => other.to_string(),
                };
                let mut outcome = OutcomeRecord::failed(message);
                outcome.summary = summary;
                return outcome;
            }
        }
    }

    let mut outcome = OutcomeRecord::succeeded(format!(
        "{} member(s) {} group(s)",
        function,
        if add { "to" } else { "from" }
    ));
    outcome.summary = summary;
    for member in &members {
        for group in &groups {
            outcome.add_data(json!({
                "member": member,
                "group": group,
                "function": function,
            }));
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_requires_one_of_each() {
        let some = vec!["cn=a,dc=x".to_string()];
        let none: Vec<String> = vec![];
        assert!(enough_to_proceed(&some, &some));
        assert!(!enough_to_proceed(&none, &some));
        assert!(!enough_to_proceed(&some, &none));
        assert!(!enough_to_proceed(&none, &none));
    }

    #[test]
    fn add_of_present_member_needs_no_change() {
        let existing: HashSet<String> =
            HashSet::from(["cn=alice,ou=staff,dc=corp,dc=example".to_string()]);
        assert!(!change_needed(&existing, "CN=Alice,OU=Staff,DC=corp,DC=example", true));
        assert!(change_needed(&existing, "cn=bob,ou=staff,dc=corp,dc=example", true));
    }

    #[test]
    fn removal_of_absent_member_needs_no_change() {
        let existing: HashSet<String> =
            HashSet::from(["cn=alice,ou=staff,dc=corp,dc=example".to_string()]);
        assert!(!change_needed(&existing, "cn=ghost,dc=corp,dc=example", false));
        assert!(change_needed(&existing, "CN=Alice,OU=Staff,DC=corp,DC=example", false));
    }

    #[test]
    fn empty_group_needs_every_add_and_no_removal() {
        let existing = HashSet::new();
        assert!(change_needed(&existing, "cn=a,dc=x", true));
        assert!(!change_needed(&existing, "cn=a,dc=x", false));
    }

    #[test]
    fn invalid_dn_hint_names_the_flag() {
        assert!(INVALID_DN_HINT.contains("use samaccountname"));
        assert!(INVALID_DN_HINT.contains("distinguishedName"));
    }
}
