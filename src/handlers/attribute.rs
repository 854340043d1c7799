//! Attribute handlers: get attributes, set attribute, run query
//!
//! Get-attributes fans one filter out across the three identity attributes
//! (userPrincipalName, sAMAccountName, distinguishedName) per principal.
//! Set-attribute applies exactly one of add, delete-all, or replace to a
//! single attribute. Run-query passes an arbitrary caller filter through
//! and lowercases the returned attribute keys.

use std::collections::HashSet;

use ldap3::Mod;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::errors::{AdapterError, Result};
use crate::handlers;
use crate::ldap_utils::escape_ldap_filter;
use crate::outcome::OutcomeRecord;
use crate::query::{self, QuerySpec};
use crate::session::DirectorySession;

#[derive(Debug, Deserialize)]
struct GetAttributesParams {
    principals: String,
    attributes: String,
}

#[derive(Debug, Deserialize)]
struct SetAttributeParams {
    user: String,
    attribute: String,
    #[serde(default)]
    value: Option<String>,
    action: String,
    #[serde(default)]
    use_samaccountname: bool,
}

#[derive(Debug, Deserialize)]
struct RunQueryParams {
    filter: String,
    attributes: String,
    #[serde(default)]
    search_base: Option<String>,
}

/// One disjunctive clause per principal across the three identity
/// attributes a caller might have supplied.
pub(crate) fn identity_filter(principals: &[String]) -> String {
    let mut filter = String::from("(|");
    for principal in principals {
        let escaped = escape_ldap_filter(principal);
        filter.push_str(&format!(
            "(userprincipalname={})(samaccountname={})(distinguishedname={})",
            escaped, escaped, escaped
        ));
    }
    filter.push(')');
    filter
}

pub fn get_attributes(session: &mut DirectorySession, params: &Value) -> OutcomeRecord {
    let p: GetAttributesParams = match handlers::parse(params) {
        Ok(p) => p,
        Err(e) => return OutcomeRecord::failed(e.to_string()),
    };

    if let Err(e) = session.ensure_bound() {
        return OutcomeRecord::failed(e.to_string());
    }

    let principals = handlers::split_list(&p.principals);
    debug!(count = principals.len(), "fetching attributes for principals");

    let spec = QuerySpec::new(identity_filter(&principals), handlers::split_list(&p.attributes));
    let document = match query::run(session, &spec) {
        Ok(doc) => doc,
        Err(e) => return OutcomeRecord::failed(e.to_string()),
    };

    let total = query::filtered_entry_count(&document);
    let mut outcome = OutcomeRecord::succeeded("Retrieved attributes");
    outcome.set_summary("total_objects", total);
    outcome.add_data(serde_json::to_value(&document).unwrap_or(Value::Null));
    outcome
}

/// The modification to apply: exactly one of add-value, delete-all-values,
/// or replace-with-value. Add and replace require a value; delete never
/// does.
pub(crate) fn build_attribute_change(
    attribute: &str,
    action: &str,
    value: Option<&str>,
) -> Result<Mod<String>> {
    match action {
        "ADD" | "REPLACE" => {
            let value = value.ok_or_else(|| {
                AdapterError::Validation(format!(
                    "Value parameter must be filled when using {} action",
                    action
                ))
            })?;
            if action == "ADD" {
                Ok(Mod::Add(
                    attribute.to_string(),
                    HashSet::from([value.to_string()]),
                ))
            } else {
                Ok(Mod::Replace(
                    attribute.to_string(),
                    HashSet::from([value.to_string()]),
                ))
            }
        }
        "DELETE" => Ok(Mod::Delete(attribute.to_string(), HashSet::new())),
        other => Err(AdapterError::Validation(format!(
            "Unsupported attribute action: {}",
            other
        ))),
    }
}

pub fn set_attribute(session: &mut DirectorySession, params: &Value) -> OutcomeRecord {
    let p: SetAttributeParams = match handlers::parse(params) {
        Ok(p) => p,
        Err(e) => return OutcomeRecord::failed(e.to_string()),
    };

    // Validation happens before any network call.
    let change = match build_attribute_change(&p.attribute, &p.action, p.value.as_deref()) {
        Ok(change) => change,
        Err(e) => return set_attribute_failed(e.to_string()),
    };

    let user = p.user.to_lowercase();
    let resolved = match handlers::resolve_principal(session, &user, p.use_samaccountname) {
        Ok(Some(r)) => r,
        Ok(None) => return set_attribute_failed("No users found".to_string()),
        Err(e) => return OutcomeRecord::failed(e.to_string()),
    };

    if let Err(e) = session.ensure_bound() {
        return set_attribute_failed(e.to_string());
    }

    debug!(user_dn = %resolved.dn, attribute = %p.attribute, action = %p.action, "setting attribute");
    if let Err(e) = session.modify(&resolved.dn, vec![change]) {
        return set_attribute_failed(e.to_string());
    }

    let mut outcome = OutcomeRecord::succeeded("Successfully Set Attribute");
    outcome.set_summary("summary", "Successfully Set Attribute");
    outcome.add_data(json!({"message": "Success"}));
    outcome
}

fn set_attribute_failed(message: String) -> OutcomeRecord {
    let mut outcome = OutcomeRecord::failed(message);
    outcome.set_summary("message", "Failed");
    outcome.add_data(json!({"message": "Failed"}));
    outcome
}

pub fn run_query(session: &mut DirectorySession, params: &Value) -> OutcomeRecord {
    let p: RunQueryParams = match handlers::parse(params) {
        Ok(p) => p,
        Err(e) => return OutcomeRecord::failed(e.to_string()),
    };

    let spec = QuerySpec::new(p.filter, handlers::split_list(&p.attributes))
        .with_base(p.search_base);
    let mut document = match query::run(session, &spec) {
        Ok(doc) => doc,
        Err(e) => return OutcomeRecord::failed(e.to_string()),
    };

    // Unify the attribute casing the server chose.
    document.lowercase_attribute_keys();

    let total = query::filtered_entry_count(&document);
    let mut outcome = OutcomeRecord::succeeded("Query complete");
    outcome.set_summary("total_objects", total);
    outcome.add_data(serde_json::to_value(&document).unwrap_or(Value::Null));
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_filter_covers_three_attributes_per_principal() {
        let filter = identity_filter(&["alice".to_string()]);
        assert_eq!(
            filter,
            "(|(userprincipalname=alice)(samaccountname=alice)(distinguishedname=alice))"
        );
    }

    #[test]
    fn identity_filter_escapes_values() {
        let filter = identity_filter(&["a*".to_string()]);
        assert!(filter.contains("(samaccountname=a\\2a)"));
        assert!(!filter.contains("a*"));
    }

    #[test]
    fn add_requires_value() {
        let err = build_attribute_change("mail", "ADD", None).unwrap_err();
        assert!(matches!(err, AdapterError::Validation(_)));
        assert!(err.to_string().contains("ADD"));
    }

    #[test]
    fn replace_requires_value() {
        let err = build_attribute_change("mail", "REPLACE", None).unwrap_err();
        assert!(err.to_string().contains("REPLACE"));
    }

    #[test]
    fn delete_never_requires_value() {
        let change = build_attribute_change("mail", "DELETE", None).unwrap();
        assert!(matches!(change, Mod::Delete(_, _)));
    }

    #[test]
    fn add_and_replace_build_the_right_mod() {
        assert!(matches!(
            build_attribute_change("mail", "ADD", Some("a@x")).unwrap(),
            Mod::Add(_, _)
        ));
        assert!(matches!(
            build_attribute_change("mail", "REPLACE", Some("a@x")).unwrap(),
            Mod::Replace(_, _)
        ));
    }

    #[test]
    fn unknown_action_is_rejected() {
        let err = build_attribute_change("mail", "UPSERT", Some("x")).unwrap_err();
        assert!(matches!(err, AdapterError::Validation(_)));
    }
}
