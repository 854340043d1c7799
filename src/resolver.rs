//! Principal resolver
//!
//! Batch-resolves short account names (sAMAccountName) to distinguished
//! names with a single disjunctive search, one round trip regardless of
//! how many principals are requested. Unresolved names are reported as
//! not-found map values, never as errors.

use std::collections::HashMap;

use tracing::debug;

use crate::errors::Result;
use crate::ldap_utils::escape_ldap_filter;
use crate::query::{self, QuerySpec, ResultDocument};
use crate::session::DirectorySession;

/// Lowercased short name -> distinguished name, or `None` when the name did
/// not resolve. The key set is exactly the (deduplicated, lowercased) input.
pub type ResolutionMap = HashMap<String, Option<String>>;

/// One disjunctive clause per input name. Values are escaped so a malformed
/// principal fails to match rather than breaking the filter.
fn sam_account_filter(names: &[String]) -> String {
    let mut filter = String::from("(|");
    for name in names {
        filter.push_str(&format!("(samaccountname={})", escape_ldap_filter(name)));
    }
    filter.push(')');
    filter
}

/// Seeds the output map with every input marked not-found, then fills in
/// distinguished names from the search response. Rows whose account name
/// was not requested are ignored.
fn apply_entries(names: &[String], document: &ResultDocument) -> ResolutionMap {
    let mut map: ResolutionMap = names
        .iter()
        .map(|n| (n.to_lowercase(), None))
        .collect();

    for entry in &document.entries {
        let sam = match entry.first_value_ci("sAMAccountName") {
            Some(v) => v.to_lowercase(),
            None => continue,
        };
        if let Some(slot) = map.get_mut(&sam) {
            if let Some(dn) = entry.first_value_ci("distinguishedName") {
                *slot = Some(dn.to_lowercase());
            }
        }
    }
    map
}

/// Resolves every name in `names` in one directory search against the
/// default naming context.
pub fn resolve_many(session: &mut DirectorySession, names: &[String]) -> Result<ResolutionMap> {
    let spec = QuerySpec::new(
        sam_account_filter(names),
        vec!["samaccountname".to_string(), "distinguishedname".to_string()],
    );
    let document = query::run(session, &spec)?;
    let map = apply_entries(names, &document);
    debug!(requested = names.len(), resolved = map.values().filter(|v| v.is_some()).count(),
        "principal resolution complete");
    Ok(map)
}

/// Splits a resolution map into resolved DNs and the names that stayed
/// unresolved.
pub fn partition_resolved(map: &ResolutionMap) -> (Vec<String>, Vec<String>) {
    let mut found = Vec::new();
    let mut not_found = Vec::new();
    for (name, dn) in map {
        match dn {
            Some(dn) => found.push(dn.clone()),
            None => not_found.push(name.clone()),
        }
    }
    (found, not_found)
}
