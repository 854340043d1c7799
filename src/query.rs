//! Query executor
//!
//! Builds and runs subtree searches against the directory and converts the
//! ldap3 response into the normalized result document consumed by the
//! operation handlers. The `entries` sequence is always present, possibly
//! empty; referral continuations are kept in the document but excluded from
//! reported totals.

use std::collections::HashMap;

use ldap3::{Scope, SearchEntry};
use serde::Serialize;
use tracing::debug;

use crate::errors::{AdapterError, Result};
use crate::session::DirectorySession;

/// A single search request: filter, requested attributes, and an optional
/// search base. When the base is absent the server's default naming context
/// is used.
#[derive(Debug, Clone)]
pub struct QuerySpec {
    pub filter: String,
    pub attributes: Vec<String>,
    pub search_base: Option<String>,
}

impl QuerySpec {
    pub fn new(filter: impl Into<String>, attributes: Vec<String>) -> Self {
        Self {
            filter: filter.into(),
            attributes,
            search_base: None,
        }
    }

    pub fn with_base(mut self, base: Option<String>) -> Self {
        self.search_base = base;
        self
    }
}

/// Distinguishes substantive objects from referral continuations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntryType {
    #[serde(rename = "searchResEntry")]
    Object,
    #[serde(rename = "searchResRef")]
    Referral,
}

/// One row of a normalized search response.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentEntry {
    pub dn: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    pub attributes: HashMap<String, Vec<String>>,
}

impl DocumentEntry {
    /// Case-insensitive single-value attribute lookup. Directory servers do
    /// not agree on attribute-name casing in responses.
    pub fn first_value_ci(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .and_then(|(_, v)| v.first())
            .map(String::as_str)
    }
}

/// Normalized representation of a directory search response.
#[derive(Debug, Clone, Serialize)]
pub struct ResultDocument {
    pub entries: Vec<DocumentEntry>,
}

impl ResultDocument {
    /// Lowercases every attribute key in place, unifying the
    /// server-dependent casing for callers that asked for it.
    pub fn lowercase_attribute_keys(&mut self) {
        for entry in &mut self.entries {
            entry.attributes = entry
                .attributes
                .drain()
                .map(|(k, v)| (k.to_lowercase(), v))
                .collect();
        }
    }
}

/// Runs the search described by `spec`. Binds the session first and issues
/// a subtree-scope search; any bind or protocol failure is terminal for
/// this invocation, no retry is performed.
pub fn run(session: &mut DirectorySession, spec: &QuerySpec) -> Result<ResultDocument> {
    if spec.attributes.is_empty() {
        return Err(AdapterError::Validation(
            "Query requires at least one attribute".into(),
        ));
    }

    session.ensure_bound()?;
    let base = match &spec.search_base {
        Some(base) => base.clone(),
        None => session.root_naming_context()?,
    };

    debug!(base = %base, filter = %spec.filter, "running subtree search");

    let (result_entries, res) = session
        .search(&base, Scope::Subtree, &spec.filter, &spec.attributes)
        .map_err(|e| match e {
            AdapterError::Bind(_) => e,
            other => AdapterError::Query(other.to_string()),
        })?;

    let mut entries: Vec<DocumentEntry> = result_entries
        .into_iter()
        .map(SearchEntry::construct)
        .map(|entry| DocumentEntry {
            dn: entry.dn,
            entry_type: EntryType::Object,
            attributes: entry.attrs,
        })
        .collect();

    // Referral continuations come back out of band in the operation result;
    // carry them in the document so callers can see them, typed so that
    // totals can exclude them.
    for referral in res.refs {
        entries.push(DocumentEntry {
            dn: referral,
            entry_type: EntryType::Referral,
            attributes: HashMap::new(),
        });
    }

    debug!(count = entries.len(), "search complete");
    Ok(ResultDocument { entries })
}

/// Counts substantive entries, excluding referral continuations. Used for
/// reporting totals only, never for correctness decisions.
pub fn filtered_entry_count(document: &ResultDocument) -> usize {
    document
        .entries
        .iter()
        .filter(|e| e.entry_type == EntryType::Object)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object_entry(dn: &str, attrs: &[(&str, &[&str])]) -> DocumentEntry {
        DocumentEntry {
            dn: dn.to_string(),
            entry_type: EntryType::Object,
            attributes: attrs
                .iter()
                .map(|(k, vs)| {
                    (
                        k.to_string(),
                        vs.iter().map(|v| v.to_string()).collect(),
                    )
                })
                .collect(),
        }
    }

    fn referral_entry(uri: &str) -> DocumentEntry {
        DocumentEntry {
            dn: uri.to_string(),
            entry_type: EntryType::Referral,
            attributes: HashMap::new(),
        }
    }

    #[test]
    fn filtered_count_excludes_referrals() {
        let document = ResultDocument {
            entries: vec![
                object_entry("CN=a,DC=x", &[]),
                object_entry("CN=b,DC=x", &[]),
                object_entry("CN=c,DC=x", &[]),
                object_entry("CN=d,DC=x", &[]),
                object_entry("CN=e,DC=x", &[]),
                referral_entry("ldap://other.example/DC=y"),
                referral_entry("ldap://third.example/DC=z"),
            ],
        };
        assert_eq!(document.entries.len(), 7);
        assert_eq!(filtered_entry_count(&document), 5);
    }

    #[test]
    fn filtered_count_of_empty_document_is_zero() {
        let document = ResultDocument { entries: vec![] };
        assert_eq!(filtered_entry_count(&document), 0);
    }

    #[test]
    fn lowercase_attribute_keys_unifies_casing() {
        let mut document = ResultDocument {
            entries: vec![object_entry(
                "CN=a,DC=x",
                &[("sAMAccountName", &["jsmith"]), ("mail", &["j@x"])],
            )],
        };
        document.lowercase_attribute_keys();
        let attrs = &document.entries[0].attributes;
        assert!(attrs.contains_key("samaccountname"));
        assert!(attrs.contains_key("mail"));
        assert!(!attrs.contains_key("sAMAccountName"));
    }

    #[test]
    fn first_value_ci_ignores_case() {
        let entry = object_entry("CN=a,DC=x", &[("userAccountControl", &["512"])]);
        assert_eq!(entry.first_value_ci("useraccountcontrol"), Some("512"));
        assert_eq!(entry.first_value_ci("USERACCOUNTCONTROL"), Some("512"));
        assert_eq!(entry.first_value_ci("missing"), None);
    }

    #[test]
    fn document_serializes_with_entry_types() {
        let document = ResultDocument {
            entries: vec![
                object_entry("CN=a,DC=x", &[]),
                referral_entry("ldap://other.example/DC=y"),
            ],
        };
        let json = serde_json::to_value(&document).unwrap();
        assert_eq!(json["entries"][0]["type"], "searchResEntry");
        assert_eq!(json["entries"][1]["type"], "searchResRef");
    }
}
