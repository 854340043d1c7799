//! Operation handlers
//!
//! One handler per action kind. Every handler follows the same shape:
//! validate parameters, optionally resolve short names, bind, execute the
//! directory operation, assemble an outcome record. Failures at any stage
//! short-circuit into a failed record carrying that stage's message and
//! whatever fields were already gathered.

pub mod account;
pub mod attribute;
pub mod group;
pub mod object;
pub mod password;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::errors::{AdapterError, Result};
use crate::resolver;
use crate::session::DirectorySession;

/// Deserializes the host's parameter mapping into a typed param struct.
pub(crate) fn parse<T: DeserializeOwned>(params: &Value) -> Result<T> {
    serde_json::from_value(params.clone())
        .map_err(|e| AdapterError::Validation(format!("Invalid action parameters: {}", e)))
}

/// Splits a semicolon-delimited list, trimming whitespace and dropping
/// empty items.
pub(crate) fn split_list(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// A principal ready to operate on: the DN the directory call will target
/// and the data fields gathered while resolving it.
pub(crate) struct ResolvedPrincipal {
    pub dn: String,
    pub data: Map<String, Value>,
}

/// Resolves `user` when short-name resolution was requested; otherwise the
/// input is taken as a literal DN. `Ok(None)` means the short name did not
/// resolve — the caller decides how hard that failure is.
pub(crate) fn resolve_principal(
    session: &mut DirectorySession,
    user: &str,
    use_short_name: bool,
) -> Result<Option<ResolvedPrincipal>> {
    let mut data = Map::new();
    if !use_short_name {
        data.insert("user_dn".to_string(), Value::String(user.to_string()));
        return Ok(Some(ResolvedPrincipal {
            dn: user.to_string(),
            data,
        }));
    }

    let map = resolver::resolve_many(session, &[user.to_string()])?;
    match map.get(user).cloned().flatten() {
        Some(dn) => {
            data.insert("user_dn".to_string(), Value::String(dn.clone()));
            data.insert("samaccountname".to_string(), Value::String(user.to_string()));
            Ok(Some(ResolvedPrincipal { dn, data }))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_list_trims_and_drops_empty() {
        assert_eq!(
            split_list(" alice ; bob;;charlie "),
            vec!["alice", "bob", "charlie"]
        );
        assert!(split_list("").is_empty());
        assert!(split_list(" ; ; ").is_empty());
    }

    #[test]
    fn parse_reports_missing_fields_as_validation() {
        #[derive(Debug, serde::Deserialize)]
        struct Needs {
            user: String,
        }
        let err = parse::<Needs>(&serde_json::json!({})).unwrap_err();
        assert!(matches!(err, AdapterError::Validation(_)));
    }
}
