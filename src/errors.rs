//! Error handling module
//!
//! Structured error types for the adapter core. Every directory call is
//! converted into one of these variants at the point of failure; handlers
//! fold them into a failed outcome record at their own boundary, so no
//! error ever crosses the dispatch boundary unhandled.

use thiserror::Error;

/// Main error type for directory operations
#[derive(Error, Debug)]
pub enum AdapterError {
    /// Authentication, network or TLS failure while establishing the session
    #[error("Bind failed: {0}")]
    Bind(String),

    /// LDAP search failure (malformed filter, insufficient rights, transport fault)
    #[error("Query failed: {0}")]
    Query(String),

    /// Missing or inconsistent action parameters, caught before any network call
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Requested object does not exist in the directory
    #[error("Not found: {0}")]
    NotFound(String),

    /// The server rejected a DN as syntactically invalid
    #[error("Invalid distinguished name: {0}")]
    InvalidDn(String),

    /// Modify or extended operation rejected by the server
    #[error("Directory operation failed: {0}")]
    DirectoryOp(String),
}

impl From<ldap3::LdapError> for AdapterError {
    fn from(err: ldap3::LdapError) -> Self {
        match err {
            ldap3::LdapError::LdapResult { result } => match result.rc {
                // 49 = Invalid credentials
                49 => AdapterError::Bind(format!("Invalid credentials: {}", result.text)),
                // 32 = No such object
                32 => AdapterError::NotFound(format!("Object not found: {}", result.text)),
                // 34 = Invalid DN syntax
                34 => AdapterError::InvalidDn(format!("Invalid DN syntax: {}", result.text)),
                // 50 = Insufficient access rights
                50 => AdapterError::DirectoryOp(format!(
                    "Insufficient access rights: {}",
                    result.text
                )),
                // 53 = Unwilling to perform
                53 => AdapterError::DirectoryOp(format!(
                    "Server unwilling to perform operation: {}",
                    result.text
                )),
                _ => AdapterError::DirectoryOp(format!(
                    "LDAP error code {}: {}",
                    result.rc, result.text
                )),
            },
            ldap3::LdapError::EndOfStream => {
                AdapterError::Bind("Connection closed unexpectedly".to_string())
            }
            ldap3::LdapError::Io { source } => {
                AdapterError::Bind(format!("I/O error: {}", source))
            }
            ldap3::LdapError::Timeout { elapsed: _ } => {
                AdapterError::Bind("LDAP operation timed out".to_string())
            }
            _ => AdapterError::Query(format!("LDAP error: {}", err)),
        }
    }
}

impl From<native_tls::Error> for AdapterError {
    fn from(err: native_tls::Error) -> Self {
        AdapterError::Bind(format!("TLS error: {}", err))
    }
}

impl From<std::io::Error> for AdapterError {
    fn from(err: std::io::Error) -> Self {
        AdapterError::Bind(format!("I/O error: {}", err))
    }
}

/// Result type alias for adapter operations
pub type Result<T> = std::result::Result<T, AdapterError>;
