//! Asset configuration
//!
//! The host supplies a JSON asset configuration when the adapter is
//! initialized. This module deserializes it and derives the TLS trust mode
//! used when the directory session is established.

use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;

use crate::errors::{AdapterError, Result};

fn default_ssl_port() -> u16 {
    636
}

/// Asset configuration consumed from the host.
#[derive(Clone, Deserialize)]
pub struct AssetConfig {
    /// Directory server hostname or address
    pub server: String,
    /// Bind username (DN or UPN form, passed through verbatim)
    pub username: String,
    /// Bind password
    pub password: String,
    /// Negotiate TLS for the connection
    #[serde(default)]
    pub force_ssl: bool,
    /// Port used when TLS is enabled
    #[serde(default = "default_ssl_port")]
    pub ssl_port: u16,
    /// Validate the server certificate instead of accepting any
    #[serde(default)]
    pub validate_ssl_cert: bool,
    /// Trust-anchor bundle used when certificate validation is enabled.
    /// When absent, the platform's system roots are used.
    #[serde(default)]
    pub ca_certs_file: Option<PathBuf>,
    /// Optional connect deadline; transport defaults apply when absent
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,
}

impl fmt::Debug for AssetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetConfig")
            .field("server", &self.server)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("force_ssl", &self.force_ssl)
            .field("ssl_port", &self.ssl_port)
            .field("validate_ssl_cert", &self.validate_ssl_cert)
            .field("ca_certs_file", &self.ca_certs_file)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

/// How the server certificate is checked during the TLS handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlsTrust {
    /// Validate against a caller-supplied CA bundle
    CaBundle(PathBuf),
    /// Validate against the platform's trust roots
    SystemRoots,
    /// Accept any certificate
    AcceptAny,
}

impl AssetConfig {
    /// Parse an asset configuration out of the host's JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let config: AssetConfig = serde_json::from_value(value)
            .map_err(|e| AdapterError::Validation(format!("Invalid asset configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.server.trim().is_empty() {
            return Err(AdapterError::Validation(
                "Asset configuration requires a server".to_string(),
            ));
        }
        if self.username.is_empty() {
            return Err(AdapterError::Validation(
                "Asset configuration requires a username".to_string(),
            ));
        }
        Ok(())
    }

    /// TLS trust mode derived from the validation flag and CA bundle.
    pub fn tls_trust(&self) -> TlsTrust {
        if !self.validate_ssl_cert {
            return TlsTrust::AcceptAny;
        }
        match &self.ca_certs_file {
            Some(path) => TlsTrust::CaBundle(path.clone()),
            None => TlsTrust::SystemRoots,
        }
    }
}
