//! Directory session
//!
//! Owns the TLS configuration and the single authenticated connection to
//! the directory server. The connection is established lazily on the first
//! operation and reused until it is lost; a stale connection is discarded
//! with an explicit unbind before a new one is opened. One session serves
//! one serial caller.

use std::time::Duration;

use ldap3::{LdapConn, LdapConnSettings, LdapError, Mod, ResultEntry, Scope, SearchEntry};
use tracing::{debug, info};

use crate::config::{AssetConfig, TlsTrust};
use crate::errors::{AdapterError, Result};
use crate::secure_types::Credentials;

pub struct DirectorySession {
    server: String,
    use_ssl: bool,
    port: u16,
    trust: TlsTrust,
    connect_timeout: Option<Duration>,
    credentials: Credentials,
    conn: Option<LdapConn>,
    root_dn: Option<String>,
}

impl DirectorySession {
    pub fn new(config: AssetConfig) -> Self {
        let trust = config.tls_trust();
        Self {
            server: config.server,
            use_ssl: config.force_ssl,
            port: config.ssl_port,
            trust,
            connect_timeout: config.connect_timeout_secs.map(Duration::from_secs),
            credentials: Credentials::new(config.username, config.password),
            conn: None,
            root_dn: None,
        }
    }

    fn ldap_url(&self) -> String {
        let scheme = if self.use_ssl { "ldaps" } else { "ldap" };
        format!("{}://{}:{}", scheme, self.server, self.port)
    }

    fn build_settings(&self) -> Result<LdapConnSettings> {
        let mut settings = LdapConnSettings::new();
        if let Some(timeout) = self.connect_timeout {
            settings = settings.set_conn_timeout(timeout);
        }
        if self.use_ssl {
            match &self.trust {
                TlsTrust::AcceptAny => {
                    let connector = native_tls::TlsConnector::builder()
                        .danger_accept_invalid_certs(true)
                        .danger_accept_invalid_hostnames(true)
                        .build()?;
                    settings = settings.set_connector(connector).set_no_tls_verify(true);
                }
                TlsTrust::CaBundle(path) => {
                    let pem = std::fs::read(path)?;
                    let cert = native_tls::Certificate::from_pem(&pem)?;
                    let connector = native_tls::TlsConnector::builder()
                        .add_root_certificate(cert)
                        .build()?;
                    settings = settings.set_connector(connector);
                }
                TlsTrust::SystemRoots => {}
            }
        }
        Ok(settings)
    }

    /// Establishes and authenticates the connection if one is not already
    /// live. A no-op when the session is bound; any half-open connection is
    /// unbound before a fresh attempt. The failure message carries the
    /// server's diagnostic verbatim when one is available.
    ///
    /// A connection the peer has silently dropped is not detected here:
    /// the next operation's transport fault discards it (see `fault`) and
    /// the call after that re-binds from scratch.
    pub fn ensure_bound(&mut self) -> Result<()> {
        if self.conn.is_some() {
            return Ok(());
        }

        let url = self.ldap_url();
        debug!(url = %url, "connecting to directory server");

        let settings = self.build_settings()?;
        let mut conn = LdapConn::with_settings(settings, &url)?;

        debug!(username = %self.credentials.username(), "binding to directory");
        let bind = conn
            .simple_bind(self.credentials.username(), self.credentials.password())
            .and_then(|r| r.success());
        match bind {
            Ok(_) => {
                info!(server = %self.server, "directory bind successful");
                self.conn = Some(conn);
                Ok(())
            }
            Err(e) => {
                // Discard the half-open connection before reporting.
                let _ = conn.unbind();
                Err(AdapterError::from(e))
            }
        }
    }

    /// Unbinds and drops the current connection. The next operation
    /// re-binds from scratch.
    pub fn invalidate(&mut self) {
        if let Some(mut conn) = self.conn.take() {
            debug!("discarding stale directory connection");
            let _ = conn.unbind();
        }
    }

    /// Folds an ldap3 error into the adapter taxonomy, discarding the
    /// connection when the fault indicates it is no longer usable.
    fn fault(&mut self, err: LdapError) -> AdapterError {
        if matches!(err, LdapError::EndOfStream | LdapError::Io { .. }) {
            self.invalidate();
        }
        AdapterError::from(err)
    }

    /// The server-advertised default naming context, read from the RootDSE
    /// and cached for the life of the session.
    pub fn root_naming_context(&mut self) -> Result<String> {
        if let Some(dn) = &self.root_dn {
            return Ok(dn.clone());
        }
        let (entries, _res) = self.search(
            "",
            Scope::Base,
            "(objectClass=*)",
            &["defaultNamingContext".to_string()],
        )?;
        let root = entries
            .into_iter()
            .next()
            .map(SearchEntry::construct)
            .and_then(|entry| {
                entry
                    .attrs
                    .get("defaultNamingContext")
                    .and_then(|v| v.first().cloned())
            })
            .ok_or_else(|| {
                AdapterError::NotFound("Server did not advertise a default naming context".into())
            })?;
        self.root_dn = Some(root.clone());
        Ok(root)
    }

    /// Raw search primitive. Binds if needed; referrals are collected in
    /// the returned `LdapResult`.
    pub fn search(
        &mut self,
        base: &str,
        scope: Scope,
        filter: &str,
        attrs: &[String],
    ) -> Result<(Vec<ResultEntry>, ldap3::LdapResult)> {
        self.ensure_bound()?;
        let conn = self.bound_conn()?;
        let result = conn.search(base, scope, filter, attrs);
        match result {
            Ok(search_result) => search_result.success().map_err(AdapterError::from),
            Err(e) => Err(self.fault(e)),
        }
    }

    /// Raw modify primitive for string-valued attribute changes.
    pub fn modify(&mut self, dn: &str, mods: Vec<Mod<String>>) -> Result<()> {
        self.ensure_bound()?;
        let conn = self.bound_conn()?;
        let result = conn.modify(dn, mods);
        match result {
            Ok(res) => res.success().map(|_| ()).map_err(AdapterError::from),
            Err(e) => Err(self.fault(e)),
        }
    }

    /// Raw modify primitive for binary-valued attribute changes
    /// (`unicodePwd` is transferred as UTF-16LE bytes).
    pub fn modify_bytes(&mut self, dn: &str, mods: Vec<Mod<Vec<u8>>>) -> Result<()> {
        self.ensure_bound()?;
        let conn = self.bound_conn()?;
        let result = conn.modify(dn, mods);
        match result {
            Ok(res) => res.success().map(|_| ()).map_err(AdapterError::from),
            Err(e) => Err(self.fault(e)),
        }
    }

    /// Raw modify-DN primitive, used for both rename (same parent) and
    /// move (`new_superior` names the destination container).
    pub fn modify_dn(
        &mut self,
        dn: &str,
        new_rdn: &str,
        delete_old: bool,
        new_superior: Option<&str>,
    ) -> Result<()> {
        self.ensure_bound()?;
        let conn = self.bound_conn()?;
        let result = conn.modifydn(dn, new_rdn, delete_old, new_superior);
        match result {
            Ok(res) => res.success().map(|_| ()).map_err(AdapterError::from),
            Err(e) => Err(self.fault(e)),
        }
    }

    fn bound_conn(&mut self) -> Result<&mut LdapConn> {
        self.conn
            .as_mut()
            .ok_or_else(|| AdapterError::Bind("No directory connection".into()))
    }
}

impl Drop for DirectorySession {
    fn drop(&mut self) {
        self.invalidate();
    }
}
