//! Active Directory action adapter over LDAP.
//!
//! Exposes a fixed set of directory operations (connectivity test, query,
//! group membership, account state, object placement, attributes, and
//! passwords) as JSON-parameterized actions against an AD domain
//! controller. One [`DirectorySession`] is bound lazily and reused across
//! actions within a host invocation.

pub mod config;
pub mod dispatch;
pub mod errors;
pub mod handlers;
pub mod ldap_utils;
pub mod outcome;
pub mod query;
pub mod resolver;
pub mod secure_types;
pub mod session;
pub mod state;

pub use config::AssetConfig;
pub use dispatch::{handle_action, Action};
pub use errors::{AdapterError, Result};
pub use outcome::OutcomeRecord;
pub use session::DirectorySession;
