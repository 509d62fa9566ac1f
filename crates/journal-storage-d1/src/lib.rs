//! Remote storage backend on Cloudflare D1.
//!
//! Records live in a single `kv_records` table keyed by `(principal_id, key)`
//! and are reached through the D1 REST query API. Every operation is scoped to
//! the principal returned by a [`PrincipalProvider`].

mod config;
mod d1_client;
mod principal;
mod storage;

pub use config::RemoteConfig;
pub use d1_client::D1Client;
pub use principal::{Principal, PrincipalProvider, SessionPrincipal};
pub use storage::RemoteStorage;
