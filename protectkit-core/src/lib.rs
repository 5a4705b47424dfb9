#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
//! Typed client for a data-protection server: vault storage, field-level protection,
//! cryptographic primitives, short-lived secure credentials and the privacy proxy.
//!
//! Every operation is a single request/response round trip over mutual TLS. Responses
//! are only handed back after the server's `x-api-version` header has been checked
//! against the [`Revision`] the client was built for, and every failure surfaces as one
//! [`ProtectKitError`] carrying one message.
//!
//! ```rust,ignore
//! use protectkit_core::{ClientConfig, ProtectKitClient, TlsMaterial};
//! use protectkit_core::vault::StoreRequest;
//!
//! let tls = TlsMaterial::from_files("ca.pem", "client.pem", "client.key")?;
//! let client = ProtectKitClient::new(ClientConfig::new("https://vault.internal", tls))?;
//! let tokens = client
//!     .vault()
//!     .store(&StoreRequest::new("customers", vec!["alice".into()]))
//!     .await?;
//! ```
use strum::{Display, EnumString};

/// Server API revision the client targets.
///
/// Each revision fixes the version line the server must report and the shape of the
/// path templates. `V0_3` replaced per-identifier path segments with batched bodies
/// for vault store/get and protection seal/open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, EnumString, Display)]
pub enum Revision {
    /// Per-identifier path segments, e.g. `POST /api/vault/{vaultId}/store`.
    #[default]
    #[strum(serialize = "v0.2")]
    V0_2,
    /// Batched bodies, e.g. `POST /api/vault/store` with `[{vault_id, values}]`.
    #[strum(serialize = "v0.3")]
    V0_3,
}

impl Revision {
    /// The version line a server must satisfy to be accepted by this revision.
    #[must_use]
    pub const fn expected_version(self) -> &'static str {
        match self {
            Self::V0_2 => "v0.2",
            Self::V0_3 => "v0.3",
        }
    }

    /// Whether vault store/get and protection seal/open take batched bodies.
    #[must_use]
    pub const fn is_batched(self) -> bool {
        matches!(self, Self::V0_3)
    }
}

mod client;
pub use client::*;

mod config;
pub use config::*;

mod error;
pub use error::*;

/// Transport seam and the default reqwest/rustls implementation.
pub mod transport;

/// Server version negotiation.
pub mod version;

/// Vault storage endpoints.
pub mod vault;

/// Field-level protection endpoints.
pub mod protection;

/// Cryptographic primitive endpoints.
pub mod crypto;

/// Short-lived secure credential endpoints.
pub mod secure;

/// Generic privacy proxy endpoint.
pub mod proxy;

/// Bridge for forwarding library logs to a host application.
pub mod logger;

// private modules
mod routes;
