use std::fmt;
use std::path::Path;
use std::time::Duration;

use reqwest::Url;
use secrecy::SecretSlice;

use crate::error::{ProtectKitError, ProtectKitResult};
use crate::Revision;

pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) fn default_user_agent() -> String {
    format!("protectkit-core/{}", env!("CARGO_PKG_VERSION"))
}

/// Mutual-TLS material: the CA that signs the server certificate, and the client's
/// own certificate and private key, all PEM encoded.
///
/// The private key is zeroized when the material is dropped.
pub struct TlsMaterial {
    ca: Vec<u8>,
    cert: Vec<u8>,
    key: SecretSlice<u8>,
}

impl TlsMaterial {
    /// Wraps PEM bytes that are already in memory.
    pub fn from_pem(
        ca: impl Into<Vec<u8>>,
        cert: impl Into<Vec<u8>>,
        key: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            ca: ca.into(),
            cert: cert.into(),
            key: SecretSlice::from(key.into()),
        }
    }

    /// Reads the three PEM files from disk.
    ///
    /// # Errors
    /// Returns [`ProtectKitError::Config`] naming the file that could not be read.
    pub fn from_files(
        ca: impl AsRef<Path>,
        cert: impl AsRef<Path>,
        key: impl AsRef<Path>,
    ) -> ProtectKitResult<Self> {
        Ok(Self::from_pem(read_pem(ca)?, read_pem(cert)?, read_pem(key)?))
    }

    pub(crate) fn ca(&self) -> &[u8] {
        &self.ca
    }

    pub(crate) fn cert(&self) -> &[u8] {
        &self.cert
    }

    pub(crate) const fn key(&self) -> &SecretSlice<u8> {
        &self.key
    }
}

// Custom Debug implementation to prevent accidental logging of key material
impl fmt::Debug for TlsMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsMaterial")
            .field("ca_len", &self.ca.len())
            .field("cert_len", &self.cert.len())
            .field("key", &"[REDACTED]")
            .finish()
    }
}

fn read_pem(path: impl AsRef<Path>) -> ProtectKitResult<Vec<u8>> {
    let path = path.as_ref();
    std::fs::read(path)
        .map_err(|e| ProtectKitError::Config(format!("unable to read {}: {e}", path.display())))
}

/// Connection configuration for a [`crate::ProtectKitClient`].
///
/// Immutable once the client is built.
#[derive(Debug)]
pub struct ClientConfig {
    base_url: String,
    tls: TlsMaterial,
    revision: Revision,
    timeout: Duration,
    user_agent: String,
}

impl ClientConfig {
    /// Creates a configuration for the given server with the default revision and a
    /// 30 second request timeout.
    pub fn new(base_url: impl Into<String>, tls: TlsMaterial) -> Self {
        Self {
            base_url: base_url.into(),
            tls,
            revision: Revision::default(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: default_user_agent(),
        }
    }

    /// Targets a specific server API revision.
    #[must_use]
    pub const fn with_revision(mut self, revision: Revision) -> Self {
        self.revision = revision;
        self
    }

    /// Overrides the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Overrides the `User-Agent` header.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// The server base URL as given.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The targeted API revision.
    #[must_use]
    pub const fn revision(&self) -> Revision {
        self.revision
    }

    /// The per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The `User-Agent` header value.
    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub(crate) const fn tls(&self) -> &TlsMaterial {
        &self.tls
    }

    /// Parses the base URL. Mutual TLS requires an `https` URL.
    pub(crate) fn parsed_base_url(&self) -> ProtectKitResult<Url> {
        let url = parse_base_url(&self.base_url)?;
        if url.scheme() != "https" {
            return Err(ProtectKitError::Config(format!(
                "base url must use https, got {}",
                url.scheme()
            )));
        }
        Ok(url)
    }
}

pub(crate) fn parse_base_url(base_url: &str) -> ProtectKitResult<Url> {
    let url = Url::parse(base_url)
        .map_err(|e| ProtectKitError::Config(format!("invalid base url {base_url}: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(ProtectKitError::Config(format!(
            "invalid base url {base_url}: cannot carry a path"
        )));
    }
    Ok(url)
}
