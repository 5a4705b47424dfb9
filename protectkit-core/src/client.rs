use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::{parse_base_url, ClientConfig};
use crate::crypto::CryptoApi;
use crate::error::{normalize, ProtectKitError, ProtectKitResult};
use crate::protection::ProtectionApi;
use crate::routes;
use crate::secure::SecureApi;
use crate::transport::{HttpTransport, RequestEnvelope, Transport};
use crate::vault::VaultApi;
use crate::version::check_version;
use crate::Revision;

/// Client for a data-protection server.
///
/// Holds only immutable configuration, so a single instance can serve any number of
/// concurrent calls. Endpoint groups are reached through [`Self::vault`],
/// [`Self::protection`], [`Self::crypto`] and [`Self::secure`]; the proxy is
/// [`Self::proxy`].
pub struct ProtectKitClient<T = HttpTransport> {
    base_url: Url,
    revision: Revision,
    transport: T,
}

impl ProtectKitClient<HttpTransport> {
    /// Builds a client that talks to the server over mutual TLS.
    ///
    /// Certificates and key are parsed once here.
    ///
    /// # Errors
    /// Returns [`ProtectKitError::Config`] when the base URL is not an `https` URL or the
    /// TLS material cannot be parsed.
    pub fn new(config: ClientConfig) -> ProtectKitResult<Self> {
        let base_url = config.parsed_base_url()?;
        let transport = HttpTransport::new(&config)?;
        log::debug!(
            "protectkit client for {base_url} targeting {}",
            config.revision()
        );
        Ok(Self {
            base_url,
            revision: config.revision(),
            transport,
        })
    }
}

#[cfg(test)]
impl ProtectKitClient<HttpTransport> {
    /// Create a client with a custom base URL and no TLS (for testing).
    pub(crate) fn with_base_url(base_url: &str, revision: Revision) -> Self {
        Self {
            base_url: parse_base_url(base_url).unwrap(),
            revision,
            transport: HttpTransport::insecure(),
        }
    }
}

impl<T: Transport> ProtectKitClient<T> {
    /// Builds a client over a caller-provided transport.
    ///
    /// # Errors
    /// Returns [`ProtectKitError::Config`] when the base URL cannot be parsed.
    pub fn with_transport(
        base_url: &str,
        revision: Revision,
        transport: T,
    ) -> ProtectKitResult<Self> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            revision,
            transport,
        })
    }

    /// The targeted API revision.
    #[must_use]
    pub const fn revision(&self) -> Revision {
        self.revision
    }

    /// The transport this client sends requests through.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Vault storage endpoints.
    #[must_use]
    pub const fn vault(&self) -> VaultApi<'_, T> {
        VaultApi::new(self)
    }

    /// Field-level protection endpoints.
    #[must_use]
    pub const fn protection(&self) -> ProtectionApi<'_, T> {
        ProtectionApi::new(self)
    }

    /// Cryptographic primitive endpoints.
    #[must_use]
    pub const fn crypto(&self) -> CryptoApi<'_, T> {
        CryptoApi::new(self)
    }

    /// Secure credential endpoints.
    #[must_use]
    pub const fn secure(&self) -> SecureApi<'_, T> {
        SecureApi::new(self)
    }

    pub(crate) fn url(&self, segments: &[&str]) -> ProtectKitResult<Url> {
        routes::endpoint(&self.base_url, segments)
    }

    /// Sends one request and returns the parsed body of a successful, version-compatible
    /// response.
    ///
    /// This is the only path to the transport. Failures of every kind come back as a
    /// single [`ProtectKitError`].
    pub(crate) async fn dispatch(
        &self,
        method: Method,
        url: Url,
        body: Option<Value>,
    ) -> ProtectKitResult<Value> {
        // Paths only: the query may carry search terms.
        let path = url.path().to_string();
        log::debug!("{method} {path}");
        let envelope = RequestEnvelope { method, url, body };
        let method = envelope.method.clone();

        let response = self.transport.send(envelope).await.map_err(|fault| {
            log::warn!("{method} {path} failed without a response: {fault}");
            ProtectKitError::Transport(fault.to_string())
        })?;

        if !response.status.is_success() {
            let err = normalize(response.status, response.body);
            log::warn!("{method} {path} returned {}: {err}", response.status);
            return Err(err);
        }

        check_version(self.revision.expected_version(), &response.headers)?;
        Ok(response.body.into_value())
    }

    /// Shapes `body` into JSON, dispatches it and decodes the response into `R`.
    pub(crate) async fn call<B, R>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> ProtectKitResult<R>
    where
        B: Serialize + Sync + ?Sized,
        R: DeserializeOwned,
    {
        let body = body
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| ProtectKitError::SerializationError(format!("invalid request body: {e}")))?;
        let value = self.dispatch(method, url, body).await?;
        serde_json::from_value(value).map_err(|e| {
            ProtectKitError::SerializationError(format!("unexpected response shape: {e}"))
        })
    }
}
