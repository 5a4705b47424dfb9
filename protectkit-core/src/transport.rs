use std::future::Future;
use std::time::Duration;

use reqwest::header::{HeaderMap, USER_AGENT};
use reqwest::{Certificate, Identity, Method, StatusCode, Url};
use secrecy::zeroize::Zeroize;
use secrecy::ExposeSecret;
use serde_json::Value;
use thiserror::Error;

use crate::config::{ClientConfig, TlsMaterial};
use crate::error::{ProtectKitError, ProtectKitResult};

/// A single request to be sent to the server.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestEnvelope {
    /// HTTP method.
    pub method: Method,
    /// Fully built target URL, including any query parameters.
    pub url: Url,
    /// JSON body, already in wire shape.
    pub body: Option<Value>,
}

/// Body of a server response, parsed as far as it goes.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// The server sent no body.
    Empty,
    /// The body parsed as JSON.
    Json(Value),
    /// The body is not JSON.
    Text(String),
}

impl ResponseBody {
    /// Parses raw response bytes. Bodies that are not valid JSON are kept as text.
    #[must_use]
    pub fn parse(bytes: &[u8]) -> Self {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Self::Empty;
        }
        serde_json::from_slice(bytes).map_or_else(
            |_| Self::Text(String::from_utf8_lossy(bytes).into_owned()),
            Self::Json,
        )
    }

    /// Converts the body into the value handed back to endpoint methods.
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Self::Empty => Value::Null,
            Self::Json(value) => value,
            Self::Text(text) => Value::String(text),
        }
    }
}

/// Any HTTP response, successful or not.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// Response status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body.
    pub body: ResponseBody,
}

/// A failure where no HTTP response was received (DNS, connect, TLS, timeout).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportFault {
    message: String,
}

impl TransportFault {
    /// Creates a fault with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for TransportFault {
    /// Joins the source chain; reqwest's top-level message only names the request. The
    /// query is dropped from that URL since search terms may hold protected data.
    fn from(mut error: reqwest::Error) -> Self {
        if let Some(url) = error.url_mut() {
            url.set_query(None);
        }
        let mut message = error.to_string();
        let mut source = std::error::Error::source(&error);
        while let Some(cause) = source {
            let text = cause.to_string();
            if !text.is_empty() && !message.contains(&text) {
                message.push_str(": ");
                message.push_str(&text);
            }
            source = cause.source();
        }
        Self::new(message)
    }
}

/// Issues exactly one request per call and reports whatever the server answered.
///
/// Branching on the status is left to the caller; implementations only fail when no
/// response was received at all.
pub trait Transport: Send + Sync {
    /// Sends the request.
    fn send(
        &self,
        request: RequestEnvelope,
    ) -> impl Future<Output = Result<RawResponse, TransportFault>> + Send;
}

/// Default [`Transport`]: a reqwest client over rustls, authenticated with mutual TLS.
pub struct HttpTransport {
    client: reqwest::Client,
    timeout: Duration,
    user_agent: String,
}

impl HttpTransport {
    /// Builds the transport from the connection configuration.
    ///
    /// Only the configured CA is trusted; the client identity is presented on every
    /// connection.
    ///
    /// # Errors
    /// Returns [`ProtectKitError::Config`] if the certificates or key cannot be parsed.
    pub fn new(config: &ClientConfig) -> ProtectKitResult<Self> {
        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .tls_built_in_root_certs(false);
        for ca in ca_certificates(config.tls())? {
            builder = builder.add_root_certificate(ca);
        }
        let client = builder.identity(client_identity(config.tls())?).build()?;

        Ok(Self {
            client,
            timeout: config.timeout(),
            user_agent: config.user_agent().to_string(),
        })
    }

    #[cfg(test)]
    pub(crate) fn insecure() -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout: crate::config::DEFAULT_TIMEOUT,
            user_agent: crate::config::default_user_agent(),
        }
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: RequestEnvelope) -> Result<RawResponse, TransportFault> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .timeout(self.timeout)
            .header(USER_AGENT, &self.user_agent);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.bytes().await?;

        Ok(RawResponse {
            status,
            headers,
            body: ResponseBody::parse(&bytes),
        })
    }
}

/// Parses the CA bundle. Input holding no certificate at all is a configuration error.
fn ca_certificates(tls: &TlsMaterial) -> ProtectKitResult<Vec<Certificate>> {
    let certificates = Certificate::from_pem_bundle(tls.ca())
        .map_err(|e| ProtectKitError::Config(format!("invalid CA certificate: {e}")))?;
    if certificates.is_empty() {
        return Err(ProtectKitError::Config(
            "invalid CA certificate: no certificates found".to_string(),
        ));
    }
    Ok(certificates)
}

fn client_identity(tls: &TlsMaterial) -> ProtectKitResult<Identity> {
    let mut pem = Vec::with_capacity(tls.cert().len() + tls.key().expose_secret().len() + 1);
    pem.extend_from_slice(tls.cert());
    pem.push(b'\n');
    pem.extend_from_slice(tls.key().expose_secret());
    let identity = Identity::from_pem(&pem)
        .map_err(|e| ProtectKitError::Config(format!("invalid client certificate or key: {e}")));
    pem.zeroize();
    identity
}
