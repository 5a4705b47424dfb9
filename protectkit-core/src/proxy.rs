//! The proxy asks the server to issue an HTTP request on the caller's behalf, replacing
//! designated fields with protection or vault data server-side. `common` and `options`
//! are passed through unchanged, `rootTag` included; the server owns their schema.

use std::collections::BTreeMap;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

use crate::client::ProtectKitClient;
use crate::error::{ProtectKitError, ProtectKitResult};
use crate::transport::Transport;

/// Format of the proxied request body.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, EnumString, Display, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BodyFormat {
    /// JSON body.
    #[default]
    Json,
    /// XML body; requires [`ProxyOptions::root_tag`].
    Xml,
}

/// Field substitutions applied by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyCommon {
    /// Field name to protection id.
    #[serde(default)]
    pub protections: BTreeMap<String, String>,
    /// Field name to `(vault id, column)`.
    #[serde(default)]
    pub vaults: BTreeMap<String, (String, String)>,
}

/// Request options forwarded to the proxied call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyOptions {
    /// Headers of the proxied request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Value>,
    /// Path parameters of the proxied request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    /// Body of the proxied request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    /// Query parameters of the proxied request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<Value>,
    /// Root element name used when the body is rendered as XML.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_tag: Option<String>,
}

/// A request for the server to proxy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyRequest {
    /// Body format.
    #[serde(rename = "type")]
    pub format: BodyFormat,
    /// Target URL.
    pub url: String,
    /// Target HTTP method.
    pub method: String,
    /// Field substitutions.
    #[serde(default)]
    pub common: ProxyCommon,
    /// Forwarded options.
    #[serde(default)]
    pub options: ProxyOptions,
}

impl ProxyRequest {
    /// Checks the request before anything is sent.
    ///
    /// # Errors
    /// Returns [`ProtectKitError::InvalidInput`] when an XML request has no root tag.
    pub fn validate(&self) -> ProtectKitResult<()> {
        let has_root_tag = self
            .options
            .root_tag
            .as_deref()
            .is_some_and(|tag| !tag.is_empty());
        if self.format == BodyFormat::Xml && !has_root_tag {
            return Err(ProtectKitError::InvalidInput(
                "rootTag is required when type is xml".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct ProxyBody<'a> {
    #[serde(rename = "type")]
    format: BodyFormat,
    url: &'a str,
    method: &'a str,
    common: &'a ProxyCommon,
    options: &'a ProxyOptions,
}

impl<'a> From<&'a ProxyRequest> for ProxyBody<'a> {
    fn from(request: &'a ProxyRequest) -> Self {
        Self {
            format: request.format,
            url: &request.url,
            method: &request.method,
            common: &request.common,
            options: &request.options,
        }
    }
}

impl<T: Transport> ProtectKitClient<T> {
    /// Has the server issue `request` and returns whatever the proxied call produced.
    ///
    /// # Errors
    /// Returns [`ProtectKitError::InvalidInput`] before any network call when the request
    /// fails [`ProxyRequest::validate`], otherwise any dispatch error.
    pub async fn proxy(&self, request: &ProxyRequest) -> ProtectKitResult<Value> {
        request.validate()?;
        let url = self.url(&["api", "proxy"])?;
        let body = ProxyBody::from(request);
        self.call(Method::POST, url, Some(&body)).await
    }
}
