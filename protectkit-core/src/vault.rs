//! Vaults store opaque values server-side and hand back one token per value.

use reqwest::Method;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::ProtectKitClient;
use crate::error::{ProtectKitError, ProtectKitResult};
use crate::routes::with_query;
use crate::transport::Transport;

/// Values to store in a vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreRequest {
    /// Target vault.
    #[serde(rename = "vaultID")]
    pub vault_id: String,
    /// Values to store, in order.
    pub values: Vec<Value>,
}

impl StoreRequest {
    /// Creates a store request.
    pub fn new(vault_id: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            vault_id: vault_id.into(),
            values,
        }
    }
}

/// Search and pagination options for listing a vault.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    /// Vault to list.
    #[serde(rename = "vaultID")]
    pub vault_id: String,
    /// Free-text filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// Page size. Zero is treated as absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    /// Cursor returned by the previous page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}

/// One stored value and its token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultItem {
    /// Token referencing the value.
    pub token: String,
    /// The stored value.
    pub value: Value,
}

/// A page of vault contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultPage {
    /// Items on this page.
    #[serde(default)]
    pub items: Vec<VaultItem>,
    /// Cursor for the next page, absent on the last one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}

/// Tokens to resolve back into values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetRequest {
    /// Vault holding the tokens.
    #[serde(rename = "vaultID")]
    pub vault_id: String,
    /// Tokens to resolve, in order.
    pub tokens: Vec<String>,
}

/// Replacement of the value behind a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRequest {
    /// Vault holding the token.
    #[serde(rename = "vaultID")]
    pub vault_id: String,
    /// Token whose value is replaced.
    pub token: String,
    /// New value.
    pub value: Value,
}

/// Removal of a token and its value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteRequest {
    /// Vault holding the token.
    #[serde(rename = "vaultID")]
    pub vault_id: String,
    /// Token to delete.
    pub token: String,
}

// Wire shapes.

#[derive(Debug, Serialize)]
struct StoreBody<'a> {
    values: &'a [Value],
}

#[derive(Debug, Serialize)]
pub(crate) struct BatchedStoreItem<'a> {
    vault_id: &'a str,
    values: &'a [Value],
}

impl<'a> From<&'a StoreRequest> for BatchedStoreItem<'a> {
    fn from(request: &'a StoreRequest) -> Self {
        Self {
            vault_id: &request.vault_id,
            values: &request.values,
        }
    }
}

#[derive(Debug, Serialize)]
struct GetBody<'a> {
    tokens: &'a [String],
}

#[derive(Debug, Serialize)]
struct BatchedGetItem<'a> {
    vault_id: &'a str,
    tokens: &'a [String],
}

impl<'a> From<&'a GetRequest> for BatchedGetItem<'a> {
    fn from(request: &'a GetRequest) -> Self {
        Self {
            vault_id: &request.vault_id,
            tokens: &request.tokens,
        }
    }
}

#[derive(Debug, Serialize)]
struct UpdateBody<'a> {
    value: &'a Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokensEnvelope {
    pub(crate) tokens: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ValuesEnvelope {
    pub(crate) values: Vec<Value>,
}

/// Takes the single entry of a batched response sent for a single-entry request.
pub(crate) fn single<T>(mut batch: Vec<T>) -> ProtectKitResult<T> {
    if batch.len() != 1 {
        return Err(ProtectKitError::SerializationError(format!(
            "expected one batch entry, received {}",
            batch.len()
        )));
    }
    batch.pop().ok_or_else(|| {
        ProtectKitError::SerializationError("expected one batch entry, received 0".to_string())
    })
}

/// Vault endpoints. Obtained from [`ProtectKitClient::vault`].
pub struct VaultApi<'a, T> {
    client: &'a ProtectKitClient<T>,
}

impl<'a, T: Transport> VaultApi<'a, T> {
    pub(crate) const fn new(client: &'a ProtectKitClient<T>) -> Self {
        Self { client }
    }

    /// Stores values and returns one token per value, in order.
    ///
    /// # Errors
    /// Returns any dispatch error, or a serialization error if the response carries no
    /// tokens.
    pub async fn store(&self, request: &StoreRequest) -> ProtectKitResult<Vec<String>> {
        if self.client.revision().is_batched() {
            let batch = [BatchedStoreItem::from(request)];
            let url = self.client.url(&["api", "vault", "store"])?;
            let response: Vec<TokensEnvelope> =
                self.client.call(Method::POST, url, Some(&batch)).await?;
            return Ok(single(response)?.tokens);
        }

        let url = self
            .client
            .url(&["api", "vault", &request.vault_id, "store"])?;
        let body = StoreBody {
            values: &request.values,
        };
        let response: TokensEnvelope = self.client.call(Method::POST, url, Some(&body)).await?;
        Ok(response.tokens)
    }

    /// Stores values into several vaults in one request. Only batched revisions accept
    /// this; the result holds one token list per request, in order.
    ///
    /// # Errors
    /// Returns [`ProtectKitError::InvalidInput`] on a non-batched revision, otherwise any
    /// dispatch error.
    pub async fn store_batch(
        &self,
        requests: &[StoreRequest],
    ) -> ProtectKitResult<Vec<Vec<String>>> {
        if !self.client.revision().is_batched() {
            return Err(ProtectKitError::InvalidInput(format!(
                "batched store is not available on revision {}",
                self.client.revision()
            )));
        }
        let batch: Vec<BatchedStoreItem<'_>> = requests.iter().map(Into::into).collect();
        let url = self.client.url(&["api", "vault", "store"])?;
        let response: Vec<TokensEnvelope> =
            self.client.call(Method::POST, url, Some(&batch)).await?;
        if response.len() != requests.len() {
            return Err(ProtectKitError::SerializationError(format!(
                "expected {} batch entries, received {}",
                requests.len(),
                response.len()
            )));
        }
        Ok(response.into_iter().map(|entry| entry.tokens).collect())
    }

    /// Lists a vault, one page at a time.
    ///
    /// # Errors
    /// Returns any dispatch error.
    pub async fn fetch(&self, request: &FetchRequest) -> ProtectKitResult<VaultPage> {
        let url = fetch_url(self.client.url(&["api", "vault", &request.vault_id])?, request);
        self.client.call::<(), _>(Method::GET, url, None).await
    }

    /// Resolves tokens back into their values, in order.
    ///
    /// # Errors
    /// Returns any dispatch error.
    pub async fn get(&self, request: &GetRequest) -> ProtectKitResult<Vec<Value>> {
        if self.client.revision().is_batched() {
            let batch = [BatchedGetItem::from(request)];
            let url = self.client.url(&["api", "vault", "get"])?;
            let response: Vec<ValuesEnvelope> =
                self.client.call(Method::POST, url, Some(&batch)).await?;
            return Ok(single(response)?.values);
        }

        let url = self.client.url(&["api", "vault", &request.vault_id, "get"])?;
        let body = GetBody {
            tokens: &request.tokens,
        };
        let response: ValuesEnvelope = self.client.call(Method::POST, url, Some(&body)).await?;
        Ok(response.values)
    }

    /// Replaces the value behind a token.
    ///
    /// # Errors
    /// Returns any dispatch error.
    pub async fn update(&self, request: &UpdateRequest) -> ProtectKitResult<()> {
        let url = self
            .client
            .url(&["api", "vault", &request.vault_id, &request.token])?;
        let body = UpdateBody {
            value: &request.value,
        };
        self.client
            .call::<_, IgnoredAny>(Method::PUT, url, Some(&body))
            .await?;
        Ok(())
    }

    /// Deletes a token and its value.
    ///
    /// # Errors
    /// Returns any dispatch error.
    pub async fn delete(&self, request: &DeleteRequest) -> ProtectKitResult<()> {
        let url = self
            .client
            .url(&["api", "vault", &request.vault_id, &request.token])?;
        self.client
            .call::<(), IgnoredAny>(Method::DELETE, url, None)
            .await?;
        Ok(())
    }
}

fn fetch_url(url: reqwest::Url, request: &FetchRequest) -> reqwest::Url {
    with_query(
        url,
        &[
            ("search", request.search.clone()),
            ("size", request.size.filter(|size| *size > 0).map(|size| size.to_string())),
            ("after", request.after.clone()),
        ],
    )
}
