//! Protections encrypt individual fields server-side. `seal` encrypts values under their
//! primary keys, `open` decrypts by token.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::ProtectKitClient;
use crate::error::{ProtectKitError, ProtectKitResult};
use crate::transport::Transport;
use crate::vault::{single, TokensEnvelope, ValuesEnvelope};

/// Values to seal under their primary keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SealRequest {
    /// Protection to seal with.
    #[serde(rename = "protectionID")]
    pub protection_id: String,
    /// One primary key per value.
    pub primary_keys: Vec<String>,
    /// Values to seal.
    pub values: Vec<Value>,
}

/// Tokens to open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenRequest {
    /// Protection the tokens were sealed with.
    #[serde(rename = "protectionID")]
    pub protection_id: String,
    /// Tokens to decrypt.
    pub tokens: Vec<String>,
}

/// Values to tokenize without sealing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizeRequest {
    /// Protection to tokenize with.
    #[serde(rename = "protectionID")]
    pub protection_id: String,
    /// Values to tokenize.
    pub values: Vec<Value>,
}

/// Sealed values to look up by primary key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtectionFetchRequest {
    /// Protection the values were sealed with.
    #[serde(rename = "protectionID")]
    pub protection_id: String,
    /// Primary keys to look up.
    pub primary_keys: Vec<String>,
}

// Wire shapes.

#[derive(Debug, Serialize)]
struct SealBody<'a> {
    primary_keys: &'a [String],
    values: &'a [Value],
}

#[derive(Debug, Serialize)]
struct BatchedSealItem<'a> {
    protection_id: &'a str,
    primary_keys: &'a [String],
    values: &'a [Value],
}

impl<'a> From<&'a SealRequest> for BatchedSealItem<'a> {
    fn from(request: &'a SealRequest) -> Self {
        Self {
            protection_id: &request.protection_id,
            primary_keys: &request.primary_keys,
            values: &request.values,
        }
    }
}

#[derive(Debug, Serialize)]
struct TokensBody<'a> {
    tokens: &'a [String],
}

#[derive(Debug, Serialize)]
struct BatchedOpenItem<'a> {
    protection_id: &'a str,
    tokens: &'a [String],
}

#[derive(Debug, Serialize)]
struct ValuesBody<'a> {
    values: &'a [Value],
}

#[derive(Debug, Serialize)]
struct PrimaryKeysBody<'a> {
    primary_keys: &'a [String],
}

#[derive(Debug, Deserialize)]
struct CountEnvelope {
    count: u64,
}

/// Protection endpoints. Obtained from [`ProtectKitClient::protection`].
pub struct ProtectionApi<'a, T> {
    client: &'a ProtectKitClient<T>,
}

impl<'a, T: Transport> ProtectionApi<'a, T> {
    pub(crate) const fn new(client: &'a ProtectKitClient<T>) -> Self {
        Self { client }
    }

    /// Seals values and returns one token per value.
    ///
    /// # Errors
    /// Returns [`ProtectKitError::InvalidInput`] when keys and values differ in length,
    /// otherwise any dispatch error.
    pub async fn seal(&self, request: &SealRequest) -> ProtectKitResult<Vec<String>> {
        if request.primary_keys.len() != request.values.len() {
            return Err(ProtectKitError::InvalidInput(format!(
                "seal needs one primary key per value, got {} keys for {} values",
                request.primary_keys.len(),
                request.values.len()
            )));
        }

        if self.client.revision().is_batched() {
            let batch = [BatchedSealItem::from(request)];
            let url = self.client.url(&["api", "protection", "seal"])?;
            let response: Vec<TokensEnvelope> =
                self.client.call(Method::POST, url, Some(&batch)).await?;
            return Ok(single(response)?.tokens);
        }

        let url = self
            .client
            .url(&["api", "protection", &request.protection_id, "seal"])?;
        let body = SealBody {
            primary_keys: &request.primary_keys,
            values: &request.values,
        };
        let response: TokensEnvelope = self.client.call(Method::POST, url, Some(&body)).await?;
        Ok(response.tokens)
    }

    /// Decrypts tokens back into their values.
    ///
    /// # Errors
    /// Returns any dispatch error.
    pub async fn open(&self, request: &OpenRequest) -> ProtectKitResult<Vec<Value>> {
        if self.client.revision().is_batched() {
            let batch = [BatchedOpenItem {
                protection_id: &request.protection_id,
                tokens: &request.tokens,
            }];
            let url = self.client.url(&["api", "protection", "open"])?;
            let response: Vec<ValuesEnvelope> =
                self.client.call(Method::POST, url, Some(&batch)).await?;
            return Ok(single(response)?.values);
        }

        let url = self
            .client
            .url(&["api", "protection", &request.protection_id, "open"])?;
        let body = TokensBody {
            tokens: &request.tokens,
        };
        let response: ValuesEnvelope = self.client.call(Method::POST, url, Some(&body)).await?;
        Ok(response.values)
    }

    /// Tokenizes values and returns one token per value.
    ///
    /// # Errors
    /// Returns any dispatch error.
    pub async fn tokenize(&self, request: &TokenizeRequest) -> ProtectKitResult<Vec<String>> {
        let url = self
            .client
            .url(&["api", "protection", &request.protection_id, "tokenize"])?;
        let body = ValuesBody {
            values: &request.values,
        };
        let response: TokensEnvelope = self.client.call(Method::POST, url, Some(&body)).await?;
        Ok(response.tokens)
    }

    /// Fetches sealed values by primary key.
    ///
    /// # Errors
    /// Returns any dispatch error.
    pub async fn fetch(&self, request: &ProtectionFetchRequest) -> ProtectKitResult<Vec<Value>> {
        let url = self
            .client
            .url(&["api", "protection", &request.protection_id, "fetch"])?;
        let body = PrimaryKeysBody {
            primary_keys: &request.primary_keys,
        };
        let response: ValuesEnvelope = self.client.call(Method::POST, url, Some(&body)).await?;
        Ok(response.values)
    }

    /// Number of values sealed under a protection.
    ///
    /// # Errors
    /// Returns any dispatch error.
    pub async fn count(&self, protection_id: &str) -> ProtectKitResult<u64> {
        let url = self
            .client
            .url(&["api", "protection", protection_id, "count"])?;
        let response: CountEnvelope = self.client.call::<(), _>(Method::GET, url, None).await?;
        Ok(response.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Revision;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn seal_request() -> SealRequest {
        SealRequest {
            protection_id: "ssn".to_string(),
            primary_keys: vec!["user-1".to_string()],
            values: vec![json!("123-45-6789")],
        }
    }

    #[test]
    fn test_seal_request_casing() {
        let request: SealRequest = serde_json::from_value(json!({
            "protectionID": "ssn",
            "primaryKeys": ["user-1"],
            "values": ["123-45-6789"]
        }))
        .unwrap();
        assert_eq!(request, seal_request());

        let wire = serde_json::to_value(BatchedSealItem::from(&request)).unwrap();
        assert_eq!(
            wire,
            json!({"protection_id": "ssn", "primary_keys": ["user-1"], "values": ["123-45-6789"]})
        );
    }

    #[tokio::test]
    async fn test_seal_segmented() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/protection/ssn/seal")
            .match_body(Matcher::Json(
                json!({"primary_keys": ["user-1"], "values": ["123-45-6789"]}),
            ))
            .with_status(200)
            .with_header("x-api-version", "v0.2.0")
            .with_body(r#"{"tokens": ["pt_1"]}"#)
            .create_async()
            .await;

        let client = ProtectKitClient::with_base_url(&server.url(), Revision::V0_2);
        let tokens = client.protection().seal(&seal_request()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(tokens, vec!["pt_1"]);
    }

    #[tokio::test]
    async fn test_seal_batched() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/protection/seal")
            .match_body(Matcher::Json(json!([
                {"protection_id": "ssn", "primary_keys": ["user-1"], "values": ["123-45-6789"]}
            ])))
            .with_status(200)
            .with_header("x-api-version", "v0.3.0")
            .with_body(r#"[{"tokens": ["pt_1"]}]"#)
            .create_async()
            .await;

        let client = ProtectKitClient::with_base_url(&server.url(), Revision::V0_3);
        let tokens = client.protection().seal(&seal_request()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(tokens, vec!["pt_1"]);
    }

    #[tokio::test]
    async fn test_seal_rejects_mismatched_lengths_locally() {
        let mut request = seal_request();
        request.primary_keys.push("user-2".to_string());

        let client = ProtectKitClient::with_base_url("http://127.0.0.1:1", Revision::V0_2);
        let err = client.protection().seal(&request).await.unwrap_err();
        assert!(matches!(err, ProtectKitError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_open_segmented() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/protection/ssn/open")
            .match_body(Matcher::Json(json!({"tokens": ["pt_1"]})))
            .with_status(200)
            .with_header("x-api-version", "v0.2.0")
            .with_body(r#"{"values": ["123-45-6789"]}"#)
            .create_async()
            .await;

        let client = ProtectKitClient::with_base_url(&server.url(), Revision::V0_2);
        let values = client
            .protection()
            .open(&OpenRequest {
                protection_id: "ssn".to_string(),
                tokens: vec!["pt_1".to_string()],
            })
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(values, vec![json!("123-45-6789")]);
    }

    #[tokio::test]
    async fn test_open_batched() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/protection/open")
            .match_body(Matcher::Json(
                json!([{"protection_id": "ssn", "tokens": ["pt_1"]}]),
            ))
            .with_status(200)
            .with_header("x-api-version", "v0.3.0")
            .with_body(r#"[{"values": ["123-45-6789"]}]"#)
            .create_async()
            .await;

        let client = ProtectKitClient::with_base_url(&server.url(), Revision::V0_3);
        let values = client
            .protection()
            .open(&OpenRequest {
                protection_id: "ssn".to_string(),
                tokens: vec!["pt_1".to_string()],
            })
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(values, vec![json!("123-45-6789")]);
    }

    #[tokio::test]
    async fn test_tokenize_fetch_and_count() {
        let mut server = Server::new_async().await;
        let tokenize = server
            .mock("POST", "/api/protection/email/tokenize")
            .match_body(Matcher::Json(json!({"values": ["a@example.com"]})))
            .with_status(200)
            .with_header("x-api-version", "v0.2.0")
            .with_body(r#"{"tokens": ["tk_1"]}"#)
            .create_async()
            .await;
        let fetch = server
            .mock("POST", "/api/protection/email/fetch")
            .match_body(Matcher::Json(json!({"primary_keys": ["user-1"]})))
            .with_status(200)
            .with_header("x-api-version", "v0.2.0")
            .with_body(r#"{"values": ["a@example.com"]}"#)
            .create_async()
            .await;
        let count = server
            .mock("GET", "/api/protection/email/count")
            .with_status(200)
            .with_header("x-api-version", "v0.2.0")
            .with_body(r#"{"count": 42}"#)
            .create_async()
            .await;

        let client = ProtectKitClient::with_base_url(&server.url(), Revision::V0_2);
        let protection = client.protection();
        let tokens = protection
            .tokenize(&TokenizeRequest {
                protection_id: "email".to_string(),
                values: vec![json!("a@example.com")],
            })
            .await
            .unwrap();
        let values = protection
            .fetch(&ProtectionFetchRequest {
                protection_id: "email".to_string(),
                primary_keys: vec!["user-1".to_string()],
            })
            .await
            .unwrap();
        let total = protection.count("email").await.unwrap();

        tokenize.assert_async().await;
        fetch.assert_async().await;
        count.assert_async().await;
        assert_eq!(tokens, vec!["tk_1"]);
        assert_eq!(values, vec![json!("a@example.com")]);
        assert_eq!(total, 42);
    }
}
