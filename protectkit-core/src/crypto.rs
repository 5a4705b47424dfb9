//! Stateless cryptographic primitives keyed by a protection. Nothing is stored
//! server-side; every call returns its result directly.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::ProtectKitClient;
use crate::error::{ProtectKitError, ProtectKitResult};
use crate::transport::Transport;
use crate::vault::ValuesEnvelope;

/// Values to encrypt, hash or sign under a protection key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptoRequest {
    /// Protection whose key is used.
    #[serde(rename = "protectionID")]
    pub protection_id: String,
    /// Input values.
    pub values: Vec<Value>,
}

/// Ciphertexts to decrypt or compare.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiphertextRequest {
    /// Protection whose key produced the ciphertexts.
    #[serde(rename = "protectionID")]
    pub protection_id: String,
    /// Ciphertexts returned by an earlier `encrypt`.
    pub ciphertexts: Vec<String>,
}

/// Values and their signatures to verify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyRequest {
    /// Protection whose key produced the signatures.
    #[serde(rename = "protectionID")]
    pub protection_id: String,
    /// Signed values.
    pub values: Vec<Value>,
    /// One signature per value.
    pub signatures: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ValuesBody<'a> {
    values: &'a [Value],
}

#[derive(Debug, Serialize)]
struct CiphertextsBody<'a> {
    ciphertexts: &'a [String],
}

#[derive(Debug, Serialize)]
struct VerifyBody<'a> {
    values: &'a [Value],
    signatures: &'a [String],
}

#[derive(Debug, Deserialize)]
struct CiphertextsEnvelope {
    ciphertexts: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DigestsEnvelope {
    digests: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SignaturesEnvelope {
    signatures: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ValidEnvelope {
    valid: Vec<bool>,
}

#[derive(Debug, Deserialize)]
struct EqualEnvelope {
    equal: bool,
}

/// Crypto endpoints. Obtained from [`ProtectKitClient::crypto`].
pub struct CryptoApi<'a, T> {
    client: &'a ProtectKitClient<T>,
}

impl<'a, T: Transport> CryptoApi<'a, T> {
    pub(crate) const fn new(client: &'a ProtectKitClient<T>) -> Self {
        Self { client }
    }

    fn url(&self, protection_id: &str, operation: &str) -> ProtectKitResult<reqwest::Url> {
        self.client
            .url(&["api", "crypto", protection_id, operation])
    }

    /// Encrypts values, one ciphertext per value.
    ///
    /// # Errors
    /// Returns any dispatch error.
    pub async fn encrypt(&self, request: &CryptoRequest) -> ProtectKitResult<Vec<String>> {
        let url = self.url(&request.protection_id, "encrypt")?;
        let body = ValuesBody {
            values: &request.values,
        };
        let response: CiphertextsEnvelope =
            self.client.call(Method::POST, url, Some(&body)).await?;
        Ok(response.ciphertexts)
    }

    /// Decrypts ciphertexts back into values.
    ///
    /// # Errors
    /// Returns any dispatch error.
    pub async fn decrypt(&self, request: &CiphertextRequest) -> ProtectKitResult<Vec<Value>> {
        let url = self.url(&request.protection_id, "decrypt")?;
        let body = CiphertextsBody {
            ciphertexts: &request.ciphertexts,
        };
        let response: ValuesEnvelope = self.client.call(Method::POST, url, Some(&body)).await?;
        Ok(response.values)
    }

    /// Keyed digests of the values.
    ///
    /// # Errors
    /// Returns any dispatch error.
    pub async fn hmac(&self, request: &CryptoRequest) -> ProtectKitResult<Vec<String>> {
        let url = self.url(&request.protection_id, "hmac")?;
        let body = ValuesBody {
            values: &request.values,
        };
        let response: DigestsEnvelope = self.client.call(Method::POST, url, Some(&body)).await?;
        Ok(response.digests)
    }

    /// Signs values, one signature per value.
    ///
    /// # Errors
    /// Returns any dispatch error.
    pub async fn sign(&self, request: &CryptoRequest) -> ProtectKitResult<Vec<String>> {
        let url = self.url(&request.protection_id, "sign")?;
        let body = ValuesBody {
            values: &request.values,
        };
        let response: SignaturesEnvelope =
            self.client.call(Method::POST, url, Some(&body)).await?;
        Ok(response.signatures)
    }

    /// Checks each signature against its value.
    ///
    /// # Errors
    /// Returns [`ProtectKitError::InvalidInput`] when values and signatures differ in
    /// length, otherwise any dispatch error.
    pub async fn verify(&self, request: &VerifyRequest) -> ProtectKitResult<Vec<bool>> {
        if request.values.len() != request.signatures.len() {
            return Err(ProtectKitError::InvalidInput(format!(
                "verify needs one signature per value, got {} signatures for {} values",
                request.signatures.len(),
                request.values.len()
            )));
        }
        let url = self.url(&request.protection_id, "verify")?;
        let body = VerifyBody {
            values: &request.values,
            signatures: &request.signatures,
        };
        let response: ValidEnvelope = self.client.call(Method::POST, url, Some(&body)).await?;
        Ok(response.valid)
    }

    /// Whether all ciphertexts decrypt to the same value.
    ///
    /// # Errors
    /// Returns [`ProtectKitError::InvalidInput`] with fewer than two ciphertexts,
    /// otherwise any dispatch error.
    pub async fn equal(&self, request: &CiphertextRequest) -> ProtectKitResult<bool> {
        if request.ciphertexts.len() < 2 {
            return Err(ProtectKitError::InvalidInput(
                "equal needs at least two ciphertexts".to_string(),
            ));
        }
        let url = self.url(&request.protection_id, "equal")?;
        let body = CiphertextsBody {
            ciphertexts: &request.ciphertexts,
        };
        let response: EqualEnvelope = self.client.call(Method::POST, url, Some(&body)).await?;
        Ok(response.equal)
    }
}
