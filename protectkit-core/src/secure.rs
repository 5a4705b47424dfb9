//! Secure credentials open a short, TTL-bounded window for READ or WRITE access to a set
//! of protections or vaults. `init` obtains the credential; `commit` finalizes the window.

use reqwest::Method;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::client::ProtectKitClient;
use crate::error::{ProtectKitError, ProtectKitResult};
use crate::transport::Transport;

/// Access granted by a secure credential.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, Serialize, Deserialize,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    /// Read access.
    Read,
    /// Write access.
    Write,
}

/// Credential request scoped to protections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecureProtectionRequest {
    /// Requested access.
    pub operation: Operation,
    /// Protections the credential covers.
    #[serde(rename = "protectionIDs")]
    pub protection_ids: Vec<String>,
    /// Lifetime in minutes.
    pub ttl: u32,
}

/// Credential request scoped to vaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecureVaultRequest {
    /// Requested access.
    pub operation: Operation,
    /// Vaults the credential covers.
    #[serde(rename = "vaultIDs")]
    pub vault_ids: Vec<String>,
    /// Lifetime in minutes.
    pub ttl: u32,
}

#[derive(Debug, Serialize)]
struct ProtectionInitBody<'a> {
    operation: Operation,
    protection_ids: &'a [String],
    ttl: u32,
}

#[derive(Debug, Serialize)]
struct VaultInitBody<'a> {
    operation: Operation,
    vault_ids: &'a [String],
    ttl: u32,
}

#[derive(Debug, Serialize)]
struct CommitBody<'a> {
    credential: &'a str,
}

#[derive(Debug, Deserialize)]
struct CredentialEnvelope {
    credential: String,
}

/// Secure credential endpoints. Obtained from [`ProtectKitClient::secure`].
pub struct SecureApi<'a, T> {
    client: &'a ProtectKitClient<T>,
}

impl<'a, T: Transport> SecureApi<'a, T> {
    pub(crate) const fn new(client: &'a ProtectKitClient<T>) -> Self {
        Self { client }
    }

    /// Obtains a credential for the given protections.
    ///
    /// # Errors
    /// Returns [`ProtectKitError::InvalidInput`] for an empty id list or a zero TTL,
    /// otherwise any dispatch error.
    pub async fn init_protection(
        &self,
        request: &SecureProtectionRequest,
    ) -> ProtectKitResult<String> {
        validate_scope("protection", &request.protection_ids, request.ttl)?;
        let url = self.client.url(&["api", "secure", "protection", "init"])?;
        let body = ProtectionInitBody {
            operation: request.operation,
            protection_ids: &request.protection_ids,
            ttl: request.ttl,
        };
        let response: CredentialEnvelope =
            self.client.call(Method::POST, url, Some(&body)).await?;
        Ok(response.credential)
    }

    /// Finalizes a protection credential.
    ///
    /// # Errors
    /// Returns any dispatch error.
    pub async fn commit_protection(&self, credential: &str) -> ProtectKitResult<()> {
        self.commit("protection", credential).await
    }

    /// Obtains a credential for the given vaults.
    ///
    /// # Errors
    /// Returns [`ProtectKitError::InvalidInput`] for an empty id list or a zero TTL,
    /// otherwise any dispatch error.
    pub async fn init_vault(&self, request: &SecureVaultRequest) -> ProtectKitResult<String> {
        validate_scope("vault", &request.vault_ids, request.ttl)?;
        let url = self.client.url(&["api", "secure", "vault", "init"])?;
        let body = VaultInitBody {
            operation: request.operation,
            vault_ids: &request.vault_ids,
            ttl: request.ttl,
        };
        let response: CredentialEnvelope =
            self.client.call(Method::POST, url, Some(&body)).await?;
        Ok(response.credential)
    }

    /// Finalizes a vault credential.
    ///
    /// # Errors
    /// Returns any dispatch error.
    pub async fn commit_vault(&self, credential: &str) -> ProtectKitResult<()> {
        self.commit("vault", credential).await
    }

    async fn commit(&self, scope: &str, credential: &str) -> ProtectKitResult<()> {
        if credential.is_empty() {
            return Err(ProtectKitError::InvalidInput(
                "credential must not be empty".to_string(),
            ));
        }
        let url = self.client.url(&["api", "secure", scope, "commit"])?;
        let body = CommitBody { credential };
        self.client
            .call::<_, IgnoredAny>(Method::POST, url, Some(&body))
            .await?;
        Ok(())
    }
}

fn validate_scope(scope: &str, ids: &[String], ttl: u32) -> ProtectKitResult<()> {
    if ids.is_empty() {
        return Err(ProtectKitError::InvalidInput(format!(
            "secure {scope} credential needs at least one id"
        )));
    }
    if ttl == 0 {
        return Err(ProtectKitError::InvalidInput(
            "ttl must be at least one minute".to_string(),
        ));
    }
    Ok(())
}
