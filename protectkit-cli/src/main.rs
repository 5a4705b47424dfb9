//! `protectkit`: call a data-protection server from the command line.
//!
//! Requests are given as the same JSON documents the library accepts (camelCase keys,
//! e.g. `{"vaultID": "customers", "values": ["alice"]}`), inline with `--json` or from a
//! file with `--file`. Results are printed to stdout as JSON; logs go to stderr and are
//! filtered with `RUST_LOG`.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use eyre::{bail, WrapErr};
use protectkit_core::secure::{SecureProtectionRequest, SecureVaultRequest};
use protectkit_core::vault::StoreRequest;
use protectkit_core::{ClientConfig, ProtectKitClient, Revision, TlsMaterial};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "protectkit", version, about = "Call a data-protection server")]
struct Cli {
    #[command(flatten)]
    connection: Connection,

    #[command(subcommand)]
    command: Command,
}

/// Where the server is and how to authenticate to it.
#[derive(Args, Debug)]
struct Connection {
    /// Base URL of the server (must be https)
    #[arg(long, env = "PROTECTKIT_URL")]
    url: String,

    /// PEM file with the CA that signs the server certificate
    #[arg(long, env = "PROTECTKIT_CA")]
    ca: PathBuf,

    /// PEM file with the client certificate
    #[arg(long, env = "PROTECTKIT_CERT")]
    cert: PathBuf,

    /// PEM file with the client private key
    #[arg(long, env = "PROTECTKIT_KEY")]
    key: PathBuf,

    /// Server API revision to target
    #[arg(long, env = "PROTECTKIT_REVISION", default_value_t = Revision::V0_2)]
    revision: Revision,
}

impl Connection {
    fn client(&self) -> eyre::Result<ProtectKitClient> {
        let tls = TlsMaterial::from_files(&self.ca, &self.cert, &self.key)?;
        let config = ClientConfig::new(&self.url, tls).with_revision(self.revision);
        Ok(ProtectKitClient::new(config)?)
    }
}

/// A request document, inline or from disk.
#[derive(Args, Debug)]
struct Input {
    /// Request as inline JSON
    #[arg(long, conflicts_with = "file", required_unless_present = "file")]
    json: Option<String>,

    /// Path to a JSON file holding the request
    #[arg(long)]
    file: Option<PathBuf>,
}

impl Input {
    fn parse<T: DeserializeOwned>(&self) -> eyre::Result<T> {
        let raw = match (&self.json, &self.file) {
            (Some(json), _) => json.clone(),
            (None, Some(path)) => read_request(path)?,
            (None, None) => bail!("either --json or --file is required"),
        };
        serde_json::from_str(&raw).wrap_err("request does not match what this command expects")
    }
}

fn read_request(path: &Path) -> eyre::Result<String> {
    std::fs::read_to_string(path).wrap_err_with(|| format!("unable to read {}", path.display()))
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Vault storage
    #[command(subcommand)]
    Vault(VaultCommand),

    /// Field-level protection
    #[command(subcommand)]
    Protection(ProtectionCommand),

    /// Cryptographic primitives
    #[command(subcommand)]
    Crypto(CryptoCommand),

    /// Short-lived secure credentials
    #[command(subcommand)]
    Secure(SecureCommand),

    /// Have the server issue an HTTP request on your behalf
    Proxy(Input),
}

#[derive(Subcommand, Debug)]
enum VaultCommand {
    /// Store values and print their tokens
    Store(Input),
    /// Store into several vaults in one call (v0.3 only)
    StoreBatch(Input),
    /// List a page of vault items
    Fetch(Input),
    /// Resolve tokens to values
    Get(Input),
    /// Replace the value behind a token
    Update(Input),
    /// Delete a token and its value
    Delete(Input),
}

#[derive(Subcommand, Debug)]
enum ProtectionCommand {
    /// Seal values under their primary keys
    Seal(Input),
    /// Open sealed tokens
    Open(Input),
    /// Tokenize values without sealing them
    Tokenize(Input),
    /// Look up sealed values by primary key
    Fetch(Input),
    /// Count the values sealed under a protection
    Count {
        /// Protection id
        protection_id: String,
    },
}

#[derive(Subcommand, Debug)]
enum CryptoCommand {
    /// Encrypt values
    Encrypt(Input),
    /// Decrypt ciphertexts
    Decrypt(Input),
    /// HMAC values
    Hmac(Input),
    /// Sign values
    Sign(Input),
    /// Verify signatures
    Verify(Input),
    /// Check whether ciphertexts hold the same plaintext
    Equal(Input),
}

#[derive(Subcommand, Debug)]
enum SecureCommand {
    /// Obtain a credential
    Init {
        /// What the credential covers
        #[arg(value_enum)]
        scope: Scope,
        #[command(flatten)]
        input: Input,
    },
    /// Finalize a credential
    Commit {
        /// What the credential covers
        #[arg(value_enum)]
        scope: Scope,
        /// Credential returned by `init`
        credential: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Scope {
    Protection,
    Vault,
}

fn to_json<T: Serialize>(value: &T) -> eyre::Result<Value> {
    Ok(serde_json::to_value(value)?)
}

fn done() -> Value {
    json!({"ok": true})
}

async fn run(client: &ProtectKitClient, command: &Command) -> eyre::Result<Value> {
    match command {
        Command::Vault(command) => run_vault(client, command).await,
        Command::Protection(command) => run_protection(client, command).await,
        Command::Crypto(command) => run_crypto(client, command).await,
        Command::Secure(command) => run_secure(client, command).await,
        Command::Proxy(input) => Ok(client.proxy(&input.parse()?).await?),
    }
}

async fn run_vault(client: &ProtectKitClient, command: &VaultCommand) -> eyre::Result<Value> {
    let vault = client.vault();
    match command {
        VaultCommand::Store(input) => to_json(&vault.store(&input.parse()?).await?),
        VaultCommand::StoreBatch(input) => {
            let requests: Vec<StoreRequest> = input.parse()?;
            to_json(&vault.store_batch(&requests).await?)
        }
        VaultCommand::Fetch(input) => to_json(&vault.fetch(&input.parse()?).await?),
        VaultCommand::Get(input) => to_json(&vault.get(&input.parse()?).await?),
        VaultCommand::Update(input) => {
            vault.update(&input.parse()?).await?;
            Ok(done())
        }
        VaultCommand::Delete(input) => {
            vault.delete(&input.parse()?).await?;
            Ok(done())
        }
    }
}

async fn run_protection(
    client: &ProtectKitClient,
    command: &ProtectionCommand,
) -> eyre::Result<Value> {
    let protection = client.protection();
    match command {
        ProtectionCommand::Seal(input) => to_json(&protection.seal(&input.parse()?).await?),
        ProtectionCommand::Open(input) => to_json(&protection.open(&input.parse()?).await?),
        ProtectionCommand::Tokenize(input) => {
            to_json(&protection.tokenize(&input.parse()?).await?)
        }
        ProtectionCommand::Fetch(input) => to_json(&protection.fetch(&input.parse()?).await?),
        ProtectionCommand::Count { protection_id } => {
            Ok(json!({"count": protection.count(protection_id).await?}))
        }
    }
}

async fn run_crypto(client: &ProtectKitClient, command: &CryptoCommand) -> eyre::Result<Value> {
    let crypto = client.crypto();
    match command {
        CryptoCommand::Encrypt(input) => to_json(&crypto.encrypt(&input.parse()?).await?),
        CryptoCommand::Decrypt(input) => to_json(&crypto.decrypt(&input.parse()?).await?),
        CryptoCommand::Hmac(input) => to_json(&crypto.hmac(&input.parse()?).await?),
        CryptoCommand::Sign(input) => to_json(&crypto.sign(&input.parse()?).await?),
        CryptoCommand::Verify(input) => to_json(&crypto.verify(&input.parse()?).await?),
        CryptoCommand::Equal(input) => Ok(json!({"equal": crypto.equal(&input.parse()?).await?})),
    }
}

async fn run_secure(client: &ProtectKitClient, command: &SecureCommand) -> eyre::Result<Value> {
    let secure = client.secure();
    match command {
        SecureCommand::Init {
            scope: Scope::Protection,
            input,
        } => {
            let request: SecureProtectionRequest = input.parse()?;
            Ok(json!({"credential": secure.init_protection(&request).await?}))
        }
        SecureCommand::Init {
            scope: Scope::Vault,
            input,
        } => {
            let request: SecureVaultRequest = input.parse()?;
            Ok(json!({"credential": secure.init_vault(&request).await?}))
        }
        SecureCommand::Commit { scope, credential } => {
            match scope {
                Scope::Protection => secure.commit_protection(credential).await?,
                Scope::Vault => secure.commit_vault(credential).await?,
            }
            Ok(done())
        }
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let client = cli.connection.client()?;
    tracing::debug!(url = %cli.connection.url, revision = %client.revision(), "client ready");

    let output = run(&client, &cli.command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::io::Write;

    const CONNECTION: [&str; 9] = [
        "protectkit",
        "--url",
        "https://protect.internal",
        "--ca",
        "ca.pem",
        "--cert",
        "client.pem",
        "--key",
        "client.key",
    ];

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(CONNECTION.iter().chain(args))
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_revision_flag() {
        let cli = parse(&["--revision", "v0.3", "protection", "count", "ssn"]).unwrap();
        assert_eq!(cli.connection.revision, Revision::V0_3);
        assert!(matches!(
            cli.command,
            Command::Protection(ProtectionCommand::Count { ref protection_id }) if protection_id == "ssn"
        ));

        assert!(parse(&["--revision", "v9", "protection", "count", "ssn"]).is_err());
    }

    #[test]
    fn test_inline_request() {
        let cli = parse(&[
            "vault",
            "store",
            "--json",
            r#"{"vaultID": "customers", "values": ["alice"]}"#,
        ])
        .unwrap();
        let Command::Vault(VaultCommand::Store(input)) = cli.command else {
            panic!("expected vault store");
        };
        let request: StoreRequest = input.parse().unwrap();
        assert_eq!(request, StoreRequest::new("customers", vec![json!("alice")]));
    }

    #[test]
    fn test_request_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"operation": "READ", "vaultIDs": ["customers"], "ttl": 5}"#)
            .unwrap();
        let path = file.path().to_str().unwrap();

        let cli = parse(&["secure", "init", "vault", "--file", path]).unwrap();
        let Command::Secure(SecureCommand::Init { scope, input }) = cli.command else {
            panic!("expected secure init");
        };
        assert_eq!(scope, Scope::Vault);
        let request: SecureVaultRequest = input.parse().unwrap();
        assert_eq!(request.vault_ids, vec!["customers"]);
    }

    #[test]
    fn test_request_is_required() {
        assert!(parse(&["crypto", "encrypt"]).is_err());
        assert!(parse(&["crypto", "encrypt", "--json", "{}", "--file", "r.json"]).is_err());
    }

    #[test]
    fn test_mismatched_request_is_reported() {
        let input = Input {
            json: Some(r#"{"vaultID": "customers"}"#.to_string()),
            file: None,
        };
        let err = input.parse::<StoreRequest>().unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }
}
