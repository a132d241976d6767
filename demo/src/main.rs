//! Verify Google ID tokens from the command line
//!
//! Configuration comes from `GALLERY_AUTH_*` environment variables, logs go
//! to stderr (`RUST_LOG`, default `info`) and results to stdout as JSON.

use std::process::ExitCode;
use std::time::{Duration, UNIX_EPOCH};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use gallery_auth::{AuthError, GoogleAuthConfig, IdentityVerifier, build_verifier};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "gallery-auth-demo",
    version,
    about = "Verify Google ID tokens against the published key set"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Give up after this many seconds
    #[arg(long, global = true, default_value_t = 15)]
    deadline_secs: u64,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Verify a token and print the identity it asserts
    Verify {
        /// Compact token (header.payload.signature)
        token: String,
    },
    /// Fetch and print the current key set
    Keys,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Verification failures are reported as JSON; exit code follows the HTTP mapping
            if let Some(auth) = e.downcast_ref::<AuthError>()
                && auth.status_code() != 500
            {
                println!(
                    "{}",
                    json!({ "error": auth.to_string(), "kind": format!("{:?}", auth.kind()) })
                );
                return if auth.status_code() == 503 {
                    ExitCode::from(3)
                } else {
                    ExitCode::from(2)
                };
            }
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = GoogleAuthConfig::from_env().context("loading GALLERY_AUTH_* configuration")?;
    let verifier = build_verifier(&config)?;
    let deadline = Duration::from_secs(cli.deadline_secs);

    match cli.command {
        Command::Verify { token } => {
            let identity = verifier.verify_with_deadline(&token, deadline).await?;
            println!("{}", serde_json::to_string_pretty(&identity)?);
        }
        Command::Keys => {
            let keys = tokio::time::timeout(deadline, verifier.fetch_keys())
                .await
                .map_err(|_| AuthError::transport("key-set fetch deadline elapsed"))??;
            let expires_at = keys
                .expires_at()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default();
            let entries: Vec<_> = keys
                .entries()
                .iter()
                .map(|entry| json!({ "kid": entry.key_id, "alg": entry.algorithm }))
                .collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "source": config.jwks_uri,
                    "expires_at": expires_at,
                    "keys": entries,
                }))?
            );
        }
    }
    Ok(())
}
