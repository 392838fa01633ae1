//! Issue command - provisions a token record and signs its bearer token

use std::path::PathBuf;

use anyhow::{bail, Context};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use clap::Args;
use rand::RngCore;
use tracing::info;

use crate::config::{AppConfig, StorageBackend};
use crate::domain::{Claims, TokenRecord, TokenStore};
use crate::infrastructure::auth::JwtSigner;
use crate::infrastructure::logging::init_logging;

const API_KEY_BYTES: usize = 16;

#[derive(Args, Clone, Debug)]
pub struct IssueArgs {
    /// Configuration file layered over config/default and config/local
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// API key to provision; a random one is generated when omitted
    #[arg(long)]
    pub api_key: Option<String>,

    /// Requests allowed per rate-limit window
    #[arg(long, default_value_t = 10)]
    pub limit: i64,

    /// Lifetime of the token in hours
    #[arg(long, default_value_t = 24)]
    pub ttl_hours: i64,

    /// Comma-separated route patterns; empty allows every path
    #[arg(long, value_delimiter = ',')]
    pub routes: Vec<String>,
}

/// Generate a random URL-safe API key
pub fn generate_api_key() -> String {
    let mut bytes = [0u8; API_KEY_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Token material produced for one API key
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub record: TokenRecord,
    pub token: String,
}

/// Store the record and sign matching claims
pub async fn issue_token(
    store: &dyn TokenStore,
    signer: &JwtSigner,
    args: &IssueArgs,
    now: DateTime<Utc>,
) -> anyhow::Result<IssuedToken> {
    if args.limit <= 0 {
        bail!("--limit must be > 0");
    }
    if args.ttl_hours <= 0 {
        bail!("--ttl-hours must be > 0");
    }

    let api_key = match &args.api_key {
        Some(key) if !key.trim().is_empty() => key.trim().to_string(),
        Some(_) => bail!("--api-key must not be empty"),
        None => generate_api_key(),
    };

    let routes: Vec<String> = args
        .routes
        .iter()
        .map(|route| route.trim().to_string())
        .filter(|route| !route.is_empty())
        .collect();

    let Some(expires_at) =
        TimeDelta::try_hours(args.ttl_hours).and_then(|ttl| now.checked_add_signed(ttl))
    else {
        bail!("--ttl-hours {} is out of range", args.ttl_hours);
    };
    let record = TokenRecord::new(api_key.clone(), args.limit, expires_at)
        .with_allowed_routes(routes.clone());

    store
        .upsert(record.clone())
        .await
        .context("failed to store token record")?;

    let claims = Claims::new(api_key, expires_at)
        .with_allowed_routes(routes)
        .with_rate_limit(args.limit)
        .with_issued_at(now);
    let token = signer.sign(&claims)?;

    Ok(IssuedToken { record, token })
}

pub async fn run(args: IssueArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load_from(args.config.as_deref())?;
    init_logging(&config.logging);

    if config.storage.backend != StorageBackend::Redis {
        bail!("issue needs a shared backend; set storage.backend = \"redis\"");
    }

    let signer = JwtSigner::hmac(&config.token.algorithm, &config.token.secret)?;
    let backends = crate::create_backends(&config).await?;

    let issued = issue_token(backends.token_store.as_ref(), &signer, &args, Utc::now()).await?;
    info!(api_key = %issued.record.api_key, "Token record stored");

    let routes = serde_json::to_string(&issued.record.allowed_routes)?;
    println!("api_key:        {}", issued.record.api_key);
    println!(
        "storage_key:    {}{}",
        config.storage.token_prefix, issued.record.api_key
    );
    println!("rate_limit:     {}", issued.record.rate_limit);
    println!(
        "expires_at:     {}",
        issued
            .record
            .expires_at
            .to_rfc3339_opts(SecondsFormat::Secs, true)
    );
    println!("allowed_routes: {}", routes);
    println!("token:          {}", issued.token);

    Ok(())
}
