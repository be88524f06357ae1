use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use apify_client::ApifyClient;
use chrono::Utc;
use clap::Parser;
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

use viral_scout::output::{RunFailure, RunOutput};
use viral_scout::{LocalStorage, OutputSink, RunConfig, Scout, ScoutError, SystemClock};

#[derive(Parser, Debug)]
#[command(name = "viral-scout", about = "Rank the freshest, fastest-growing results of an upstream scrape")]
struct Args {
    /// Job input JSON. Defaults to INPUT.json in the default key-value store.
    #[arg(long, env = "VIRAL_SCOUT_INPUT")]
    input: Option<PathBuf>,

    /// Root of the local storage layout (datasets/, key_value_stores/).
    #[arg(long, env = "APIFY_LOCAL_STORAGE_DIR", default_value = "./storage")]
    storage_dir: PathBuf,

    #[arg(long, env = "APIFY_API_BASE_URL", default_value = "https://api.apify.com/v2")]
    api_base_url: String,

    /// Emit logs as JSON lines.
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("viral_scout=info,apify_client=info"));
    if args.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!("Viral Scout starting...");

    let storage = Arc::new(LocalStorage::open(&args.storage_dir).await?);

    let input = match load_input(args.input.as_deref(), &args.storage_dir).await {
        Ok(input) => input,
        Err(err) => {
            storage
                .set_output(&RunOutput::Failure(RunFailure::from_error(&err)))
                .await?;
            return Err(err.into());
        }
    };

    let config = RunConfig::from_input(&input, Utc::now());
    let client = ApifyClient::with_base_url(
        args.api_base_url,
        config.upstream_token.as_ref().map(|t| t.expose().to_string()),
    );

    let scout = Scout::new(Arc::new(client), Arc::new(SystemClock), storage.clone());
    let report = scout.run(&config).await?;

    info!(
        output = %storage.output_path().display(),
        shortlisted = report.shortlist.len(),
        "Done"
    );
    Ok(())
}

/// Read the job input. An explicit path must exist; the default location
/// may be absent, in which case every setting takes its default.
async fn load_input(explicit: Option<&Path>, storage_dir: &Path) -> std::result::Result<Value, ScoutError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let default = storage_dir
                .join("key_value_stores")
                .join("default")
                .join("INPUT.json");
            if !tokio::fs::try_exists(&default).await.unwrap_or(false) {
                info!(path = %default.display(), "No input file, using defaults");
                return Ok(Value::Object(Default::default()));
            }
            default
        }
    };

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| ScoutError::InvalidInput(format!("{}: {e}", path.display())))?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_slice(&bytes)
        .map_err(|e| ScoutError::InvalidInput(format!("{}: {e}", path.display())))
}
