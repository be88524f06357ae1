use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{Result, ScoutError};
use crate::platform::JobPlatform;
use crate::poller::RunHandle;

/// Default upstream actors, tried in order.
pub const DEFAULT_PROVIDERS: &[&str] = &[
    "streamers/youtube-scraper",
    "streamers/youtube-videos-scraper",
    "runtime/youtube-channel-scraper",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderFailure {
    pub provider_id: String,
    pub message: String,
}

/// A started run plus the providers that refused before it.
#[derive(Debug, Clone)]
pub struct Launch {
    pub provider_id: String,
    pub handle: RunHandle,
    pub failures: Vec<ProviderFailure>,
}

/// Try each candidate once, in order, and stop at the first that starts.
/// No retries or backoff: a refused provider is recorded and skipped.
pub async fn launch(
    platform: &dyn JobPlatform,
    candidates: &[String],
    params: &Value,
) -> Result<Launch> {
    let mut failures = Vec::new();

    for provider_id in candidates {
        info!(provider_id = provider_id.as_str(), "Trying to start actor");
        match platform.start(provider_id, params).await {
            Ok(snapshot) => {
                let run_id = snapshot
                    .run_id
                    .filter(|id| !id.trim().is_empty())
                    .ok_or(ScoutError::MissingRunArtifact("run id in start response"))?;
                info!(
                    provider_id = provider_id.as_str(),
                    run_id = run_id.as_str(),
                    prior_failures = failures.len(),
                    "Actor started"
                );
                return Ok(Launch {
                    provider_id: provider_id.clone(),
                    handle: RunHandle::new(run_id),
                    failures,
                });
            }
            Err(e) => {
                warn!(provider_id = provider_id.as_str(), error = %e, "Actor failed to start");
                failures.push(ProviderFailure {
                    provider_id: provider_id.clone(),
                    message: e.to_string(),
                });
            }
        }
    }

    let last_error = failures
        .last()
        .map(|f| format!("{}: {}", f.provider_id, f.message))
        .unwrap_or_else(|| "no candidate providers configured".to_string());
    Err(ScoutError::ProviderExhausted {
        attempts: failures,
        last_error,
    })
}
