// Trait seams between the scout pipeline and the outside world.
//
// JobPlatform — the three remote calls: start a job, read its status, list results.
// Clock — wall-clock time and the suspension between polls.
//
// Production wires ApifyClient + SystemClock; tests use ScriptedPlatform and
// ManualClock from `testing`, so polling runs without real delays.

use std::time::Duration;

use anyhow::Result;
use apify_client::{ApifyClient, RunData};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// What the platform reports about a run at one point in time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSnapshot {
    pub run_id: Option<String>,
    pub status: Option<String>,
    pub status_message: Option<String>,
    pub dataset_id: Option<String>,
}

impl From<RunData> for RunSnapshot {
    fn from(run: RunData) -> Self {
        Self {
            run_id: run.id,
            status: run.status,
            status_message: run.status_message,
            dataset_id: run.default_dataset_id,
        }
    }
}

// ---------------------------------------------------------------------------
// JobPlatform
// ---------------------------------------------------------------------------

#[async_trait]
pub trait JobPlatform: Send + Sync {
    /// Start a job on `provider_id` with `params`. Fails if the provider is
    /// unknown or unauthorized.
    async fn start(&self, provider_id: &str, params: &Value) -> Result<RunSnapshot>;

    /// Read the current status of a run.
    async fn get_status(&self, run_id: &str) -> Result<RunSnapshot>;

    /// List at most `limit` raw result records.
    async fn list_results(&self, dataset_id: &str, limit: u32) -> Result<Vec<Value>>;
}

#[async_trait]
impl JobPlatform for ApifyClient {
    async fn start(&self, provider_id: &str, params: &Value) -> Result<RunSnapshot> {
        Ok(self.start_actor(provider_id, params).await?.into())
    }

    async fn get_status(&self, run_id: &str) -> Result<RunSnapshot> {
        Ok(self.get_run(run_id).await?.into())
    }

    async fn list_results(&self, dataset_id: &str, limit: u32) -> Result<Vec<Value>> {
        Ok(self.list_dataset_items(dataset_id, limit).await?)
    }
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    async fn sleep(&self, duration: Duration);
}

pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
