use std::error::Error as StdError;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, ScoutError};
use crate::ranking::ScoredRecord;

pub const FAILURE_HINT: &str = "Check that UPSTREAM_APIFY_TOKEN is set in the environment and that \
forwardInput follows the actor schema: use searchQueries: [...].";

/// One emitted shortlist entry. The raw upstream payload is not included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortlistItem {
    pub run_date: String,
    pub url: String,
    pub title: String,
    pub channel: String,
    pub views: f64,
    pub likes: f64,
    pub comments: f64,
    pub published_at: String,
    pub age_hours: f64,
    pub score: f64,
}

impl ShortlistItem {
    pub fn new(scored: &ScoredRecord, run_date: DateTime<Utc>) -> Self {
        let r = &scored.record;
        Self {
            run_date: iso(run_date),
            url: r.url.clone(),
            title: r.title.clone(),
            channel: r.channel.clone(),
            views: r.views,
            likes: r.likes,
            comments: r.comments,
            published_at: iso(r.published_at),
            age_hours: r.age_hours,
            score: scored.score,
        }
    }
}

/// Terminal summary of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RunOutput {
    Success(RunSuccess),
    Failure(RunFailure),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSuccess {
    pub ok: bool,
    pub count: usize,
    pub top_n: usize,
    pub last_hours: u64,
    pub items: Vec<ShortlistItem>,
    pub actor_id: String,
    pub run_id: String,
    /// The job input actually sent upstream.
    pub query: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunFailure {
    pub ok: bool,
    pub error: String,
    /// Rendered error chain.
    pub stack: String,
    pub hint: String,
}

impl RunFailure {
    pub fn from_error(err: &ScoutError) -> Self {
        let mut stack = format!("{err:?}");
        let mut source = StdError::source(err);
        while let Some(cause) = source {
            stack.push_str(&format!("\nCaused by: {cause}"));
            source = cause.source();
        }
        Self {
            ok: false,
            error: err.to_string(),
            stack,
            hint: FAILURE_HINT.to_string(),
        }
    }
}

fn iso(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ---------------------------------------------------------------------------
// OutputSink
// ---------------------------------------------------------------------------

#[async_trait]
pub trait OutputSink: Send + Sync {
    /// Emit one shortlist item.
    async fn push_item(&self, item: &ShortlistItem) -> Result<()>;

    /// Record the terminal summary. Called exactly once per run.
    async fn set_output(&self, output: &RunOutput) -> Result<()>;

    /// Drop every item emitted so far. A failed run leaves no items behind.
    async fn discard_items(&self) -> Result<()>;
}

/// Local storage layout of the platform: dataset items as numbered JSON
/// files, the summary as the `OUTPUT` record of the default key-value store.
pub struct LocalStorage {
    dataset_dir: PathBuf,
    kv_dir: PathBuf,
    next_item: AtomicU64,
}

impl LocalStorage {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            dataset_dir: root.join("datasets").join("default"),
            kv_dir: root.join("key_value_stores").join("default"),
            next_item: AtomicU64::new(1),
        }
    }

    /// Open the layout for a new run. Items left over from a previous run in
    /// the same directory are removed.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let storage = Self::new(root);
        storage.purge().await?;
        Ok(storage)
    }

    pub async fn purge(&self) -> Result<()> {
        match tokio::fs::remove_dir_all(&self.dataset_dir).await {
            Ok(()) => debug!(dir = %self.dataset_dir.display(), "Purged default dataset"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.next_item.store(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn output_path(&self) -> PathBuf {
        self.kv_dir.join("OUTPUT.json")
    }

    pub fn dataset_dir(&self) -> &Path {
        &self.dataset_dir
    }
}

#[async_trait]
impl OutputSink for LocalStorage {
    async fn push_item(&self, item: &ShortlistItem) -> Result<()> {
        tokio::fs::create_dir_all(&self.dataset_dir).await?;
        let n = self.next_item.fetch_add(1, Ordering::Relaxed);
        let path = self.dataset_dir.join(format!("{n:09}.json"));
        tokio::fs::write(&path, to_json(item)?).await?;
        Ok(())
    }

    async fn set_output(&self, output: &RunOutput) -> Result<()> {
        tokio::fs::create_dir_all(&self.kv_dir).await?;
        tokio::fs::write(self.output_path(), to_json(output)?).await?;
        Ok(())
    }

    async fn discard_items(&self) -> Result<()> {
        self.purge().await
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(value).map_err(|e| ScoutError::Storage(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::CanonicalRecord;
    use chrono::TimeZone;
    use serde_json::json;

    fn scored() -> ScoredRecord {
        ScoredRecord {
            record: CanonicalRecord {
                url: "https://www.youtube.com/watch?v=a1".into(),
                title: "Fast greens".into(),
                channel: "Grower".into(),
                views: 100.0,
                likes: 50.0,
                comments: 10.0,
                published_at: Utc.with_ymd_and_hms(2025, 6, 15, 11, 0, 0).unwrap(),
                age_hours: 1.0,
            },
            score: 74.0,
        }
    }

    #[test]
    fn shortlist_item_json_shape() {
        let run_date = Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap();
        let item = ShortlistItem::new(&scored(), run_date);
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["runDate"], "2025-06-15T12:00:00.000Z");
        assert_eq!(value["publishedAt"], "2025-06-15T11:00:00.000Z");
        assert_eq!(value["score"], 74.0);
        assert_eq!(value["ageHours"], 1.0);
        assert!(value.get("raw").is_none());
    }

    #[test]
    fn failure_summary_shape() {
        let err = ScoutError::PollingTimeout {
            timeout: std::time::Duration::from_secs(300),
        };
        let value = serde_json::to_value(RunOutput::Failure(RunFailure::from_error(&err))).unwrap();
        assert_eq!(value["ok"], false);
        assert_eq!(value["error"], "Polling timed out after 300s");
        assert!(value["stack"].as_str().unwrap().contains("PollingTimeout"));
        assert_eq!(value["hint"], FAILURE_HINT);
    }

    #[tokio::test]
    async fn local_storage_writes_items_and_output() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());
        let item = ShortlistItem::new(&scored(), Utc::now());

        storage.push_item(&item).await.unwrap();
        storage.push_item(&item).await.unwrap();
        storage
            .set_output(&RunOutput::Success(RunSuccess {
                ok: true,
                count: 2,
                top_n: 5,
                last_hours: 24,
                items: vec![item.clone(), item.clone()],
                actor_id: "streamers/youtube-scraper".into(),
                run_id: "run-1".into(),
                query: json!({"searchQueries": ["microgreens"]}),
            }))
            .await
            .unwrap();

        let first = storage.dataset_dir().join("000000001.json");
        let second = storage.dataset_dir().join("000000002.json");
        let saved: ShortlistItem =
            serde_json::from_slice(&std::fs::read(first).unwrap()).unwrap();
        assert_eq!(saved, item);
        assert!(second.exists());

        let output: Value =
            serde_json::from_slice(&std::fs::read(storage.output_path()).unwrap()).unwrap();
        assert_eq!(output["ok"], true);
        assert_eq!(output["count"], 2);
        assert_eq!(output["actorId"], "streamers/youtube-scraper");
    }

    #[tokio::test]
    async fn reopening_storage_drops_previous_items() {
        let dir = tempfile::tempdir().unwrap();
        let item = ShortlistItem::new(&scored(), Utc::now());

        let first_run = LocalStorage::open(dir.path()).await.unwrap();
        first_run.push_item(&item).await.unwrap();
        first_run.push_item(&item).await.unwrap();

        let second_run = LocalStorage::open(dir.path()).await.unwrap();
        let err = ScoutError::PollingTimeout {
            timeout: std::time::Duration::from_secs(30),
        };
        second_run
            .set_output(&RunOutput::Failure(RunFailure::from_error(&err)))
            .await
            .unwrap();

        assert!(!second_run.dataset_dir().exists());
        let output: Value =
            serde_json::from_slice(&std::fs::read(second_run.output_path()).unwrap()).unwrap();
        assert_eq!(output["ok"], false);

        second_run.push_item(&item).await.unwrap();
        assert!(second_run.dataset_dir().join("000000001.json").exists());
        assert!(!second_run.dataset_dir().join("000000002.json").exists());
    }

    #[tokio::test]
    async fn discarding_removes_partial_items() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::open(dir.path()).await.unwrap();
        storage.push_item(&ShortlistItem::new(&scored(), Utc::now())).await.unwrap();

        storage.discard_items().await.unwrap();
        storage.discard_items().await.unwrap();

        assert!(!storage.dataset_dir().exists());
    }
}
