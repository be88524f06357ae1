// Test doubles for the scout pipeline.
//
// - ScriptedPlatform (JobPlatform) — per-provider start outcomes, a status
//   sequence, dataset contents, and a log of every call made
// - ManualClock (Clock) — virtual time; sleep advances it instantly
// - MemorySink (OutputSink) — keeps emitted items and the summary in memory

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::ScoutError;
use crate::output::{OutputSink, RunOutput, ShortlistItem};
use crate::platform::{Clock, JobPlatform, RunSnapshot};

// ---------------------------------------------------------------------------
// ScriptedPlatform
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum PlatformCall {
    Start { provider_id: String, params: Value },
    Status { run_id: String },
    List { dataset_id: String, limit: u32 },
}

/// Scripted platform. Unregistered providers refuse to start; once the
/// status sequence is used up the last status repeats.
#[derive(Default)]
pub struct ScriptedPlatform {
    starts: HashMap<String, std::result::Result<RunSnapshot, String>>,
    statuses: Mutex<VecDeque<RunSnapshot>>,
    last_status: Mutex<Option<RunSnapshot>>,
    datasets: HashMap<String, Vec<Value>>,
    clock: Option<Arc<ManualClock>>,
    calls: Mutex<Vec<PlatformCall>>,
    status_times: Mutex<Vec<DateTime<Utc>>>,
}

impl ScriptedPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_start_ok(self, provider_id: &str, run_id: &str) -> Self {
        self.on_start_snapshot(
            provider_id,
            RunSnapshot {
                run_id: Some(run_id.to_string()),
                status: Some("READY".to_string()),
                ..Default::default()
            },
        )
    }

    pub fn on_start_snapshot(mut self, provider_id: &str, snapshot: RunSnapshot) -> Self {
        self.starts.insert(provider_id.to_string(), Ok(snapshot));
        self
    }

    pub fn on_start_err(mut self, provider_id: &str, message: &str) -> Self {
        self.starts
            .insert(provider_id.to_string(), Err(message.to_string()));
        self
    }

    /// Queue one status snapshot per entry. `dataset_id` is reported on
    /// every snapshot, as the platform does.
    pub fn with_statuses(self, statuses: &[&str], dataset_id: Option<&str>) -> Self {
        {
            let mut queue = self.statuses.lock().unwrap();
            for status in statuses {
                queue.push_back(RunSnapshot {
                    run_id: None,
                    status: Some(status.to_string()),
                    status_message: None,
                    dataset_id: dataset_id.map(str::to_string),
                });
            }
        }
        self
    }

    /// Attach a status message to every queued snapshot.
    pub fn with_status_message(self, message: &str) -> Self {
        for snapshot in self.statuses.lock().unwrap().iter_mut() {
            snapshot.status_message = Some(message.to_string());
        }
        self
    }

    pub fn on_results(mut self, dataset_id: &str, items: Vec<Value>) -> Self {
        self.datasets.insert(dataset_id.to_string(), items);
        self
    }

    /// Record the virtual time of each status read.
    pub fn with_clock(mut self, clock: Arc<ManualClock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn calls(&self) -> Vec<PlatformCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn start_count(&self) -> usize {
        self.count(|c| matches!(c, PlatformCall::Start { .. }))
    }

    pub fn status_count(&self) -> usize {
        self.count(|c| matches!(c, PlatformCall::Status { .. }))
    }

    pub fn status_times(&self) -> Vec<DateTime<Utc>> {
        self.status_times.lock().unwrap().clone()
    }

    fn count(&self, pred: impl Fn(&PlatformCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: PlatformCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl JobPlatform for ScriptedPlatform {
    async fn start(&self, provider_id: &str, params: &Value) -> Result<RunSnapshot> {
        self.record(PlatformCall::Start {
            provider_id: provider_id.to_string(),
            params: params.clone(),
        });
        match self.starts.get(provider_id) {
            Some(Ok(snapshot)) => Ok(snapshot.clone()),
            Some(Err(message)) => Err(anyhow!("{message}")),
            None => Err(anyhow!("Actor {provider_id} was not found")),
        }
    }

    async fn get_status(&self, run_id: &str) -> Result<RunSnapshot> {
        self.record(PlatformCall::Status {
            run_id: run_id.to_string(),
        });
        if let Some(clock) = &self.clock {
            self.status_times.lock().unwrap().push(clock.now());
        }

        let next = self.statuses.lock().unwrap().pop_front();
        let mut last = self.last_status.lock().unwrap();
        if let Some(snapshot) = next {
            *last = Some(snapshot);
        }
        let mut snapshot = last
            .clone()
            .ok_or_else(|| anyhow!("no status scripted for run {run_id}"))?;
        snapshot.run_id = Some(run_id.to_string());
        Ok(snapshot)
    }

    async fn list_results(&self, dataset_id: &str, limit: u32) -> Result<Vec<Value>> {
        self.record(PlatformCall::List {
            dataset_id: dataset_id.to_string(),
            limit,
        });
        let items = self
            .datasets
            .get(dataset_id)
            .ok_or_else(|| anyhow!("Dataset {dataset_id} was not found"))?;
        Ok(items.iter().take(limit as usize).cloned().collect())
    }
}

// ---------------------------------------------------------------------------
// ManualClock
// ---------------------------------------------------------------------------

pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += chrono::Duration::from_std(by).expect("duration in range");
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        self.advance(duration);
    }
}

// ---------------------------------------------------------------------------
// MemorySink
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemorySink {
    items: Mutex<Vec<ShortlistItem>>,
    output: Mutex<Option<RunOutput>>,
    accept_items: Option<usize>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse every item after the first `n`, as a full disk would.
    pub fn accepting_items(mut self, n: usize) -> Self {
        self.accept_items = Some(n);
        self
    }

    pub fn items(&self) -> Vec<ShortlistItem> {
        self.items.lock().unwrap().clone()
    }

    pub fn output(&self) -> Option<RunOutput> {
        self.output.lock().unwrap().clone()
    }
}

#[async_trait]
impl OutputSink for MemorySink {
    async fn push_item(&self, item: &ShortlistItem) -> std::result::Result<(), ScoutError> {
        let mut items = self.items.lock().unwrap();
        if self.accept_items.is_some_and(|n| items.len() >= n) {
            return Err(ScoutError::Storage("no space left on device".into()));
        }
        items.push(item.clone());
        Ok(())
    }

    async fn set_output(&self, output: &RunOutput) -> std::result::Result<(), ScoutError> {
        *self.output.lock().unwrap() = Some(output.clone());
        Ok(())
    }

    async fn discard_items(&self) -> std::result::Result<(), ScoutError> {
        self.items.lock().unwrap().clear();
        Ok(())
    }
}
