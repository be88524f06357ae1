use std::fmt;
use std::sync::Arc;

use tracing::{error, info};

use crate::config::RunConfig;
use crate::error::{Result, ScoutError};
use crate::launcher::{launch, Launch, ProviderFailure};
use crate::normalize::normalize;
use crate::output::{OutputSink, RunFailure, RunOutput, RunSuccess, ShortlistItem};
use crate::platform::{Clock, JobPlatform};
use crate::poller::RunPoller;
use crate::ranking::{rank, ScoredRecord};

/// What one successful run did.
#[derive(Debug, Clone)]
pub struct ScoutReport {
    pub provider_id: String,
    pub run_id: String,
    pub provider_failures: Vec<ProviderFailure>,
    pub polls: u32,
    pub fetched: usize,
    pub shortlist: Vec<ScoredRecord>,
}

impl fmt::Display for ScoutReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "actor={} run={} skipped_providers={} polls={} fetched={} shortlisted={}",
            self.provider_id,
            self.run_id,
            self.provider_failures.len(),
            self.polls,
            self.fetched,
            self.shortlist.len()
        )
    }
}

/// Runs the pipeline: launch → poll → fetch → normalize → rank → emit.
pub struct Scout {
    platform: Arc<dyn JobPlatform>,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn OutputSink>,
}

impl Scout {
    pub fn new(
        platform: Arc<dyn JobPlatform>,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn OutputSink>,
    ) -> Self {
        Self {
            platform,
            clock,
            sink,
        }
    }

    /// Run once. On any failure items already emitted are discarded and a
    /// failure summary is written instead of a shortlist; the error is still
    /// returned to the caller.
    pub async fn run(&self, config: &RunConfig) -> Result<ScoutReport> {
        match self.execute(config).await {
            Ok(report) => {
                info!("Scout run complete. {report}");
                Ok(report)
            }
            Err(err) => {
                error!(error = %err, "Scout run failed");
                if let Err(discard_err) = self.sink.discard_items().await {
                    error!(error = %discard_err, "Failed to discard emitted items");
                }
                let summary = RunOutput::Failure(RunFailure::from_error(&err));
                if let Err(write_err) = self.sink.set_output(&summary).await {
                    error!(error = %write_err, "Failed to record failure summary");
                }
                Err(err)
            }
        }
    }

    async fn execute(&self, config: &RunConfig) -> Result<ScoutReport> {
        config.log_redacted();
        let params = config.job_input();

        let Launch {
            provider_id,
            mut handle,
            failures,
        } = launch(self.platform.as_ref(), &config.providers, &params).await?;

        let poller = RunPoller::new(
            self.platform.as_ref(),
            self.clock.as_ref(),
            config.poll_settings(),
        );
        let polls = poller.poll_until_terminal(&mut handle).await?;

        let dataset_id = handle
            .dataset_id
            .clone()
            .ok_or(ScoutError::MissingRunArtifact("defaultDatasetId on the finished run"))?;

        info!(dataset_id = dataset_id.as_str(), limit = config.max_dataset_items, "Fetching dataset items");
        let raw = self
            .platform
            .list_results(&dataset_id, config.max_dataset_items)
            .await?;
        info!(count = raw.len(), "Dataset items received");

        let now = self.clock.now();
        let shortlist = rank(
            raw.iter().map(|item| normalize(item, now)),
            &config.rank_options(),
        );

        let run_date = self.clock.now();
        let items: Vec<ShortlistItem> = shortlist
            .iter()
            .map(|scored| ShortlistItem::new(scored, run_date))
            .collect();
        for item in &items {
            self.sink.push_item(item).await?;
        }
        self.sink
            .set_output(&RunOutput::Success(RunSuccess {
                ok: true,
                count: items.len(),
                top_n: config.top_n,
                last_hours: config.last_hours,
                items,
                actor_id: provider_id.clone(),
                run_id: handle.run_id.clone(),
                query: params,
            }))
            .await?;

        Ok(ScoutReport {
            provider_id,
            run_id: handle.run_id,
            provider_failures: failures,
            polls,
            fetched: raw.len(),
            shortlist,
        })
    }
}
