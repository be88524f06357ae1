use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::{Result, ScoutError};
use crate::platform::{Clock, JobPlatform};

/// Upstream statuses that end a run successfully.
const SUCCESS_STATUSES: &[&str] = &["SUCCEEDED", "FINISHED", "SUCCEED"];

/// Upstream statuses that end a run in failure.
const FAILURE_STATUSES: &[&str] = &["FAILED", "ABORTED", "TIMED-OUT", "TIMED_OUT"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Any non-terminal upstream status (READY, RUNNING, unknown strings).
    Running,
    Succeeded,
    Failed,
}

impl RunState {
    pub fn classify(status: &str) -> Self {
        let status = status.trim();
        if SUCCESS_STATUSES.iter().any(|s| s.eq_ignore_ascii_case(status)) {
            RunState::Succeeded
        } else if FAILURE_STATUSES.iter().any(|s| s.eq_ignore_ascii_case(status)) {
            RunState::Failed
        } else {
            RunState::Running
        }
    }

    pub fn is_terminal(self) -> bool {
        self != RunState::Running
    }
}

/// One remote run. Created by the launcher, advanced only by [`RunPoller`].
#[derive(Debug, Clone, PartialEq)]
pub struct RunHandle {
    pub run_id: String,
    /// Set once the run reaches a successful terminal state.
    pub dataset_id: Option<String>,
    pub state: RunState,
}

impl RunHandle {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            dataset_id: None,
            state: RunState::Running,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollSettings {
    pub interval: Duration,
    pub timeout: Duration,
}

pub struct RunPoller<'a> {
    platform: &'a dyn JobPlatform,
    clock: &'a dyn Clock,
    settings: PollSettings,
}

impl<'a> RunPoller<'a> {
    pub fn new(platform: &'a dyn JobPlatform, clock: &'a dyn Clock, settings: PollSettings) -> Self {
        Self {
            platform,
            clock,
            settings,
        }
    }

    /// Poll until the run is terminal or the timeout passes. Returns the
    /// number of status reads performed. No status read is issued once the
    /// elapsed time exceeds the timeout.
    pub async fn poll_until_terminal(&self, handle: &mut RunHandle) -> Result<u32> {
        let started = self.clock.now();
        let mut polls = 0u32;

        loop {
            let snapshot = self.platform.get_status(&handle.run_id).await?;
            polls += 1;

            let status = snapshot.status.clone().unwrap_or_default();
            debug!(run_id = handle.run_id.as_str(), status = status.as_str(), polls, "Run status");

            match RunState::classify(&status) {
                RunState::Succeeded => {
                    handle.state = RunState::Succeeded;
                    handle.dataset_id = snapshot.dataset_id.filter(|id| !id.trim().is_empty());
                    info!(run_id = handle.run_id.as_str(), polls, "Run succeeded");
                    return Ok(polls);
                }
                RunState::Failed => {
                    handle.state = RunState::Failed;
                    return Err(ScoutError::UpstreamJobFailure {
                        status,
                        message: snapshot
                            .status_message
                            .unwrap_or_else(|| "no statusMessage".to_string()),
                    });
                }
                RunState::Running => {}
            }

            if self.past_deadline(started) {
                return Err(self.timed_out());
            }
            self.clock.sleep(self.settings.interval).await;
            if self.past_deadline(started) {
                return Err(self.timed_out());
            }
        }
    }

    fn past_deadline(&self, started: DateTime<Utc>) -> bool {
        let elapsed = (self.clock.now() - started).to_std().unwrap_or(Duration::ZERO);
        elapsed > self.settings.timeout
    }

    fn timed_out(&self) -> ScoutError {
        ScoutError::PollingTimeout {
            timeout: self.settings.timeout,
        }
    }
}
