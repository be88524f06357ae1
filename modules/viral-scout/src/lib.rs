pub mod config;
pub mod dates;
pub mod error;
pub mod fields;
pub mod launcher;
pub mod normalize;
pub mod output;
pub mod platform;
pub mod poller;
pub mod ranking;
pub mod scoring;
pub mod scout;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use config::{Credential, RunConfig};
pub use error::{Result, ScoutError};
pub use normalize::{normalize, CanonicalRecord};
pub use output::{LocalStorage, OutputSink, RunOutput, ShortlistItem};
pub use platform::{Clock, JobPlatform, RunSnapshot, SystemClock};
pub use ranking::{rank, RankOptions, ScoredRecord};
pub use scoring::{score, ScoreWeights};
pub use scout::{Scout, ScoutReport};
