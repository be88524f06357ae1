//! Pipeline tests: scripted platform → Scout → in-memory sink.
//!
//! Each test scripts provider start outcomes, a status sequence and a
//! dataset, runs the orchestrator once, and asserts on the emitted items and
//! the terminal summary. Virtual clock, no network, no sleeping.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{json, Value};

use viral_scout::output::RunOutput;
use viral_scout::testing::{ManualClock, MemorySink, PlatformCall, ScriptedPlatform};
use viral_scout::{RunConfig, Scout, ScoutError};

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
}

fn hours_before_start(hours: i64) -> String {
    (start() - Duration::hours(hours)).to_rfc3339()
}

fn config(input: Value) -> RunConfig {
    RunConfig::reconcile(&input, start(), |_| None)
}

struct Harness {
    platform: Arc<ScriptedPlatform>,
    clock: Arc<ManualClock>,
    sink: Arc<MemorySink>,
}

impl Harness {
    fn new(platform: ScriptedPlatform) -> Self {
        Self::with_sink(platform, MemorySink::new())
    }

    fn with_sink(platform: ScriptedPlatform, sink: MemorySink) -> Self {
        let clock = Arc::new(ManualClock::new(start()));
        Self {
            platform: Arc::new(platform.with_clock(clock.clone())),
            clock,
            sink: Arc::new(sink),
        }
    }

    fn scout(&self) -> Scout {
        Scout::new(self.platform.clone(), self.clock.clone(), self.sink.clone())
    }
}

fn dataset() -> Vec<Value> {
    vec![
        json!({"title": "steady", "url": "https://y/1", "viewCount": 1000, "likes": 10, "commentCount": 1, "date": hours_before_start(10)}),
        json!({"title": "rocket", "id": "abc123", "views": "900", "likeCount": 300, "comments": 40, "publishedAt": hours_before_start(2)}),
        json!({"title": "ancient", "url": "https://y/3", "viewCount": 100000, "date": hours_before_start(200)}),
        json!({"title": "tiny", "url": "https://y/4", "viewCount": 3, "date": hours_before_start(1)}),
        json!({"title": "mystery-date", "url": "https://y/5", "viewCount": 50, "date": "not a date"}),
    ]
}

#[tokio::test]
async fn falls_back_polls_and_ranks() {
    let h = Harness::new(
        ScriptedPlatform::new()
            .on_start_err("streamers/youtube-scraper", "Actor not found")
            .on_start_ok("streamers/youtube-videos-scraper", "run-42")
            .with_statuses(&["READY", "RUNNING", "SUCCEEDED"], Some("ds-42"))
            .on_results("ds-42", dataset()),
    );
    let cfg = config(json!({
        "searchKeywords": "ai, microgreens",
        "topN": 3,
        "minViews": 10,
        "lastHours": 48
    }));

    let report = h.scout().run(&cfg).await.expect("run should succeed");

    assert_eq!(report.provider_id, "streamers/youtube-videos-scraper");
    assert_eq!(report.run_id, "run-42");
    assert_eq!(report.provider_failures.len(), 1);
    assert_eq!(report.polls, 3);
    assert_eq!(report.fetched, 5);

    let titles: Vec<String> = h.sink.items().iter().map(|i| i.title.clone()).collect();
    assert_eq!(titles, vec!["rocket", "steady", "mystery-date"]);

    let rocket = &h.sink.items()[0];
    assert_eq!(rocket.url, "https://www.youtube.com/watch?v=abc123");
    assert_eq!(rocket.views, 900.0);

    match h.sink.output().expect("summary written") {
        RunOutput::Success(summary) => {
            assert!(summary.ok);
            assert_eq!(summary.count, 3);
            assert_eq!(summary.top_n, 3);
            assert_eq!(summary.last_hours, 48);
            assert_eq!(summary.actor_id, "streamers/youtube-videos-scraper");
            assert_eq!(summary.items, h.sink.items());
            assert_eq!(summary.query["searchQueries"], json!(["ai", "microgreens"]));
        }
        other => panic!("expected success summary, got {other:?}"),
    }
}

#[tokio::test]
async fn dataset_limit_is_forwarded() {
    let h = Harness::new(
        ScriptedPlatform::new()
            .on_start_ok("me/actor", "run-1")
            .with_statuses(&["SUCCEEDED"], Some("ds-1"))
            .on_results("ds-1", dataset()),
    );
    let cfg = config(json!({"actorIds": ["me/actor"], "maxDatasetItems": 2, "lastHours": 500}));

    let report = h.scout().run(&cfg).await.unwrap();

    assert_eq!(report.fetched, 2);
    assert!(h.platform.calls().contains(&PlatformCall::List {
        dataset_id: "ds-1".into(),
        limit: 2
    }));
}

#[tokio::test]
async fn upstream_failure_writes_failure_summary_only() {
    let h = Harness::new(
        ScriptedPlatform::new()
            .on_start_ok("me/actor", "run-1")
            .with_statuses(&["RUNNING", "ABORTED"], Some("ds-1"))
            .with_status_message("Aborted by user")
            .on_results("ds-1", dataset()),
    );
    let cfg = config(json!({"actorIds": "me/actor"}));

    let err = h.scout().run(&cfg).await.unwrap_err();

    assert!(matches!(err, ScoutError::UpstreamJobFailure { .. }), "got {err:?}");
    assert!(h.sink.items().is_empty());
    match h.sink.output().expect("summary written") {
        RunOutput::Failure(failure) => {
            assert!(!failure.ok);
            assert_eq!(
                failure.error,
                "Upstream run ended with status: ABORTED. Message: Aborted by user"
            );
            assert!(!failure.hint.is_empty());
        }
        other => panic!("expected failure summary, got {other:?}"),
    }
    assert!(!h
        .platform
        .calls()
        .iter()
        .any(|c| matches!(c, PlatformCall::List { .. })));
}

#[tokio::test]
async fn storage_fault_leaves_no_partial_shortlist() {
    let h = Harness::with_sink(
        ScriptedPlatform::new()
            .on_start_ok("me/actor", "run-1")
            .with_statuses(&["SUCCEEDED"], Some("ds-1"))
            .on_results("ds-1", dataset()),
        MemorySink::new().accepting_items(1),
    );
    let cfg = config(json!({"actorIds": "me/actor", "minViews": 10, "lastHours": 48}));

    let err = h.scout().run(&cfg).await.unwrap_err();

    assert!(matches!(err, ScoutError::Storage(_)), "got {err:?}");
    assert!(h.sink.items().is_empty());
    match h.sink.output().expect("summary written") {
        RunOutput::Failure(failure) => assert!(failure.error.contains("no space left")),
        other => panic!("expected failure summary, got {other:?}"),
    }
}

#[tokio::test]
async fn polling_timeout_aborts() {
    let h = Harness::new(
        ScriptedPlatform::new()
            .on_start_ok("me/actor", "run-1")
            .with_statuses(&["RUNNING"], None),
    );
    let cfg = config(json!({"actorIds": "me/actor", "pollSeconds": 10, "pollTimeoutSeconds": 25}));

    let err = h.scout().run(&cfg).await.unwrap_err();

    assert!(matches!(err, ScoutError::PollingTimeout { .. }), "got {err:?}");
    assert_eq!(h.platform.status_count(), 3);
    for at in h.platform.status_times() {
        assert!(at - start() <= Duration::seconds(25));
    }
    match h.sink.output().unwrap() {
        RunOutput::Failure(failure) => assert_eq!(failure.error, "Polling timed out after 25s"),
        other => panic!("expected failure summary, got {other:?}"),
    }
}

#[tokio::test]
async fn every_provider_refusing_is_reported() {
    let h = Harness::new(
        ScriptedPlatform::new()
            .on_start_err("a/one", "unauthorized")
            .on_start_err("b/two", "monthly usage exceeded"),
    );
    let cfg = config(json!({"actorIds": ["a/one", "b/two"]}));

    let err = h.scout().run(&cfg).await.unwrap_err();

    match &err {
        ScoutError::ProviderExhausted { attempts, last_error } => {
            assert_eq!(attempts.len(), 2);
            assert!(last_error.contains("monthly usage exceeded"));
        }
        other => panic!("expected ProviderExhausted, got {other:?}"),
    }
    assert_eq!(h.platform.status_count(), 0);
    match h.sink.output().unwrap() {
        RunOutput::Failure(failure) => assert!(failure.error.contains("b/two")),
        other => panic!("expected failure summary, got {other:?}"),
    }
}

#[tokio::test]
async fn success_without_dataset_is_missing_artifact() {
    let h = Harness::new(
        ScriptedPlatform::new()
            .on_start_ok("me/actor", "run-1")
            .with_statuses(&["SUCCEEDED"], None),
    );
    let cfg = config(json!({"actorIds": "me/actor"}));

    let err = h.scout().run(&cfg).await.unwrap_err();

    assert!(matches!(err, ScoutError::MissingRunArtifact(_)), "got {err:?}");
    assert!(matches!(h.sink.output(), Some(RunOutput::Failure(_))));
}

#[tokio::test]
async fn nothing_fresh_enough_is_an_empty_success() {
    let h = Harness::new(
        ScriptedPlatform::new()
            .on_start_ok("me/actor", "run-1")
            .with_statuses(&["SUCCEEDED"], Some("ds-1"))
            .on_results(
                "ds-1",
                vec![json!({"title": "old", "viewCount": 10, "date": hours_before_start(100)})],
            ),
    );
    let cfg = config(json!({"actorIds": "me/actor", "uploadDate": 48}));

    let report = h.scout().run(&cfg).await.unwrap();

    assert!(report.shortlist.is_empty());
    match h.sink.output().unwrap() {
        RunOutput::Success(summary) => {
            assert_eq!(summary.count, 0);
            assert_eq!(summary.last_hours, 48);
        }
        other => panic!("expected success summary, got {other:?}"),
    }
}

#[tokio::test]
async fn job_receives_reconciled_input() {
    let h = Harness::new(
        ScriptedPlatform::new()
            .on_start_ok("me/actor", "run-1")
            .with_statuses(&["SUCCEEDED"], Some("ds-1"))
            .on_results("ds-1", vec![]),
    );
    let cfg = config(json!({
        "actorIds": "me/actor",
        "forwardInput": {"query": "kale", "maxResults": 10, "sortingOrder": "views"}
    }));

    h.scout().run(&cfg).await.unwrap();

    let params = h
        .platform
        .calls()
        .into_iter()
        .find_map(|c| match c {
            PlatformCall::Start { params, .. } => Some(params),
            _ => None,
        })
        .unwrap();
    assert_eq!(
        params,
        json!({
            "searchQueries": ["kale"],
            "maxResults": 10,
            "maxResultsShorts": 0,
            "maxResultStreams": 0,
            "sortingOrder": "views"
        })
    );
}
