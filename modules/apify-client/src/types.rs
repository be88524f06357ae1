use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Wrapper for Apify API responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

/// Apify actor run metadata.
///
/// Every field is optional: the platform omits `defaultDatasetId` on some
/// early responses, and callers decide which absences are fatal.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunData {
    pub id: Option<String>,
    #[serde(rename = "actId")]
    pub act_id: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "statusMessage")]
    pub status_message: Option<String>,
    #[serde(rename = "defaultDatasetId")]
    pub default_dataset_id: Option<String>,
    #[serde(rename = "startedAt")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(rename = "finishedAt")]
    pub finished_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_data_tolerates_missing_fields() {
        let resp: ApiResponse<RunData> =
            serde_json::from_str(r#"{"data": {"id": "run-1", "status": "READY"}}"#).unwrap();
        assert_eq!(resp.data.id.as_deref(), Some("run-1"));
        assert_eq!(resp.data.status.as_deref(), Some("READY"));
        assert!(resp.data.default_dataset_id.is_none());
        assert!(resp.data.finished_at.is_none());
    }

    #[test]
    fn run_data_reads_finished_run() {
        let json = r#"{"data": {
            "id": "run-2",
            "actId": "act-9",
            "status": "SUCCEEDED",
            "statusMessage": "Done",
            "defaultDatasetId": "ds-7",
            "startedAt": "2025-03-01T10:00:00.000Z",
            "finishedAt": "2025-03-01T10:04:30.000Z"
        }}"#;
        let run = serde_json::from_str::<ApiResponse<RunData>>(json).unwrap().data;
        assert_eq!(run.default_dataset_id.as_deref(), Some("ds-7"));
        assert_eq!(run.status_message.as_deref(), Some("Done"));
        let elapsed = run.finished_at.unwrap() - run.started_at.unwrap();
        assert_eq!(elapsed.num_seconds(), 270);
    }
}
