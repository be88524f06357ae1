pub mod error;
pub mod types;

pub use error::{ApifyError, Endpoint, Result};
pub use types::RunData;

use serde::de::DeserializeOwned;
use types::ApiResponse;

const BASE_URL: &str = "https://api.apify.com/v2";

pub struct ApifyClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApifyClient {
    /// Client against the public Apify API. Without a token only public
    /// actors can be started.
    pub fn new(token: Option<String>) -> Self {
        Self::with_base_url(BASE_URL, token)
    }

    pub fn with_base_url(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Start an actor run. Returns immediately with run metadata.
    pub async fn start_actor(&self, actor_id: &str, input: &serde_json::Value) -> Result<RunData> {
        let url = format!("{}/acts/{}/runs", self.base_url, actor_path_id(actor_id));
        tracing::debug!(actor_id, "Starting actor run");

        let resp = self
            .authorized(self.client.post(&url))
            .json(input)
            .send()
            .await
            .map_err(|e| ApifyError::transport(Endpoint::StartRun, e))?;
        let api_resp: ApiResponse<RunData> = read_json(Endpoint::StartRun, resp).await?;
        Ok(api_resp.data)
    }

    /// Read the current state of a run once. Callers own the polling cadence.
    pub async fn get_run(&self, run_id: &str) -> Result<RunData> {
        let url = format!("{}/actor-runs/{}", self.base_url, run_id);
        let resp = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(|e| ApifyError::transport(Endpoint::GetRun, e))?;
        let api_resp: ApiResponse<RunData> = read_json(Endpoint::GetRun, resp).await?;
        Ok(api_resp.data)
    }

    /// Fetch up to `limit` cleaned dataset items from a completed run.
    pub async fn list_dataset_items<T: DeserializeOwned>(
        &self,
        dataset_id: &str,
        limit: u32,
    ) -> Result<Vec<T>> {
        let url = format!("{}/datasets/{}/items", self.base_url, dataset_id);
        let resp = self
            .authorized(self.client.get(&url))
            .query(&[
                ("clean", "true".to_string()),
                ("format", "json".to_string()),
                ("limit", limit.to_string()),
            ])
            .send()
            .await
            .map_err(|e| ApifyError::transport(Endpoint::DatasetItems, e))?;

        let items: Vec<T> = read_json(Endpoint::DatasetItems, resp).await?;
        tracing::debug!(dataset_id, count = items.len(), "Fetched dataset items");
        Ok(items)
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

/// `owner/name` actor ids travel as `owner~name` in API paths.
fn actor_path_id(actor_id: &str) -> String {
    actor_id.trim().replace('/', "~")
}

async fn read_json<T: DeserializeOwned>(endpoint: Endpoint, resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        tracing::debug!(%endpoint, status = status.as_u16(), "Apify API returned an error status");
        return Err(ApifyError::Status {
            endpoint,
            status: status.as_u16(),
            body,
        });
    }

    let body = resp
        .text()
        .await
        .map_err(|e| ApifyError::transport(endpoint, e))?;
    serde_json::from_str(&body).map_err(|e| ApifyError::decode(endpoint, e))
}
