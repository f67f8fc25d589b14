use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};

use crate::config::RemoteConfig;
use crate::error::{StoreError, StoreResult};
use crate::types::{NewScore, Score};

pub const SCORES_TABLE: &str = "scores";

pub trait RemoteScores: Send + Sync {
    fn insert(&self, rows: Vec<NewScore>) -> BoxFuture<'_, StoreResult<()>>;

    fn top(&self, limit: usize) -> BoxFuture<'_, StoreResult<Vec<Score>>>;
}

pub struct RestRemote {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl RestRemote {
    pub fn new(config: &RemoteConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/rest/v1/{SCORES_TABLE}", config.base_url),
            api_key: config.api_key.clone(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn auth_headers(&self) -> StoreResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&self.api_key).map_err(|_| StoreError::NotConfigured)?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|_| StoreError::NotConfigured)?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);
        Ok(headers)
    }

    async fn insert_rows(&self, rows: Vec<NewScore>) -> StoreResult<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .headers(self.auth_headers()?)
            .header("Prefer", "return=minimal")
            .json(&rows)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn fetch_top(&self, limit: usize) -> StoreResult<Vec<Score>> {
        let response = self
            .client
            .get(&self.endpoint)
            .headers(self.auth_headers()?)
            .query(&[
                ("select", "*".to_string()),
                ("order", "score.desc".to_string()),
                ("limit", limit.to_string()),
            ])
            .send()
            .await?;
        let response = ensure_success(response).await?;
        Ok(response.json::<Vec<Score>>().await?)
    }
}

impl RemoteScores for RestRemote {
    fn insert(&self, rows: Vec<NewScore>) -> BoxFuture<'_, StoreResult<()>> {
        self.insert_rows(rows).boxed()
    }

    fn top(&self, limit: usize) -> BoxFuture<'_, StoreResult<Vec<Score>>> {
        self.fetch_top(limit).boxed()
    }
}

async fn ensure_success(response: reqwest::Response) -> StoreResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Status {
        status: status.as_u16(),
        body,
    })
}
