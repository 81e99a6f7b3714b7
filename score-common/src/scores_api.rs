use crate::match_snapshot::MatchSnapshot;
use log::{debug, warn};
use reqwest::{Client, ClientBuilder};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("server responded with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed match data: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Client for the score tracker's match API.
///
/// No request timeout is set, a request that never completes simply never resolves.
#[derive(Debug, Clone)]
pub struct ScoresApiClient {
    base_url: String,
    client: Client,
}

impl ScoresApiClient {
    pub fn new(
        base_url: &str,
        require_https: bool,
        connect_timeout: Option<Duration>,
    ) -> Result<Self, ApiError> {
        let mut builder = ClientBuilder::new().https_only(require_https);
        if let Some(timeout) = connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        let client = builder.build()?;

        let base_url = base_url.trim_end_matches('/').to_string();

        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn match_url(&self, match_id: &str) -> String {
        format!("{}/api/matches/{match_id}", self.base_url)
    }

    pub fn get_match(
        &self,
        match_id: &str,
    ) -> impl std::future::Future<Output = Result<MatchSnapshot, ApiError>> + use<> {
        let url = self.match_url(match_id);
        let request = self.client.get(&url).send();

        async move {
            let response = request.await?;

            if response.status().is_success() {
                let body = response.text().await?;
                debug!("Got match data from {url}");
                Ok(serde_json::from_str(&body)?)
            } else {
                warn!("Get match from {url} failed, response: {response:?}");
                let status = response.status().as_u16();
                let body = response.text().await?;
                Err(ApiError::Status { status, body })
            }
        }
    }
}
