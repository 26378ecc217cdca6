use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, instrument};

/// Failures surfaced by a fetch. Cancellation never produces one of these:
/// a superseded request is aborted and simply stops.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Something went wrong with the movie search")]
    Status(StatusCode),
    #[error("Something went wrong with the movie search")]
    Transport(#[from] reqwest::Error),
    #[error("{0}")]
    Application(String),
}

#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("popcornlist/0.1.0")
            .build()?;

        Ok(Self { client })
    }

    #[instrument(skip(self), fields(url = %redact(url)))]
    pub async fn get(&self, url: &url::Url) -> Result<Response, FetchError> {
        debug!("Making GET request");
        let response = self.client.get(url.clone()).send().await?;

        if !response.status().is_success() {
            error!("HTTP request failed with status: {}", response.status());
            return Err(FetchError::Status(response.status()));
        }

        Ok(response)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &url::Url) -> Result<T, FetchError> {
        let response = self.get(url).await?;
        let json = response.json::<T>().await?;
        Ok(json)
    }
}

/// Strips the query string so api keys stay out of the logs.
fn redact(url: &url::Url) -> String {
    let mut shown = url.clone();
    shown.set_query(None);
    shown.to_string()
}
