//! Timed, retried HTTP fetches. Every outbound call in the crate goes through here.

use super::error::FetchError;
use anyhow::Result;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Deadline for a single attempt.
    pub timeout: Duration,
    /// Retry attempts after the first one (total runs = 1 + retries).
    pub retries: usize,
    /// Delay before the first retry; doubled on each following retry.
    pub backoff: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        FetchOptions {
            timeout: Duration::from_secs(10),
            retries: 3,
            backoff: Duration::from_millis(100),
        }
    }
}

pub struct FetchClient {
    client: Client,
    options: FetchOptions,
}

impl FetchClient {
    pub fn new(options: FetchOptions) -> Result<Self> {
        let client = Client::builder().user_agent("quotesync/1.0").build()?;
        Ok(FetchClient { client, options })
    }

    /// GETs `url` and decodes the JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        self.send_json(url, |client| client.get(url)).await
    }

    /// Sends the request produced by `build` and decodes the JSON body.
    ///
    /// `build` is invoked once per attempt. Each attempt races the request against
    /// the configured timeout; a request that loses the race is dropped, so the
    /// remote side may still have completed it.
    pub async fn send_json<T, F>(&self, url: &str, build: F) -> Result<T, FetchError>
    where
        T: DeserializeOwned,
        F: Fn(&Client) -> RequestBuilder,
    {
        let body = with_retry(
            || self.attempt(url, &build),
            self.options.retries,
            self.options.backoff,
        )
        .await?;

        serde_json::from_str(&body).map_err(|e| FetchError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    async fn attempt<F>(&self, url: &str, build: &F) -> Result<String, FetchError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let request = async {
            let response = build(&self.client)
                .send()
                .await
                .map_err(|source| FetchError::Transport {
                    url: url.to_string(),
                    source,
                })?;

            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status,
                });
            }

            response.text().await.map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })
        };

        match tokio::time::timeout(self.options.timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout {
                url: url.to_string(),
                after: self.options.timeout,
            }),
        }
    }
}

/// Retries an async operation with exponential backoff.
///
/// Only errors classified as retryable are retried; anything else is returned
/// immediately.
///
/// # Parameters
/// - `operation`: Closure returning a future
/// - `retries`: Number of retry attempts (total runs = 1 initial + retries)
/// - `backoff`: Delay before the first retry, doubled for each later one
pub async fn with_retry<F, Fut, T>(
    mut operation: F,
    retries: usize,
    backoff: Duration,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(err) => {
                if !err.is_retryable() || attempt > retries {
                    return Err(err);
                }
                let delay = backoff * 2u32.saturating_pow(attempt as u32 - 1);
                debug!(
                    "Attempt {}/{} failed: {}. Retrying in {:?}...",
                    attempt,
                    retries + 1,
                    err,
                    delay
                );
                attempt += 1;
                tokio::time::sleep(delay).await;
            }
        }
    }
}
