use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, anyhow};
use bytes::Bytes;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, RETRY_AFTER};
use serde::de::DeserializeOwned;
use url::Url;

use crate::progress::Progress;

const ACCEPT_JSON: &str = "application/json, text/javascript, */*; q=0.01";
const ACCEPT_LANG: &str = "zh-CN,zh;q=0.9,en;q=0.8";

/// Sequential JSON client. One request at a time; `max_attempts` of 1 means no retry.
#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    max_attempts: usize,
    progress: Option<Arc<Progress>>,
}

impl Fetcher {
    pub fn new(
        user_agent: &str,
        max_attempts: usize,
        progress: Option<Arc<Progress>>,
    ) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_JSON));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANG));

        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("build reqwest client")?;
        Ok(Self {
            client,
            max_attempts: max_attempts.max(1),
            progress,
        })
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: Url) -> anyhow::Result<T> {
        let bytes = self.get_bytes(url.clone()).await?;
        serde_json::from_slice(&bytes).with_context(|| format!("decode JSON from {}", url))
    }

    pub async fn get_bytes(&self, url: Url) -> anyhow::Result<Bytes> {
        if let Some(p) = &self.progress {
            p.http_start(&url);
        }
        let res = self.get_bytes_inner(&url).await;
        if let Some(p) = &self.progress {
            match &res {
                Ok(bytes) => p.http_ok(&url, bytes.len()),
                Err(_) => p.http_err(&url),
            }
        }
        res
    }

    async fn get_bytes_inner(&self, url: &Url) -> anyhow::Result<Bytes> {
        let mut backoff = Duration::from_millis(250);

        for attempt in 1..=self.max_attempts {
            let resp = self
                .client
                .get(url.clone())
                .send()
                .await
                .with_context(|| format!("GET {}", url))?;

            let status = resp.status();
            let headers = resp.headers().clone();

            if status.is_success() {
                return resp.bytes().await.context("read response body");
            }

            let retryable = status.as_u16() == 429 || status.as_u16() == 503;
            if retryable && attempt < self.max_attempts {
                let wait = retry_after_duration(&headers).unwrap_or(backoff);
                tracing::warn!(
                    %status,
                    attempt,
                    wait_ms = wait.as_millis(),
                    "throttled; backing off"
                );
                if let Some(p) = &self.progress {
                    p.http_throttled(url, status.as_u16(), wait);
                }
                tokio::time::sleep(wait).await;
                backoff = (backoff * 2).min(Duration::from_secs(10));
                continue;
            }

            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!(
                "GET {} failed with status {}: {}",
                url,
                status,
                body.trim()
            ));
        }

        Err(anyhow!("GET {} failed after {} attempts", url, self.max_attempts))
    }
}

fn retry_after_duration(headers: &HeaderMap) -> Option<Duration> {
    let v = headers.get(RETRY_AFTER)?;
    let s = v.to_str().ok()?.trim();
    let seconds: u64 = s.parse().ok()?;
    Some(Duration::from_secs(seconds))
}
