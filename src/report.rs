use std::path::Path;

use anyhow::Context as _;
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Serialize;

use crate::cli::PinnedPolicy;
use crate::config::FetchConfig;
use crate::digest::{Digest, StopReason};
use crate::topic::TopicRecord;

#[derive(Debug, Serialize)]
pub struct Parameters<'a> {
    pub base_url: &'a str,
    pub category_slug: &'a str,
    pub category_id: u64,
    pub tag: Option<&'a str>,
    pub days: u32,
    pub pinned: PinnedPolicy,
}

#[derive(Debug, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// The document written by the latest-topics digest.
#[derive(Debug, Serialize)]
pub struct DigestReport<'a> {
    pub fetched_at: DateTime<FixedOffset>,
    pub parameters: Parameters<'a>,
    pub date_range: DateRange,
    pub complete: bool,
    pub stop_reason: StopReason,
    pub pages_fetched: u32,
    pub total: usize,
    pub topics: &'a [TopicRecord],
}

impl<'a> DigestReport<'a> {
    pub fn new(
        config: &'a FetchConfig,
        digest: &'a Digest,
        fetched_at: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            fetched_at,
            parameters: Parameters {
                base_url: config.base_url.as_str(),
                category_slug: &config.category_slug,
                category_id: config.category_id,
                tag: config.tag.as_deref(),
                days: config.days,
                pinned: config.pinned,
            },
            date_range: DateRange {
                start: digest.window.start,
                end: digest.window.end,
            },
            complete: digest.is_complete(),
            stop_reason: digest.stop_reason,
            pages_fetched: digest.pages_fetched,
            total: digest.topics.len(),
            topics: &digest.topics,
        }
    }
}

/// Pretty-prints `value` to `path`, creating parent directories.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
    }
    let mut bytes = serde_json::to_vec_pretty(value).context("serialize output")?;
    bytes.push(b'\n');
    std::fs::write(path, bytes).with_context(|| format!("write {}", path.display()))
}
