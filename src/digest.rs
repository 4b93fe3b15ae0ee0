//! Paging over a category's latest topics, newest first, until the date window is left behind.

use serde::Serialize;
use url::Url;

use crate::cli::PinnedPolicy;
use crate::config::FetchConfig;
use crate::fetcher::Fetcher;
use crate::progress::Progress;
use crate::topic::{Topic, TopicListResponse, TopicRecord};
use crate::window::{DateWindow, civil_date};

/// One page of topics, in server order. An empty page means the listing is exhausted.
#[allow(async_fn_in_trait)]
pub trait PageSource {
    async fn fetch_page(&self, page: u32) -> anyhow::Result<Vec<Topic>>;
}

/// `latest.json` of one category over HTTP.
pub struct LatestTopics<'a> {
    fetcher: &'a Fetcher,
    config: &'a FetchConfig,
}

impl<'a> LatestTopics<'a> {
    pub fn new(fetcher: &'a Fetcher, config: &'a FetchConfig) -> Self {
        Self { fetcher, config }
    }
}

impl PageSource for LatestTopics<'_> {
    async fn fetch_page(&self, page: u32) -> anyhow::Result<Vec<Topic>> {
        let url = self.config.latest_url(page)?;
        tracing::debug!(%url, page, "fetching latest topics");
        let resp: TopicListResponse = self.fetcher.get_json(url).await?;
        Ok(resp.topic_list.topics)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// A page came back empty.
    Exhausted,
    /// A non-pinned topic older than the window was seen.
    ReachedOlder,
    /// The configured page limit was hit.
    PageLimit,
    /// A page could not be fetched or decoded.
    Failed,
}

#[derive(Debug)]
pub struct Digest {
    pub window: DateWindow,
    /// Sorted by `created_at`, newest first.
    pub topics: Vec<TopicRecord>,
    pub pages_fetched: u32,
    pub stop_reason: StopReason,
    /// Set when paging was cut short by a failed page; `topics` holds what came before it.
    pub error: Option<anyhow::Error>,
}

impl Digest {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Default)]
struct PageScan {
    kept: Vec<TopicRecord>,
    found_older: bool,
    pinned: usize,
}

fn scan_page(
    topics: &[Topic],
    window: &DateWindow,
    policy: PinnedPolicy,
    base_url: &Url,
) -> PageScan {
    let mut scan = PageScan::default();

    for topic in topics {
        let created = civil_date(&topic.created_at);

        if topic.is_pinned() {
            scan.pinned += 1;
            if policy == PinnedPolicy::Include && window.contains(created) {
                scan.kept.push(TopicRecord::from_topic(topic, base_url));
            }
            continue;
        }

        if window.is_before_start(created) {
            tracing::debug!(id = topic.id, %created, "older than window; stopping");
            scan.found_older = true;
            break;
        }

        if window.contains(created) {
            scan.kept.push(TopicRecord::from_topic(topic, base_url));
        }
    }

    scan
}

/// Walks pages 0, 1, 2, ... of `source` and keeps the topics created inside `window`.
///
/// Paging stops at the first empty page, after the page holding the first non-pinned topic
/// older than the window, at `max_pages`, or at the first failed page. A failure does not
/// discard what was gathered before it.
pub async fn collect<S: PageSource>(
    source: &S,
    config: &FetchConfig,
    window: DateWindow,
    progress: Option<&Progress>,
) -> Digest {
    let mut topics = Vec::new();
    let mut page = 0u32;
    let mut pages_fetched = 0u32;
    let mut error = None;

    let stop_reason = loop {
        let batch = match source.fetch_page(page).await {
            Ok(batch) => batch,
            Err(e) => {
                tracing::error!(page, error = %format!("{e:#}"), "failed to fetch page");
                error = Some(e);
                break StopReason::Failed;
            }
        };
        pages_fetched += 1;

        if batch.is_empty() {
            tracing::info!(page, "no more topics");
            break StopReason::Exhausted;
        }

        let scan = scan_page(&batch, &window, config.pinned, &config.base_url);
        tracing::info!(
            page,
            seen = batch.len(),
            kept = scan.kept.len(),
            pinned = scan.pinned,
            "scanned page"
        );
        if let Some(p) = progress {
            p.page_done(page, batch.len(), scan.kept.len(), scan.pinned);
        }
        topics.extend(scan.kept);

        if scan.found_older {
            break StopReason::ReachedOlder;
        }
        if config.max_pages.is_some_and(|max| pages_fetched >= max) {
            tracing::warn!(pages_fetched, "page limit reached before leaving the window");
            break StopReason::PageLimit;
        }

        page += 1;
        if !config.page_delay.is_zero() {
            tokio::time::sleep(config.page_delay).await;
        }
    };

    topics.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Digest {
        window,
        topics,
        pages_fetched,
        stop_reason,
        error,
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::time::Duration;

    use chrono::{DateTime, Utc};
    use tokio::time::Instant;

    use super::*;

    struct Pages {
        pages: Vec<anyhow::Result<Vec<Topic>>>,
        requested: RefCell<Vec<u32>>,
        fetched_at: RefCell<Vec<Instant>>,
    }

    impl Pages {
        fn new(pages: Vec<anyhow::Result<Vec<Topic>>>) -> Self {
            Self {
                pages,
                requested: RefCell::new(Vec::new()),
                fetched_at: RefCell::new(Vec::new()),
            }
        }
    }

    impl PageSource for Pages {
        async fn fetch_page(&self, page: u32) -> anyhow::Result<Vec<Topic>> {
            self.requested.borrow_mut().push(page);
            self.fetched_at.borrow_mut().push(Instant::now());
            match self.pages.get(page as usize) {
                Some(Ok(topics)) => Ok(topics.clone()),
                Some(Err(e)) => Err(anyhow::anyhow!("{e}")),
                None => Ok(Vec::new()),
            }
        }
    }

    fn topic(id: u64, created_at: &str, pinned: bool) -> Topic {
        let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(created_at)
            .unwrap()
            .with_timezone(&Utc);
        serde_json::from_value(serde_json::json!({
            "id": id,
            "title": format!("topic {id}"),
            "slug": format!("topic-{id}"),
            "created_at": created_at,
            "pinned": pinned,
        }))
        .unwrap()
    }

    fn config(pinned: PinnedPolicy) -> FetchConfig {
        FetchConfig {
            base_url: Url::parse("https://forum.example.com").unwrap(),
            category_slug: "welfare".to_string(),
            category_id: 36,
            tag: None,
            days: 3,
            pinned,
            page_delay: Duration::ZERO,
            max_pages: None,
        }
    }

    fn window() -> DateWindow {
        let now = DateTime::parse_from_rfc3339("2025-01-17T10:00:00+08:00").unwrap();
        DateWindow::ending_at(&now, 3).unwrap()
    }

    fn ids(digest: &Digest) -> Vec<u64> {
        digest.topics.iter().map(|t| t.id).collect()
    }

    #[tokio::test]
    async fn older_topic_stops_paging_and_is_excluded() {
        let source = Pages::new(vec![
            Ok(vec![
                topic(3, "2025-01-17T09:00:00+08:00", false),
                topic(2, "2025-01-15T00:00:01+08:00", false),
            ]),
            Ok(vec![
                topic(1, "2025-01-14T23:59:00+08:00", false),
                topic(0, "2025-01-16T12:00:00+08:00", false),
            ]),
            Ok(vec![topic(9, "2025-01-16T12:00:00+08:00", false)]),
        ]);

        let digest = collect(&source, &config(PinnedPolicy::Skip), window(), None).await;

        assert_eq!(digest.stop_reason, StopReason::ReachedOlder);
        assert_eq!(ids(&digest), [3, 2]);
        assert_eq!(digest.pages_fetched, 2);
        assert_eq!(*source.requested.borrow(), [0, 1]);
        assert!(digest.is_complete());
    }

    #[tokio::test]
    async fn old_pinned_topic_never_stops_paging() {
        let source = Pages::new(vec![
            Ok(vec![
                topic(100, "2020-01-01T00:00:00+08:00", true),
                topic(5, "2025-01-17T08:00:00+08:00", false),
            ]),
            Ok(vec![topic(4, "2025-01-16T08:00:00+08:00", false)]),
        ]);

        let digest = collect(&source, &config(PinnedPolicy::Include), window(), None).await;

        assert_eq!(digest.stop_reason, StopReason::Exhausted);
        assert_eq!(ids(&digest), [5, 4]);
        assert_eq!(*source.requested.borrow(), [0, 1, 2]);
    }

    #[tokio::test]
    async fn pinned_policy_decides_inclusion_of_in_window_pinned_topics() {
        let pages = || {
            vec![Ok(vec![
                topic(10, "2025-01-16T08:00:00+08:00", true),
                topic(11, "2025-01-17T08:00:00+08:00", false),
            ])]
        };

        let skipped =
            collect(&Pages::new(pages()), &config(PinnedPolicy::Skip), window(), None).await;
        assert_eq!(ids(&skipped), [11]);

        let included =
            collect(&Pages::new(pages()), &config(PinnedPolicy::Include), window(), None).await;
        assert_eq!(ids(&included), [11, 10]);
        assert!(included.topics[1].pinned);
    }

    #[tokio::test]
    async fn empty_first_page_returns_nothing() {
        let source = Pages::new(vec![]);
        let digest = collect(&source, &config(PinnedPolicy::Skip), window(), None).await;
        assert_eq!(digest.stop_reason, StopReason::Exhausted);
        assert!(digest.topics.is_empty());
        assert_eq!(digest.pages_fetched, 1);
    }

    #[tokio::test]
    async fn failed_page_keeps_earlier_results() {
        let source = Pages::new(vec![
            Ok(vec![
                topic(1, "2025-01-15T10:00:00+08:00", false),
                topic(2, "2025-01-17T10:00:00+08:00", false),
            ]),
            Err(anyhow::anyhow!("GET page 1 failed with status 502")),
        ]);

        let digest = collect(&source, &config(PinnedPolicy::Skip), window(), None).await;

        assert_eq!(digest.stop_reason, StopReason::Failed);
        assert!(!digest.is_complete());
        assert_eq!(digest.pages_fetched, 1);
        assert_eq!(ids(&digest), [2, 1]);
    }

    #[tokio::test]
    async fn results_are_sorted_newest_first_across_pages() {
        let source = Pages::new(vec![
            Ok(vec![
                topic(1, "2025-01-15T10:00:00+08:00", false),
                topic(2, "2025-01-17T01:00:00+08:00", false),
            ]),
            Ok(vec![
                topic(3, "2025-01-16T10:00:00+08:00", false),
                topic(4, "2025-01-17T09:00:00+08:00", false),
            ]),
        ]);

        let digest = collect(&source, &config(PinnedPolicy::Skip), window(), None).await;

        assert_eq!(ids(&digest), [4, 2, 3, 1]);
        assert!(
            digest
                .topics
                .windows(2)
                .all(|w| w[0].created_at >= w[1].created_at)
        );
    }

    #[tokio::test]
    async fn page_limit_stops_early() {
        let source = Pages::new(vec![
            Ok(vec![topic(1, "2025-01-17T10:00:00+08:00", false)]),
            Ok(vec![topic(2, "2025-01-16T10:00:00+08:00", false)]),
        ]);
        let mut cfg = config(PinnedPolicy::Skip);
        cfg.max_pages = Some(1);

        let digest = collect(&source, &cfg, window(), None).await;

        assert_eq!(digest.stop_reason, StopReason::PageLimit);
        assert_eq!(ids(&digest), [1]);
        assert_eq!(*source.requested.borrow(), [0]);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_between_pages_but_not_after_the_last() {
        let source = Pages::new(vec![
            Ok(vec![topic(2, "2025-01-17T10:00:00+08:00", false)]),
            Ok(vec![
                topic(1, "2025-01-16T10:00:00+08:00", false),
                topic(0, "2025-01-10T10:00:00+08:00", false),
            ]),
        ]);
        let mut cfg = config(PinnedPolicy::Skip);
        cfg.page_delay = Duration::from_secs(5);

        let started = Instant::now();
        let digest = collect(&source, &cfg, window(), None).await;
        let elapsed = started.elapsed();

        assert_eq!(digest.stop_reason, StopReason::ReachedOlder);
        let fetched_at = source.fetched_at.borrow();
        assert_eq!(fetched_at.len(), 2);
        assert_eq!(fetched_at[1] - fetched_at[0], Duration::from_secs(5));
        assert_eq!(elapsed, Duration::from_secs(5));
    }

    #[test]
    fn scan_breaks_at_first_older_topic() {
        let base = Url::parse("https://forum.example.com").unwrap();
        let topics = [
            topic(1, "2025-01-14T23:59:00+08:00", false),
            topic(2, "2025-01-16T00:00:00+08:00", false),
        ];
        let scan = scan_page(&topics, &window(), PinnedPolicy::Skip, &base);
        assert!(scan.found_older);
        assert!(scan.kept.is_empty());
    }
}
