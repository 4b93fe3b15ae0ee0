use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use indicatif::{
    HumanBytes, HumanDuration, MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle,
};
use url::Url;

pub struct Progress {
    enabled: bool,
    start: Instant,

    // UI
    mp: Option<MultiProgress>,
    stage: ProgressBar,
    counters: ProgressBar,

    // Counters
    pages: AtomicU64,
    topics_seen: AtomicU64,
    topics_kept: AtomicU64,
    pinned_seen: AtomicU64,

    http_in_flight: AtomicU64,
    http_done: AtomicU64,
    http_failed: AtomicU64,
    http_bytes: AtomicU64,

    last_http_label: Mutex<String>,
}

impl Progress {
    pub fn new(enabled: bool) -> Arc<Self> {
        let start = Instant::now();

        let (mp, stage, counters) = if enabled {
            let mp = MultiProgress::with_draw_target(ProgressDrawTarget::stderr());

            let stage = mp.add(ProgressBar::new_spinner());
            stage.set_style(
                ProgressStyle::with_template("{spinner} {msg}  [{elapsed_precise}]").unwrap(),
            );
            stage.enable_steady_tick(Duration::from_millis(80));
            stage.set_message("准备开始");

            let counters = mp.add(ProgressBar::new_spinner());
            counters.set_style(ProgressStyle::with_template("{spinner} {msg}").unwrap());
            counters.enable_steady_tick(Duration::from_millis(120));

            (Some(mp), stage, counters)
        } else {
            (None, ProgressBar::hidden(), ProgressBar::hidden())
        };

        Arc::new(Self {
            enabled,
            start,
            mp,
            stage,
            counters,
            pages: AtomicU64::new(0),
            topics_seen: AtomicU64::new(0),
            topics_kept: AtomicU64::new(0),
            pinned_seen: AtomicU64::new(0),
            http_in_flight: AtomicU64::new(0),
            http_done: AtomicU64::new(0),
            http_failed: AtomicU64::new(0),
            http_bytes: AtomicU64::new(0),
            last_http_label: Mutex::new(String::new()),
        })
    }

    pub fn set_stage(&self, msg: impl Into<String>) {
        if !self.enabled {
            return;
        }
        self.stage.set_message(msg.into());
    }

    pub fn page_done(&self, page: u32, seen: usize, kept: usize, pinned: usize) {
        self.pages.fetch_add(1, Ordering::Relaxed);
        self.topics_seen.fetch_add(seen as u64, Ordering::Relaxed);
        self.topics_kept.fetch_add(kept as u64, Ordering::Relaxed);
        self.pinned_seen.fetch_add(pinned as u64, Ordering::Relaxed);
        if self.enabled {
            self.set_stage(format!("已扫描第 {page} 页"));
            self.refresh();
        }
    }

    pub fn http_start(&self, url: &Url) {
        self.http_in_flight.fetch_add(1, Ordering::Relaxed);
        if self.enabled {
            if let Ok(mut last) = self.last_http_label.lock() {
                *last = format!("GET {}", url);
            }
            self.refresh();
        }
    }

    pub fn http_throttled(&self, url: &Url, status: u16, wait: Duration) {
        if !self.enabled {
            return;
        }
        if let Ok(mut last) = self.last_http_label.lock() {
            *last = format!("GET {} throttled {} wait {}ms", url, status, wait.as_millis());
        }
        self.refresh();
    }

    pub fn http_ok(&self, url: &Url, bytes: usize) {
        self.http_in_flight.fetch_sub(1, Ordering::Relaxed);
        self.http_done.fetch_add(1, Ordering::Relaxed);
        self.http_bytes.fetch_add(bytes as u64, Ordering::Relaxed);
        if self.enabled {
            if let Ok(mut last) = self.last_http_label.lock() {
                *last = format!("GET {} ok {}B", url, bytes);
            }
            self.refresh();
        }
    }

    pub fn http_err(&self, url: &Url) {
        self.http_in_flight.fetch_sub(1, Ordering::Relaxed);
        self.http_failed.fetch_add(1, Ordering::Relaxed);
        if self.enabled {
            if let Ok(mut last) = self.last_http_label.lock() {
                *last = format!("GET {} failed", url);
            }
            self.refresh();
        }
    }

    pub fn finish(&self) {
        if !self.enabled {
            return;
        }
        self.refresh();
        self.stage.finish_with_message("完成");
        self.counters.finish_and_clear();
        if let Some(mp) = &self.mp {
            let _ = mp.println(format!("Done in {}", HumanDuration(self.start.elapsed())));
        }
    }

    fn refresh(&self) {
        if !self.enabled {
            return;
        }

        let in_flight = self.http_in_flight.load(Ordering::Relaxed);
        let done = self.http_done.load(Ordering::Relaxed);
        let failed = self.http_failed.load(Ordering::Relaxed);
        let bytes = self.http_bytes.load(Ordering::Relaxed);
        let pages = self.pages.load(Ordering::Relaxed);
        let seen = self.topics_seen.load(Ordering::Relaxed);
        let kept = self.topics_kept.load(Ordering::Relaxed);
        let pinned = self.pinned_seen.load(Ordering::Relaxed);

        let last = self
            .last_http_label
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default();
        self.counters.set_message(format!(
            "HTTP: done {done} failed {failed} in-flight {in_flight} | {bytes} | pages {pages} | topics seen {seen} kept {kept} pinned {pinned} | {last}",
            bytes = HumanBytes(bytes),
        ));
    }
}
