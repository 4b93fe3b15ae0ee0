use std::path::PathBuf;

use chrono::{DateTime, FixedOffset};
use clap::{Parser, ValueEnum};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Page through a category's latest topics and keep those inside the date window.
    Latest,
    /// Save one snapshot of the site-wide top topics.
    Top,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PinnedPolicy {
    /// Drop pinned topics entirely.
    #[default]
    Skip,
    /// Keep pinned topics whose creation date is inside the window.
    Include,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ProgressMode {
    /// Enable progress UI when stderr is a TTY.
    Auto,
    /// Always enable progress UI (even when piped).
    Always,
    /// Never show progress UI.
    Never,
}

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    /// What to fetch: `latest` (category topics in a date window) or `top` (site top list).
    #[arg(long, value_enum, default_value = "latest")]
    pub mode: Mode,

    /// Base URL of the Discourse site.
    #[arg(long, default_value = "https://linux.do")]
    pub base_url: Url,

    /// Category slug used in the `/c/{slug}/{id}` path.
    #[arg(long, default_value = "welfare")]
    pub category_slug: String,

    /// Numeric category id.
    #[arg(long, default_value_t = 36)]
    pub category_id: u64,

    /// Tag passed to the server as the `tags` filter.
    #[arg(long, default_value = "抽奖", conflicts_with = "no_tag")]
    pub tag: String,

    /// Do not filter by tag.
    #[arg(long)]
    pub no_tag: bool,

    /// Number of calendar days (Asia/Shanghai) to keep, counting today.
    #[arg(long, default_value_t = 3)]
    pub days: u32,

    /// What to do with pinned topics. They never stop paging either way.
    #[arg(long, value_enum, default_value = "skip")]
    pub pinned: PinnedPolicy,

    /// Delay between page requests, in milliseconds.
    #[arg(long, default_value_t = 1000)]
    pub page_delay_ms: u64,

    /// Stop after this many pages even if the window is not exhausted.
    #[arg(long, default_value_t = 100)]
    pub max_pages: u32,

    /// Attempts per request; 429/503 responses are retried with backoff when above 1.
    #[arg(long, default_value_t = 1)]
    pub max_attempts: usize,

    /// Output JSON file. Defaults to `linux_do_lottery.json` (latest) or
    /// `linux_do_top_{date}.json` (top).
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Evaluate the window as of this RFC 3339 instant instead of the current time.
    #[arg(long)]
    pub as_of: Option<DateTime<FixedOffset>>,

    /// In `top` mode, also fetch each topic's first post (author and HTML).
    #[arg(long)]
    pub with_content: bool,

    /// HTTP User-Agent.
    #[arg(
        long,
        default_value = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
    )]
    pub user_agent: String,

    /// Progress display: `auto`, `always`, or `never`.
    #[arg(long, value_enum, default_value = "auto")]
    pub progress: ProgressMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_lottery_watch() {
        let args = Args::try_parse_from(["discourse-topic-digest"]).unwrap();
        assert_eq!(args.mode, Mode::Latest);
        assert_eq!(args.category_id, 36);
        assert_eq!(args.category_slug, "welfare");
        assert_eq!(args.tag, "抽奖");
        assert_eq!(args.days, 3);
        assert_eq!(args.pinned, PinnedPolicy::Skip);
        assert_eq!(args.max_attempts, 1);
        assert_eq!(args.max_pages, 100);
    }

    #[test]
    fn as_of_parses_offset_timestamps() {
        let args = Args::try_parse_from([
            "discourse-topic-digest",
            "--as-of",
            "2025-01-17T10:00:00+08:00",
            "--no-tag",
        ])
        .unwrap();
        assert_eq!(
            args.as_of.unwrap().to_rfc3339(),
            "2025-01-17T10:00:00+08:00"
        );
        assert!(args.no_tag);
    }

    #[test]
    fn tag_and_no_tag_conflict() {
        let res = Args::try_parse_from(["discourse-topic-digest", "--tag", "x", "--no-tag"]);
        assert!(res.is_err());
    }
}
