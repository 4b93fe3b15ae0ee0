use std::time::Duration;

use url::Url;

use crate::cli::{Args, PinnedPolicy};

pub const DEFAULT_LATEST_OUT: &str = "linux_do_lottery.json";

/// Everything the latest-topics digest needs, resolved from the command line.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub base_url: Url,
    pub category_slug: String,
    pub category_id: u64,
    pub tag: Option<String>,
    pub days: u32,
    pub pinned: PinnedPolicy,
    pub page_delay: Duration,
    pub max_pages: Option<u32>,
}

impl FetchConfig {
    pub fn from_args(args: &Args) -> anyhow::Result<Self> {
        if args.days == 0 {
            anyhow::bail!("--days must be at least 1");
        }
        if args.category_slug.trim().is_empty() {
            anyhow::bail!("--category-slug must not be empty");
        }
        if args.max_pages == 0 {
            anyhow::bail!("--max-pages must be at least 1");
        }

        let tag = if args.no_tag || args.tag.trim().is_empty() {
            None
        } else {
            Some(args.tag.trim().to_string())
        };

        Ok(Self {
            base_url: args.base_url.clone(),
            category_slug: args.category_slug.trim().to_string(),
            category_id: args.category_id,
            tag,
            days: args.days,
            pinned: args.pinned,
            page_delay: Duration::from_millis(args.page_delay_ms),
            max_pages: Some(args.max_pages),
        })
    }

    /// `{base}/c/{slug}/{id}/l/latest.json?page={n}&tags={tag}&order=created`
    pub fn latest_url(&self, page: u32) -> anyhow::Result<Url> {
        let path = format!(
            "c/{}/{}/l/latest.json",
            self.category_slug, self.category_id
        );
        let mut url = join_base(&self.base_url, &path)?;
        {
            let mut q = url.query_pairs_mut();
            q.append_pair("page", &page.to_string());
            if let Some(tag) = &self.tag {
                q.append_pair("tags", tag);
            }
            q.append_pair("order", "created");
        }
        Ok(url)
    }
}

#[derive(Debug, Clone)]
pub struct TopConfig {
    pub base_url: Url,
    pub with_content: bool,
}

impl TopConfig {
    pub fn from_args(args: &Args) -> Self {
        Self {
            base_url: args.base_url.clone(),
            with_content: args.with_content,
        }
    }

    pub fn top_url(&self) -> anyhow::Result<Url> {
        join_base(&self.base_url, "top.json")
    }

    pub fn topic_url(&self, topic_id: u64) -> anyhow::Result<Url> {
        join_base(&self.base_url, &format!("t/{topic_id}.json"))
    }
}

/// Joins `path` under the base URL, keeping any path prefix the base carries.
fn join_base(base: &Url, path: &str) -> anyhow::Result<Url> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let p = format!("{}/", base.path());
        base.set_path(&p);
    }
    base.join(path)
        .map_err(|e| anyhow::anyhow!("join {} onto {}: {}", path, base, e))
}
