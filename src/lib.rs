mod cli;
mod config;
mod digest;
mod fetcher;
mod progress;
mod report;
mod top;
mod topic;
mod window;

use std::path::PathBuf;

use chrono::{DateTime, FixedOffset, Utc};
use cli::Args;
use report::DigestReport;

pub use cli::{Args as CliArgs, Mode, PinnedPolicy, ProgressMode};
pub use config::{FetchConfig, TopConfig};
pub use digest::{Digest, LatestTopics, PageSource, StopReason, collect};
pub use fetcher::Fetcher;
pub use topic::{TagRef, Topic, TopicRecord};
pub use window::DateWindow;

pub async fn run(args: Args) -> anyhow::Result<()> {
    use std::io::IsTerminal as _;

    let progress_enabled = match args.progress {
        ProgressMode::Always => true,
        ProgressMode::Never => false,
        ProgressMode::Auto => std::io::stderr().is_terminal(),
    };
    let progress = progress::Progress::new(progress_enabled);

    let now = args
        .as_of
        .unwrap_or_else(|| Utc::now().with_timezone(&window::shanghai()));
    let fetcher = Fetcher::new(&args.user_agent, args.max_attempts, Some(progress.clone()))?;

    let res = match args.mode {
        Mode::Latest => run_latest(&args, &fetcher, now, &progress).await,
        Mode::Top => run_top(&args, &fetcher, now, &progress).await,
    };
    progress.finish();
    res
}

async fn run_latest(
    args: &Args,
    fetcher: &Fetcher,
    now: DateTime<FixedOffset>,
    progress: &progress::Progress,
) -> anyhow::Result<()> {
    let config = FetchConfig::from_args(args)?;
    let window = DateWindow::ending_at(&now, config.days)?;
    tracing::info!(
        category = %format!("{}/{}", config.category_slug, config.category_id),
        tag = config.tag.as_deref().unwrap_or("-"),
        start = %window.start,
        end = %window.end,
        "fetching latest topics"
    );

    progress.set_stage("抓取最新话题");
    let source = LatestTopics::new(fetcher, &config);
    let digest = collect(&source, &config, window, Some(progress)).await;

    progress.set_stage("写入输出");
    let out = args
        .out
        .clone()
        .unwrap_or_else(|| PathBuf::from(config::DEFAULT_LATEST_OUT));
    let fetched_at = Utc::now().with_timezone(&window::shanghai());
    report::write_json(&out, &DigestReport::new(&config, &digest, fetched_at))?;

    match &digest.error {
        None => tracing::info!(
            count = digest.topics.len(),
            pages = digest.pages_fetched,
            out = %out.display(),
            "saved topics"
        ),
        Some(e) => tracing::error!(
            count = digest.topics.len(),
            out = %out.display(),
            error = %format!("{e:#}"),
            "fetch aborted; saved partial results"
        ),
    }
    tracing::info!(start = %digest.window.start, end = %digest.window.end, "date range");
    Ok(())
}

async fn run_top(
    args: &Args,
    fetcher: &Fetcher,
    now: DateTime<FixedOffset>,
    progress: &progress::Progress,
) -> anyhow::Result<()> {
    let config = TopConfig::from_args(args);

    progress.set_stage("抓取热门话题");
    let snapshot = top::snapshot(fetcher, &config, now, Some(progress)).await?;

    progress.set_stage("写入输出");
    let out = args
        .out
        .clone()
        .unwrap_or_else(|| PathBuf::from(top::default_file_name(snapshot.date)));
    report::write_json(&out, &snapshot)?;
    tracing::info!(count = snapshot.topics.len(), out = %out.display(), "saved top topics");
    Ok(())
}
