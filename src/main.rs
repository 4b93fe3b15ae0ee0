use clap::Parser as _;
use tracing_subscriber::EnvFilter;

use discourse_topic_digest::CliArgs;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();
    if let Err(e) = discourse_topic_digest::run(args).await {
        tracing::error!("Fatal error: {e:#}");
        std::process::exit(1);
    }
}
