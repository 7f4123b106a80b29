mod client;
mod config;
mod crawler;
mod error;
mod logging;
mod models;
mod scraper;
mod sink;
#[cfg(test)]
mod testing;
mod utils;

use crate::client::{Client, PageFetcher};
use crate::config::{Config, OutputFormat};
use crate::crawler::{CrawlOrchestrator, CrawlSettings};
use crate::error::Result;
use crate::logging::{init_logging, LoggerConfig};
use crate::sink::{JsonLinesSink, LogSink, RecordSink};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Crawl search listings for a term across scopes and store every review found.
#[derive(Parser, Debug)]
#[command(name = "review-crawler", version)]
struct Cli {
    /// TOML configuration file; defaults are used when it does not exist.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Text file with one scope (city) per line.
    #[arg(short = 'c', long)]
    scope_file: Option<String>,

    /// Directory for the per-scope JSON Lines files.
    #[arg(short = 'o', long)]
    output_dir: Option<String>,

    /// Search term to query in every scope.
    #[arg(short = 's', long)]
    search_term: Option<String>,

    /// Stop after this many reviews have been stored.
    #[arg(short = 'r', long)]
    review_limit: Option<usize>,

    /// Log records instead of writing files.
    #[arg(long)]
    stdout: bool,
}

impl Cli {
    fn apply(self, mut config: Config) -> Result<Config> {
        if let Some(scope_file) = self.scope_file {
            config.scope_file = Some(scope_file);
        }
        if let Some(output_dir) = self.output_dir {
            config.output.directory = output_dir;
        }
        if let Some(search_term) = self.search_term {
            config.search_term = search_term;
        }
        if self.review_limit.is_some() {
            config.review_limit = self.review_limit;
        }
        if self.stdout {
            config.output.format = OutputFormat::Stdout;
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load_or_default(&cli.config)?;
    let config = cli.apply(config)?;

    init_logging(LoggerConfig::from_config(&config.logging)?)?;
    log_info!("[main] Starting crawler...");

    let scopes = config.resolve_scopes()?;
    log_info!(
        "[main] Searching {:?} in {} scopes on {}",
        config.search_term,
        scopes.len(),
        config.base_url
    );

    let fetcher: Arc<dyn PageFetcher> = Arc::new(Client::from_config(&config)?);
    let sink: Arc<dyn RecordSink> = match config.output.format {
        OutputFormat::Jsonl => Arc::new(JsonLinesSink::new(config.output_directory())?),
        OutputFormat::Stdout => Arc::new(LogSink),
    };

    let cancel = CancellationToken::new();
    spawn_cancel_triggers(&config, cancel.clone());

    let crawler = CrawlOrchestrator::new(
        fetcher,
        sink,
        &config.base_url,
        CrawlSettings::from(&config),
        cancel,
    )?;

    let report = crawler.run(&config.search_term, &scopes).await;
    report.print_report();
    if report.was_cancelled() {
        log_warn!("[main] Crawl stopped early; re-run the cancelled scopes to finish");
    }

    log_info!(
        "[main] Crawl completed: {} records stored",
        crawler.records_forwarded()
    );
    Ok(())
}

/// Cancels the crawl on Ctrl-C or once the configured run timeout elapses.
fn spawn_cancel_triggers(config: &Config, cancel: CancellationToken) {
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log_warn!("[main] Interrupted, finishing current page...");
            on_interrupt.cancel();
        }
    });

    if let Some(seconds) = config.run_timeout {
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(seconds)).await;
            if !cancel.is_cancelled() {
                log_warn!("[main] Run timeout of {}s reached, stopping", seconds);
                cancel.cancel();
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let cli = Cli::parse_from([
            "review-crawler",
            "-s",
            "Coffee",
            "-o",
            "out",
            "-r",
            "25",
            "--stdout",
        ]);
        let config = cli.apply(Config::default()).unwrap();

        assert_eq!(config.search_term, "Coffee");
        assert_eq!(config.output.directory, "out");
        assert_eq!(config.review_limit, Some(25));
        assert_eq!(config.output.format, OutputFormat::Stdout);
    }

    #[test]
    fn zero_review_limit_is_rejected() {
        let cli = Cli::parse_from(["review-crawler", "-r", "0"]);
        assert!(cli.apply(Config::default()).is_err());
    }
}
