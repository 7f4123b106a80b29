use super::business::BusinessReviewWalker;
use super::search::SearchResultsWalker;
use super::stats::{CrawlReport, ScopeStats};
use crate::client::PageFetcher;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{BusinessListing, ReviewRecord};
use crate::scraper::{Markup, ReviewEvent};
use crate::sink::RecordSink;
use crate::{log_error, log_info, log_warn};
use futures::{stream, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct CrawlSettings {
    /// Scopes crawled at once; 1 keeps the run strictly sequential.
    pub scope_concurrency: usize,
    /// Run-wide cap on records handed to the sink.
    pub review_limit: Option<usize>,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            scope_concurrency: 1,
            review_limit: None,
        }
    }
}

impl From<&Config> for CrawlSettings {
    fn from(config: &Config) -> Self {
        Self {
            scope_concurrency: config.scope_concurrency,
            review_limit: config.review_limit,
        }
    }
}

/// Drives search, business and review walks for every scope and forwards
/// records to the sink.
pub struct CrawlOrchestrator {
    search: SearchResultsWalker,
    business: BusinessReviewWalker,
    sink: Arc<dyn RecordSink>,
    settings: CrawlSettings,
    cancel: CancellationToken,
    forwarded: AtomicUsize,
}

impl CrawlOrchestrator {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        sink: Arc<dyn RecordSink>,
        base_url: &str,
        settings: CrawlSettings,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let markup = Arc::new(Markup::new()?);
        Ok(Self {
            search: SearchResultsWalker::new(
                fetcher.clone(),
                markup.clone(),
                base_url,
                cancel.clone(),
            )?,
            business: BusinessReviewWalker::new(fetcher, markup, cancel.clone()),
            sink,
            settings,
            cancel,
            forwarded: AtomicUsize::new(0),
        })
    }

    pub fn records_forwarded(&self) -> usize {
        self.forwarded.load(Ordering::SeqCst)
    }

    /// Crawls every scope and returns per-scope stats in scope order.
    pub async fn run(&self, term: &str, scopes: &[String]) -> CrawlReport {
        log_info!(
            term,
            scopes = scopes.len(),
            concurrency = self.settings.scope_concurrency,
            "[crawl] Starting crawl"
        );

        let results = stream::iter(scopes)
            .map(|scope| async move { (scope.clone(), self.crawl_scope(term, scope).await) })
            .buffered(self.settings.scope_concurrency.max(1))
            .collect::<Vec<_>>()
            .await;

        if let Err(e) = self.sink.flush().await {
            let e = AppError::from(e);
            log_error!(e => "[crawl] Failed to flush sink");
        }

        CrawlReport { scopes: results }
    }

    async fn crawl_scope(&self, term: &str, scope: &str) -> ScopeStats {
        let mut stats = ScopeStats::new();
        if self.cancel.is_cancelled() {
            stats.cancelled = true;
            return stats;
        }

        log_info!(scope, "[crawl] Crawling scope");
        let mut listings = self.search.walk(term, scope);

        while let Some(item) = listings.next().await {
            let listing = match item {
                Ok(listing) => listing,
                Err(AppError::Cancelled) => {
                    stats.cancelled = true;
                    break;
                }
                Err(e) => {
                    // Already logged with page context by the walker.
                    stats.record_failure(scope, &e);
                    break;
                }
            };
            stats.listings_seen += 1;

            if self.cancel.is_cancelled() {
                stats.cancelled = true;
                break;
            }
            if let Err(AppError::Cancelled) = self.crawl_business(&listing, scope, &mut stats).await {
                stats.cancelled = true;
                break;
            }
        }

        log_info!(
            scope,
            records = stats.records_written,
            businesses = stats.businesses_crawled,
            cancelled = stats.cancelled,
            "[crawl] Finished scope"
        );
        stats
    }

    /// Only cancellation is returned; other failures are recorded in `stats`.
    async fn crawl_business(
        &self,
        listing: &BusinessListing,
        scope: &str,
        stats: &mut ScopeStats,
    ) -> Result<()> {
        let walk = match self.business.walk(&listing.url, scope).await {
            Ok(walk) => walk,
            Err(AppError::Cancelled) => return Err(AppError::Cancelled),
            Err(e) => {
                log_error!(e => scope, url = %listing.url, "[crawl] Skipping business {}", listing.name);
                stats.businesses_failed += 1;
                stats.record_failure(&listing.url, &e);
                return Ok(());
            }
        };

        if !walk.metadata.is_rated() {
            stats.businesses_unrated += 1;
            return Ok(());
        }

        let mut reviews = walk.reviews;
        while let Some(event) = reviews.next().await {
            match event {
                Ok(ReviewEvent::Record(record)) => self.forward(&record, stats).await,
                Ok(ReviewEvent::Skipped(e)) => {
                    log_warn!(
                        scope,
                        business = %walk.metadata.business_name,
                        "[crawl] Skipping review: {}",
                        e
                    );
                    stats.records_skipped += 1;
                }
                Err(AppError::Cancelled) => return Err(AppError::Cancelled),
                Err(e) => {
                    stats.businesses_failed += 1;
                    stats.record_failure(&listing.url, &e);
                    return Ok(());
                }
            }
        }
        stats.businesses_crawled += 1;
        Ok(())
    }

    async fn forward(&self, record: &ReviewRecord, stats: &mut ScopeStats) {
        let reserved = self.forwarded.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(limit) = self.settings.review_limit {
            if reserved > limit {
                self.forwarded.fetch_sub(1, Ordering::SeqCst);
                self.cancel.cancel();
                return;
            }
        }

        match self.sink.put(record).await {
            Ok(()) => {
                stats.records_written += 1;
                if self.settings.review_limit == Some(reserved) {
                    log_info!(limit = reserved, "[crawl] Review limit reached, stopping");
                    self.cancel.cancel();
                }
            }
            Err(e) => {
                self.forwarded.fetch_sub(1, Ordering::SeqCst);
                stats.sink_failures += 1;
                let e = AppError::from(e);
                log_error!(
                    e => scope = %record.scope,
                    business = %record.business_name,
                    "[crawl] Failed to store review"
                );
            }
        }
    }
}
