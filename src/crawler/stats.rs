use crate::error::AppError;
use crate::{log_error, log_info};

/// Counters for one scope's crawl.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ScopeStats {
    pub listings_seen: usize,
    /// Rated businesses whose review pages were all walked.
    pub businesses_crawled: usize,
    pub businesses_unrated: usize,
    /// Detail page or a later review page failed.
    pub businesses_failed: usize,
    pub records_written: usize,
    pub records_skipped: usize,
    pub sink_failures: usize,
    pub failed_units: Vec<(String, String)>, // (url or scope, reason)
    pub cancelled: bool,
}

impl ScopeStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_failure(&mut self, unit: impl Into<String>, error: &AppError) {
        self.failed_units.push((unit.into(), error.to_string()));
    }
}

/// Per-scope results of a run, in scope order.
#[derive(Debug, Default, Clone)]
pub struct CrawlReport {
    pub scopes: Vec<(String, ScopeStats)>,
}

impl CrawlReport {
    pub fn total_records(&self) -> usize {
        self.scopes.iter().map(|(_, s)| s.records_written).sum()
    }

    pub fn total_failures(&self) -> usize {
        self.scopes.iter().map(|(_, s)| s.failed_units.len()).sum()
    }

    pub fn was_cancelled(&self) -> bool {
        self.scopes.iter().any(|(_, s)| s.cancelled)
    }

    #[cfg(test)]
    pub fn stats_for(&self, scope: &str) -> Option<&ScopeStats> {
        self.scopes
            .iter()
            .find(|(name, _)| name == scope)
            .map(|(_, stats)| stats)
    }

    pub fn print_report(&self) {
        log_info!("=== Crawl Report ===");
        log_info!("Scopes: {}", self.scopes.len());
        log_info!("Records written: {}", self.total_records());
        log_info!("Failed units: {}", self.total_failures());
        log_info!("-----------------------------");

        for (scope, stats) in &self.scopes {
            log_info!(
                "{}{}: {} listings, {} businesses crawled, {} unrated, {} failed",
                scope,
                if stats.cancelled { " (cancelled)" } else { "" },
                stats.listings_seen,
                stats.businesses_crawled,
                stats.businesses_unrated,
                stats.businesses_failed
            );
            log_info!(
                "  records: {} written, {} skipped, {} sink failures",
                stats.records_written,
                stats.records_skipped,
                stats.sink_failures
            );
            for (unit, reason) in &stats.failed_units {
                log_error!("  ✗ {} (Reason: {})", unit, reason);
            }
        }
    }
}
