mod business;
mod orchestrator;
mod search;
mod stats;

pub use orchestrator::{CrawlOrchestrator, CrawlSettings};
pub use stats::CrawlReport;
