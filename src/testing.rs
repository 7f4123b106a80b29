//! Fixture fetcher, in-memory sink and HTML builders shared by unit tests.

use crate::client::PageFetcher;
use crate::error::{ClientError, Result, SinkError};
use crate::models::ReviewRecord;
use crate::sink::RecordSink;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::{Layer, Registry};

/// Serves canned pages by exact URL and records every fetch.
#[derive(Default)]
pub struct FixtureFetcher {
    pages: HashMap<String, String>,
    fetched: Mutex<Vec<String>>,
}

impl FixtureFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, html: impl Into<String>) -> Self {
        self.pages.insert(url.to_string(), html.into());
        self
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for FixtureFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.fetched.lock().unwrap().push(url.to_string());
        self.pages.get(url).cloned().ok_or_else(|| {
            ClientError::ResponseError {
                status_code: 404,
                url: url.to_string(),
            }
            .into()
        })
    }
}

/// Collects records; scopes listed in `failing_scopes` reject writes.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<ReviewRecord>>,
    failing_scopes: HashSet<String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(scope: &str) -> Self {
        Self {
            failing_scopes: HashSet::from([scope.to_string()]),
            ..Default::default()
        }
    }

    pub fn records(&self) -> Vec<ReviewRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn put(&self, record: &ReviewRecord) -> std::result::Result<(), SinkError> {
        if self.failing_scopes.contains(&record.scope) {
            return Err(SinkError::Write {
                scope: record.scope.clone(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            });
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

/// Counts WARN and ERROR events on the current thread while installed.
#[derive(Clone, Default)]
pub struct WarningCounter(Arc<AtomicUsize>);

impl WarningCounter {
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        tracing::subscriber::set_default(Registry::default().with(self.clone()))
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl<S: Subscriber> Layer<S> for WarningCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() <= Level::WARN {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

pub struct Review {
    pub text: String,
    pub date: String,
    pub rating: f32,
}

impl Review {
    pub fn new(text: &str, date: &str, rating: f32) -> Self {
        Self {
            text: text.to_string(),
            date: date.to_string(),
            rating,
        }
    }
}

/// Search results page; `links` are `(href, name)` pairs.
pub fn search_page(
    header: &str,
    indicator: &str,
    links: &[(&str, &str)],
    next: Option<&str>,
) -> String {
    let cards: String = links
        .iter()
        .map(|(href, name)| {
            format!(
                r#"<li><div class="search-result natural-search-result biz-listing-large">
                    <div class="media-story"><h3><a class="biz-name" href="{}">{}</a></h3></div>
                </div></li>"#,
                href, name
            )
        })
        .collect();

    format!(
        r#"<html><body>
            <h1>{}</h1>
            <div class="page-of-pages arrange_unit arrange_unit--fill">{}</div>
            <ul>{}</ul>
            {}
        </body></html>"#,
        header,
        indicator,
        cards,
        next_link(next)
    )
}

/// Business detail or review page; `rating` is `(score, review_count)`.
pub fn business_page(
    name: &str,
    rating: Option<(f32, u32)>,
    reviews: &[Review],
    next: Option<&str>,
) -> String {
    let rating_block = rating
        .map(|(score, count)| {
            format!(
                r#"<div class="biz-rating biz-rating-very-large clearfix">
                    <div class="i-stars"><img alt="{:.1} star rating" src="stars.png"></div>
                    <span class="review-count rating-qualifier">{} reviews</span>
                </div>"#,
                score, count
            )
        })
        .unwrap_or_default();

    let review_blocks: String = reviews
        .iter()
        .map(|review| {
            format!(
                r#"<div class="review-content">
                    <div class="biz-rating"><img alt="{:.1} star rating" src="stars.png">
                    <span class="rating-qualifier">
                        {}
                    </span></div>
                    <p lang="en">{}</p>
                </div>"#,
                review.rating, review.date, review.text
            )
        })
        .collect();

    format!(
        r#"<html><body>
            <h1 class="biz-page-title">{}</h1>
            {}
            {}
            {}
        </body></html>"#,
        name,
        rating_block,
        review_blocks,
        next_link(next)
    )
}

fn next_link(next: Option<&str>) -> String {
    next.map(|href| {
        format!(
            r#"<a class="u-decoration-none next pagination-links_anchor" href="{}">Next</a>"#,
            href.replace('&', "&amp;")
        )
    })
    .unwrap_or_default()
}
