use crate::client::PageFetcher;
use crate::error::{AppError, ClientError, Result};
use crate::models::BusinessMetadata;
use crate::scraper::{Markup, ReviewEvent, Scraper};
use crate::{log_error, log_info, log_warn};
use async_stream::stream;
use futures::stream::BoxStream;
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use url::Url;

struct ReviewPage {
    events: Vec<ReviewEvent>,
    next_url: Option<Url>,
}

/// A business's header snapshot and its lazily fetched reviews.
pub struct BusinessWalk<'a> {
    pub metadata: BusinessMetadata,
    pub reviews: BoxStream<'a, Result<ReviewEvent>>,
}

/// Walks one business's detail page and its review pages.
pub struct BusinessReviewWalker {
    fetcher: Arc<dyn PageFetcher>,
    markup: Arc<Markup>,
    cancel: CancellationToken,
}

impl BusinessReviewWalker {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        markup: Arc<Markup>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            fetcher,
            markup,
            cancel,
        }
    }

    /// Fetches the detail page and reads the business header.
    ///
    /// Unrated businesses come back with an empty review stream. Otherwise
    /// the stream yields the first page's reviews, then follows "next" links
    /// on demand. Every record carries the metadata read here.
    pub async fn walk<'a>(&'a self, url: &str, scope: &'a str) -> Result<BusinessWalk<'a>> {
        if self.cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }

        let url = Url::parse(url)
            .map_err(|e| ClientError::InvalidUrl(format!("Invalid business URL {}: {}", url, e)))?;
        let content = self.fetcher.fetch(url.as_str()).await?;
        let (metadata, first_page) = self.parse_detail_page(&content, url.clone(), scope)?;

        let Some(first_page) = first_page else {
            return Ok(BusinessWalk {
                metadata,
                reviews: Box::pin(futures::stream::empty()),
            });
        };

        log_info!(
            scope,
            url = %url,
            "[business] Scraping reviews for {}, n = {}",
            metadata.business_name,
            metadata.review_count_or_zero()
        );

        let snapshot = metadata.clone();
        let reviews = Box::pin(stream! {
            let mut page = first_page;
            let mut visited = HashSet::from([url]);
            let mut page_number = 1usize;
            let mut extracted = 0usize;

            loop {
                let ReviewPage { events, next_url } = page;
                for event in events {
                    if matches!(event, ReviewEvent::Record(_)) {
                        extracted += 1;
                    }
                    yield Ok(event);
                }
                log_info!(
                    scope,
                    business = %snapshot.business_name,
                    page = page_number,
                    "[business] Added {} results of {}",
                    extracted,
                    snapshot.review_count_or_zero()
                );

                let next_url = match next_url {
                    Some(next_url) if visited.contains(&next_url) => {
                        log_warn!(scope, url = %next_url, "[business] Next link points to a visited page, stopping");
                        break;
                    }
                    Some(next_url) => next_url,
                    None => break,
                };

                if self.cancel.is_cancelled() {
                    yield Err(AppError::Cancelled);
                    return;
                }
                page_number += 1;
                visited.insert(next_url.clone());

                let content = match self.fetcher.fetch(next_url.as_str()).await {
                    Ok(content) => content,
                    Err(e) => {
                        log_error!(
                            e => scope,
                            business = %snapshot.business_name,
                            page = page_number,
                            url = %next_url,
                            "[business] Failed to fetch review page"
                        );
                        yield Err(e);
                        return;
                    }
                };
                page = self.parse_review_page(&content, next_url, &snapshot, scope);
            }
        });

        Ok(BusinessWalk { metadata, reviews })
    }

    /// Metadata, plus the first review page when the business is rated.
    fn parse_detail_page(
        &self,
        content: &str,
        url: Url,
        scope: &str,
    ) -> Result<(BusinessMetadata, Option<ReviewPage>)> {
        let scraper = Scraper::new(content, url, &self.markup);
        let metadata = scraper.content().extract_business_metadata()?;
        if !metadata.is_rated() {
            return Ok((metadata, None));
        }

        let page = ReviewPage {
            events: scraper.content().extract_reviews(&metadata, scope),
            next_url: scraper.page().next_page_url(),
        };
        Ok((metadata, Some(page)))
    }

    fn parse_review_page(
        &self,
        content: &str,
        url: Url,
        metadata: &BusinessMetadata,
        scope: &str,
    ) -> ReviewPage {
        let scraper = Scraper::new(content, url, &self.markup);
        ReviewPage {
            events: scraper.content().extract_reviews(metadata, scope),
            next_url: scraper.page().next_page_url(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{business_page, FixtureFetcher, Review};
    use futures::StreamExt;

    const BIZ: &str = "https://www.yelp.com/biz/club-a";

    fn walker(fetcher: FixtureFetcher) -> (Arc<FixtureFetcher>, BusinessReviewWalker) {
        let fetcher = Arc::new(fetcher);
        let walker = BusinessReviewWalker::new(
            fetcher.clone(),
            Arc::new(Markup::new().unwrap()),
            CancellationToken::new(),
        );
        (fetcher, walker)
    }

    fn reviews(prefix: &str, count: usize) -> Vec<Review> {
        (0..count)
            .map(|i| Review::new(&format!("{} review {}", prefix, i), "2/3/2017", 4.0))
            .collect()
    }

    fn records(events: Vec<Result<ReviewEvent>>) -> Vec<crate::models::ReviewRecord> {
        events
            .into_iter()
            .filter_map(|event| match event.unwrap() {
                ReviewEvent::Record(record) => Some(record),
                ReviewEvent::Skipped(_) => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn walks_every_review_page_with_one_metadata_snapshot() {
        let page2 = "https://www.yelp.com/biz/club-a?start=20";
        let page3 = "https://www.yelp.com/biz/club-a?start=40";
        let fetcher = FixtureFetcher::new()
            .page(BIZ, business_page("Club A", Some((4.0, 9)), &reviews("p1", 3), Some("/biz/club-a?start=20")))
            // Later pages carry a different header; records must keep the first one.
            .page(page2, business_page("Club A (page 2)", Some((1.0, 99)), &reviews("p2", 3), Some(page3)))
            .page(page3, business_page("Club A", Some((4.0, 9)), &reviews("p3", 3), None));
        let (fetcher, walker) = walker(fetcher);

        let walk = walker.walk(BIZ, "Springfield").await.unwrap();
        assert_eq!(walk.metadata, BusinessMetadata::rated("Club A", 4.0, 9));

        let records = records(walk.reviews.collect().await);
        assert_eq!(records.len(), 9);
        assert!(records.iter().all(|r| r.business_name == "Club A"
            && r.score == 4.0
            && r.review_count == 9
            && r.scope == "Springfield"));
        assert_eq!(records[0].text, "p1 review 0");
        assert_eq!(records[8].text, "p3 review 2");
        assert_eq!(fetcher.fetched(), vec![BIZ, page2, page3]);
    }

    #[tokio::test]
    async fn unrated_business_has_no_reviews() {
        let fetcher = FixtureFetcher::new().page(
            BIZ,
            business_page("Club B", None, &reviews("p1", 2), Some("/biz/club-a?start=20")),
        );
        let (fetcher, walker) = walker(fetcher);

        let walk = walker.walk(BIZ, "Springfield").await.unwrap();
        assert_eq!(walk.metadata.score_or_zero(), 0.0);
        assert_eq!(walk.metadata.review_count_or_zero(), 0);

        let events: Vec<_> = walk.reviews.collect().await;
        assert!(events.is_empty());
        assert_eq!(fetcher.fetched(), vec![BIZ]);
    }

    #[tokio::test]
    async fn overlapping_pages_are_not_deduplicated() {
        let page2 = "https://www.yelp.com/biz/club-a?start=20";
        let same = reviews("dup", 2);
        let fetcher = FixtureFetcher::new()
            .page(BIZ, business_page("Club A", Some((3.0, 4)), &same, Some(page2)))
            .page(page2, business_page("Club A", Some((3.0, 4)), &same, None));
        let (_, walker) = walker(fetcher);

        let walk = walker.walk(BIZ, "Springfield").await.unwrap();
        let records = records(walk.reviews.collect().await);

        assert_eq!(records.len(), 4);
        assert_eq!(records[0], records[2]);
    }

    #[tokio::test]
    async fn failed_review_page_ends_the_stream_after_earlier_records() {
        let fetcher = FixtureFetcher::new().page(
            BIZ,
            business_page("Club A", Some((3.0, 4)), &reviews("p1", 2), Some("/biz/club-a?start=20")),
        );
        let (_, walker) = walker(fetcher);

        let walk = walker.walk(BIZ, "Springfield").await.unwrap();
        let events: Vec<_> = walk.reviews.collect().await;

        assert_eq!(events.len(), 3);
        assert!(events[..2].iter().all(|e| matches!(e, Ok(ReviewEvent::Record(_)))));
        assert!(matches!(events[2], Err(AppError::Client(_))));
    }

    #[tokio::test]
    async fn cancellation_stops_before_the_next_review_page() {
        let page2 = "https://www.yelp.com/biz/club-a?start=20";
        let fetcher = Arc::new(
            FixtureFetcher::new()
                .page(BIZ, business_page("Club A", Some((3.0, 4)), &reviews("p1", 2), Some(page2)))
                .page(page2, business_page("Club A", Some((3.0, 4)), &reviews("p2", 2), None)),
        );
        let cancel = CancellationToken::new();
        let walker = BusinessReviewWalker::new(
            fetcher.clone(),
            Arc::new(Markup::new().unwrap()),
            cancel.clone(),
        );

        let mut walk = walker.walk(BIZ, "Springfield").await.unwrap();
        for _ in 0..2 {
            assert!(matches!(walk.reviews.next().await, Some(Ok(ReviewEvent::Record(_)))));
        }
        cancel.cancel();

        assert!(matches!(walk.reviews.next().await, Some(Err(AppError::Cancelled))));
        assert!(walk.reviews.next().await.is_none());
        assert_eq!(fetcher.fetched(), vec![BIZ]);
    }

    #[tokio::test]
    async fn cancelled_walk_fetches_nothing() {
        let fetcher = Arc::new(FixtureFetcher::new().page(
            BIZ,
            business_page("Club A", Some((3.0, 4)), &reviews("p1", 2), None),
        ));
        let cancel = CancellationToken::new();
        let walker = BusinessReviewWalker::new(
            fetcher.clone(),
            Arc::new(Markup::new().unwrap()),
            cancel.clone(),
        );
        cancel.cancel();

        assert!(matches!(
            walker.walk(BIZ, "Springfield").await,
            Err(AppError::Cancelled)
        ));
        assert!(fetcher.fetched().is_empty());
    }

    #[tokio::test]
    async fn missing_detail_page_is_an_error() {
        let (_, walker) = walker(FixtureFetcher::new());
        assert!(matches!(
            walker.walk(BIZ, "Springfield").await,
            Err(AppError::Client(ClientError::ResponseError { status_code: 404, .. }))
        ));
    }
}
