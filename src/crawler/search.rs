use crate::client::PageFetcher;
use crate::error::{AppError, ClientError, Result};
use crate::models::BusinessListing;
use crate::scraper::{Markup, PageInfo, Scraper};
use crate::utils::search_url;
use crate::{log_error, log_info, log_warn};
use async_stream::stream;
use futures::stream::BoxStream;
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use url::Url;

struct SearchPage {
    info: PageInfo,
    listings: Vec<BusinessListing>,
}

/// Walks the paginated search results for one term and scope.
pub struct SearchResultsWalker {
    fetcher: Arc<dyn PageFetcher>,
    markup: Arc<Markup>,
    base_url: String,
    site: Url,
    cancel: CancellationToken,
}

impl SearchResultsWalker {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        markup: Arc<Markup>,
        base_url: &str,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let site = Url::parse(base_url)
            .map_err(|e| ClientError::InvalidUrl(format!("Invalid base URL: {}", e)))?;
        Ok(Self {
            fetcher,
            markup,
            base_url: base_url.to_string(),
            site,
            cancel,
        })
    }

    /// Lazily yields every business listing, page by page.
    ///
    /// The next results page is fetched only once the previous page's
    /// listings have been consumed. The stream ends after the first error.
    pub fn walk<'a>(
        &'a self,
        term: &'a str,
        scope: &'a str,
    ) -> BoxStream<'a, Result<BusinessListing>> {
        Box::pin(stream! {
            let mut next = match search_url(&self.base_url, term, scope) {
                Ok(url) => Some(url),
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };
            let mut visited = HashSet::new();
            let mut page_number = 0usize;

            while let Some(url) = next.take() {
                if self.cancel.is_cancelled() {
                    yield Err(AppError::Cancelled);
                    return;
                }
                page_number += 1;
                visited.insert(url.clone());

                let content = match self.fetcher.fetch(url.as_str()).await {
                    Ok(content) => content,
                    Err(e) => {
                        log_error!(e => scope, page = page_number, url = %url, "[search] Failed to fetch results page");
                        yield Err(e);
                        return;
                    }
                };

                let page = match self.parse_page(&content, url.clone()) {
                    Ok(page) => page,
                    Err(e) => {
                        log_error!(e => scope, page = page_number, url = %url, "[search] Unreadable results page");
                        yield Err(e);
                        return;
                    }
                };

                log_info!(
                    scope,
                    page = page_number,
                    "[search] Scraping page: {}, {}",
                    page.info.header,
                    page.info.page_indicator
                );

                for listing in page.listings {
                    yield Ok(listing);
                }

                next = match page.info.next_url {
                    Some(next_url) if visited.contains(&next_url) => {
                        log_warn!(scope, url = %next_url, "[search] Next link points to a visited page, stopping");
                        None
                    }
                    other => other,
                };
            }

            log_info!(scope, pages = page_number, "[search] Reached last results page");
        })
    }

    fn parse_page(&self, content: &str, url: Url) -> Result<SearchPage> {
        let scraper = Scraper::new(content, url, &self.markup);
        let info = scraper.page().analyze()?;
        let listings = scraper.content().extract_listings(&self.site);
        Ok(SearchPage { info, listings })
    }
}
