use super::predicate::{first_token, text_of};
use super::Markup;
use crate::error::{Result, ScraperError};
use crate::models::{BusinessListing, BusinessMetadata, ReviewRecord};
use crate::{log_debug, log_info};
use scraper::{ElementRef, Html};
use url::Url;

/// Outcome of reading one review block.
#[derive(Debug)]
pub enum ReviewEvent {
    Record(ReviewRecord),
    /// The block lacked a required sub-element.
    Skipped(ScraperError),
}

pub struct ContentScraper<'a> {
    document: &'a Html,
    url: &'a Url,
    markup: &'a Markup,
}

impl<'a> ContentScraper<'a> {
    pub(crate) fn new(document: &'a Html, url: &'a Url, markup: &'a Markup) -> Self {
        Self {
            document,
            url,
            markup,
        }
    }

    /// Business links from the listing cards, in page order.
    ///
    /// Cards whose first anchor does not point at a business detail page on
    /// `site` (ads, category links) are skipped.
    pub fn extract_listings(&self, site: &Url) -> Vec<BusinessListing> {
        let cards = self.markup.listing_card.find_all(self.document.root_element());
        let card_count = cards.len();

        let listings = cards
            .into_iter()
            .filter_map(|card| {
                let result = self.extract_listing(card, site);
                if result.is_none() {
                    log_debug!(page = %self.url, "[scraper] Skipping non-business listing card");
                }
                result
            })
            .collect::<Vec<_>>();

        log_debug!(
            page = %self.url,
            "[scraper] Found {} business links in {} listing cards",
            listings.len(),
            card_count
        );
        listings
    }

    fn extract_listing(&self, card: ElementRef, site: &Url) -> Option<BusinessListing> {
        let anchor = self.markup.anchor.find_one(card)?;
        let href = anchor.value().attr("href")?;
        let url = self.url.join(href).ok()?;

        if url.host_str() != site.host_str() || !url.path().starts_with(&self.markup.business_path)
        {
            return None;
        }

        Some(BusinessListing {
            name: text_of(anchor),
            url: url.to_string(),
        })
    }

    /// Business name plus rating summary. A missing or unreadable rating
    /// block yields unrated metadata; a missing heading is an error.
    pub fn extract_business_metadata(&self) -> Result<BusinessMetadata> {
        let root = self.document.root_element();
        let business_name = self
            .markup
            .heading
            .find_one(root)
            .map(text_of)
            .ok_or_else(|| ScraperError::MissingElement {
                element: "business heading",
                url: self.url.to_string(),
            })?;

        match self.extract_rating_summary(root) {
            Some((score, review_count)) => Ok(BusinessMetadata::rated(
                business_name,
                score,
                review_count,
            )),
            None => {
                log_info!(
                    page = %self.url,
                    "[scraper] No rating summary for {}",
                    business_name
                );
                Ok(BusinessMetadata::unrated(business_name))
            }
        }
    }

    fn extract_rating_summary(&self, root: ElementRef) -> Option<(f32, u32)> {
        let block = self.markup.rating_block.find_one(root)?;

        let alt = self.markup.image.find_one(block)?.value().attr("alt")?;
        let score = first_token(alt)?.parse().ok()?;

        let count_text = text_of(self.markup.caption.find_one(block)?);
        let review_count = first_token(&count_text)?.replace(',', "").parse().ok()?;

        Some((score, review_count))
    }

    /// All review blocks on the page, in document order.
    pub fn extract_reviews(&self, metadata: &BusinessMetadata, scope: &str) -> Vec<ReviewEvent> {
        self.markup
            .review_block
            .find_all(self.document.root_element())
            .into_iter()
            .map(|block| match self.extract_review(block, metadata, scope) {
                Ok(record) => ReviewEvent::Record(record),
                Err(e) => ReviewEvent::Skipped(e),
            })
            .collect()
    }

    fn extract_review(
        &self,
        block: ElementRef,
        metadata: &BusinessMetadata,
        scope: &str,
    ) -> std::result::Result<ReviewRecord, ScraperError> {
        let text = self
            .markup
            .paragraph
            .find_one(block)
            .map(|p| p.text().collect::<String>())
            .ok_or_else(|| self.missing("review text"))?;

        let date = self
            .markup
            .caption
            .find_one(block)
            .map(text_of)
            .ok_or_else(|| self.missing("review date"))?;

        let alt = self
            .markup
            .image
            .find_one(block)
            .and_then(|img| img.value().attr("alt"))
            .ok_or_else(|| self.missing("review rating"))?;

        let token = first_token(alt).ok_or_else(|| self.missing("review rating"))?;
        let rating = token.parse().map_err(|_| ScraperError::InvalidValue {
            field: "review rating",
            value: token.to_string(),
            url: self.url.to_string(),
        })?;

        Ok(ReviewRecord::new(metadata, scope, text, date, rating))
    }

    fn missing(&self, element: &'static str) -> ScraperError {
        ScraperError::MissingElement {
            element,
            url: self.url.to_string(),
        }
    }
}
