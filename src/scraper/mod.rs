mod content;
mod page;
mod predicate;

pub use content::{ContentScraper, ReviewEvent};
pub use page::{PageInfo, PageScraper};
use predicate::Predicate;

use crate::error::Result;
use scraper::Html;
use url::Url;

/// Element predicates for the listing site's markup.
#[derive(Debug, Clone)]
pub struct Markup {
    pub heading: Predicate,
    pub page_indicator: Predicate,
    pub listing_card: Predicate,
    pub anchor: Predicate,
    pub next_page: Predicate,
    pub rating_block: Predicate,
    pub review_block: Predicate,
    pub paragraph: Predicate,
    pub caption: Predicate,
    pub image: Predicate,
    /// Path prefix of business detail pages.
    pub business_path: String,
}

impl Markup {
    pub fn new() -> Result<Self> {
        Ok(Self {
            heading: Predicate::tag("h1")?,
            page_indicator: Predicate::tag("div")?
                .class_pattern(r"page-of-pages arrange_unit arrange_unit--fill")?,
            listing_card: Predicate::tag("div")?.class_pattern(r"biz-listing-large")?,
            anchor: Predicate::tag("a")?,
            next_page: Predicate::tag("a")?
                .class_exact("u-decoration-none next pagination-links_anchor"),
            rating_block: Predicate::tag("div")?
                .class_exact("biz-rating biz-rating-very-large clearfix"),
            review_block: Predicate::tag("div")?.class_token("review-content"),
            paragraph: Predicate::tag("p")?,
            caption: Predicate::tag("span")?,
            image: Predicate::tag("img")?,
            business_path: "/biz/".to_string(),
        })
    }
}

/// A parsed page together with the URL it was fetched from.
pub struct Scraper<'m> {
    document: Html,
    url: Url,
    markup: &'m Markup,
}

impl<'m> Scraper<'m> {
    pub fn new(html: &str, url: Url, markup: &'m Markup) -> Self {
        Self {
            document: Html::parse_document(html),
            url,
            markup,
        }
    }

    pub fn page(&self) -> PageScraper {
        PageScraper::new(&self.document, &self.url, self.markup)
    }

    pub fn content(&self) -> ContentScraper {
        ContentScraper::new(&self.document, &self.url, self.markup)
    }
}
