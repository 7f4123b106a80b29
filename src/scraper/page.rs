use super::predicate::text_of;
use super::Markup;
use crate::error::{Result, ScraperError};
use scraper::Html;
use url::Url;

/// Header and pagination data of a listing page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageInfo {
    pub header: String,
    pub page_indicator: String,
    pub next_url: Option<Url>,
}

pub struct PageScraper<'a> {
    document: &'a Html,
    url: &'a Url,
    markup: &'a Markup,
}

impl<'a> PageScraper<'a> {
    pub(crate) fn new(document: &'a Html, url: &'a Url, markup: &'a Markup) -> Self {
        Self {
            document,
            url,
            markup,
        }
    }

    /// Header, page-of-pages indicator and next link. Both texts are required.
    pub fn analyze(&self) -> Result<PageInfo> {
        let header = self.header().ok_or_else(|| self.missing("page header"))?;
        let page_indicator = self
            .page_indicator()
            .ok_or_else(|| self.missing("page-of-pages indicator"))?;

        Ok(PageInfo {
            header,
            page_indicator,
            next_url: self.next_page_url(),
        })
    }

    pub fn header(&self) -> Option<String> {
        self.markup
            .heading
            .find_one(self.document.root_element())
            .map(text_of)
    }

    pub fn page_indicator(&self) -> Option<String> {
        self.markup
            .page_indicator
            .find_one(self.document.root_element())
            .map(text_of)
    }

    /// Absolute URL of the "next" pagination anchor, if any.
    pub fn next_page_url(&self) -> Option<Url> {
        let href = self
            .markup
            .next_page
            .find_one(self.document.root_element())?
            .value()
            .attr("href")?;

        match self.url.join(href) {
            Ok(url) => Some(url),
            Err(e) => {
                crate::log_warn!(page = %self.url, href, "[scraper] Unusable next link: {}", e);
                None
            }
        }
    }

    fn missing(&self, element: &'static str) -> ScraperError {
        ScraperError::MissingElement {
            element,
            url: self.url.to_string(),
        }
    }
}
