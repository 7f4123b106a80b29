use serde::{Deserialize, Serialize};

/// A search result that links to a business detail page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusinessListing {
    pub name: String,
    pub url: String,
}

/// Header data read once from a business detail page.
///
/// `score` and `review_count` are both `None` when the rating summary could
/// not be read; such a business contributes no reviews.
#[derive(Debug, Clone, PartialEq)]
pub struct BusinessMetadata {
    pub business_name: String,
    pub score: Option<f32>,
    pub review_count: Option<u32>,
}

impl BusinessMetadata {
    pub fn rated(business_name: impl Into<String>, score: f32, review_count: u32) -> Self {
        Self {
            business_name: business_name.into(),
            score: Some(score),
            review_count: Some(review_count),
        }
    }

    pub fn unrated(business_name: impl Into<String>) -> Self {
        Self {
            business_name: business_name.into(),
            score: None,
            review_count: None,
        }
    }

    pub fn is_rated(&self) -> bool {
        self.score.is_some() && self.review_count.is_some()
    }

    pub fn score_or_zero(&self) -> f32 {
        self.score.unwrap_or(0.0)
    }

    pub fn review_count_or_zero(&self) -> u32 {
        self.review_count.unwrap_or(0)
    }
}

/// One review, stamped with its business header and scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ReviewRecord {
    pub business_name: String,
    pub score: f32,
    pub review_count: u32,
    pub scope: String,
    pub text: String,
    pub date: String,
    pub rating: f32,
}

impl ReviewRecord {
    pub fn new(
        metadata: &BusinessMetadata,
        scope: &str,
        text: String,
        date: String,
        rating: f32,
    ) -> Self {
        Self {
            business_name: metadata.business_name.clone(),
            score: metadata.score_or_zero(),
            review_count: metadata.review_count_or_zero(),
            scope: scope.to_string(),
            text,
            date,
            rating,
        }
    }
}
