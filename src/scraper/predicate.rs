use crate::error::{Result, ScraperError};
use regex::Regex;
use scraper::{ElementRef, Selector};

/// How an attribute value is compared.
#[derive(Debug, Clone)]
pub enum AttrMatch {
    /// Whole value, whitespace-normalized, must be equal.
    Exact(String),
    /// One of the whitespace-separated tokens must be equal.
    Token(String),
    /// Regex searched anywhere in the raw value.
    Pattern(Regex),
}

impl AttrMatch {
    fn matches(&self, value: &str) -> bool {
        match self {
            AttrMatch::Exact(expected) => {
                let mut tokens = value.split_whitespace();
                let mut wanted = expected.split_whitespace();
                loop {
                    match (tokens.next(), wanted.next()) {
                        (Some(a), Some(b)) if a == b => continue,
                        (None, None) => return true,
                        _ => return false,
                    }
                }
            }
            AttrMatch::Token(expected) => {
                value.split_whitespace().any(|token| token == expected.as_str())
            }
            AttrMatch::Pattern(pattern) => pattern.is_match(value),
        }
    }
}

/// Element predicate: tag name plus an optional attribute matcher.
#[derive(Debug, Clone)]
pub struct Predicate {
    tag: Selector,
    attr: Option<(String, AttrMatch)>,
}

impl Predicate {
    pub fn tag(name: &str) -> Result<Self> {
        let tag = Selector::parse(name)
            .map_err(|e| ScraperError::SelectorError(format!("{}: {}", name, e)))?;
        Ok(Self { tag, attr: None })
    }

    pub fn attr_exact(mut self, attr: &str, value: &str) -> Self {
        self.attr = Some((attr.to_string(), AttrMatch::Exact(value.to_string())));
        self
    }

    pub fn attr_token(mut self, attr: &str, token: &str) -> Self {
        self.attr = Some((attr.to_string(), AttrMatch::Token(token.to_string())));
        self
    }

    pub fn attr_pattern(mut self, attr: &str, pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern)
            .map_err(|e| ScraperError::SelectorError(format!("{}: {}", pattern, e)))?;
        self.attr = Some((attr.to_string(), AttrMatch::Pattern(regex)));
        Ok(self)
    }

    pub fn class_exact(self, value: &str) -> Self {
        self.attr_exact("class", value)
    }

    /// Element carries `class` among possibly other classes.
    pub fn class_token(self, class: &str) -> Self {
        self.attr_token("class", class)
    }

    pub fn class_pattern(self, pattern: &str) -> Result<Self> {
        self.attr_pattern("class", pattern)
    }

    pub fn matches(&self, element: &ElementRef) -> bool {
        match &self.attr {
            None => true,
            Some((name, matcher)) => element
                .value()
                .attr(name)
                .is_some_and(|value| matcher.matches(value)),
        }
    }

    /// First matching descendant of `scope`, in document order.
    pub fn find_one<'a>(&self, scope: ElementRef<'a>) -> Option<ElementRef<'a>> {
        scope.select(&self.tag).find(|el| self.matches(el))
    }

    /// All matching descendants of `scope`, in document order.
    pub fn find_all<'a>(&self, scope: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        scope.select(&self.tag).filter(|el| self.matches(el)).collect()
    }
}

/// Trimmed text content of an element.
pub fn text_of(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// First whitespace-delimited token of `value`.
pub fn first_token(value: &str) -> Option<&str> {
    value.split_whitespace().next()
}
