use crate::error::{ClientError, Result};
use std::fs;
use std::path::Path;
use url::Url;

pub fn ensure_directory(dir: impl AsRef<Path>) -> Result<()> {
    if !dir.as_ref().exists() {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

/// File-name-safe form of a scope: `"San Jose CA"` becomes `"san-jose-ca"`.
pub fn scope_slug(scope: &str) -> String {
    let slug = scope
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| part.to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join("-");

    if slug.is_empty() {
        "scope".to_string()
    } else {
        slug
    }
}

/// `{base}/search?find_desc={term}&find_loc={scope}` with form encoding.
pub fn search_url(base_url: &str, term: &str, scope: &str) -> Result<Url> {
    let base = Url::parse(base_url)
        .map_err(|e| ClientError::InvalidUrl(format!("Invalid base URL: {}", e)))?;
    let mut url = base
        .join("/search")
        .map_err(|e| ClientError::InvalidUrl(format!("Invalid search URL: {}", e)))?;

    url.query_pairs_mut()
        .append_pair("find_desc", term)
        .append_pair("find_loc", scope);
    Ok(url)
}
