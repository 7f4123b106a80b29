mod builder;

use crate::config::Config;
use crate::error::{ClientError, Result};
use async_trait::async_trait;
pub use builder::{ClientBuilder, DEFAULT_USER_AGENT};
use rquest::Client as RquestClient;
use std::time::Duration;
use url::Url;

/// Source of raw page content.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches `url` and returns the response body. Non-success statuses are errors.
    async fn fetch(&self, url: &str) -> Result<String>;
}

#[derive(Debug)]
pub struct ClientResponse {
    pub status: u16,
    pub content: String,
}

pub struct Client {
    inner: RquestClient,
    base_url: String,
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Client with the configured base URL, user agent, proxy and timeout.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut builder = Self::builder()
            .base_url(&config.base_url)
            .user_agent(&config.user_agent)?
            .timeout(Duration::from_secs(config.request_timeout));

        if let Some(proxy) = &config.proxy {
            builder = builder.proxy(proxy);
        }
        builder.build()
    }

    /// `path` may be relative to the base URL or absolute.
    pub async fn get(&self, path: &str) -> Result<ClientResponse> {
        let url = self.build_url(path)?;
        self.request(&url).await
    }

    fn build_url(&self, path: &str) -> Result<String> {
        let base = Url::parse(&self.base_url)
            .map_err(|e| ClientError::InvalidUrl(format!("Invalid base URL: {}", e)))?;

        let full_url = base
            .join(path)
            .map_err(|e| ClientError::InvalidUrl(format!("Invalid path {}: {}", path, e)))?;

        Ok(full_url.to_string())
    }

    async fn request(&self, url: &str) -> Result<ClientResponse> {
        let response = self
            .inner
            .get(url)
            .send()
            .await
            .map_err(|e| request_error(url, e))?;

        let status = response.status().as_u16();
        let is_success = response.status().is_success();
        let content = response.text().await.map_err(|e| request_error(url, e))?;

        if !is_success {
            return Err(ClientError::ResponseError {
                status_code: status,
                url: url.to_string(),
            }
            .into());
        }

        Ok(ClientResponse { status, content })
    }
}

fn request_error(url: &str, e: rquest::Error) -> ClientError {
    if e.is_timeout() {
        ClientError::Timeout {
            url: url.to_string(),
        }
    } else {
        ClientError::RequestFailed {
            url: url.to_string(),
            message: e.to_string(),
        }
    }
}

#[async_trait]
impl PageFetcher for Client {
    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self.get(url).await?;
        crate::log_debug!(
            url,
            status = response.status,
            bytes = response.content.len(),
            "[client] Fetched page"
        );
        Ok(response.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_relative_and_absolute_paths() {
        let client = Client::builder()
            .base_url("https://www.yelp.com")
            .build()
            .unwrap();

        assert_eq!(
            client.build_url("/biz/some-club").unwrap(),
            "https://www.yelp.com/biz/some-club"
        );
        assert_eq!(
            client
                .build_url("https://www.yelp.com/biz/some-club?start=20")
                .unwrap(),
            "https://www.yelp.com/biz/some-club?start=20"
        );
    }
}
