use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;
use url::Url;

use crate::app::{NewsError, Result};
use crate::config::ApiConfig;
use crate::domain::{Article, FetchResult, Source};
use crate::fetcher::NewsFetcher;
use crate::normalizer::Normalizer;

const API_KEY_HEADER: &str = "X-Api-Key";

/// reqwest-based client for the v2 headlines API.
pub struct HttpFetcher {
    client: Client,
    base_url: Url,
    page_size: u32,
    normalizer: Normalizer,
}

impl HttpFetcher {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(key) = &config.api_key {
            let value = HeaderValue::from_str(key)
                .map_err(|_| NewsError::Config("API key contains invalid characters".into()))?;
            headers.insert(API_KEY_HEADER, value);
        }

        let client = Client::builder()
            .timeout(config.timeout())
            .gzip(true)
            .brotli(true)
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url(&config.base_url)?,
            page_size: config.page_size.max(1),
            normalizer: Normalizer::new(),
        })
    }

    pub fn sources_url(&self, category: &str) -> Result<Url> {
        let mut url = self.base_url.join("top-headlines/sources")?;
        url.query_pairs_mut().append_pair("category", category);
        Ok(url)
    }

    pub fn articles_url(&self, source: &str, page: u32) -> Result<Url> {
        let mut url = self.base_url.join("everything")?;
        url.query_pairs_mut()
            .append_pair("sources", source)
            .append_pair("page", &page.to_string())
            .append_pair("pageSize", &self.page_size.to_string());
        Ok(url)
    }

    async fn get(&self, url: Url) -> Result<Vec<u8>> {
        tracing::debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            if let Some(err) = self.normalizer.api_error(&body) {
                return Err(err);
            }
            return Err(NewsError::Other(format!("Request failed with status {}", status)));
        }

        Ok(body.to_vec())
    }

    async fn sources(&self, category: &str) -> Result<Vec<Source>> {
        let body = self.get(self.sources_url(category)?).await?;
        self.normalizer.sources(&body)
    }

    async fn articles(&self, source: &str, page: u32) -> Result<Vec<Article>> {
        let body = self.get(self.articles_url(source, page)?).await?;
        self.normalizer.articles(&body)
    }
}

#[async_trait]
impl NewsFetcher for HttpFetcher {
    async fn fetch_sources_by_category(&self, category: &str) -> FetchResult<Vec<Source>> {
        let result = self.sources(category).await;
        match &result {
            Ok(sources) => tracing::info!("Fetched {} sources for {}", sources.len(), category),
            Err(e) => tracing::warn!("Failed to fetch sources for {}: {}", category, e),
        }
        FetchResult::from(result)
    }

    async fn fetch_articles_by_source(&self, source: &str, page: u32) -> FetchResult<Vec<Article>> {
        let result = self.articles(source, page).await;
        match &result {
            Ok(articles) => {
                tracing::info!("Fetched {} articles from {} page {}", articles.len(), source, page)
            }
            Err(e) => tracing::warn!("Failed to fetch {} page {}: {}", source, page, e),
        }
        FetchResult::from(result)
    }
}

/// Parse the base URL, making sure relative joins land under its path.
fn base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
