use std::sync::Arc;

use async_trait::async_trait;

use crate::controller::PageSource;
use crate::domain::{Article, FetchResult, Source};
use crate::fetcher::NewsFetcher;

/// Articles of one news source, `key` being the source id.
pub struct ArticlePages {
    fetcher: Arc<dyn NewsFetcher + Send + Sync>,
}

impl ArticlePages {
    pub fn new(fetcher: Arc<dyn NewsFetcher + Send + Sync>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl PageSource for ArticlePages {
    type Item = Article;

    async fn fetch_page(&self, key: &str, page: u32) -> FetchResult<Vec<Article>> {
        self.fetcher.fetch_articles_by_source(key, page).await
    }
}

/// Sources of one category, `key` being the category name. Not paginated.
pub struct CategorySources {
    fetcher: Arc<dyn NewsFetcher + Send + Sync>,
}

impl CategorySources {
    pub fn new(fetcher: Arc<dyn NewsFetcher + Send + Sync>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl PageSource for CategorySources {
    type Item = Source;

    async fn fetch_page(&self, key: &str, _page: u32) -> FetchResult<Vec<Source>> {
        self.fetcher.fetch_sources_by_category(key).await
    }

    fn is_paginated(&self) -> bool {
        false
    }
}
