use std::sync::Arc;

use crate::app::error::Result;
use crate::config::Config;
use crate::controller::{
    ArticleListController, ArticlePages, CategorySources, ListController, SourceListController,
};
use crate::fetcher::http_fetcher::HttpFetcher;
use crate::fetcher::NewsFetcher;

pub struct AppContext {
    pub config: Config,
    pub fetcher: Arc<dyn NewsFetcher + Send + Sync>,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        if config.api.api_key.is_none() {
            tracing::warn!("No API key configured, requests will be rejected");
        }
        let fetcher: Arc<dyn NewsFetcher + Send + Sync> = Arc::new(HttpFetcher::new(&config.api)?);
        Ok(Self::from_fetcher(config, fetcher))
    }

    pub fn from_fetcher(config: Config, fetcher: Arc<dyn NewsFetcher + Send + Sync>) -> Self {
        Self { config, fetcher }
    }

    /// Controller for the articles of `source`, already loading page 1.
    pub fn article_list(&self, source: &str) -> ArticleListController {
        let controller = ListController::new(ArticlePages::new(self.fetcher.clone()));
        controller.initialize(Some(source));
        controller
    }

    /// Controller for the sources of `category`, already loading.
    pub fn source_list(&self, category: &str) -> SourceListController {
        let controller = ListController::new(CategorySources::new(self.fetcher.clone()));
        controller.initialize(Some(category));
        controller
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::domain::{Article, FetchResult, Source};

    #[derive(Default)]
    struct RecordingFetcher {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl NewsFetcher for RecordingFetcher {
        async fn fetch_sources_by_category(&self, category: &str) -> FetchResult<Vec<Source>> {
            self.calls.lock().unwrap().push(format!("sources:{}", category));
            FetchResult::Success(vec![Source {
                id: Some("espn".into()),
                name: Some("ESPN".into()),
                ..Default::default()
            }])
        }

        async fn fetch_articles_by_source(&self, source: &str, page: u32) -> FetchResult<Vec<Article>> {
            self.calls.lock().unwrap().push(format!("articles:{}:{}", source, page));
            if page > 1 {
                return FetchResult::Empty;
            }
            FetchResult::Success(vec![Article {
                title: Some("Headline".into()),
                ..Default::default()
            }])
        }
    }

    fn context() -> (AppContext, Arc<RecordingFetcher>) {
        let fetcher = Arc::new(RecordingFetcher::default());
        let ctx = AppContext::from_fetcher(Config::default(), fetcher.clone());
        (ctx, fetcher)
    }

    #[test]
    fn test_new_builds_http_fetcher() {
        assert!(AppContext::new(Config::default()).is_ok());
    }

    #[tokio::test]
    async fn test_article_list_loads_first_page() {
        let (ctx, fetcher) = context();
        let list = ctx.article_list("bbc-news");
        list.settled().await;

        assert_eq!(list.current_result().items().len(), 1);
        assert_eq!(*fetcher.calls.lock().unwrap(), vec!["articles:bbc-news:1"]);

        list.load_more();
        let cursor = list.settled().await;
        assert!(cursor.is_last_page);
    }

    #[tokio::test]
    async fn test_source_list_is_single_shot() {
        let (ctx, fetcher) = context();
        let list = ctx.source_list("sports");
        let cursor = list.settled().await;

        assert!(cursor.is_last_page);
        assert_eq!(list.current_result().items()[0].display_name(), "ESPN");
        assert_eq!(*fetcher.calls.lock().unwrap(), vec!["sources:sports"]);
    }
}
