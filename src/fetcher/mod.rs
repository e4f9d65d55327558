pub mod http_fetcher;

use async_trait::async_trait;

use crate::domain::{Article, FetchResult, Source};

/// Remote news data source.
///
/// Each call is a single request with no internal retry, and always resolves
/// to a terminal variant: `Success` with at least one item, `Empty`, or
/// `Error`. Transport and parse failures are reported as `Error`, never
/// propagated as panics.
#[async_trait]
pub trait NewsFetcher {
    async fn fetch_sources_by_category(&self, category: &str) -> FetchResult<Vec<Source>>;

    async fn fetch_articles_by_source(&self, source: &str, page: u32) -> FetchResult<Vec<Article>>;
}
