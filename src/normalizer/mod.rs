use html_escape::decode_html_entities;
use serde::Deserialize;

use crate::app::{NewsError, Result};
use crate::domain::{Article, ArticleSource, Source};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArticlesPayload {
    status: String,
    #[serde(default)]
    articles: Vec<ArticlePayload>,
    code: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArticlePayload {
    source: Option<SourceRefPayload>,
    author: Option<String>,
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    url_to_image: Option<String>,
    published_at: Option<String>,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SourceRefPayload {
    id: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SourcesPayload {
    status: String,
    #[serde(default)]
    sources: Vec<SourcePayload>,
    code: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SourcePayload {
    id: Option<String>,
    name: Option<String>,
    description: Option<String>,
    url: Option<String>,
    category: Option<String>,
    language: Option<String>,
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    code: Option<String>,
    message: Option<String>,
}

/// Maps API response bodies into domain records.
///
/// Text fields have HTML entities decoded and blank strings dropped, so an
/// absent field and an empty one look the same to the rest of the crate.
#[derive(Debug, Clone)]
pub struct Normalizer;

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    pub fn articles(&self, body: &[u8]) -> Result<Vec<Article>> {
        let payload: ArticlesPayload = serde_json::from_slice(body)?;
        check_status(&payload.status, payload.code, payload.message)?;

        Ok(payload
            .articles
            .into_iter()
            .map(|a| Article {
                source: a.source.map(|s| ArticleSource {
                    id: clean(s.id),
                    name: text(s.name),
                }),
                author: text(a.author),
                title: text(a.title),
                description: text(a.description),
                url: clean(a.url),
                url_to_image: clean(a.url_to_image),
                published_at: clean(a.published_at),
                content: text(a.content),
            })
            .collect())
    }

    pub fn sources(&self, body: &[u8]) -> Result<Vec<Source>> {
        let payload: SourcesPayload = serde_json::from_slice(body)?;
        check_status(&payload.status, payload.code, payload.message)?;

        Ok(payload
            .sources
            .into_iter()
            .map(|s| Source {
                id: clean(s.id),
                name: text(s.name),
                description: text(s.description),
                url: clean(s.url),
                category: clean(s.category),
                language: clean(s.language),
                country: clean(s.country),
            })
            .collect())
    }

    /// Extract the API's own error description from a failed response body.
    pub fn api_error(&self, body: &[u8]) -> Option<NewsError> {
        let payload: ErrorPayload = serde_json::from_slice(body).ok()?;
        let message = clean(payload.message)?;
        Some(NewsError::Api {
            code: payload.code,
            message,
        })
    }
}

fn check_status(status: &str, code: Option<String>, message: Option<String>) -> Result<()> {
    if status.eq_ignore_ascii_case("ok") {
        return Ok(());
    }
    Err(NewsError::Api {
        code,
        message: clean(message).unwrap_or_else(|| format!("API returned status '{}'", status)),
    })
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn text(value: Option<String>) -> Option<String> {
    clean(value).map(|v| decode_html_entities(&v).to_string())
}
