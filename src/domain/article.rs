use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const SHORT_KEY_LEN: usize = 8;

/// Attribution attached to an article.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleSource {
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub source: Option<ArticleSource>,
    pub author: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub url_to_image: Option<String>,
    /// Publication time as sent by the API (RFC 3339)
    pub published_at: Option<String>,
    pub content: Option<String>,
}

impl Article {
    /// Stable key for an article. Articles carry no id, so the url is hashed,
    /// falling back to the title when the url is missing.
    pub fn key(&self) -> String {
        let basis = self
            .url
            .as_deref()
            .or(self.title.as_deref())
            .unwrap_or_default();
        Self::generate_key(basis)
    }

    /// First characters of [`key`](Self::key), as printed in listings.
    pub fn short_key(&self) -> String {
        let mut key = self.key();
        key.truncate(SHORT_KEY_LEN);
        key
    }

    /// Whether `prefix` identifies this article. Case-insensitive; a blank
    /// prefix matches nothing.
    pub fn matches_key(&self, prefix: &str) -> bool {
        let prefix = prefix.trim().to_lowercase();
        !prefix.is_empty() && self.key().starts_with(&prefix)
    }

    pub fn generate_key(basis: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(basis.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("(Untitled)")
    }

    pub fn source_name(&self) -> Option<&str> {
        self.source.as_ref().and_then(|s| s.name.as_deref())
    }

    /// Best available body text: content, then description.
    pub fn display_content(&self) -> &str {
        self.content
            .as_deref()
            .or(self.description.as_deref())
            .unwrap_or("")
    }

    pub fn published_at_utc(&self) -> Option<DateTime<Utc>> {
        self.published_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }
}
