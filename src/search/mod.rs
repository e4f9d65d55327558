//! Client-side keyword filtering over fetched lists.
//!
//! Matching is a case-insensitive substring test against a fixed set of text
//! fields per item type. The keyword is trimmed first; a blank keyword keeps
//! the list as-is. Filtering is pure, so it is cheap enough to rerun on every
//! keystroke and safe to share between controllers.

use crate::domain::{Article, FetchResult, Source};

/// An item that can be matched against a search keyword.
pub trait Searchable {
    /// Fields considered by [`filter`]. Absent fields never match.
    fn search_fields(&self) -> Vec<Option<&str>>;
}

impl Searchable for Article {
    fn search_fields(&self) -> Vec<Option<&str>> {
        vec![
            self.title.as_deref(),
            self.description.as_deref(),
            self.author.as_deref(),
            self.content.as_deref(),
        ]
    }
}

impl Searchable for Source {
    fn search_fields(&self) -> Vec<Option<&str>> {
        vec![
            self.name.as_deref(),
            self.description.as_deref(),
            self.category.as_deref(),
        ]
    }
}

/// Keep the items matching `keyword`, preserving their relative order.
pub fn filter<T: Searchable + Clone>(items: &[T], keyword: &str) -> Vec<T> {
    let needle = keyword.trim();
    if needle.is_empty() {
        return items.to_vec();
    }

    let needle = needle.to_lowercase();
    items
        .iter()
        .filter(|item| matches(*item, &needle))
        .cloned()
        .collect()
}

/// Apply [`filter`] to the payload of a `Success`; other variants pass through.
///
/// A `Success` whose items all get filtered out stays `Success(vec![])` so a
/// consumer can tell "no matches" apart from "nothing was fetched".
pub fn filter_result<T: Searchable + Clone>(
    result: &FetchResult<Vec<T>>,
    keyword: &str,
) -> FetchResult<Vec<T>> {
    match result {
        FetchResult::Success(items) => FetchResult::Success(filter(items, keyword)),
        FetchResult::Loading => FetchResult::Loading,
        FetchResult::Empty => FetchResult::Empty,
        FetchResult::Error(message) => FetchResult::Error(message.clone()),
    }
}

fn matches<T: Searchable>(item: &T, needle_lower: &str) -> bool {
    item.search_fields()
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(needle_lower))
}
