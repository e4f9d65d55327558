use serde::{Deserialize, Serialize};

/// Message used when a failure carries no usable description.
pub const UNEXPECTED_ERROR: &str = "Unexpected Error";

/// Outcome of a fetch attempt, and the state published for a list.
///
/// Exactly one variant is active. A successful fetch that returned no rows is
/// represented as [`FetchResult::Empty`], never as `Success` of an empty list;
/// use [`FetchResult::from_items`] to get that coercion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchResult<T> {
    /// Request in flight, no payload yet
    Loading,
    /// Request succeeded with zero items
    Empty,
    /// Request succeeded, items in server order
    Success(T),
    /// Request failed with a human readable cause
    Error(String),
}

impl<T> FetchResult<T> {
    /// Build an `Error`, substituting [`UNEXPECTED_ERROR`] for a blank message.
    pub fn error(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.trim().is_empty() {
            FetchResult::Error(UNEXPECTED_ERROR.to_string())
        } else {
            FetchResult::Error(message)
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FetchResult::Success(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, FetchResult::Error(_))
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            FetchResult::Error(message) => Some(message),
            _ => None,
        }
    }
}

impl<T> FetchResult<Vec<T>> {
    /// Wrap a fetched page, coercing a zero-length page into `Empty`.
    pub fn from_items(items: Vec<T>) -> Self {
        if items.is_empty() {
            FetchResult::Empty
        } else {
            FetchResult::Success(items)
        }
    }

    /// Re-apply the empty-page coercion to a result produced elsewhere.
    pub fn normalized(self) -> Self {
        match self {
            FetchResult::Success(items) => Self::from_items(items),
            FetchResult::Error(message) => Self::error(message),
            other => other,
        }
    }

    /// Items of a `Success`, or an empty slice for every other variant.
    pub fn items(&self) -> &[T] {
        match self {
            FetchResult::Success(items) => items,
            _ => &[],
        }
    }
}

impl<T, E: std::fmt::Display> From<std::result::Result<Vec<T>, E>> for FetchResult<Vec<T>> {
    fn from(result: std::result::Result<Vec<T>, E>) -> Self {
        match result {
            Ok(items) => Self::from_items(items),
            Err(e) => Self::error(e.to_string()),
        }
    }
}

impl<T> Default for FetchResult<T> {
    fn default() -> Self {
        FetchResult::Loading
    }
}
