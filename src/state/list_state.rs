use std::sync::{Mutex, PoisonError};

use tokio::sync::watch;

use crate::domain::FetchResult;
use crate::search::{self, Searchable};
use crate::state::cell::{StateCell, Subscription};

/// Snapshot of a controller's page cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationCursor {
    /// Next page to request. Only advances on a non-empty page.
    pub current_page: u32,
    pub is_last_page: bool,
    /// A fetch is outstanding; doubles as the "loading more" indicator.
    pub is_fetch_in_flight: bool,
    /// Page whose fetch failed during pagination, awaiting retry or dismissal.
    pub last_failed_page: Option<u32>,
}

impl Default for PaginationCursor {
    fn default() -> Self {
        Self {
            current_page: 1,
            is_last_page: false,
            is_fetch_in_flight: false,
            last_failed_page: None,
        }
    }
}

/// Observable state of one list screen.
///
/// Holds the controller's published result, the keyword-filtered view of it,
/// the keyword itself, the pagination error notice and the cursor snapshot.
/// The filtered view is recomputed inside the same call that changes either
/// the result or the keyword, and both values are stored before any observer
/// runs, so an observer never sees a filtered view derived from stale input.
pub struct ListState<T> {
    result: StateCell<FetchResult<Vec<T>>>,
    filtered: StateCell<FetchResult<Vec<T>>>,
    keyword: StateCell<String>,
    pagination_error: StateCell<Option<String>>,
    cursor: StateCell<PaginationCursor>,
    // Serializes the two writers of `filtered`. Never held while observers run.
    derive: Mutex<()>,
}

impl<T> ListState<T>
where
    T: Searchable + Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            result: StateCell::new(FetchResult::Loading),
            filtered: StateCell::new(FetchResult::Loading),
            keyword: StateCell::new(String::new()),
            pagination_error: StateCell::new(None),
            cursor: StateCell::new(PaginationCursor::default()),
            derive: Mutex::new(()),
        }
    }

    pub fn current_result(&self) -> FetchResult<Vec<T>> {
        self.result.get()
    }

    pub fn current_filtered_result(&self) -> FetchResult<Vec<T>> {
        self.filtered.get()
    }

    pub fn keyword(&self) -> String {
        self.keyword.get()
    }

    pub fn pagination_error(&self) -> Option<String> {
        self.pagination_error.get()
    }

    pub fn cursor(&self) -> PaginationCursor {
        self.cursor.get()
    }

    /// Set the search keyword and re-derive the filtered view.
    pub fn update_keyword(&self, keyword: impl Into<String>) {
        let keyword = keyword.into();
        {
            let _guard = self.derive.lock().unwrap_or_else(PoisonError::into_inner);
            if self.keyword.get() == keyword {
                return;
            }

            let filtered = search::filter_result(&self.result.get(), &keyword);
            self.keyword.replace(keyword);
            self.filtered.replace(filtered);
        }
        self.keyword.notify();
        self.filtered.notify();
    }

    pub(crate) fn publish_result(&self, result: FetchResult<Vec<T>>) {
        {
            let _guard = self.derive.lock().unwrap_or_else(PoisonError::into_inner);
            let filtered = search::filter_result(&result, &self.keyword.get());
            self.result.replace(result);
            self.filtered.replace(filtered);
        }
        self.result.notify();
        self.filtered.notify();
    }

    pub(crate) fn set_pagination_error(&self, message: Option<String>) {
        if self.pagination_error.get() != message {
            self.pagination_error.set(message);
        }
    }

    pub(crate) fn publish_cursor(&self, cursor: PaginationCursor) {
        if self.cursor.get() != cursor {
            self.cursor.set(cursor);
        }
    }

    pub fn observe_result<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&FetchResult<Vec<T>>) + Send + 'static,
    {
        self.result.observe(callback)
    }

    pub fn observe_filtered<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&FetchResult<Vec<T>>) + Send + 'static,
    {
        self.filtered.observe(callback)
    }

    pub fn observe_keyword<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&String) + Send + 'static,
    {
        self.keyword.observe(callback)
    }

    pub fn observe_pagination_error<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&Option<String>) + Send + 'static,
    {
        self.pagination_error.observe(callback)
    }

    pub fn observe_cursor<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&PaginationCursor) + Send + 'static,
    {
        self.cursor.observe(callback)
    }

    pub fn watch_cursor(&self) -> watch::Receiver<PaginationCursor> {
        self.cursor.watch()
    }
}

impl<T> Default for ListState<T>
where
    T: Searchable + Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for ListState<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListState")
            .field("result", &self.result)
            .field("keyword", &self.keyword)
            .field("pagination_error", &self.pagination_error)
            .field("cursor", &self.cursor)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc::RecvTimeoutError;
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::domain::Source;

    fn source(name: &str, category: &str) -> Source {
        Source {
            id: Some(name.to_lowercase()),
            name: Some(name.into()),
            category: Some(category.into()),
            ..Default::default()
        }
    }

    fn sources() -> Vec<Source> {
        vec![
            source("TechCrunch", "technology"),
            source("Wired", "technology"),
            source("ESPN", "sports"),
        ]
    }

    #[test]
    fn test_initial_state_is_loading() {
        let state: ListState<Source> = ListState::new();
        assert_eq!(state.current_result(), FetchResult::Loading);
        assert_eq!(state.current_filtered_result(), FetchResult::Loading);
        assert_eq!(state.keyword(), "");
        assert_eq!(state.pagination_error(), None);
        assert_eq!(state.cursor(), PaginationCursor::default());
    }

    #[test]
    fn test_publish_result_refilters_with_current_keyword() {
        let state = ListState::new();
        state.update_keyword("wired");
        state.publish_result(FetchResult::Success(sources()));

        assert_eq!(state.current_result(), FetchResult::Success(sources()));
        assert_eq!(
            state.current_filtered_result(),
            FetchResult::Success(vec![source("Wired", "technology")])
        );
    }

    #[test]
    fn test_update_keyword_refilters_current_result() {
        let state = ListState::new();
        state.publish_result(FetchResult::Success(sources()));

        state.update_keyword("TechCrunch");
        assert_eq!(state.current_filtered_result().items().len(), 1);

        state.update_keyword("Wired");
        assert_eq!(
            state.current_filtered_result(),
            FetchResult::Success(vec![source("Wired", "technology")])
        );

        state.update_keyword("");
        assert_eq!(state.current_filtered_result(), FetchResult::Success(sources()));
    }

    #[test]
    fn test_empty_and_error_pass_through_filter() {
        let state: ListState<Source> = ListState::new();
        state.publish_result(FetchResult::Empty);
        state.update_keyword("x");
        assert_eq!(state.current_filtered_result(), FetchResult::Empty);

        state.publish_result(FetchResult::Error("Network error".into()));
        assert_eq!(
            state.current_filtered_result(),
            FetchResult::Error("Network error".into())
        );
    }

    #[test]
    fn test_filtered_observer_never_sees_stale_result() {
        let state = Arc::new(ListState::new());
        state.update_keyword("espn");

        let checker = state.clone();
        let mismatches = Arc::new(Mutex::new(0));
        let counter = mismatches.clone();
        let _sub = state.observe_result(move |result: &FetchResult<Vec<Source>>| {
            let expected = search::filter_result(result, &checker.keyword());
            if checker.current_filtered_result() != expected {
                *counter.lock().unwrap() += 1;
            }
        });

        state.publish_result(FetchResult::Success(sources()));
        state.publish_result(FetchResult::Empty);

        assert_eq!(*mismatches.lock().unwrap(), 0);
    }

    #[test]
    fn test_keyword_observer_sees_each_distinct_value() {
        let state: ListState<Source> = ListState::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _sub = state.observe_keyword(move |k: &String| sink.lock().unwrap().push(k.clone()));

        state.update_keyword("test keyword");
        state.update_keyword("test keyword");
        state.update_keyword("");

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["".to_string(), "test keyword".to_string(), "".to_string()]
        );
    }

    #[test]
    fn test_pagination_error_notifications() {
        let state: ListState<Source> = ListState::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _sub = state.observe_pagination_error(move |e: &Option<String>| {
            sink.lock().unwrap().push(e.clone())
        });

        state.set_pagination_error(Some("timeout".into()));
        state.set_pagination_error(None);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![None, Some("timeout".to_string()), None]
        );
    }

    /// Run `f` on its own thread and fail instead of hanging if it never returns.
    fn within_deadline(f: impl FnOnce() + Send + 'static) {
        let (done_tx, done_rx) = std::sync::mpsc::channel();
        let handle = std::thread::spawn(move || {
            f();
            let _ = done_tx.send(());
        });
        if let Err(RecvTimeoutError::Timeout) = done_rx.recv_timeout(Duration::from_secs(3)) {
            panic!("publishing did not return");
        }
        if let Err(panic) = handle.join() {
            std::panic::resume_unwind(panic);
        }
    }

    #[test]
    fn test_result_observer_can_update_keyword() {
        within_deadline(|| {
            let state = Arc::new(ListState::new());
            let inner = state.clone();
            let _sub = state.observe_result(move |result: &FetchResult<Vec<Source>>| {
                if result.is_success() {
                    inner.update_keyword("");
                    inner.update_keyword("espn");
                }
            });

            state.publish_result(FetchResult::Success(sources()));

            assert_eq!(state.keyword(), "espn");
            assert_eq!(
                state.current_filtered_result(),
                FetchResult::Success(vec![source("ESPN", "sports")])
            );
        });
    }

    #[test]
    fn test_filtered_observer_can_update_keyword() {
        within_deadline(|| {
            let state = Arc::new(ListState::new());
            state.publish_result(FetchResult::Success(sources()));

            let inner = state.clone();
            let seen = Arc::new(Mutex::new(Vec::new()));
            let sink = seen.clone();
            let _sub = state.observe_filtered(move |filtered: &FetchResult<Vec<Source>>| {
                sink.lock().unwrap().push(filtered.items().len());
                // Narrow an overly broad match down to one category.
                if filtered.items().len() > 1 {
                    inner.update_keyword("sports");
                }
            });

            assert_eq!(state.keyword(), "sports");
            assert_eq!(*seen.lock().unwrap(), vec![3, 1]);

            state.update_keyword("technology");
            assert_eq!(state.keyword(), "sports");
            assert_eq!(*seen.lock().unwrap(), vec![3, 1, 2, 1]);
        });
    }
}
