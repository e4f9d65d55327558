//! Paginated, filterable, retryable list controller.
//!
//! A [`ListController`] loads one list (the articles of a source, or the
//! sources of a category) page by page from a [`PageSource`] and publishes the
//! merged result into a [`ListState`]. The cursor and the accumulated items are
//! owned by an actor task, so every mutation is applied sequentially and at most
//! one fetch is in flight per controller.
//!
//! ```text
//! consumer ──commands──▶ actor ──fetch task──▶ PageSource
//!    ▲                     │  ◀──completion──┘
//!    └──── ListState ◀─────┘
//! ```
//!
//! Failure handling depends on which load failed:
//!
//! - the first page replaces the published result with `Error`; recover with
//!   [`ListController::retry_initial_load`]
//! - a later page leaves the list as it was and raises a pagination error;
//!   recover with [`ListController::retry_pagination`] or clear it with
//!   [`ListController::dismiss_pagination_error`]
//!
//! An empty page marks the end of the list.

mod actor;
mod pages;

pub use pages::{ArticlePages, CategorySources};

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::domain::FetchResult;
use crate::search::Searchable;
use crate::state::{ListState, PaginationCursor};

use self::actor::{Command, ControllerActor};

/// Where a controller gets its pages from.
#[async_trait]
pub trait PageSource: Send + Sync + 'static {
    type Item: Searchable + Clone + Send + Sync + 'static;

    /// Fetch page `page` (1-based) of the list identified by `key`.
    async fn fetch_page(&self, key: &str, page: u32) -> FetchResult<Vec<Self::Item>>;

    /// Whether later pages exist at all. Single-shot lists report `false` and
    /// are marked finished after their first successful load.
    fn is_paginated(&self) -> bool {
        true
    }
}

pub type ArticleListController = ListController<ArticlePages>;
pub type SourceListController = ListController<CategorySources>;

/// Handle to a running list controller.
///
/// Operations are fire-and-forget: they queue a command for the actor and
/// return immediately. Observe progress through [`state`](Self::state) or wait
/// for the current fetch with [`settled`](Self::settled). Dropping the handle
/// stops the actor and cancels its in-flight fetch; a result arriving later is
/// discarded. Must be created inside a tokio runtime.
pub struct ListController<P: PageSource> {
    tx: mpsc::UnboundedSender<Command<P::Item>>,
    state: Arc<ListState<P::Item>>,
    actor: JoinHandle<()>,
}

impl<P: PageSource> ListController<P> {
    pub fn new(source: P) -> Self {
        Self::with_source(Arc::new(source))
    }

    pub fn with_source(source: Arc<P>) -> Self {
        let state = Arc::new(ListState::new());
        let (tx, rx) = mpsc::unbounded_channel();
        let actor = ControllerActor::new(source, state.clone(), tx.clone(), rx);
        let actor = tokio::spawn(actor.run());

        Self { tx, state, actor }
    }

    /// Start loading the list for `key`. Without a key the controller stays
    /// idle. Only the first call has any effect.
    pub fn initialize(&self, key: Option<&str>) {
        self.send(Command::Initialize(key.map(String::from)));
    }

    /// Fetch the next page, unless a fetch is in flight or the list is
    /// finished.
    pub fn load_more(&self) {
        self.send(Command::LoadMore);
    }

    /// Throw away the list and load it again from page 1.
    pub fn retry_initial_load(&self) {
        self.send(Command::RetryInitialLoad);
    }

    /// Fetch the page that last failed during pagination again.
    pub fn retry_pagination(&self) {
        self.send(Command::RetryPagination);
    }

    pub fn dismiss_pagination_error(&self) {
        self.send(Command::DismissPaginationError);
    }

    pub fn update_keyword(&self, keyword: impl Into<String>) {
        self.state.update_keyword(keyword);
    }

    pub fn state(&self) -> &Arc<ListState<P::Item>> {
        &self.state
    }

    pub fn current_result(&self) -> FetchResult<Vec<P::Item>> {
        self.state.current_result()
    }

    pub fn current_filtered_result(&self) -> FetchResult<Vec<P::Item>> {
        self.state.current_filtered_result()
    }

    pub fn pagination_error(&self) -> Option<String> {
        self.state.pagination_error()
    }

    /// Wait until every queued command has been handled and no fetch is in
    /// flight, then return the cursor.
    pub async fn settled(&self) -> PaginationCursor {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Command::Sync(reply)).is_err() {
            return self.state.cursor();
        }
        let Ok(cursor) = rx.await else {
            return self.state.cursor();
        };
        if !cursor.is_fetch_in_flight {
            return cursor;
        }

        let mut watch = self.state.watch_cursor();
        loop {
            let current = *watch.borrow_and_update();
            if !current.is_fetch_in_flight {
                return current;
            }
            if watch.changed().await.is_err() {
                return current;
            }
        }
    }

    /// Stop the actor after the commands already queued.
    pub fn shutdown(&self) {
        self.send(Command::Shutdown);
    }

    fn send(&self, command: Command<P::Item>) {
        if self.tx.send(command).is_err() {
            tracing::debug!("List controller stopped, command dropped");
        }
    }
}

impl<P: PageSource> Drop for ListController<P> {
    fn drop(&mut self) {
        self.actor.abort();
    }
}
