use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::controller::PageSource;
use crate::domain::{FetchResult, UNEXPECTED_ERROR};
use crate::state::{ListState, PaginationCursor};

/// Messages processed by the controller actor, in arrival order.
pub(crate) enum Command<T> {
    Initialize(Option<String>),
    LoadMore,
    RetryInitialLoad,
    RetryPagination,
    DismissPaginationError,
    /// A fetch settled
    Completed(Completion<T>),
    /// Reply with the cursor once every earlier command has been handled
    Sync(oneshot::Sender<PaginationCursor>),
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoadKind {
    /// First page of a fresh or retried load; replaces the published result
    Initial,
    /// Any later page; failures go to the pagination error channel
    Pagination,
}

pub(crate) struct Completion<T> {
    generation: u64,
    page: u32,
    kind: LoadKind,
    result: FetchResult<Vec<T>>,
}

/// Owns the cursor and accumulated list of one controller.
///
/// All mutation happens inside [`run`](ControllerActor::run), one command at a
/// time. Fetches run on their own task and report back with a `Completed`
/// message tagged with the generation they were issued under; a reset bumps
/// the generation so an older completion is dropped instead of applied.
pub(crate) struct ControllerActor<P: PageSource> {
    source: Arc<P>,
    state: Arc<ListState<P::Item>>,
    tx: mpsc::UnboundedSender<Command<P::Item>>,
    rx: mpsc::UnboundedReceiver<Command<P::Item>>,
    key: Option<String>,
    initialized: bool,
    cursor: PaginationCursor,
    accumulated: Vec<P::Item>,
    generation: u64,
    in_flight: Option<JoinHandle<()>>,
}

impl<P: PageSource> ControllerActor<P> {
    pub(crate) fn new(
        source: Arc<P>,
        state: Arc<ListState<P::Item>>,
        tx: mpsc::UnboundedSender<Command<P::Item>>,
        rx: mpsc::UnboundedReceiver<Command<P::Item>>,
    ) -> Self {
        Self {
            source,
            state,
            tx,
            rx,
            key: None,
            initialized: false,
            cursor: PaginationCursor::default(),
            accumulated: Vec::new(),
            generation: 0,
            in_flight: None,
        }
    }

    pub(crate) async fn run(mut self) {
        while let Some(command) = self.rx.recv().await {
            match command {
                Command::Initialize(key) => self.initialize(key),
                Command::LoadMore => self.load_more(),
                Command::RetryInitialLoad => self.retry_initial_load(),
                Command::RetryPagination => self.retry_pagination(),
                Command::DismissPaginationError => self.dismiss_pagination_error(),
                Command::Completed(completion) => self.on_completed(completion),
                Command::Sync(reply) => {
                    let _ = reply.send(self.cursor);
                }
                Command::Shutdown => {
                    debug!("List controller shutting down");
                    break;
                }
            }
        }
        self.stop();
    }

    /// Cancel any outstanding fetch so waiters on the cursor are released.
    fn stop(&mut self) {
        self.abort_in_flight();
        if self.cursor.is_fetch_in_flight {
            self.cursor.is_fetch_in_flight = false;
            self.state.publish_cursor(self.cursor);
        }
    }

    fn initialize(&mut self, key: Option<String>) {
        if self.initialized {
            warn!("List controller already initialized, ignoring");
            return;
        }
        self.initialized = true;

        match key {
            Some(key) => {
                info!("Loading list for {}", key);
                self.key = Some(key);
                self.start_initial_load();
            }
            None => debug!("No list key, controller stays idle"),
        }
    }

    fn load_more(&mut self) {
        if self.key.is_none() || self.cursor.is_fetch_in_flight || self.cursor.is_last_page {
            debug!("load_more ignored: {:?}", self.cursor);
            return;
        }
        // Non-empty exactly while the published result is `Success`.
        if self.accumulated.is_empty() {
            debug!("load_more ignored until the first page has loaded");
            return;
        }

        // A pending failure means current_page was never advanced past it.
        let page = match self.cursor.last_failed_page.take() {
            Some(failed) => {
                self.state.set_pagination_error(None);
                failed
            }
            None => self.cursor.current_page,
        };
        self.dispatch(page, LoadKind::Pagination);
    }

    fn retry_initial_load(&mut self) {
        if self.key.is_none() {
            debug!("retry_initial_load ignored: no list key");
            return;
        }
        info!("Retrying initial load");
        self.start_initial_load();
    }

    fn retry_pagination(&mut self) {
        let Some(page) = self.cursor.last_failed_page else {
            debug!("retry_pagination ignored: no failed page");
            return;
        };
        if self.cursor.is_fetch_in_flight {
            debug!("retry_pagination ignored: fetch in flight");
            return;
        }

        info!("Retrying page {}", page);
        self.cursor.last_failed_page = None;
        self.state.set_pagination_error(None);
        self.dispatch(page, LoadKind::Pagination);
    }

    fn dismiss_pagination_error(&mut self) {
        self.cursor.last_failed_page = None;
        self.state.set_pagination_error(None);
        self.state.publish_cursor(self.cursor);
    }

    fn start_initial_load(&mut self) {
        self.generation += 1;
        self.abort_in_flight();

        self.cursor = PaginationCursor::default();
        self.accumulated.clear();
        self.state.set_pagination_error(None);
        self.state.publish_result(FetchResult::Loading);
        self.dispatch(1, LoadKind::Initial);
    }

    /// Mark the fetch in flight, then hand it to its own task.
    fn dispatch(&mut self, page: u32, kind: LoadKind) {
        let Some(key) = self.key.clone() else {
            return;
        };

        self.cursor.is_fetch_in_flight = true;
        self.state.publish_cursor(self.cursor);
        debug!("Fetching {} page {} ({:?})", key, page, kind);

        let source = self.source.clone();
        let tx = self.tx.clone();
        let generation = self.generation;
        self.in_flight = Some(tokio::spawn(async move {
            let result = source.fetch_page(&key, page).await;
            let completion = Completion {
                generation,
                page,
                kind,
                result,
            };
            if tx.send(Command::Completed(completion)).is_err() {
                debug!("Controller gone, dropping result for {} page {}", key, page);
            }
        }));
    }

    fn on_completed(&mut self, completion: Completion<P::Item>) {
        if completion.generation != self.generation {
            debug!(
                "Discarding stale result for page {} (generation {} != {})",
                completion.page, completion.generation, self.generation
            );
            return;
        }

        self.in_flight = None;
        self.cursor.is_fetch_in_flight = false;

        let Completion {
            page, kind, result, ..
        } = completion;

        let result = match result.normalized() {
            FetchResult::Loading => {
                warn!("Fetch for page {} settled without a result", page);
                FetchResult::error(UNEXPECTED_ERROR)
            }
            other => other,
        };

        match (kind, result) {
            (_, FetchResult::Success(items)) => {
                if kind == LoadKind::Initial {
                    self.accumulated.clear();
                }
                debug!("Page {} added {} items", page, items.len());
                self.accumulated.extend(items);
                self.cursor.current_page += 1;
                if !self.source.is_paginated() {
                    self.cursor.is_last_page = true;
                }
                self.state
                    .publish_result(FetchResult::Success(self.accumulated.clone()));
            }
            (LoadKind::Initial, FetchResult::Empty) => {
                self.accumulated.clear();
                self.cursor.is_last_page = true;
                self.state.publish_result(FetchResult::Empty);
            }
            (LoadKind::Pagination, FetchResult::Empty) => {
                info!("Reached the last page at page {}", page);
                self.cursor.is_last_page = true;
            }
            (LoadKind::Initial, FetchResult::Error(message)) => {
                warn!("Initial load failed: {}", message);
                self.accumulated.clear();
                self.state.publish_result(FetchResult::Error(message));
            }
            (LoadKind::Pagination, FetchResult::Error(message)) => {
                warn!("Loading page {} failed: {}", page, message);
                self.cursor.last_failed_page = Some(page);
                self.state.set_pagination_error(Some(message));
            }
            (_, FetchResult::Loading) => {}
        }

        self.state.publish_cursor(self.cursor);
    }

    fn abort_in_flight(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }
}

impl<P: PageSource> Drop for ControllerActor<P> {
    fn drop(&mut self) {
        self.abort_in_flight();
    }
}
