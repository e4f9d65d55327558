//! # Newsreel
//!
//! A terminal news browser: pick a category, browse its sources, page through
//! a source's headlines and narrow them down by keyword.
//!
//! ## Architecture
//!
//! ```text
//! Fetcher → Normalizer → ListController → ListState → CLI
//!                              ↑
//!                           search
//! ```
//!
//! - [`fetcher`]: HTTP client for the headlines API
//! - [`normalizer`]: Converts API payloads to domain models
//! - [`controller`]: Paginated, retryable list loading
//! - [`state`]: Observable list state with keyword filtering
//!
//! ## Quick Start
//!
//! ```bash
//! # Show the categories
//! newsreel categories
//!
//! # Sources of a category
//! newsreel sources technology
//!
//! # Three pages of headlines, filtered
//! newsreel articles abc-news --pages 3 --search election
//!
//! # Open the second headline in the browser
//! newsreel open abc-news 2
//!
//! # ...or by the id printed next to it
//! newsreel open abc-news --id 3f9a2c1b
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires the configuration to a
/// fetcher and hands out list controllers.
pub mod app;

/// Command-line interface using clap.
///
/// - `categories` - List the categories
/// - `sources <category>` - List a category's sources
/// - `articles <source>` - Page through a source's articles
/// - `open <source> <index>` / `open <source> --id <id>` - Open an article in the browser
pub mod cli;

/// Configuration management.
///
/// Loads from `~/.config/newsreel/config.toml`; `NEWSAPI_KEY` overrides the
/// API key.
pub mod config;

/// The paginated list controller.
///
/// - [`ListController`](controller::ListController): Actor-backed controller handle
/// - [`PageSource`](controller::PageSource): Where pages come from
pub mod controller;

/// Core domain models.
///
/// - [`Article`](domain::Article) and [`Source`](domain::Source): API records
/// - [`FetchResult`](domain::FetchResult): Loading/Empty/Success/Error outcome
/// - [`Category`](domain::Category): The fixed category list
pub mod domain;

/// Remote data access.
///
/// - [`NewsFetcher`](fetcher::NewsFetcher): Async trait for fetching sources and articles
/// - [`HttpFetcher`](fetcher::http_fetcher::HttpFetcher): reqwest-based implementation
pub mod fetcher;

/// API payload parsing and normalization.
pub mod normalizer;

/// Case-insensitive keyword filtering over articles and sources.
pub mod search;

/// Observable values with replay-latest semantics.
pub mod state;
