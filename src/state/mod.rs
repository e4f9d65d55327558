//! Push-based, replay-latest state for list consumers.
//!
//! - [`StateCell`]: a single observable value (tokio `watch` plus callbacks)
//! - [`ListState`]: result, filtered result, keyword, pagination error and
//!   cursor for one list
//! - [`Subscription`]: RAII guard returned by every `observe_*` call

mod cell;
mod list_state;

pub use cell::{StateCell, Subscription};
pub use list_state::{ListState, PaginationCursor};
