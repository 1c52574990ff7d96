//! External context sources for query answering.
//!
//! Each source implements [`attache_core::traits::ContextSource`] and
//! returns one plain-text block. Sources are fetched in parallel by the
//! query service; a failing source degrades to a placeholder.

pub mod email;
pub mod market;
pub mod news;
pub mod search;
pub mod store;

pub use email::EmailSource;
pub use market::MarketSource;
pub use news::NewsSource;
pub use search::SearchSource;
pub use store::{ArchiveSource, CalendarSource, TasksSource};
