//! # attache-services
//!
//! Domain services the dispatcher invokes (tasks, calendar, notes, chat,
//! query answering), link archiving, and the external context sources
//! the query service fetches from in parallel.

pub mod calendar;
pub mod chat;
pub mod note;
pub mod prompts;
pub mod query;
pub mod sources;
pub mod task;
pub mod url;

pub use calendar::CalendarService;
pub use chat::ChatService;
pub use note::NoteService;
pub use query::QueryService;
pub use task::TaskService;
pub use url::UrlService;
