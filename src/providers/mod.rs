// =============================================================================
// External Providers
// =============================================================================
//
// HTTP collaborators for the desk: a daily price-history source and a
// bounded headline feed. Every transport or parse failure degrades to
// `EngineError::DataSourceUnavailable` — callers handle absence explicitly,
// nothing here ever panics outward.

pub mod history;
pub mod news;

pub use history::HistoryClient;
pub use news::{NewsClient, NewsItem};
