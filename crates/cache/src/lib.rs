//! Annotator Cache Library
//!
//! Lazy, windowed caching of the annotation and token page feeds.

pub mod config;
pub mod document;
pub mod page_cache;
pub mod window;

pub use config::{ConfigError, LoaderConfig};
pub use document::{DocumentDataCache, LoadRequest};
pub use page_cache::{CacheStats, MergeOutcome, PageCache};
pub use window::{WindowPlanner, WindowState};
