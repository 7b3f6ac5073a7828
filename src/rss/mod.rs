//! Feed polling and ingestion.
//!
//! Feeds are fetched one at a time by the [`PollScheduler`]; items are
//! decoded, their publish dates normalized, and stored as posts with
//! duplicate URLs suppressed.

pub mod date;
pub mod fetcher;
pub mod repository;
pub mod scheduler;
pub mod types;

pub use date::{normalize, CanonicalTimestamp, DateFormat, DATE_FORMATS};
pub use fetcher::{parse_document, validate_url, FeedFetcher};
pub use repository::{FeedFollowRepository, FeedRepository, PostRepository};
pub use scheduler::{CycleReport, PollScheduler};
pub use types::{
    Feed, FeedFollow, FeedWithCreator, InsertOutcome, NewFeed, NewPost, Post, PostWithFeed,
    RssChannel, RssDocument, RssItem,
};
