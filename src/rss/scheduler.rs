//! Feed polling scheduler.
//!
//! Each cycle picks the feed that has waited longest, claims it, fetches it
//! and stores its new items. Cycles run one at a time on a fixed interval
//! until shutdown is requested.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::PollConfig;
use crate::db::Database;
use crate::rss::date::normalize;
use crate::rss::fetcher::FeedFetcher;
use crate::rss::repository::{FeedRepository, PostRepository};
use crate::rss::types::{Feed, InsertOutcome, NewPost, RssDocument};
use crate::shutdown::Shutdown;
use crate::{GatorError, Result};

/// What one poll cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// The feed that was polled.
    pub feed_id: String,
    /// Its display name.
    pub feed_name: String,
    /// Items in the fetched document.
    pub items: usize,
    /// New posts written.
    pub inserted: usize,
    /// Items whose URL was already stored.
    pub duplicates: usize,
    /// Items without a link.
    pub skipped: usize,
    /// Items dropped because of a bad date or a storage error.
    pub failed: usize,
}

impl CycleReport {
    fn new(feed: &Feed) -> Self {
        Self {
            feed_id: feed.id.clone(),
            feed_name: feed.name.clone(),
            ..Default::default()
        }
    }
}

/// Sequential feed poller.
pub struct PollScheduler {
    db: Arc<Database>,
    fetcher: FeedFetcher,
    min_interval: Duration,
}

impl PollScheduler {
    /// Create a scheduler from the polling settings.
    pub fn new(db: Arc<Database>, config: &PollConfig) -> Result<Self> {
        Ok(Self::with_fetcher(db, FeedFetcher::new(config)?, config.min_interval()))
    }

    /// Create a scheduler around an existing fetcher.
    pub fn with_fetcher(db: Arc<Database>, fetcher: FeedFetcher, min_interval: Duration) -> Self {
        Self {
            db,
            fetcher,
            min_interval,
        }
    }

    /// The shortest interval [`run`](Self::run) accepts.
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Reject intervals below the floor.
    pub fn validate_interval(&self, interval: Duration) -> Result<()> {
        if interval < self.min_interval {
            return Err(GatorError::IntervalTooShort {
                interval,
                minimum: self.min_interval,
            });
        }
        Ok(())
    }

    /// Poll the next due feed once.
    ///
    /// The feed is claimed before it is fetched, so a feed that keeps
    /// failing still moves to the back of the queue. Bad items are logged
    /// and counted without failing the cycle.
    pub async fn run_cycle(&self, shutdown: &Shutdown) -> Result<CycleReport> {
        let feeds = FeedRepository::new(self.db.pool());

        let feed = feeds.next_feed_to_fetch().await?;
        feeds.mark_fetched(&feed.id).await?;

        info!("Fetching feed {} ({})", feed.name, feed.url);
        let document = self.fetcher.fetch(&feed.url, shutdown).await?;

        let report = self.ingest(&feed, document).await;
        info!(
            "Feed {} processed: {} new, {} duplicate, {} skipped, {} failed",
            report.feed_name, report.inserted, report.duplicates, report.skipped, report.failed
        );
        Ok(report)
    }

    /// Store the items of a fetched document in document order.
    pub(crate) async fn ingest(&self, feed: &Feed, document: RssDocument) -> CycleReport {
        let posts = PostRepository::new(self.db.pool());
        let mut report = CycleReport::new(feed);

        for item in document.channel.items {
            report.items += 1;

            let link = item.link.trim();
            if link.is_empty() {
                warn!("Skipping item {:?} in feed {}: no link", item.title, feed.name);
                report.skipped += 1;
                continue;
            }

            let published_at = match normalize(&item.pub_date) {
                Ok(published_at) => published_at,
                Err(e) => {
                    warn!("Skipping item {} in feed {}: {}", link, feed.name, e);
                    report.failed += 1;
                    continue;
                }
            };

            let post = NewPost::new(&feed.id, link, item.title)
                .with_description(item.description)
                .with_published_at(published_at);

            match posts.insert(&post).await {
                Ok(InsertOutcome::Inserted(_)) => report.inserted += 1,
                Ok(InsertOutcome::Duplicate) => {
                    debug!("Post {} already stored", post.url);
                    report.duplicates += 1;
                }
                Err(e) => {
                    error!("Failed to store post {} for feed {}: {}", post.url, feed.name, e);
                    report.failed += 1;
                }
            }
        }

        report
    }

    /// Poll one feed per tick until `shutdown` fires.
    ///
    /// The first cycle starts immediately. Cycle errors are logged and the
    /// loop carries on.
    pub async fn run(&self, every: Duration, shutdown: Shutdown) -> Result<()> {
        self.validate_interval(every)?;
        info!("Collecting feeds every {:?}", every);

        let mut timer = interval(every);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if shutdown.is_triggered() {
                break;
            }

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = timer.tick() => {}
            }

            match self.run_cycle(&shutdown).await {
                Ok(report) => debug!("Cycle finished for feed {}", report.feed_id),
                Err(GatorError::Cancelled) => {
                    info!("Poll cycle interrupted by shutdown");
                    break;
                }
                Err(e) if e.is_feed_level() => warn!("Poll cycle failed: {}", e),
                Err(e) => error!("Poll cycle failed: {}", e),
            }
        }

        info!("Feed collection stopped");
        Ok(())
    }
}
