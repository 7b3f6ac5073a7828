//! RSS types for Gator.

use chrono::{DateTime, Utc};

use super::date::CanonicalTimestamp;

/// A registered feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feed {
    /// Feed ID (UUID).
    pub id: String,
    /// Display name.
    pub name: String,
    /// Feed URL (unique).
    pub url: String,
    /// Owning user ID.
    pub user_id: String,
    /// When the feed was created.
    pub created_at: DateTime<Utc>,
    /// When the feed was last updated.
    pub updated_at: DateTime<Utc>,
    /// When the poller last claimed the feed. `None` means never.
    pub last_fetched_at: Option<DateTime<Utc>>,
}

/// New feed for creation.
#[derive(Debug, Clone)]
pub struct NewFeed {
    /// Display name.
    pub name: String,
    /// Feed URL.
    pub url: String,
    /// Owning user ID.
    pub user_id: String,
}

impl NewFeed {
    /// Create a new feed.
    pub fn new(name: impl Into<String>, url: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            user_id: user_id.into(),
        }
    }
}

/// Feed joined with the name of the user who registered it.
#[derive(Debug, Clone)]
pub struct FeedWithCreator {
    /// The feed.
    pub feed: Feed,
    /// Creator's user name.
    pub creator_name: String,
}

/// A user's subscription to a feed.
#[derive(Debug, Clone)]
pub struct FeedFollow {
    /// Follow ID (UUID).
    pub id: String,
    /// Following user.
    pub user_id: String,
    /// Followed feed.
    pub feed_id: String,
    /// Followed feed name.
    pub feed_name: String,
    /// When the follow was created.
    pub created_at: DateTime<Utc>,
}

/// A stored post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    /// Post ID (UUID).
    pub id: String,
    /// Title.
    pub title: String,
    /// Article URL (unique across all feeds).
    pub url: String,
    /// Description.
    pub description: String,
    /// Canonical RFC3339 publish time, empty if the item had none.
    pub published_at: String,
    /// Feed the post was first seen in.
    pub feed_id: String,
    /// When the post was stored.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Post joined with its feed name, for browsing.
#[derive(Debug, Clone)]
pub struct PostWithFeed {
    /// The post.
    pub post: Post,
    /// Name of the feed it belongs to.
    pub feed_name: String,
}

/// New post for creation.
#[derive(Debug, Clone)]
pub struct NewPost {
    /// Title.
    pub title: String,
    /// Article URL.
    pub url: String,
    /// Description.
    pub description: String,
    /// Normalized publish time.
    pub published_at: CanonicalTimestamp,
    /// Owning feed.
    pub feed_id: String,
}

impl NewPost {
    /// Create a new post with an empty description and publish time.
    pub fn new(feed_id: impl Into<String>, url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            description: String::new(),
            published_at: CanonicalTimestamp::empty(),
            feed_id: feed_id.into(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the publish time.
    pub fn with_published_at(mut self, published_at: CanonicalTimestamp) -> Self {
        self.published_at = published_at;
        self
    }
}

/// Result of inserting a post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new row was written; carries the post ID.
    Inserted(String),
    /// A post with the same URL already exists. Nothing was written.
    Duplicate,
}

/// A decoded RSS 2.0 document.
///
/// Only lives for one fetch-ingest cycle.
#[derive(Debug, Clone, Default)]
pub struct RssDocument {
    /// The `<channel>` element.
    pub channel: RssChannel,
}

/// The `<channel>` element of an RSS document.
#[derive(Debug, Clone, Default)]
pub struct RssChannel {
    /// Channel title.
    pub title: String,
    /// Site link from the plain `<link>` element.
    pub link: String,
    /// Channel description.
    pub description: String,
    /// Items in document order.
    pub items: Vec<RssItem>,
}

/// An `<item>` element.
#[derive(Debug, Clone, Default)]
pub struct RssItem {
    /// Item title.
    pub title: String,
    /// Article link.
    pub link: String,
    /// Item description.
    pub description: String,
    /// Publish date exactly as it appears in the feed.
    pub pub_date: String,
}

impl From<::rss::Channel> for RssDocument {
    fn from(channel: ::rss::Channel) -> Self {
        let items = channel.items().iter().map(RssItem::from).collect();

        Self {
            channel: RssChannel {
                title: channel.title().to_string(),
                link: channel.link().trim().to_string(),
                description: channel.description().to_string(),
                items,
            },
        }
    }
}

impl From<&::rss::Item> for RssItem {
    fn from(item: &::rss::Item) -> Self {
        Self {
            title: item.title().unwrap_or_default().to_string(),
            link: item.link().unwrap_or_default().to_string(),
            description: item.description().unwrap_or_default().to_string(),
            pub_date: item.pub_date().unwrap_or_default().to_string(),
        }
    }
}
