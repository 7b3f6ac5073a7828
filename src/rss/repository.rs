//! Feed, follow and post repositories for Gator.

use chrono::Utc;
use uuid::Uuid;

use super::types::{Feed, FeedFollow, FeedWithCreator, InsertOutcome, NewFeed, NewPost, Post, PostWithFeed};
use crate::db::{is_unique_violation, now_timestamp, parse_datetime, DbPool};
use crate::{GatorError, Result};

const FEED_COLUMNS: &str = "id, name, url, user_id, created_at, updated_at, last_fetched_at";

/// Row type for feeds.
#[derive(Debug, Clone, sqlx::FromRow)]
struct FeedRow {
    id: String,
    name: String,
    url: String,
    user_id: String,
    created_at: String,
    updated_at: String,
    last_fetched_at: Option<String>,
}

impl From<FeedRow> for Feed {
    fn from(row: FeedRow) -> Self {
        Feed {
            id: row.id,
            name: row.name,
            url: row.url,
            user_id: row.user_id,
            created_at: parse_datetime(&row.created_at).unwrap_or_else(Utc::now),
            updated_at: parse_datetime(&row.updated_at).unwrap_or_else(Utc::now),
            last_fetched_at: row.last_fetched_at.and_then(|s| parse_datetime(&s)),
        }
    }
}

/// Row type for a feed joined with its creator.
#[derive(Debug, Clone, sqlx::FromRow)]
struct FeedWithCreatorRow {
    #[sqlx(flatten)]
    feed: FeedRow,
    creator_name: String,
}

impl From<FeedWithCreatorRow> for FeedWithCreator {
    fn from(row: FeedWithCreatorRow) -> Self {
        FeedWithCreator {
            feed: row.feed.into(),
            creator_name: row.creator_name,
        }
    }
}

/// Row type for feed follows.
#[derive(Debug, Clone, sqlx::FromRow)]
struct FeedFollowRow {
    id: String,
    user_id: String,
    feed_id: String,
    feed_name: String,
    created_at: String,
}

impl From<FeedFollowRow> for FeedFollow {
    fn from(row: FeedFollowRow) -> Self {
        FeedFollow {
            id: row.id,
            user_id: row.user_id,
            feed_id: row.feed_id,
            feed_name: row.feed_name,
            created_at: parse_datetime(&row.created_at).unwrap_or_else(Utc::now),
        }
    }
}

/// Row type for posts.
#[derive(Debug, Clone, sqlx::FromRow)]
struct PostRow {
    id: String,
    title: String,
    url: String,
    description: String,
    published_at: String,
    feed_id: String,
    created_at: String,
    updated_at: String,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post {
            id: row.id,
            title: row.title,
            url: row.url,
            description: row.description,
            published_at: row.published_at,
            feed_id: row.feed_id,
            created_at: parse_datetime(&row.created_at).unwrap_or_else(Utc::now),
            updated_at: parse_datetime(&row.updated_at).unwrap_or_else(Utc::now),
        }
    }
}

/// Row type for a post joined with its feed name.
#[derive(Debug, Clone, sqlx::FromRow)]
struct PostWithFeedRow {
    #[sqlx(flatten)]
    post: PostRow,
    feed_name: String,
}

impl From<PostWithFeedRow> for PostWithFeed {
    fn from(row: PostWithFeedRow) -> Self {
        PostWithFeed {
            post: row.post.into(),
            feed_name: row.feed_name,
        }
    }
}

/// Repository for feeds.
pub struct FeedRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FeedRepository<'a> {
    /// Create a new FeedRepository.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Register a feed. It starts out never fetched.
    pub async fn create(&self, new_feed: &NewFeed) -> Result<Feed> {
        let id = Uuid::new_v4().to_string();
        let now = now_timestamp();

        sqlx::query(
            r#"
            INSERT INTO feeds (id, created_at, updated_at, name, url, user_id, last_fetched_at)
            VALUES ($1, $2, $3, $4, $5, $6, NULL)
            "#,
        )
        .bind(&id)
        .bind(&now)
        .bind(&now)
        .bind(&new_feed.name)
        .bind(&new_feed.url)
        .bind(&new_feed.user_id)
        .execute(self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                GatorError::Validation(format!("feed {:?} already exists", new_feed.url))
            } else {
                GatorError::Database(e.to_string())
            }
        })?;

        self.get_by_id(&id)
            .await?
            .ok_or_else(|| GatorError::NotFound("feed".to_string()))
    }

    /// Get a feed by ID.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<Feed>> {
        let row = sqlx::query_as::<_, FeedRow>(&format!(
            "SELECT {FEED_COLUMNS} FROM feeds WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| GatorError::Database(e.to_string()))?;

        Ok(row.map(Feed::from))
    }

    /// Get a feed by URL.
    pub async fn get_by_url(&self, url: &str) -> Result<Option<Feed>> {
        let row = sqlx::query_as::<_, FeedRow>(&format!(
            "SELECT {FEED_COLUMNS} FROM feeds WHERE url = $1"
        ))
        .bind(url)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| GatorError::Database(e.to_string()))?;

        Ok(row.map(Feed::from))
    }

    /// List all feeds with the name of the user who added them.
    pub async fn list_with_creator(&self) -> Result<Vec<FeedWithCreator>> {
        let rows = sqlx::query_as::<_, FeedWithCreatorRow>(
            r#"
            SELECT f.id, f.name, f.url, f.user_id, f.created_at, f.updated_at,
                   f.last_fetched_at, u.name AS creator_name
            FROM feeds f
            JOIN users u ON u.id = f.user_id
            ORDER BY f.created_at ASC, f.id ASC
            "#,
        )
        .fetch_all(self.pool)
        .await
        .map_err(|e| GatorError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(FeedWithCreator::from).collect())
    }

    /// Pick the feed that has waited longest.
    ///
    /// Never-fetched feeds come first; ties are broken by ID. Selecting does
    /// not modify anything, so the same feed is returned until it is claimed
    /// with [`mark_fetched`](Self::mark_fetched).
    pub async fn next_feed_to_fetch(&self) -> Result<Feed> {
        let row = sqlx::query_as::<_, FeedRow>(&format!(
            r#"
            SELECT {FEED_COLUMNS} FROM feeds
            ORDER BY last_fetched_at ASC NULLS FIRST, id ASC
            LIMIT 1
            "#
        ))
        .fetch_optional(self.pool)
        .await
        .map_err(|e| GatorError::Database(e.to_string()))?;

        row.map(Feed::from).ok_or(GatorError::NoFeedsAvailable)
    }

    /// Claim a feed for polling by stamping it as fetched now.
    pub async fn mark_fetched(&self, id: &str) -> Result<()> {
        let now = now_timestamp();

        let result = sqlx::query("UPDATE feeds SET last_fetched_at = $1, updated_at = $2 WHERE id = $3")
            .bind(&now)
            .bind(&now)
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| GatorError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(GatorError::NotFound("feed".to_string()));
        }
        Ok(())
    }
}

/// Repository for feed follows.
pub struct FeedFollowRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FeedFollowRepository<'a> {
    /// Create a new FeedFollowRepository.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Follow a feed. Following the same feed twice is a validation error.
    pub async fn create(&self, user_id: &str, feed_id: &str) -> Result<FeedFollow> {
        let id = Uuid::new_v4().to_string();
        let now = now_timestamp();

        sqlx::query(
            r#"
            INSERT INTO feed_follows (id, created_at, updated_at, user_id, feed_id)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&id)
        .bind(&now)
        .bind(&now)
        .bind(user_id)
        .bind(feed_id)
        .execute(self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                GatorError::Validation("already following this feed".to_string())
            } else {
                GatorError::Database(e.to_string())
            }
        })?;

        let row = sqlx::query_as::<_, FeedFollowRow>(
            r#"
            SELECT ff.id, ff.user_id, ff.feed_id, f.name AS feed_name, ff.created_at
            FROM feed_follows ff
            JOIN feeds f ON f.id = ff.feed_id
            WHERE ff.id = $1
            "#,
        )
        .bind(&id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| GatorError::Database(e.to_string()))?;

        row.map(FeedFollow::from)
            .ok_or_else(|| GatorError::NotFound("feed follow".to_string()))
    }

    /// List the feeds a user follows.
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<FeedFollow>> {
        let rows = sqlx::query_as::<_, FeedFollowRow>(
            r#"
            SELECT ff.id, ff.user_id, ff.feed_id, f.name AS feed_name, ff.created_at
            FROM feed_follows ff
            JOIN feeds f ON f.id = ff.feed_id
            WHERE ff.user_id = $1
            ORDER BY ff.created_at ASC, f.name ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await
        .map_err(|e| GatorError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(FeedFollow::from).collect())
    }

    /// Stop following the feed with the given URL.
    ///
    /// Returns whether a follow was removed.
    pub async fn delete_by_user_and_url(&self, user_id: &str, url: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM feed_follows
            WHERE user_id = $1
              AND feed_id IN (SELECT id FROM feeds WHERE url = $2)
            "#,
        )
        .bind(user_id)
        .bind(url)
        .execute(self.pool)
        .await
        .map_err(|e| GatorError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}

/// Repository for posts.
pub struct PostRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> PostRepository<'a> {
    /// Create a new PostRepository.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Store a post unless one with the same URL exists.
    ///
    /// A URL collision is reported as [`InsertOutcome::Duplicate`]; the
    /// constraint kind is read from the driver error, not its message. Every
    /// other failure is a database error.
    pub async fn insert(&self, new_post: &NewPost) -> Result<InsertOutcome> {
        let id = Uuid::new_v4().to_string();
        let now = now_timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO posts (id, created_at, updated_at, title, url, description, published_at, feed_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&id)
        .bind(&now)
        .bind(&now)
        .bind(&new_post.title)
        .bind(&new_post.url)
        .bind(&new_post.description)
        .bind(new_post.published_at.as_str())
        .bind(&new_post.feed_id)
        .execute(self.pool)
        .await;

        match result {
            Ok(_) => Ok(InsertOutcome::Inserted(id)),
            Err(e) if is_unique_violation(&e) => Ok(InsertOutcome::Duplicate),
            Err(e) => Err(GatorError::Database(e.to_string())),
        }
    }

    /// Get a post by URL.
    pub async fn get_by_url(&self, url: &str) -> Result<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT id, title, url, description, published_at, feed_id, created_at, updated_at
            FROM posts WHERE url = $1
            "#,
        )
        .bind(url)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| GatorError::Database(e.to_string()))?;

        Ok(row.map(Post::from))
    }

    /// Count all posts.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
            .fetch_one(self.pool)
            .await
            .map_err(|e| GatorError::Database(e.to_string()))?;

        Ok(count)
    }

    /// Count the posts of one feed.
    pub async fn count_by_feed(&self, feed_id: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE feed_id = $1")
            .bind(feed_id)
            .fetch_one(self.pool)
            .await
            .map_err(|e| GatorError::Database(e.to_string()))?;

        Ok(count)
    }

    /// Newest posts from the feeds a user follows.
    ///
    /// Posts are ordered by publish time converted to UTC; undated posts
    /// come last.
    pub async fn list_for_user(&self, user_id: &str, limit: i64) -> Result<Vec<PostWithFeed>> {
        let rows = sqlx::query_as::<_, PostWithFeedRow>(
            r#"
            SELECT p.id, p.title, p.url, p.description, p.published_at, p.feed_id,
                   p.created_at, p.updated_at, f.name AS feed_name
            FROM posts p
            JOIN feed_follows ff ON ff.feed_id = p.feed_id
            JOIN feeds f ON f.id = p.feed_id
            WHERE ff.user_id = $1
            ORDER BY datetime(p.published_at) DESC, p.created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await
        .map_err(|e| GatorError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(PostWithFeed::from).collect())
    }
}
