//! Database schema and migrations for Gator.
//!
//! This module contains all database migrations that will be applied
//! sequentially when the database is first opened or upgraded.

/// Database migrations.
///
/// Each migration is a SQL script that will be executed in order.
/// The schema_version table tracks which migrations have been applied.
pub const MIGRATIONS: &[&str] = &[
    // v1: Users
    r#"
CREATE TABLE users (
    id          TEXT PRIMARY KEY,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    name        TEXT NOT NULL UNIQUE
);
"#,
    // v2: Feeds owned by a user
    r#"
CREATE TABLE feeds (
    id          TEXT PRIMARY KEY,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    name        TEXT NOT NULL,
    url         TEXT NOT NULL UNIQUE,
    user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX idx_feeds_user_id ON feeds(user_id);
"#,
    // v3: Feed follows
    r#"
CREATE TABLE feed_follows (
    id          TEXT PRIMARY KEY,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    feed_id     TEXT NOT NULL REFERENCES feeds(id) ON DELETE CASCADE,
    UNIQUE(user_id, feed_id)
);

CREATE INDEX idx_feed_follows_feed_id ON feed_follows(feed_id);
"#,
    // v4: Polling watermark (NULL = never fetched)
    r#"
ALTER TABLE feeds ADD COLUMN last_fetched_at TEXT;

CREATE INDEX idx_feeds_last_fetched_at ON feeds(last_fetched_at);
"#,
    // v5: Posts, deduplicated by URL across all feeds
    r#"
CREATE TABLE posts (
    id            TEXT PRIMARY KEY,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL,
    title         TEXT NOT NULL,
    url           TEXT NOT NULL UNIQUE,
    description   TEXT NOT NULL,
    published_at  TEXT NOT NULL,            -- canonical RFC3339, empty when the item had no date
    feed_id       TEXT NOT NULL REFERENCES feeds(id) ON DELETE CASCADE
);

CREATE INDEX idx_posts_feed_id ON posts(feed_id);
CREATE INDEX idx_posts_published_at ON posts(published_at);
"#,
];
