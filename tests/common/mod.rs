//! Test helpers for integration tests.
//!
//! Provides a local feed server and database setup helpers.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, StatusCode};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use gator::config::PollConfig;
use gator::rss::{Feed, FeedRepository, NewFeed};
use gator::{Database, NewUser, UserRepository};

/// Default timeout for test operations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// A well-formed feed with two dated items.
pub const SAMPLE_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Sample &amp;amp; Co</title>
    <link>https://sample.example.com/</link>
    <description>Sample feed</description>
    <item>
      <title>Fish &amp;amp; Chips</title>
      <link>https://sample.example.com/posts/1</link>
      <pubDate>Tue, 10 Nov 2009 23:00:00 GMT</pubDate>
      <description>First &lt;b&gt;post&lt;/b&gt;</description>
    </item>
    <item>
      <title>Second</title>
      <link>https://sample.example.com/posts/2</link>
      <pubDate>2009-11-11T08:30:00+01:00</pubDate>
      <description>Second post</description>
    </item>
  </channel>
</rss>"#;

/// A feed whose items exercise the per-item failure paths.
pub const MIXED_FEED: &str = r#"<rss version="2.0">
  <channel>
    <title>Mixed</title>
    <item>
      <title>Bad date</title>
      <link>https://mixed.example.com/bad-date</link>
      <pubDate>sometime last week</pubDate>
    </item>
    <item>
      <title>No link</title>
      <pubDate>2009-11-10</pubDate>
    </item>
    <item>
      <title>Good</title>
      <link>https://mixed.example.com/good</link>
      <pubDate>10 Nov 2009</pubDate>
    </item>
    <item>
      <title>Undated</title>
      <link>https://mixed.example.com/undated</link>
    </item>
  </channel>
</rss>"#;

/// A typical blog or podcast feed: a channel `atom:link` after the
/// description and namespaced extensions on every item.
pub const EXTENDED_FEED: &str = r#"<?xml version="1.0" encoding="utf-8" standalone="yes"?>
<rss version="2.0"
  xmlns:atom="http://www.w3.org/2005/Atom"
  xmlns:itunes="http://www.itunes.com/dtds/podcast-1.0.dtd"
  xmlns:media="http://search.yahoo.com/mrss/"
  xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel>
    <title>Extended</title>
    <link>https://extended.example.com/</link>
    <description>Recent content on Extended</description>
    <atom:link href="https://extended.example.com/index.xml" rel="self" type="application/rss+xml"/>
    <item>
      <title>Episode one</title>
      <itunes:title>Episode one (iTunes)</itunes:title>
      <link>https://extended.example.com/1</link>
      <pubDate>Sun, 19 Feb 2023 00:00:00 +0000</pubDate>
      <description>Plain one</description>
      <media:description>Media one</media:description>
      <dc:creator>Lane</dc:creator>
      <guid>https://extended.example.com/1</guid>
      <category>go</category>
      <category>rust</category>
    </item>
    <item>
      <itunes:title>Episode two (iTunes)</itunes:title>
      <media:title>Episode two (media)</media:title>
      <title>Episode two</title>
      <link>https://extended.example.com/2</link>
      <guid isPermaLink="false">ep-2</guid>
      <pubDate>Mon, 20 Feb 2023 00:00:00 +0000</pubDate>
      <media:description>Media two</media:description>
      <description>Plain two</description>
    </item>
  </channel>
</rss>"#;

/// Not well-formed XML.
pub const BROKEN_FEED: &str = "<rss><channel><title>Broken</channel></rss>";

/// Local HTTP server serving canned feeds.
///
/// Routes: `/feed.xml` and `/copy.xml` ([`SAMPLE_FEED`]), `/mixed.xml`,
/// `/extended.xml`, `/broken.xml`, `/missing.xml` (404) and `/slow.xml` (never answers in
/// time).
pub struct FeedServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl FeedServer {
    /// Bind to an ephemeral port and start serving.
    pub async fn start() -> Self {
        let rss = |body: &'static str| ([(header::CONTENT_TYPE, "application/rss+xml")], body);

        let app = Router::new()
            .route("/feed.xml", get(move || async move { rss(SAMPLE_FEED) }))
            .route("/copy.xml", get(move || async move { rss(SAMPLE_FEED) }))
            .route("/mixed.xml", get(move || async move { rss(MIXED_FEED) }))
            .route("/extended.xml", get(move || async move { rss(EXTENDED_FEED) }))
            .route("/broken.xml", get(move || async move { rss(BROKEN_FEED) }))
            .route("/missing.xml", get(|| async { StatusCode::NOT_FOUND }))
            .route(
                "/slow.xml",
                get(move || async move {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    rss(SAMPLE_FEED)
                }),
            );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, handle }
    }

    /// Full URL for a path on this server.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for FeedServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Poll settings that allow fetching from the loopback server.
pub fn poll_config() -> PollConfig {
    PollConfig {
        block_private_hosts: false,
        total_timeout_secs: 10,
        ..PollConfig::default()
    }
}

/// Open a migrated in-memory database.
pub async fn setup_db() -> Arc<Database> {
    Arc::new(Database::open_in_memory().await.unwrap())
}

/// Register a feed owned by the `tester` user, creating the user on first use.
pub async fn add_feed(db: &Database, name: &str, url: &str) -> Feed {
    let users = UserRepository::new(db.pool());
    let user = match users.get_by_name("tester").await.unwrap() {
        Some(user) => user,
        None => users.create(&NewUser::new("tester")).await.unwrap(),
    };
    FeedRepository::new(db.pool())
        .create(&NewFeed::new(name, url, &user.id))
        .await
        .unwrap()
}

/// Reload a feed by ID.
pub async fn reload_feed(db: &Database, id: &str) -> Feed {
    FeedRepository::new(db.pool())
        .get_by_id(id)
        .await
        .unwrap()
        .unwrap()
}
