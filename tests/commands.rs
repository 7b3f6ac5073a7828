//! End-to-end command tests: register, add a feed, aggregate, browse.

mod common;

use gator::{AppState, CommandTable, Config, GatorError};

use common::{poll_config, setup_db, FeedServer};

struct Cli {
    _dir: tempfile::TempDir,
    table: CommandTable,
    state: AppState,
}

impl Cli {
    async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".gatorconfig.json");
        let config = Config {
            poll: poll_config(),
            ..Config::default()
        };
        config.save(&path).unwrap();

        Self {
            _dir: dir,
            table: CommandTable::new(),
            state: AppState::new(setup_db().await, config, path),
        }
    }

    async fn run(&mut self, line: &str) -> gator::Result<String> {
        let mut words = line.split_whitespace();
        let name = words.next().unwrap_or_default();
        let args: Vec<String> = words.map(String::from).collect();
        let mut out = Vec::new();
        self.table.dispatch(&mut self.state, name, &args, &mut out).await?;
        Ok(String::from_utf8(out).unwrap())
    }
}

#[tokio::test]
async fn test_aggregate_then_browse() {
    let server = FeedServer::start().await;
    let mut cli = Cli::new().await;

    cli.run("register lane").await.unwrap();
    let feed_url = server.url("/feed.xml");
    cli.run(&format!("addfeed Sample {feed_url}")).await.unwrap();

    let out = cli.run("agg").await.unwrap();
    assert!(out.contains("Fetched Sample: 2 new"), "{out}");

    let out = cli.run("browse").await.unwrap();
    assert!(out.contains("- Second"), "{out}");
    assert!(out.contains("- Fish & Chips"), "{out}");
    assert!(out.contains("Sample | 2009-11-10T23:00:00Z"), "{out}");

    let out = cli.run("agg").await.unwrap();
    assert!(out.contains("0 new, 2 duplicate"), "{out}");
}

#[tokio::test]
async fn test_browse_only_shows_followed_feeds() {
    let server = FeedServer::start().await;
    let mut cli = Cli::new().await;

    cli.run("register lane").await.unwrap();
    cli.run(&format!("addfeed Sample {}", server.url("/feed.xml")))
        .await
        .unwrap();
    cli.run("agg").await.unwrap();

    cli.run("register kahya").await.unwrap();
    assert_eq!(cli.run("browse 10").await.unwrap(), "");

    cli.run(&format!("follow {}", server.url("/feed.xml")))
        .await
        .unwrap();
    let out = cli.run("browse 10").await.unwrap();
    assert!(out.contains("Fish & Chips"), "{out}");
}

#[tokio::test]
async fn test_agg_reports_fetch_failure() {
    let server = FeedServer::start().await;
    let mut cli = Cli::new().await;

    cli.run("register lane").await.unwrap();
    cli.run(&format!("addfeed Missing {}", server.url("/missing.xml")))
        .await
        .unwrap();

    let err = cli.run("agg").await.unwrap_err();
    assert!(matches!(err, GatorError::Fetch(_)), "{err:?}");
}

#[tokio::test]
async fn test_addfeed_refuses_private_hosts_by_default() {
    let mut cli = Cli::new().await;
    cli.state.config.poll.block_private_hosts = true;

    cli.run("register lane").await.unwrap();
    let err = cli
        .run("addfeed Local http://127.0.0.1:8080/feed.xml")
        .await
        .unwrap_err();
    assert!(matches!(err, GatorError::Validation(ref msg) if msg.contains("private IP")));
}
