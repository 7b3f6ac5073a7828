//! Command bodies.

use std::io::Write;

use tracing::info;

use super::{parse_duration, AppState, DEFAULT_BROWSE_LIMIT};
use crate::db::{NewUser, User, UserRepository};
use crate::rss::{
    validate_url, FeedFollowRepository, FeedRepository, NewFeed, PollScheduler, PostRepository,
};
use crate::shutdown::Shutdown;
use crate::{GatorError, Result};

fn expect_args(args: &[String], count: usize, usage: &str) -> Result<()> {
    if args.len() != count {
        return Err(GatorError::Validation(format!("usage: {usage}")));
    }
    Ok(())
}

pub(super) async fn register(state: &mut AppState, args: &[String], out: &mut dyn Write) -> Result<()> {
    expect_args(args, 1, "register <name>")?;
    let name = args[0].trim();
    if name.is_empty() {
        return Err(GatorError::Validation("user name is empty".to_string()));
    }

    let user = UserRepository::new(state.db.pool())
        .create(&NewUser::new(name))
        .await?;
    state.config.set_user(&user.name, &state.config_path)?;
    info!("Registered user {}", user.name);

    writeln!(out, "User {} created", user.name)?;
    writeln!(out, "Username set to {}", user.name)?;
    Ok(())
}

pub(super) async fn login(state: &mut AppState, args: &[String], out: &mut dyn Write) -> Result<()> {
    expect_args(args, 1, "login <name>")?;
    let name = args[0].trim();

    let user = UserRepository::new(state.db.pool())
        .get_by_name(name)
        .await?
        .ok_or_else(|| GatorError::NotFound(format!("user {:?}", name)))?;
    state.config.set_user(&user.name, &state.config_path)?;

    writeln!(out, "Username set to {}", user.name)?;
    Ok(())
}

pub(super) async fn reset(state: &mut AppState, args: &[String], out: &mut dyn Write) -> Result<()> {
    expect_args(args, 0, "reset")?;
    let removed = UserRepository::new(state.db.pool()).delete_all().await?;
    info!("Reset database, removed {} user(s)", removed);

    writeln!(out, "database reset!")?;
    Ok(())
}

pub(super) async fn users(state: &mut AppState, args: &[String], out: &mut dyn Write) -> Result<()> {
    expect_args(args, 0, "users")?;
    let users = UserRepository::new(state.db.pool()).list().await?;

    for user in users {
        if user.name == state.config.current_user_name {
            writeln!(out, "* {} (current)", user.name)?;
        } else {
            writeln!(out, "* {}", user.name)?;
        }
    }
    Ok(())
}

pub(super) async fn feeds(state: &mut AppState, args: &[String], out: &mut dyn Write) -> Result<()> {
    expect_args(args, 0, "feeds")?;
    let feeds = FeedRepository::new(state.db.pool()).list_with_creator().await?;

    for entry in feeds {
        writeln!(out, "- Feed: {}", entry.feed.name)?;
        writeln!(out, "  URL: {}", entry.feed.url)?;
        writeln!(out, "  Created by: {}", entry.creator_name)?;
        writeln!(out)?;
    }
    Ok(())
}

/// Without an argument one cycle runs; with an interval the poller runs
/// until Ctrl-C.
pub(super) async fn agg(state: &mut AppState, args: &[String], out: &mut dyn Write) -> Result<()> {
    if args.len() > 1 {
        return Err(GatorError::Validation(
            "usage: agg [interval], e.g. agg 30s or agg 1h30m".to_string(),
        ));
    }

    let scheduler = PollScheduler::new(state.db.clone(), &state.config.poll)?;

    let Some(arg) = args.first() else {
        let report = scheduler.run_cycle(&Shutdown::never()).await?;
        writeln!(
            out,
            "Fetched {}: {} new, {} duplicate, {} skipped, {} failed",
            report.feed_name, report.inserted, report.duplicates, report.skipped, report.failed
        )?;
        return Ok(());
    };

    let every = parse_duration(arg)?;
    scheduler.validate_interval(every)?;

    writeln!(out, "Collecting feeds every {}", arg.trim())?;
    out.flush()?;

    let (trigger, shutdown) = Shutdown::new();
    let signal = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, shutting down");
            trigger.trigger();
        }
    });

    let result = scheduler.run(every, shutdown).await;
    signal.abort();
    result
}

pub(super) async fn add_feed(
    state: &mut AppState,
    user: &User,
    args: &[String],
    out: &mut dyn Write,
) -> Result<()> {
    expect_args(args, 2, "addfeed <name> <url>")?;
    let (name, url) = (args[0].trim(), args[1].trim());
    if name.is_empty() {
        return Err(GatorError::Validation("feed name is empty".to_string()));
    }
    validate_url(url, state.config.poll.block_private_hosts)?;

    let feed = FeedRepository::new(state.db.pool())
        .create(&NewFeed::new(name, url, &user.id))
        .await?;
    FeedFollowRepository::new(state.db.pool())
        .create(&user.id, &feed.id)
        .await?;
    info!("User {} added feed {} ({})", user.name, feed.name, feed.url);

    writeln!(out, "{} has followed {}", user.name, feed.name)?;
    writeln!(out, "  ID: {}", feed.id)?;
    writeln!(out, "  URL: {}", feed.url)?;
    Ok(())
}

pub(super) async fn follow(
    state: &mut AppState,
    user: &User,
    args: &[String],
    out: &mut dyn Write,
) -> Result<()> {
    expect_args(args, 1, "follow <url>")?;
    let url = args[0].trim();

    let feed = FeedRepository::new(state.db.pool())
        .get_by_url(url)
        .await?
        .ok_or_else(|| GatorError::NotFound(format!("feed {:?}", url)))?;
    let follow = FeedFollowRepository::new(state.db.pool())
        .create(&user.id, &feed.id)
        .await?;

    writeln!(out, "{} has followed {}", user.name, follow.feed_name)?;
    Ok(())
}

pub(super) async fn following(
    state: &mut AppState,
    user: &User,
    args: &[String],
    out: &mut dyn Write,
) -> Result<()> {
    expect_args(args, 0, "following")?;
    let follows = FeedFollowRepository::new(state.db.pool())
        .list_for_user(&user.id)
        .await?;

    writeln!(out, "{} is following:", user.name)?;
    for follow in follows {
        writeln!(out, "  - {}", follow.feed_name)?;
    }
    Ok(())
}

pub(super) async fn unfollow(
    state: &mut AppState,
    user: &User,
    args: &[String],
    out: &mut dyn Write,
) -> Result<()> {
    expect_args(args, 1, "unfollow <url>")?;
    let url = args[0].trim();

    let feed = FeedRepository::new(state.db.pool())
        .get_by_url(url)
        .await?
        .ok_or_else(|| GatorError::NotFound(format!("feed {:?}", url)))?;
    let removed = FeedFollowRepository::new(state.db.pool())
        .delete_by_user_and_url(&user.id, url)
        .await?;
    if !removed {
        return Err(GatorError::NotFound(format!("follow of {:?}", url)));
    }

    writeln!(out, "You have unfollowed {}", feed.name)?;
    Ok(())
}

pub(super) async fn browse(
    state: &mut AppState,
    user: &User,
    args: &[String],
    out: &mut dyn Write,
) -> Result<()> {
    if args.len() > 1 {
        return Err(GatorError::Validation("usage: browse [limit]".to_string()));
    }
    let limit = match args.first() {
        Some(arg) => match arg.trim().parse::<i64>() {
            Ok(limit) if limit > 0 => limit,
            _ => {
                return Err(GatorError::Validation(format!(
                    "limit must be a positive number, got {:?}",
                    arg
                )))
            }
        },
        None => DEFAULT_BROWSE_LIMIT,
    };

    let posts = PostRepository::new(state.db.pool())
        .list_for_user(&user.id, limit)
        .await?;

    for entry in posts {
        let published = if entry.post.published_at.is_empty() {
            "unknown date"
        } else {
            entry.post.published_at.as_str()
        };
        writeln!(out, "- {}", entry.post.title)?;
        writeln!(out, "  {} | {}", entry.feed_name, published)?;
        if !entry.post.description.is_empty() {
            writeln!(out, "  {}", entry.post.description)?;
        }
        writeln!(out, "  {}", entry.post.url)?;
        writeln!(out)?;
    }
    Ok(())
}
