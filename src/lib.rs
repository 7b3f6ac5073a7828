//! Gator - a personal RSS aggregator
//!
//! Users register feeds and follow them; a poller fetches one feed per tick
//! and stores new posts for browsing.

pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod rss;
pub mod shutdown;

pub use commands::{AppState, CommandTable};
pub use config::Config;
pub use db::{Database, NewUser, User, UserRepository};
pub use error::{GatorError, Result};
pub use shutdown::{Shutdown, ShutdownTrigger};
