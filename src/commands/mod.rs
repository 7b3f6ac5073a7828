//! Command dispatch for the `gator` CLI.
//!
//! Commands are looked up by name in a [`CommandTable`] built once at
//! startup. Commands that act on behalf of a user are wrapped in an
//! [`AuthenticatedHandler`], which resolves the configured user before the
//! command body runs.

mod duration;
mod handlers;

pub use duration::parse_duration;

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::db::{Database, User, UserRepository};
use crate::{Config, GatorError, Result};

/// Posts shown by `browse` when no limit is given.
pub const DEFAULT_BROWSE_LIMIT: i64 = 2;

/// Everything a command can touch.
pub struct AppState {
    /// Shared database handle.
    pub db: Arc<Database>,
    /// Loaded configuration.
    pub config: Config,
    /// Where the configuration is persisted.
    pub config_path: PathBuf,
}

impl AppState {
    /// Bundle the process state.
    pub fn new(db: Arc<Database>, config: Config, config_path: impl Into<PathBuf>) -> Self {
        Self {
            db,
            config,
            config_path: config_path.into(),
        }
    }
}

/// Commands that need no logged-in user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicCommand {
    /// `login <name>`
    Login,
    /// `register <name>`
    Register,
    /// `reset`
    Reset,
    /// `users`
    Users,
    /// `agg [interval]`
    Agg,
    /// `feeds`
    Feeds,
}

impl PublicCommand {
    async fn run(self, state: &mut AppState, args: &[String], out: &mut dyn Write) -> Result<()> {
        match self {
            PublicCommand::Login => handlers::login(state, args, out).await,
            PublicCommand::Register => handlers::register(state, args, out).await,
            PublicCommand::Reset => handlers::reset(state, args, out).await,
            PublicCommand::Users => handlers::users(state, args, out).await,
            PublicCommand::Agg => handlers::agg(state, args, out).await,
            PublicCommand::Feeds => handlers::feeds(state, args, out).await,
        }
    }
}

/// Commands that act as the current user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserCommand {
    /// `addfeed <name> <url>`
    AddFeed,
    /// `follow <url>`
    Follow,
    /// `following`
    Following,
    /// `unfollow <url>`
    Unfollow,
    /// `browse [limit]`
    Browse,
}

impl UserCommand {
    async fn run(
        self,
        state: &mut AppState,
        user: &User,
        args: &[String],
        out: &mut dyn Write,
    ) -> Result<()> {
        match self {
            UserCommand::AddFeed => handlers::add_feed(state, user, args, out).await,
            UserCommand::Follow => handlers::follow(state, user, args, out).await,
            UserCommand::Following => handlers::following(state, user, args, out).await,
            UserCommand::Unfollow => handlers::unfollow(state, user, args, out).await,
            UserCommand::Browse => handlers::browse(state, user, args, out).await,
        }
    }
}

/// Runs a [`UserCommand`] after resolving the configured user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedHandler {
    command: UserCommand,
}

impl AuthenticatedHandler {
    /// Wrap a user command.
    pub fn new(command: UserCommand) -> Self {
        Self { command }
    }

    /// The wrapped command.
    pub fn command(&self) -> UserCommand {
        self.command
    }

    /// Look up the user named in the configuration.
    pub async fn resolve_user(state: &AppState) -> Result<User> {
        let name = state.config.current_user_name.trim();
        if name.is_empty() {
            return Err(GatorError::Auth(
                "no user is logged in; run `register` or `login` first".to_string(),
            ));
        }

        UserRepository::new(state.db.pool())
            .get_by_name(name)
            .await?
            .ok_or_else(|| GatorError::Auth(format!("current user {:?} does not exist", name)))
    }

    /// Resolve the user, then run the command as that user.
    pub async fn run(&self, state: &mut AppState, args: &[String], out: &mut dyn Write) -> Result<()> {
        let user = Self::resolve_user(state).await?;
        debug!("Running {:?} as {}", self.command, user.name);
        self.command.run(state, &user, args, out).await
    }
}

/// Entry in the dispatch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    /// Runs without a user.
    Public(PublicCommand),
    /// Requires a logged-in user.
    Authenticated(AuthenticatedHandler),
}

impl Handler {
    /// Whether the command needs a logged-in user.
    pub fn requires_login(&self) -> bool {
        matches!(self, Handler::Authenticated(_))
    }

    async fn run(&self, state: &mut AppState, args: &[String], out: &mut dyn Write) -> Result<()> {
        match self {
            Handler::Public(command) => command.run(state, args, out).await,
            Handler::Authenticated(handler) => handler.run(state, args, out).await,
        }
    }
}

/// Maps command names to handlers.
#[derive(Debug, Clone)]
pub struct CommandTable {
    handlers: HashMap<&'static str, Handler>,
}

impl CommandTable {
    /// Build the table with every command.
    pub fn new() -> Self {
        let public = [
            ("login", PublicCommand::Login),
            ("register", PublicCommand::Register),
            ("reset", PublicCommand::Reset),
            ("users", PublicCommand::Users),
            ("agg", PublicCommand::Agg),
            ("feeds", PublicCommand::Feeds),
        ];
        let authenticated = [
            ("addfeed", UserCommand::AddFeed),
            ("follow", UserCommand::Follow),
            ("following", UserCommand::Following),
            ("unfollow", UserCommand::Unfollow),
            ("browse", UserCommand::Browse),
        ];

        let mut handlers = HashMap::new();
        for (name, command) in public {
            handlers.insert(name, Handler::Public(command));
        }
        for (name, command) in authenticated {
            handlers.insert(name, Handler::Authenticated(AuthenticatedHandler::new(command)));
        }

        Self { handlers }
    }

    /// Look up a handler.
    pub fn get(&self, name: &str) -> Option<&Handler> {
        self.handlers.get(name)
    }

    /// Registered command names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.handlers.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Run the named command.
    pub async fn dispatch(
        &self,
        state: &mut AppState,
        name: &str,
        args: &[String],
        out: &mut dyn Write,
    ) -> Result<()> {
        let handler = self
            .get(name)
            .ok_or_else(|| GatorError::UnknownCommand(name.to_string()))?;
        debug!("Dispatching {} with {} argument(s)", name, args.len());
        handler.run(state, args, out).await
    }
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::new()
    }
}
