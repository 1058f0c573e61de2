//! Command-line interface for gator.
//!
//! Each subcommand is a short sequence of repository calls. Command output
//! goes to the supplied writer; diagnostics go through `tracing`.

use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::datetime::format_utc_datetime_default;
use crate::db::{FeedFollowRepository, User, UserRepository};
use crate::rss::{parse_interval, FeedRepository, NewFeed, PostRepository, RssFetcher, Scheduler};
use crate::{Config, Database, GatorError, Result};

/// Number of posts shown by `browse` when no limit is given.
pub const DEFAULT_BROWSE_LIMIT: i64 = 2;

/// gator - a command-line RSS aggregator
#[derive(Parser, Debug)]
#[command(name = "gator", version, about, long_about = None)]
pub struct Cli {
    /// Config file (defaults to $GATOR_CONFIG or ~/.gatorconfig.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create a user and log in as them
    Register {
        /// User name
        name: String,
    },
    /// Switch the current user
    Login {
        /// User name
        name: String,
    },
    /// Delete every user along with their feeds, follows and posts
    Reset,
    /// List users
    Users,
    /// Add a feed and follow it
    Addfeed {
        /// Display name
        name: String,
        /// Feed URL
        url: String,
    },
    /// List all feeds
    Feeds,
    /// Follow an existing feed
    Follow {
        /// Feed URL
        url: String,
    },
    /// List the feeds the current user follows
    Following,
    /// Stop following a feed
    Unfollow {
        /// Feed URL
        url: String,
    },
    /// Show the newest posts from followed feeds
    Browse {
        /// Number of posts to show
        limit: Option<String>,
    },
    /// Fetch feeds on a fixed interval until interrupted
    #[command(alias = "agg")]
    Aggregate {
        /// Time between fetches, e.g. 30s, 1m, 1h30m
        interval: String,
    },
}

/// Loaded configuration and an open database.
pub struct Session {
    config: Config,
    db: Database,
}

impl Session {
    /// Create a session.
    pub fn new(config: Config, db: Database) -> Self {
        Self { config, db }
    }

    /// Current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run one command.
    ///
    /// `cancel` only matters for `aggregate`, which runs until it fires.
    pub async fn execute<W: Write + Send>(
        &mut self,
        command: Command,
        out: &mut W,
        cancel: CancellationToken,
    ) -> Result<()> {
        match command {
            Command::Register { name } => self.register(&name, out).await,
            Command::Login { name } => self.login(&name, out).await,
            Command::Reset => self.reset(out).await,
            Command::Users => self.users(out).await,
            Command::Addfeed { name, url } => self.add_feed(&name, &url, out).await,
            Command::Feeds => self.feeds(out).await,
            Command::Follow { url } => self.follow(&url, out).await,
            Command::Following => self.following(out).await,
            Command::Unfollow { url } => self.unfollow(&url, out).await,
            Command::Browse { limit } => self.browse(limit.as_deref(), out).await,
            Command::Aggregate { interval } => self.aggregate(&interval, out, cancel).await,
        }
    }

    async fn current_user(&self) -> Result<User> {
        let name = self.config.current_user_name.as_str();
        if name.is_empty() {
            return Err(GatorError::NotFound(
                "logged-in user (run `gator login <name>`)".to_string(),
            ));
        }
        UserRepository::new(self.db.pool())
            .get_by_name(name)
            .await?
            .ok_or_else(|| GatorError::NotFound(format!("user {:?}", name)))
    }

    async fn register<W: Write>(&mut self, name: &str, out: &mut W) -> Result<()> {
        let user = UserRepository::new(self.db.pool()).create(name).await?;
        self.config.set_user(&user.name)?;
        info!("Registered user {}", user.name);
        writeln!(out, "User {} created (id {})", user.name, user.id)?;
        Ok(())
    }

    async fn login<W: Write>(&mut self, name: &str, out: &mut W) -> Result<()> {
        let user = UserRepository::new(self.db.pool())
            .get_by_name(name.trim())
            .await?
            .ok_or_else(|| GatorError::NotFound(format!("user {:?}", name.trim())))?;
        self.config.set_user(&user.name)?;
        writeln!(out, "Logged in as {}", user.name)?;
        Ok(())
    }

    async fn reset<W: Write>(&mut self, out: &mut W) -> Result<()> {
        let deleted = UserRepository::new(self.db.pool()).reset().await?;
        info!("Reset database: {} user(s) deleted", deleted);
        writeln!(out, "Database reset ({} user(s) deleted)", deleted)?;
        Ok(())
    }

    async fn users<W: Write>(&self, out: &mut W) -> Result<()> {
        let users = UserRepository::new(self.db.pool()).list().await?;
        for user in users {
            if user.name == self.config.current_user_name {
                writeln!(out, "* {} (current)", user.name)?;
            } else {
                writeln!(out, "* {}", user.name)?;
            }
        }
        Ok(())
    }

    async fn add_feed<W: Write>(&self, name: &str, url: &str, out: &mut W) -> Result<()> {
        let user = self.current_user().await?;
        let feed = FeedRepository::new(self.db.pool())
            .create(&NewFeed::new(name, url, user.id))
            .await?;
        let follow = FeedFollowRepository::new(self.db.pool())
            .create(user.id, feed.id)
            .await?;

        info!("Feed {} added by {}", feed.url, user.name);
        writeln!(out, "Feed added: {} ({})", feed.name, feed.url)?;
        writeln!(out, "{} now follows {}", follow.user_name, follow.feed_name)?;
        Ok(())
    }

    async fn feeds<W: Write>(&self, out: &mut W) -> Result<()> {
        let feeds = FeedRepository::new(self.db.pool()).list_with_owner().await?;
        for entry in feeds {
            writeln!(
                out,
                "* {} ({}) added by {}",
                entry.feed.name, entry.feed.url, entry.user_name
            )?;
        }
        Ok(())
    }

    async fn follow<W: Write>(&self, url: &str, out: &mut W) -> Result<()> {
        let user = self.current_user().await?;
        let feed = FeedRepository::new(self.db.pool())
            .get_by_url(url)
            .await?
            .ok_or_else(|| GatorError::NotFound(format!("feed {}", url.trim())))?;
        let follow = FeedFollowRepository::new(self.db.pool())
            .create(user.id, feed.id)
            .await?;

        writeln!(out, "{} now follows {}", follow.user_name, follow.feed_name)?;
        Ok(())
    }

    async fn following<W: Write>(&self, out: &mut W) -> Result<()> {
        let user = self.current_user().await?;
        let follows = FeedFollowRepository::new(self.db.pool())
            .list_for_user(user.id)
            .await?;
        for follow in follows {
            writeln!(out, "* {}", follow.feed_name)?;
        }
        Ok(())
    }

    async fn unfollow<W: Write>(&self, url: &str, out: &mut W) -> Result<()> {
        let user = self.current_user().await?;
        let removed = FeedFollowRepository::new(self.db.pool())
            .delete_by_user_and_url(user.id, url.trim())
            .await?;
        if !removed {
            return Err(GatorError::NotFound(format!(
                "follow of {} by {}",
                url.trim(),
                user.name
            )));
        }

        writeln!(out, "{} unfollowed {}", user.name, url.trim())?;
        Ok(())
    }

    async fn browse<W: Write>(&self, limit: Option<&str>, out: &mut W) -> Result<()> {
        let limit = parse_limit(limit)?;
        let user = self.current_user().await?;
        let posts = PostRepository::new(self.db.pool())
            .list_for_user(user.id, limit)
            .await?;

        if posts.is_empty() {
            writeln!(out, "No posts yet. Run `gator aggregate <interval>` to collect some.")?;
            return Ok(());
        }

        let timezone = self.config.display.timezone.as_str();
        for entry in posts {
            let post = &entry.post;
            writeln!(
                out,
                "{} from {}",
                format_utc_datetime_default(&post.published_at, timezone),
                entry.feed_name
            )?;
            writeln!(out, "--- {} ---", post.title)?;
            if !post.description.is_empty() {
                writeln!(out, "    {}", post.description)?;
            }
            writeln!(out, "Link: {}", post.url)?;
            writeln!(out, "=====================================")?;
        }
        Ok(())
    }

    async fn aggregate<W: Write + Send>(
        &self,
        interval: &str,
        out: &mut W,
        cancel: CancellationToken,
    ) -> Result<()> {
        let interval = parse_interval(interval)?;
        let fetcher = RssFetcher::new(&self.config.aggregator)?;
        let scheduler = Scheduler::new(
            FeedRepository::new(self.db.pool()),
            PostRepository::new(self.db.pool()),
            fetcher,
            interval,
        );

        writeln!(out, "Collecting feeds every {:?}", scheduler.interval())?;
        out.flush()?;
        scheduler.run(cancel).await;
        Ok(())
    }
}

/// Parse the optional `browse` limit.
pub fn parse_limit(limit: Option<&str>) -> Result<i64> {
    let Some(raw) = limit else {
        return Ok(DEFAULT_BROWSE_LIMIT);
    };
    match raw.trim().parse::<i64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(GatorError::Usage(format!(
            "limit must be a positive integer, got {:?}",
            raw
        ))),
    }
}
