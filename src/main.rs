use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use podbo::config::Config;
use podbo::feed::{EntryPolicy, Episode, Feed, FeedError, FeedErrorKind, FeedFetcher};
use podbo::storage::{Database, DatabaseError};

/// Get the config directory path (~/.config/podbo/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("podbo"))
}

#[derive(Parser, Debug)]
#[command(name = "podbo", about = "Podcast subscriptions from the command line")]
struct Args {
    /// Config file (default: ~/.config/podbo/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Database file (overrides the config file)
    #[arg(long, value_name = "FILE")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Subscribe to a feed and store its current episodes
    Add {
        url: String,
        /// Drop malformed entries instead of failing
        #[arg(long)]
        skip_malformed: bool,
    },
    /// List subscribed feeds
    List,
    /// Fetch a feed and print its episodes without storing them
    Episodes {
        url: String,
        /// Drop malformed entries instead of failing
        #[arg(long)]
        skip_malformed: bool,
        /// Print episodes as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the stored episodes of a subscribed feed
    Show { url: String },
}

fn entry_policy(config: &Config, skip_malformed: bool) -> EntryPolicy {
    if skip_malformed {
        EntryPolicy::SkipEntry
    } else {
        config.on_malformed_entry
    }
}

/// Prefixes a feed error with a user-facing hint for its failure class.
fn feed_failure(err: FeedError) -> anyhow::Error {
    let hint = match err.kind() {
        FeedErrorKind::FeedUnavailable => "Could not retrieve the feed",
        FeedErrorKind::MalformedFeed => "The URL does not point to a usable podcast feed",
        FeedErrorKind::MalformedEntry => {
            "The feed contains an episode without media or date (retry with --skip-malformed)"
        }
    };
    anyhow::anyhow!("{}: {}", hint, err)
}

fn print_episode(pub_date: &NaiveDateTime, title: &str, media_url: &str) {
    println!("{}  {}\n    {}", pub_date.format("%Y-%m-%d %H:%M"), title, media_url);
}

fn print_episodes(episodes: &[Episode]) {
    for episode in episodes {
        print_episode(&episode.pub_date, &episode.title, &episode.media_url);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config_dir = get_config_dir()?;
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let config = Config::load(&config_path).context("Failed to load configuration")?;

    let db_path = args
        .db
        .clone()
        .or_else(|| config.database_path.clone())
        .unwrap_or_else(|| config_dir.join("podbo.db"));
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create database directory {}", parent.display())
            })?;
        }
    }
    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;

    let db = match Database::open(db_path_str).await {
        Ok(db) => db,
        Err(DatabaseError::InstanceLocked) => {
            eprintln!("Error: The database is locked by another process.");
            std::process::exit(1);
        }
        Err(e) => return Err(anyhow::anyhow!("Failed to open database: {}", e)),
    };

    let fetcher = FeedFetcher::from_config(&config).context("Failed to build HTTP client")?;

    match args.command {
        Command::Add {
            url,
            skip_malformed,
        } => {
            let feed = Feed::fetch(&fetcher, &url).await.map_err(feed_failure)?;
            let episodes = feed
                .get_entries(&fetcher, entry_policy(&config, skip_malformed))
                .await
                .map_err(feed_failure)?;

            let stored = match db.subscribe(&feed, &episodes).await {
                Ok((_, stored)) => stored,
                Err(DatabaseError::FeedExists(url)) => {
                    eprintln!("Already subscribed to {}", url);
                    std::process::exit(1);
                }
                Err(e) => return Err(e).context("Failed to store subscription"),
            };

            println!("Subscribed to {} ({} episodes)", feed.title(), stored);
        }
        Command::List => {
            let feeds = db.get_feeds().await.context("Failed to load feeds")?;
            if feeds.is_empty() {
                println!("No subscriptions yet. Add one with: podbo add <URL>");
            }
            for feed in feeds {
                println!("{} [{} episodes]\n    {}", feed.title, feed.episode_count, feed.url);
            }
        }
        Command::Episodes {
            url,
            skip_malformed,
            json,
        } => {
            let feed = match db.get_feed_by_url(&url).await? {
                Some(stored) => stored.to_feed(),
                None => Feed::fetch(&fetcher, &url).await.map_err(feed_failure)?,
            };
            let episodes = feed
                .get_entries(&fetcher, entry_policy(&config, skip_malformed))
                .await
                .map_err(feed_failure)?;

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&episodes).context("Failed to encode episodes")?
                );
            } else {
                println!("{}\n{}\n", feed.title(), feed.summary());
                print_episodes(&episodes);
            }
        }
        Command::Show { url } => {
            let Some(feed) = db.get_feed_by_url(&url).await? else {
                eprintln!("Not subscribed to {}", url);
                std::process::exit(1);
            };
            let episodes = db
                .get_episodes_for_feed(feed.id)
                .await
                .context("Failed to load episodes")?;

            println!("{}\n{}\n", feed.title, feed.summary);
            for episode in episodes {
                print_episode(&episode.pub_date, &episode.title, &episode.media_url);
            }
        }
    }

    Ok(())
}
