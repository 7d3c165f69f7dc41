//! Global Cache - admin command line
//!
//! Inspects and maintains the cache configured through `GLOBALCACHE_*`
//! environment variables, e.g. from a cron job or a deploy script.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use globalcache::{Config, GlobalCache};

#[derive(Parser, Debug)]
#[command(name = "globalcache", version, about = "Inspect and maintain the global cache")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Describe the active backend
    Info {
        /// Enumerate every key (file backend)
        #[arg(long)]
        keys: bool,
    },
    /// List all live keys
    Keys,
    /// Print the value stored under KEY
    Get { key: String },
    /// Store a JSON value under KEY
    Set {
        key: String,
        /// Value as JSON; plain text is stored as a string
        value: String,
        /// Seconds to live, 0 = backend default
        #[arg(long, default_value_t = 0)]
        ttl: i64,
    },
    /// Remove KEY
    Delete { key: String },
    /// Remove all entries
    Clear {
        /// Only remove expired entries
        #[arg(long)]
        expired_only: bool,
    },
}

fn main() -> Result<()> {
    // Logs go to stderr so stdout stays valid JSON.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "globalcache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    let cache = GlobalCache::from_config(&config);
    cache.mark_ready();
    info!("Using '{}' backend", cache.backend_name());

    let output = run(&cache, cli.command)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&output).context("Failed to render output")?
    );
    Ok(())
}

fn run(cache: &GlobalCache, command: Command) -> Result<Value> {
    let output = match command {
        Command::Info { keys } => serde_json::to_value(cache.info(keys))?,
        Command::Keys => json!(cache.keys()),
        Command::Get { key } => cache.get_value(&key, Value::Null),
        Command::Set { key, value, ttl } => {
            let value = serde_json::from_str(&value).unwrap_or_else(|_| Value::String(value));
            json!(cache.set(&key, &value, ttl))
        }
        Command::Delete { key } => json!(cache.delete(&key)),
        Command::Clear { expired_only } => json!(cache.clear(expired_only)),
    };
    Ok(output)
}
