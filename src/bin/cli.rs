//! DocKV CLI
//!
//! Command-line interface for inspecting and editing a DocKV collection.

use clap::{Parser, Subcommand};
use dockv::{DocStore, StoreConfig};
use serde_json::Value;
use tracing_subscriber::{fmt, EnvFilter};

/// DocKV CLI
#[derive(Parser, Debug)]
#[command(name = "dockv")]
#[command(about = "CLI for the DocKV key-value store")]
#[command(version)]
struct Args {
    /// Store address (<scheme>://<host>[:<port>]/<database>)
    #[arg(short, long, default_value = "dockv://localhost:27017/dockv")]
    uri: String,

    /// Collection to operate on
    #[arg(short, long, default_value = "kv")]
    collection: String,

    /// Data directory for the log backend
    #[arg(short, long, default_value = "./dockv_data")]
    data_dir: String,

    /// Rewrite the address host to this machine
    #[arg(long)]
    local_host: bool,

    /// Permit the clear command
    #[arg(long)]
    allow_clear: bool,

    /// Log failures and print safe defaults instead of exiting
    #[arg(long)]
    ignore_errors: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Put {
        /// The key to set
        key: String,

        /// The value (JSON, or a plain string)
        value: String,
    },

    /// Remove a key
    Remove {
        /// The key to remove
        key: String,
    },

    /// Check whether a key exists
    Contains {
        /// The key to check
        key: String,
    },

    /// Count records
    Size,

    /// Erase every record (requires --allow-clear)
    Clear,

    /// List keys
    Keys,

    /// Print the whole collection as a JSON object
    Dump,
}

#[tokio::main]
async fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,dockv=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    tracing::debug!("DocKV CLI v{}", dockv::VERSION);

    let config = store_config(&args);

    if let Err(e) = run(config, args.command).await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn store_config(args: &Args) -> StoreConfig {
    StoreConfig::builder()
        .uri(&args.uri)
        .collection(&args.collection)
        .data_dir(&args.data_dir)
        .use_local_host(args.local_host)
        .allow_destructive_clear(args.allow_clear)
        .ignore_errors(args.ignore_errors)
        .build()
}

async fn run(config: StoreConfig, command: Commands) -> dockv::Result<()> {
    let store = DocStore::open(config)?;
    store.start().await?;

    match command {
        Commands::Get { key } => match store.get(&key).await? {
            Some(value) => println!("{}", value),
            None => println!("(nil)"),
        },
        Commands::Put { key, value } => {
            store.put(&key, parse_value(&value)).await?;
            println!("OK");
        }
        Commands::Remove { key } => {
            store.remove(&key).await?;
            println!("OK");
        }
        Commands::Contains { key } => println!("{}", store.contains_key(&key).await?),
        Commands::Size => println!("{}", store.size().await?),
        Commands::Clear => {
            store.clear().await?;
            println!("OK");
        }
        Commands::Keys => {
            for key in store.keys().await? {
                println!("{}", key);
            }
        }
        Commands::Dump => {
            let snapshot = Value::Object(store.to_object().await?);
            println!("{:#}", snapshot);
        }
    }

    store.close().await
}

/// Parse a CLI value as JSON, falling back to a plain string
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dockv::DocKvError;
    use serde_json::json;

    fn memory_args(extra: &[&str]) -> Args {
        let mut argv = vec!["dockv", "--uri", "memory://localhost/cli"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_parse_value_reads_json() {
        assert_eq!(parse_value("42"), json!(42));
        assert_eq!(parse_value("true"), json!(true));
        assert_eq!(parse_value(r#"{"a":[1,2]}"#), json!({ "a": [1, 2] }));
        assert_eq!(parse_value(r#""quoted""#), json!("quoted"));
    }

    #[test]
    fn test_parse_value_falls_back_to_string() {
        assert_eq!(parse_value("hello world"), json!("hello world"));
        assert_eq!(parse_value("{not json"), json!("{not json"));
        assert_eq!(parse_value(""), json!(""));
    }

    #[test]
    fn test_args_build_store_config() {
        let args = memory_args(&["--collection", "sessions", "--allow-clear", "--ignore-errors", "size"]);

        let config = store_config(&args);

        assert_eq!(config.uri, "memory://localhost/cli");
        assert_eq!(config.collection, "sessions");
        assert!(config.allow_destructive_clear);
        assert!(config.ignore_connection_error);
        assert!(config.ignore_operation_error);
        assert!(!config.use_local_host);
        assert!(matches!(args.command, Commands::Size));
    }

    #[test]
    fn test_args_require_subcommand() {
        assert!(Args::try_parse_from(["dockv"]).is_err());
    }

    #[tokio::test]
    async fn test_run_put_against_memory_store() {
        let args = memory_args(&["put", "k", "[1,2]"]);

        run(store_config(&args), args.command).await.unwrap();
    }

    #[tokio::test]
    async fn test_run_clear_requires_flag() {
        let args = memory_args(&["clear"]);

        let result = run(store_config(&args), args.command).await;

        assert!(matches!(result, Err(DocKvError::Permission(_))));
    }
}
