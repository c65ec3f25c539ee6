//! lockwire CLI
//!
//! Command-line interface for talking to a RESP store and holding locks.

use std::time::Duration;

use clap::{Parser, Subcommand};
use lockwire::{Command, Config, Connection, DistributedMutex, SharedConnection};
use tracing_subscriber::{fmt, EnvFilter};

/// lockwire CLI
#[derive(Parser, Debug)]
#[command(name = "lockwire-cli")]
#[command(about = "CLI for RESP key-value stores and distributed locks")]
#[command(version)]
struct Args {
    /// Server URL (redis://[user:pass@]host[:port][/db] or unix:///path)
    #[arg(short, long, default_value = "redis://127.0.0.1:6379")]
    url: String,

    /// Password (overrides the URL)
    #[arg(short, long)]
    password: Option<String>,

    /// Database index (overrides the URL)
    #[arg(short = 'n', long)]
    db: Option<u32>,

    /// Read/write timeout in milliseconds
    #[arg(short, long, default_value = "5000")]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ping the server
    Ping,

    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,

        /// Expire after this many milliseconds
        #[arg(long)]
        px: Option<u64>,
    },

    /// Delete keys
    Del {
        /// The keys to delete
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Run an arbitrary command
    Exec {
        /// Command verb (quote multi-word verbs: "CLIENT LIST")
        verb: String,

        /// Command arguments
        args: Vec<String>,
    },

    /// Acquire a lock, hold it, then release it
    Lock {
        /// Lock name
        name: String,

        /// Seconds to wait for the lock
        #[arg(short, long, default_value = "0")]
        wait: u64,

        /// Seconds to hold the lock before releasing
        #[arg(long, default_value = "1")]
        hold: u64,

        /// Lease in milliseconds
        #[arg(long)]
        lease_ms: Option<u64>,
    },
}

/// Log filter used when RUST_LOG is unset; logs go to stderr
const DEFAULT_LOG_FILTER: &str = "info,lockwire=debug";

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match Config::from_url(&args.url) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid URL: {}", e);
            std::process::exit(2);
        }
    };
    if let Some(password) = args.password {
        config.password = Some(password);
    }
    if let Some(db) = args.db {
        config.database = db;
    }
    config.data_timeout_ms = args.timeout_ms;

    tracing::debug!("lockwire CLI v{} -> {}", lockwire::VERSION, config.endpoint);

    if let Err(e) = run(config, args.command) {
        eprintln!("(error) {}", e);
        std::process::exit(1);
    }
}

fn run(config: Config, command: Commands) -> lockwire::Result<()> {
    match command {
        Commands::Lock {
            name,
            wait,
            hold,
            lease_ms,
        } => {
            let mut config = config;
            if let Some(lease_ms) = lease_ms {
                config.lock_lease_ms = lease_ms;
            }
            let connection = SharedConnection::new(config.clone());
            let mutex = DistributedMutex::from_config(&connection, &config);

            if !mutex.acquire(&name, Duration::from_secs(wait))? {
                println!("lock '{}' is held elsewhere", name);
                std::process::exit(3);
            }
            tracing::info!("Holding lock '{}' for {}s", name, hold);
            println!("acquired '{}' ({})", name, mutex.key_for(&name));
            std::thread::sleep(Duration::from_secs(hold));

            if mutex.release(&name)? {
                println!("released '{}'", name);
            } else {
                println!("lease on '{}' expired before release", name);
            }
            connection.close()
        }
        other => {
            let mut connection = Connection::new(config);
            let command = match other {
                Commands::Ping => Command::new("PING"),
                Commands::Get { key } => Command::new("GET").arg(key),
                Commands::Set { key, value, px } => {
                    let command = Command::new("SET").arg(key).arg(value);
                    match px {
                        Some(ms) => command.arg("PX").arg(ms),
                        None => command,
                    }
                }
                Commands::Del { keys } => Command::with_args("DEL", keys),
                Commands::Exec { verb, args } => Command::with_args(&verb, args),
                Commands::Lock { .. } => unreachable!("handled above"),
            };
            let reply = connection.execute_command(&command)?;
            println!("{}", reply);
            connection.close()
        }
    }
}
