//! Configuration for lockwire
//!
//! Centralized configuration with sensible defaults.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{LockwireError, Result};

/// Where the store listens
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// TCP host and port
    Tcp { host: String, port: u16 },

    /// Unix domain socket path
    Unix(PathBuf),
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Tcp { host, port } => write!(f, "{}:{}", host, port),
            Endpoint::Unix(path) => write!(f, "unix:{}", path.display()),
        }
    }
}

/// Main configuration for a lockwire client
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Connection Configuration
    // -------------------------------------------------------------------------
    /// Server endpoint (TCP or unix socket)
    pub endpoint: Endpoint,

    /// Username for ACL authentication (sent only with a password)
    pub username: Option<String>,

    /// Password; when set, AUTH is sent right after connecting
    pub password: Option<String>,

    /// Database index; SELECT is sent when non-zero
    pub database: u32,

    /// Connect timeout (milliseconds, 0 = platform default)
    pub connect_timeout_ms: u64,

    /// Read/write timeout applied to every round trip (milliseconds, 0 = none)
    pub data_timeout_ms: u64,

    /// How many times a command is resent after an I/O failure
    pub retries: u32,

    /// Pause before reconnecting for a retry (milliseconds)
    pub retry_interval_ms: u64,

    // -------------------------------------------------------------------------
    // Mutex Configuration
    // -------------------------------------------------------------------------
    /// Lease attached to every lock key (milliseconds)
    pub lock_lease_ms: u64,

    /// Prefix of every lock key
    pub lock_key_prefix: String,

    /// Pause between acquire attempts (milliseconds)
    pub lock_retry_interval_ms: u64,

    /// Release still-held locks when the mutex is dropped
    pub lock_auto_release: bool,

    // -------------------------------------------------------------------------
    // Pool Configuration
    // -------------------------------------------------------------------------
    /// Max connections kept by a ConnectionPool
    pub pool_size: usize,

    /// How long ConnectionPool::get waits for a free connection (milliseconds)
    pub pool_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::Tcp {
                host: "127.0.0.1".to_string(),
                port: Self::DEFAULT_PORT,
            },
            username: None,
            password: None,
            database: 0,
            connect_timeout_ms: 5000,
            data_timeout_ms: 5000,
            retries: 0,
            retry_interval_ms: 100,
            lock_lease_ms: 30_000,
            lock_key_prefix: "lw:".to_string(),
            lock_retry_interval_ms: 1000,
            lock_auto_release: true,
            pool_size: 8,
            pool_timeout_ms: 5000,
        }
    }
}

impl Config {
    pub const DEFAULT_PORT: u16 = 6379;

    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Parse a connection URL
    ///
    /// Accepted forms:
    /// - `redis://[[user]:password@]host[:port][/db]`
    /// - `unix:///path/to/socket[?db=N]`
    pub fn from_url(url: &str) -> Result<Self> {
        let mut config = Config::default();

        if let Some(rest) = url.strip_prefix("unix://") {
            let (path, query) = match rest.split_once('?') {
                Some((path, query)) => (path, Some(query)),
                None => (rest, None),
            };
            if path.is_empty() {
                return Err(LockwireError::Config(format!("missing socket path in '{}'", url)));
            }
            config.endpoint = Endpoint::Unix(PathBuf::from(path));

            if let Some(query) = query {
                for pair in query.split('&').filter(|p| !p.is_empty()) {
                    match pair.split_once('=') {
                        Some(("db", value)) => config.database = parse_number("db", value)?,
                        Some(("password", value)) => config.password = Some(value.to_string()),
                        _ => {
                            return Err(LockwireError::Config(format!(
                                "unsupported query parameter '{}'",
                                pair
                            )))
                        }
                    }
                }
            }
            return Ok(config);
        }

        let rest = url
            .strip_prefix("redis://")
            .ok_or_else(|| LockwireError::Config(format!("unsupported URL scheme in '{}'", url)))?;

        // Split authority from the database path
        let (authority, db) = match rest.split_once('/') {
            Some((authority, db)) => (authority, db),
            None => (rest, ""),
        };
        if !db.is_empty() {
            config.database = parse_number("db", db)?;
        }

        // Credentials
        let host_port = match authority.rsplit_once('@') {
            Some((userinfo, host_port)) => {
                let (user, password) = match userinfo.split_once(':') {
                    Some((user, password)) => (user, Some(password)),
                    None => (userinfo, None),
                };
                match password {
                    Some(password) => {
                        if !user.is_empty() {
                            config.username = Some(user.to_string());
                        }
                        config.password = Some(password.to_string());
                    }
                    // A lone userinfo component is a password, as redis-cli reads it
                    None if !user.is_empty() => config.password = Some(user.to_string()),
                    None => {}
                }
                host_port
            }
            None => authority,
        };

        let (host, port) = match host_port.rsplit_once(':') {
            Some((host, port)) => (host, parse_number("port", port)?),
            None => (host_port, Self::DEFAULT_PORT),
        };
        if host.is_empty() {
            return Err(LockwireError::Config(format!("missing host in '{}'", url)));
        }
        config.endpoint = Endpoint::Tcp {
            host: host.to_string(),
            port,
        };

        Ok(config)
    }

    /// Build a config from `LOCKWIRE_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable lookup
    ///
    /// Reads `LOCKWIRE_URL`, `LOCKWIRE_PASSWORD`, `LOCKWIRE_DB`,
    /// `LOCKWIRE_CONNECT_TIMEOUT_MS`, `LOCKWIRE_DATA_TIMEOUT_MS`,
    /// `LOCKWIRE_LOCK_LEASE_MS` and `LOCKWIRE_LOCK_PREFIX`. Unset variables
    /// keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup("LOCKWIRE_URL") {
            Some(url) => Self::from_url(&url)?,
            None => Config::default(),
        };

        if let Some(password) = lookup("LOCKWIRE_PASSWORD") {
            config.password = Some(password);
        }
        if let Some(db) = lookup("LOCKWIRE_DB") {
            config.database = parse_number("LOCKWIRE_DB", &db)?;
        }
        if let Some(ms) = lookup("LOCKWIRE_CONNECT_TIMEOUT_MS") {
            config.connect_timeout_ms = parse_number("LOCKWIRE_CONNECT_TIMEOUT_MS", &ms)?;
        }
        if let Some(ms) = lookup("LOCKWIRE_DATA_TIMEOUT_MS") {
            config.data_timeout_ms = parse_number("LOCKWIRE_DATA_TIMEOUT_MS", &ms)?;
        }
        if let Some(ms) = lookup("LOCKWIRE_LOCK_LEASE_MS") {
            config.lock_lease_ms = parse_number("LOCKWIRE_LOCK_LEASE_MS", &ms)?;
        }
        if let Some(prefix) = lookup("LOCKWIRE_LOCK_PREFIX") {
            config.lock_key_prefix = prefix;
        }

        Ok(config)
    }

    /// Connect timeout, if one is configured
    pub fn connect_timeout(&self) -> Option<Duration> {
        non_zero_millis(self.connect_timeout_ms)
    }

    /// Data (read/write) timeout, if one is configured
    pub fn data_timeout(&self) -> Option<Duration> {
        non_zero_millis(self.data_timeout_ms)
    }
}

fn non_zero_millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

fn parse_number<T: std::str::FromStr>(what: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| LockwireError::Config(format!("invalid {}: '{}'", what, value)))
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Connect over TCP
    pub fn tcp(mut self, host: impl Into<String>, port: u16) -> Self {
        self.config.endpoint = Endpoint::Tcp {
            host: host.into(),
            port,
        };
        self
    }

    /// Connect over a unix domain socket
    pub fn unix(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.endpoint = Endpoint::Unix(path.into());
        self
    }

    /// Set the endpoint
    pub fn endpoint(mut self, endpoint: Endpoint) -> Self {
        self.config.endpoint = endpoint;
        self
    }

    /// Set the ACL username
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.config.username = Some(username.into());
        self
    }

    /// Set the password
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.password = Some(password.into());
        self
    }

    /// Set the database index
    pub fn database(mut self, index: u32) -> Self {
        self.config.database = index;
        self
    }

    /// Set the connect timeout (in milliseconds)
    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.connect_timeout_ms = ms;
        self
    }

    /// Set the data timeout (in milliseconds)
    pub fn data_timeout_ms(mut self, ms: u64) -> Self {
        self.config.data_timeout_ms = ms;
        self
    }

    /// Set how many times a command is retried after an I/O failure
    pub fn retries(mut self, retries: u32) -> Self {
        self.config.retries = retries;
        self
    }

    /// Set the pause before a reconnect retry (in milliseconds)
    pub fn retry_interval_ms(mut self, ms: u64) -> Self {
        self.config.retry_interval_ms = ms;
        self
    }

    /// Set the lock lease (in milliseconds)
    pub fn lock_lease_ms(mut self, ms: u64) -> Self {
        self.config.lock_lease_ms = ms;
        self
    }

    /// Set the lock key prefix
    pub fn lock_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.lock_key_prefix = prefix.into();
        self
    }

    /// Set the pause between acquire attempts (in milliseconds)
    pub fn lock_retry_interval_ms(mut self, ms: u64) -> Self {
        self.config.lock_retry_interval_ms = ms;
        self
    }

    /// Release held locks when the mutex is dropped
    pub fn lock_auto_release(mut self, enabled: bool) -> Self {
        self.config.lock_auto_release = enabled;
        self
    }

    /// Set the pool size
    pub fn pool_size(mut self, size: usize) -> Self {
        self.config.pool_size = size;
        self
    }

    /// Set the pool checkout timeout (in milliseconds)
    pub fn pool_timeout_ms(mut self, ms: u64) -> Self {
        self.config.pool_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
