//! Store configuration parsed from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_DB_PATH: &str = "wishlist.db";
pub const DEFAULT_STORAGE_KEY: &str = "wishlist";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a positive integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },

    #[error("{var} must not be empty")]
    Empty { var: &'static str },
}

/// Connection settings for the remote mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub base_url: String,
    pub api_token: Option<String>,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WishlistConfig {
    pub db_path: PathBuf,
    pub storage_key: String,
    /// `None` keeps the wishlist local-only.
    pub remote: Option<RemoteConfig>,
}

impl Default for WishlistConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            remote: None,
        }
    }
}

impl WishlistConfig {
    /// Build config from environment variables.
    ///
    /// Optional:
    /// - `WISHLIST_DB_PATH`: default `wishlist.db`
    /// - `WISHLIST_STORAGE_KEY`: default `wishlist`
    /// - `WISHLIST_API_BASE_URL`: enables remote sync when set
    /// - `WISHLIST_API_TOKEN`: bearer token for the remote API
    /// - `WISHLIST_REQUEST_TIMEOUT_SECS`: default 15
    /// - `WISHLIST_CONNECT_TIMEOUT_SECS`: default 5
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build config from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let db_path = lookup("WISHLIST_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));

        let storage_key = match lookup("WISHLIST_STORAGE_KEY") {
            Some(key) if key.trim().is_empty() => {
                return Err(ConfigError::Empty { var: "WISHLIST_STORAGE_KEY" });
            }
            Some(key) => key,
            None => DEFAULT_STORAGE_KEY.to_string(),
        };

        let remote = match lookup("WISHLIST_API_BASE_URL").filter(|url| !url.trim().is_empty()) {
            Some(url) => Some(RemoteConfig {
                base_url: url.trim().trim_end_matches('/').to_string(),
                api_token: lookup("WISHLIST_API_TOKEN").filter(|token| !token.is_empty()),
                request_timeout: parse_secs(
                    "WISHLIST_REQUEST_TIMEOUT_SECS",
                    lookup("WISHLIST_REQUEST_TIMEOUT_SECS"),
                    DEFAULT_REQUEST_TIMEOUT_SECS,
                )?,
                connect_timeout: parse_secs(
                    "WISHLIST_CONNECT_TIMEOUT_SECS",
                    lookup("WISHLIST_CONNECT_TIMEOUT_SECS"),
                    DEFAULT_CONNECT_TIMEOUT_SECS,
                )?,
            }),
            None => None,
        };

        Ok(Self {
            db_path,
            storage_key,
            remote,
        })
    }
}

fn parse_secs(var: &'static str, value: Option<String>, default: u64) -> Result<Duration, ConfigError> {
    let Some(raw) = value else {
        return Ok(Duration::from_secs(default));
    };
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidNumber { var, value: raw }),
    }
}
