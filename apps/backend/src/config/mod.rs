//! Environment configuration, read once at startup.
//!
//! Each config struct has a `from_env()` for `main` and a `from_lookup()`
//! that takes any key → value function, so tests never touch the process
//! environment.

pub mod game;
pub mod server;

use std::str::FromStr;

use crate::error::AppError;

pub use game::{GameConfig, PaymentConfig};
pub use server::ServerConfig;

/// Parse `key` with `FromStr`, falling back to `default` when unset or
/// blank. A present but malformed value is a config error.
pub(crate) fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<T>().map_err(|_| {
            AppError::config(format!("Environment variable '{key}' has invalid value '{raw}'"))
        }),
    }
}

pub(crate) fn string_or<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

pub(crate) fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
