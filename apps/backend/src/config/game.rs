use std::time::Duration;

use crate::config::{env_lookup, parse_or};
use crate::domain::rules::{LobbyRules, DEFAULT_WINNERS_QUOTA, HAND_SIZE, MIN_PLAYERS};
use crate::error::AppError;

/// Lobby and game tunables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameConfig {
    /// How long a disconnected player keeps their seat.
    pub grace_period: Duration,
    /// Copied into every new lobby.
    pub rules: LobbyRules,
    pub max_capacity: usize,
    pub default_capacity: usize,
    pub payment: PaymentConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentConfig {
    pub paid_lobbies_enabled: bool,
    /// Unset selects the in-memory oracle.
    pub oracle_url: Option<String>,
    pub oracle_timeout: Duration,
    /// A paid lobby nobody has joined is deleted after this long.
    pub unjoined_ttl: Duration,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            paid_lobbies_enabled: true,
            oracle_url: None,
            oracle_timeout: Duration::from_millis(5000),
            unjoined_ttl: Duration::from_secs(300),
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            grace_period: Duration::from_secs(30),
            rules: LobbyRules::default(),
            max_capacity: 10,
            default_capacity: 4,
            payment: PaymentConfig::default(),
        }
    }
}

impl GameConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let grace_secs: u64 = parse_or(&lookup, "LOBBY_GRACE_SECS", 30)?;
        let winners_quota: usize = parse_or(&lookup, "LOBBY_WINNERS_QUOTA", DEFAULT_WINNERS_QUOTA)?;
        let hand_size: usize = parse_or(&lookup, "LOBBY_HAND_SIZE", HAND_SIZE)?;
        let max_capacity: usize = parse_or(&lookup, "LOBBY_MAX_CAPACITY", 10)?;
        let default_capacity: usize = parse_or(&lookup, "LOBBY_DEFAULT_CAPACITY", 4)?;
        let timeout_ms: u64 = parse_or(&lookup, "PAYMENT_ORACLE_TIMEOUT_MS", 5000)?;
        let paid_lobbies_enabled: bool = parse_or(&lookup, "PAID_LOBBIES_ENABLED", true)?;
        let unjoined_secs: u64 = parse_or(&lookup, "PAID_LOBBY_UNJOINED_SECS", 300)?;
        let oracle_url = lookup("PAYMENT_ORACLE_URL").filter(|v| !v.trim().is_empty());

        if winners_quota == 0 {
            return Err(AppError::config("LOBBY_WINNERS_QUOTA must be at least 1"));
        }
        if max_capacity < MIN_PLAYERS {
            return Err(AppError::config(format!(
                "LOBBY_MAX_CAPACITY must be at least {MIN_PLAYERS}"
            )));
        }
        if !(MIN_PLAYERS..=max_capacity).contains(&default_capacity) {
            return Err(AppError::config(format!(
                "LOBBY_DEFAULT_CAPACITY must be within {MIN_PLAYERS}..={max_capacity}"
            )));
        }
        let rules = LobbyRules {
            hand_size,
            winners_quota,
        };
        rules
            .check_deal(max_capacity)
            .map_err(|e| AppError::config(format!("LOBBY_HAND_SIZE: {e}")))?;

        Ok(Self {
            grace_period: Duration::from_secs(grace_secs),
            rules,
            max_capacity,
            default_capacity,
            payment: PaymentConfig {
                paid_lobbies_enabled,
                oracle_url,
                oracle_timeout: Duration::from_millis(timeout_ms),
                unjoined_ttl: Duration::from_secs(unjoined_secs),
            },
        })
    }
}
