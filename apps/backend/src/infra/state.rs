use std::sync::Arc;

use tracing::info;

use crate::adapters::payment_oracle::{
    DisabledPaymentOracle, HttpPaymentOracle, InMemoryPaymentOracle, PaymentOracle,
};
use crate::config::GameConfig;
use crate::error::AppError;
use crate::services::lobbies::LobbyManager;
use crate::state::app_state::AppState;
use crate::ws::hub::ConnectionRegistry;

/// Builder for creating AppState instances (used in both tests and main)
pub struct StateBuilder {
    game_config: GameConfig,
    oracle: Option<Arc<dyn PaymentOracle>>,
}

impl StateBuilder {
    pub fn new() -> Self {
        Self {
            game_config: GameConfig::default(),
            oracle: None,
        }
    }

    pub fn with_game_config(mut self, config: GameConfig) -> Self {
        self.game_config = config;
        self
    }

    /// Use this oracle instead of the one the config would select.
    pub fn with_oracle(mut self, oracle: Arc<dyn PaymentOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn build(self) -> Result<AppState, AppError> {
        let oracle = match self.oracle {
            Some(oracle) => oracle,
            None => select_oracle(&self.game_config)?,
        };
        let registry = Arc::new(ConnectionRegistry::new());
        let lobbies = LobbyManager::new(self.game_config, oracle, registry);
        Ok(AppState::new(lobbies))
    }
}

impl Default for StateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn build_state() -> StateBuilder {
    StateBuilder::new()
}

fn select_oracle(config: &GameConfig) -> Result<Arc<dyn PaymentOracle>, AppError> {
    let payment = &config.payment;
    if !payment.paid_lobbies_enabled {
        info!(oracle = "disabled", "payment oracle selected");
        return Ok(Arc::new(DisabledPaymentOracle));
    }
    match &payment.oracle_url {
        Some(url) => {
            let oracle = HttpPaymentOracle::new(url.as_str(), payment.oracle_timeout)
                .map_err(|e| AppError::config(format!("PAYMENT_ORACLE_URL: {e}")))?;
            info!(oracle = "http", url = %url, "payment oracle selected");
            Ok(Arc::new(oracle))
        }
        None => {
            info!(oracle = "in_memory", "payment oracle selected");
            Ok(Arc::new(InMemoryPaymentOracle::new()))
        }
    }
}
