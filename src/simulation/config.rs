// src/simulation/config.rs

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::io::demand;

pub const MIN_ROUNDS: u32 = 4;
pub const MAX_ROUNDS: u32 = 100;
pub const MAX_DELAY: u32 = 10;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("total rounds must be between 4 and 100, got {0}")]
    RoundsOutOfRange(u32),
    #[error("demand sequence is empty")]
    EmptyDemand,
    #[error("{name} must be a finite, non-negative rate, got {value}")]
    InvalidRate { name: &'static str, value: f64 },
    #[error("{0} must be at least one round")]
    ZeroDelay(&'static str),
    #[error("{name} must be at most 10 rounds, got {value}")]
    DelayTooLong { name: &'static str, value: u32 },
}

/// Everything that determines how a game plays out. Frozen once the game
/// leaves the lobby.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Consumer demand per round; the last value repeats past the end.
    pub demand: Vec<u32>,
    pub total_rounds: u32,
    pub starting_inventory: u32,
    pub holding_cost: f64,
    pub backlog_cost: f64,
    pub order_delay: u32,
    pub shipping_delay: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            demand: demand::generate_classic_beer_game_demand(36),
            total_rounds: 36,
            starting_inventory: 12,
            holding_cost: 0.5,
            backlog_cost: 1.0,
            order_delay: 2,
            shipping_delay: 2,
        }
    }
}

impl GameConfig {
    /// Checks the invariants and pads the demand sequence to `total_rounds`.
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        if !(MIN_ROUNDS..=MAX_ROUNDS).contains(&self.total_rounds) {
            return Err(ConfigError::RoundsOutOfRange(self.total_rounds));
        }
        if self.demand.is_empty() {
            return Err(ConfigError::EmptyDemand);
        }
        for (name, value) in [("holding cost", self.holding_cost), ("backlog cost", self.backlog_cost)] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidRate { name, value });
            }
        }
        for (name, value) in [("order delay", self.order_delay), ("shipping delay", self.shipping_delay)] {
            if value == 0 {
                return Err(ConfigError::ZeroDelay(name));
            }
            if value > MAX_DELAY {
                return Err(ConfigError::DelayTooLong { name, value });
            }
        }
        demand::pad_to(&mut self.demand, self.total_rounds as usize);
        Ok(self)
    }

    /// Rounds between placing an order and receiving the goods.
    pub fn lead_time(&self) -> u32 {
        self.order_delay + self.shipping_delay
    }

    /// Consumer demand for a 1-based round, clamped to the last entry.
    pub fn demand_at(&self, round: u32) -> u32 {
        let index = (round.max(1) - 1) as usize;
        self.demand
            .get(index)
            .or_else(|| self.demand.last())
            .copied()
            .unwrap_or(0)
    }

    /// The flow the pipeline is seeded with.
    pub fn steady_demand(&self) -> u32 {
        self.demand_at(1)
    }
}
