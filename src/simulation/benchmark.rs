// src/simulation/benchmark.rs

//! Best-known full-length cost per configuration.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::error::IntegrityError;
use crate::model::role::PerRole;
use crate::simulation::config::GameConfig;
use crate::simulation::engine::{CostPoint, SimulationResult};
use crate::simulation::session::GameId;

#[derive(Debug, Error)]
pub enum BenchmarkError {
    #[error("benchmark store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("benchmark encoding failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("benchmark replay failed: {0}")]
    Replay(#[from] IntegrityError),
}

/// The seven fields that decide whether two games are comparable, in a
/// fixed order so the encoding is canonical.
#[derive(Serialize)]
struct ConfigKey<'a> {
    demand: &'a [u32],
    total_rounds: u32,
    holding_cost: f64,
    backlog_cost: f64,
    starting_inventory: u32,
    order_delay: u32,
    shipping_delay: u32,
}

/// Hex SHA-256 over the canonical JSON of the comparable config fields.
pub fn config_hash(config: &GameConfig) -> Result<String, BenchmarkError> {
    let key = ConfigKey {
        demand: &config.demand,
        total_rounds: config.total_rounds,
        holding_cost: config.holding_cost,
        backlog_cost: config.backlog_cost,
        starting_inventory: config.starting_inventory,
        order_delay: config.order_delay,
        shipping_delay: config.shipping_delay,
    };
    let digest = Sha256::digest(serde_json::to_vec(&key)?);
    Ok(digest.iter().map(|byte| format!("{byte:02x}")).collect())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Benchmark {
    pub config_hash: String,
    pub game: GameId,
    pub total_chain_cost: f64,
    pub costs_by_role: PerRole<f64>,
    pub per_role: PerRole<Vec<CostPoint>>,
    pub completed_at: DateTime<Utc>,
}

impl Benchmark {
    pub fn from_result(config_hash: String, game: GameId, result: SimulationResult) -> Self {
        Self {
            config_hash,
            game,
            total_chain_cost: result.total_chain_cost,
            costs_by_role: result.per_role_total,
            per_role: result.per_role,
            completed_at: Utc::now(),
        }
    }

    /// Only a strictly cheaper run replaces the stored one.
    pub fn improves_on(&self, existing: Option<&Benchmark>) -> bool {
        existing.map_or(true, |current| self.total_chain_cost < current.total_chain_cost)
    }
}

pub trait BenchmarkStore: Send + Sync {
    fn get(&self, config_hash: &str) -> Result<Option<Benchmark>, BenchmarkError>;

    /// Stores `candidate` if it beats the current entry for its hash.
    /// Check and replace happen as one step. Returns whether it was stored.
    fn offer(&self, candidate: Benchmark) -> Result<bool, BenchmarkError>;
}

#[derive(Debug, Default)]
pub struct MemoryBenchmarkStore {
    entries: Mutex<HashMap<String, Benchmark>>,
}

impl MemoryBenchmarkStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BenchmarkStore for MemoryBenchmarkStore {
    fn get(&self, config_hash: &str) -> Result<Option<Benchmark>, BenchmarkError> {
        Ok(self.entries.lock().get(config_hash).cloned())
    }

    fn offer(&self, candidate: Benchmark) -> Result<bool, BenchmarkError> {
        let mut entries = self.entries.lock();
        if !candidate.improves_on(entries.get(&candidate.config_hash)) {
            return Ok(false);
        }
        entries.insert(candidate.config_hash.clone(), candidate);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::engine::optimal_costs;

    fn candidate(hash: &str, cost: f64) -> Benchmark {
        let config = GameConfig::default().validated().unwrap();
        let mut result = optimal_costs(&config).unwrap();
        result.total_chain_cost = cost;
        Benchmark::from_result(hash.to_string(), GameId::new("BEER-777"), result)
    }

    #[test]
    fn hash_is_stable_and_sensitive() {
        let base = GameConfig::default().validated().unwrap();
        let same = GameConfig::default().validated().unwrap();
        assert_eq!(config_hash(&base).unwrap(), config_hash(&same).unwrap());
        assert_eq!(config_hash(&base).unwrap().len(), 64);

        let slower = GameConfig { shipping_delay: 3, ..base.clone() };
        assert_ne!(config_hash(&base).unwrap(), config_hash(&slower).unwrap());
        let pricier = GameConfig { backlog_cost: 2.0, ..base.clone() };
        assert_ne!(config_hash(&base).unwrap(), config_hash(&pricier).unwrap());
    }

    #[test]
    fn only_strictly_lower_cost_replaces() {
        let store = MemoryBenchmarkStore::new();
        assert!(store.offer(candidate("h", 100.0)).unwrap());
        assert!(!store.offer(candidate("h", 100.0)).unwrap());
        assert!(!store.offer(candidate("h", 140.0)).unwrap());
        assert!(store.offer(candidate("h", 90.0)).unwrap());
        assert_eq!(store.get("h").unwrap().unwrap().total_chain_cost, 90.0);
        assert!(store.get("other").unwrap().is_none());
    }
}
