// src/simulation/engine.rs

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::IntegrityError;
use crate::model::pipeline::PipelineLedger;
use crate::model::role::{PerRole, Role};
use crate::model::snapshot::SnapshotStore;
use crate::simulation::config::GameConfig;
use crate::simulation::processor::{process_round, seed_pipeline};
use crate::strategy::implementations::PerfectForesightPolicy;
use crate::strategy::traits::{OrderContext, OrderPolicy};

/// One role's standing after one round, as kept in results and benchmarks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostPoint {
    pub round: u32,
    pub order_placed: u32,
    pub inventory_after: u32,
    pub backlog_after: u32,
    pub total_cost_cumulative: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub per_role: PerRole<Vec<CostPoint>>,
    pub per_role_total: PerRole<f64>,
    pub total_chain_cost: f64,
}

impl SimulationResult {
    /// Collects rounds `1..` from a snapshot history.
    pub fn from_snapshots(snapshots: &SnapshotStore) -> Self {
        let per_role = PerRole::from_fn(|role| {
            snapshots
                .history(role)
                .iter()
                .filter(|s| s.round > 0)
                .map(|s| CostPoint {
                    round: s.round,
                    order_placed: s.order_placed,
                    inventory_after: s.inventory_after,
                    backlog_after: s.backlog_after,
                    total_cost_cumulative: s.total_cost_cumulative,
                })
                .collect::<Vec<_>>()
        });
        let per_role_total = per_role.map(|_, points| {
            points.last().map_or(0.0, |p| p.total_cost_cumulative)
        });
        let total_chain_cost = per_role_total.values().sum();

        Self {
            per_role,
            per_role_total,
            total_chain_cost,
        }
    }

    /// The cost breakdown by stage.
    pub fn cost_breakdown(&self) -> Vec<(Role, f64)> {
        self.per_role_total.iter().map(|(role, &cost)| (role, cost)).collect()
    }

    pub fn orders(&self, role: Role) -> Vec<u32> {
        self.per_role[role].iter().map(|p| p.order_placed).collect()
    }
}

/// Offline run of the full chain with every order coming from one policy.
///
/// Uses the same pre-fill and round processor as live games, so its costs
/// are directly comparable with theirs.
pub struct ChainSimulation {
    config: GameConfig,
    policy: Box<dyn OrderPolicy>,
    ledger: PipelineLedger,
    snapshots: SnapshotStore,
    current_round: u32,
}

impl ChainSimulation {
    pub fn new(config: GameConfig, policy: Box<dyn OrderPolicy>) -> Result<Self, IntegrityError> {
        let mut ledger = PipelineLedger::new();
        ledger.append_all(seed_pipeline(&config))?;
        let snapshots = SnapshotStore::seeded(config.starting_inventory);

        Ok(Self {
            config,
            policy,
            ledger,
            snapshots,
            current_round: 1, // Usually start at round 1
        })
    }

    pub fn run(mut self) -> Result<SimulationResult, IntegrityError> {
        // Run until we exceed total_rounds
        while self.advance()?.is_some() {}
        debug!(
            rounds = self.config.total_rounds,
            policy = ?self.policy,
            "chain simulation finished"
        );
        Ok(SimulationResult::from_snapshots(&self.snapshots))
    }

    /// Plays one round. Returns the round played, or `None` once the game
    /// has run its length.
    pub fn advance(&mut self) -> Result<Option<u32>, IntegrityError> {
        let round = self.current_round;
        if round > self.config.total_rounds {
            return Ok(None);
        }

        // Decide every order before anything moves.
        let orders = PerRole::try_from_fn(|role| {
            let previous = self.snapshots.require(role, round - 1)?;
            let ctx = OrderContext {
                config: &self.config,
                role,
                round,
                previous,
                ledger: &self.ledger,
            };
            Ok::<_, IntegrityError>(self.policy.decide(&ctx))
        })?;

        process_round(&self.config, round, &orders, &self.ledger, &self.snapshots)?
            .commit(&mut self.ledger, &mut self.snapshots)?;

        self.current_round += 1;
        Ok(Some(round))
    }

    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    pub fn ledger(&self) -> &PipelineLedger {
        &self.ledger
    }
}

/// The perfect-information reference cost for `config`.
pub fn optimal_costs(config: &GameConfig) -> Result<SimulationResult, IntegrityError> {
    ChainSimulation::new(config.clone(), Box::new(PerfectForesightPolicy::new()))?.run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::implementations::PassThroughPolicy;

    fn step_config() -> GameConfig {
        GameConfig {
            demand: vec![4, 4, 4, 4, 8],
            total_rounds: 20,
            ..GameConfig::default()
        }
        .validated()
        .unwrap()
    }

    #[test]
    fn pass_through_on_steady_demand_costs_holding_only() {
        let config = GameConfig {
            demand: vec![4],
            total_rounds: 6,
            ..GameConfig::default()
        }
        .validated()
        .unwrap();
        let result = ChainSimulation::new(config, Box::new(PassThroughPolicy::new()))
            .unwrap()
            .run()
            .unwrap();
        for (_, &cost) in result.per_role_total.iter() {
            assert_eq!(cost, 6.0 * 6.0);
        }
        assert_eq!(result.total_chain_cost, 4.0 * 36.0);
    }

    #[test]
    fn optimal_beats_pass_through_on_a_demand_step() {
        let config = step_config();
        let optimal = optimal_costs(&config).unwrap();
        let naive = ChainSimulation::new(config, Box::new(PassThroughPolicy::new()))
            .unwrap()
            .run()
            .unwrap();
        assert!(optimal.total_chain_cost < naive.total_chain_cost);
    }

    #[test]
    fn optimal_anticipates_the_step() {
        let optimal = optimal_costs(&step_config()).unwrap();
        let early = &optimal.orders(Role::Retailer)[..4];
        assert!(early.iter().any(|&q| q > 4), "orders before the step: {early:?}");
    }

    #[test]
    fn result_series_skip_round_zero() {
        let optimal = optimal_costs(&step_config()).unwrap();
        assert_eq!(optimal.per_role[Role::Factory].len(), 20);
        assert_eq!(optimal.per_role[Role::Factory][0].round, 1);
        assert_eq!(optimal.cost_breakdown().len(), 4);
    }
}
