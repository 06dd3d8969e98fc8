// src/simulation/results.rs

//! Scoring of completed games against the perfect-foresight reference.

use serde::Serialize;

use crate::model::role::{PerRole, Role};
use crate::simulation::benchmark::Benchmark;
use crate::simulation::engine::SimulationResult;
use crate::simulation::session::{EndReason, GameId, GameSession};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleResult {
    pub role: Role,
    pub total_cost: f64,
    pub optimal_cost: Option<f64>,
    pub pct_over_optimal: Option<f64>,
    pub bullwhip_index: f64,
    pub peak_backlog: u32,
    pub orders: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameResults {
    pub game: GameId,
    pub end_reason: Option<EndReason>,
    pub rounds_played: u32,
    pub per_role: PerRole<RoleResult>,
    pub total_chain_cost: f64,
    pub optimal_chain_cost: Option<f64>,
    pub chain_pct_over_optimal: Option<f64>,
    pub optimal: Option<SimulationResult>,
    pub benchmark: Option<Benchmark>,
}

impl GameResults {
    /// Scores `session` over the rounds it actually played. The optimal
    /// comparison uses the reference cost at that same round.
    pub fn build(
        session: &GameSession,
        optimal: Option<SimulationResult>,
        benchmark: Option<Benchmark>,
    ) -> Self {
        let played = session.rounds_played();
        let snapshots = session.snapshots();
        let demand: Vec<u32> = (1..=played).map(|r| session.config().demand_at(r)).collect();

        let optimal_at = |role: Role| -> Option<f64> {
            let series = &optimal.as_ref()?.per_role[role];
            match played {
                0 => Some(0.0),
                n => series.get(n as usize - 1).map(|p| p.total_cost_cumulative),
            }
        };

        let per_role = PerRole::from_fn(|role| {
            let history: Vec<_> = snapshots.history(role).iter().filter(|s| s.round > 0).collect();
            let orders: Vec<u32> = history.iter().map(|s| s.order_placed).collect();
            let total_cost = history.last().map_or(0.0, |s| s.total_cost_cumulative);
            let optimal_cost = optimal_at(role);

            RoleResult {
                role,
                total_cost,
                optimal_cost,
                pct_over_optimal: optimal_cost.and_then(|o| pct_over_optimal(total_cost, o)),
                bullwhip_index: bullwhip_index(&orders, &demand),
                peak_backlog: history.iter().map(|s| s.backlog_after).max().unwrap_or(0),
                orders,
            }
        });

        let total_chain_cost = per_role.values().map(|r| r.total_cost).sum();
        let optimal_chain_cost = per_role
            .values()
            .map(|r| r.optimal_cost)
            .sum::<Option<f64>>();

        Self {
            game: session.id().clone(),
            end_reason: session.end_reason(),
            rounds_played: played,
            per_role,
            total_chain_cost,
            chain_pct_over_optimal: optimal_chain_cost
                .and_then(|o| pct_over_optimal(total_chain_cost, o)),
            optimal_chain_cost,
            optimal,
            benchmark,
        }
    }
}

/// `(actual - optimal) / optimal * 100`, undefined when optimal is zero.
pub fn pct_over_optimal(actual: f64, optimal: f64) -> Option<f64> {
    if optimal > 0.0 {
        Some((actual - optimal) / optimal * 100.0)
    } else {
        None
    }
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

/// Order variability relative to consumer demand variability.
///
/// Values above 1 mean the role amplified the signal it received. Zero when
/// demand never varied.
pub fn bullwhip_index(orders: &[u32], demand: &[u32]) -> f64 {
    let as_f64 = |xs: &[u32]| xs.iter().map(|&x| f64::from(x)).collect::<Vec<_>>();
    let demand_std = std_dev(&as_f64(demand));
    if demand_std == 0.0 {
        return 0.0;
    }
    std_dev(&as_f64(orders)) / demand_std
}
