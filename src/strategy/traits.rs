// src/strategy/traits.rs

use std::fmt::Debug;

use crate::model::pipeline::PipelineLedger;
use crate::model::role::Role;
use crate::model::snapshot::RoundSnapshot;
use crate::simulation::config::GameConfig;

/// What an echelon knows when it places its order for `round`.
///
/// `previous` is its own state at the end of `round - 1` and `ledger` is the
/// pipeline as it stands before `round` is processed: the same information a
/// human has when submitting.
#[derive(Debug, Clone, Copy)]
pub struct OrderContext<'a> {
    pub config: &'a GameConfig,
    pub role: Role,
    pub round: u32,
    pub previous: &'a RoundSnapshot,
    pub ledger: &'a PipelineLedger,
}

/// Defines the decision-making logic for automated supply chain roles.
///
/// Sessions holding a policy sit behind a lock shared between threads,
/// hence `Send + Sync`.
pub trait OrderPolicy: Debug + Send + Sync {
    /// Calculates how much `ctx.role` orders from its upstream partner this round.
    fn decide(&mut self, ctx: &OrderContext<'_>) -> u32;
}
