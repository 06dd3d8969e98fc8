// src/model/snapshot.rs

use serde::{Deserialize, Serialize};

use crate::error::IntegrityError;
use crate::model::role::{PerRole, Role};

/// The state of a single echelon at the end of one round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundSnapshot {
    pub role: Role,
    pub round: u32,

    pub inventory_before: u32,
    pub inventory_after: u32,
    pub backlog_before: u32,
    pub backlog_after: u32,

    pub incoming_order: u32,    // Demand from downstream
    pub incoming_shipment: u32, // Goods from upstream
    pub order_placed: u32,
    pub shipment_sent: u32,

    pub holding_cost: f64,
    pub backlog_cost: f64,
    pub total_cost_cumulative: f64,
}

impl RoundSnapshot {
    /// Synthetic round 0: starting stock, nothing moved yet.
    pub fn initial(role: Role, starting_inventory: u32) -> Self {
        Self {
            role,
            round: 0,
            inventory_before: starting_inventory,
            inventory_after: starting_inventory,
            backlog_before: 0,
            backlog_after: 0,
            incoming_order: 0,
            incoming_shipment: 0,
            order_placed: 0,
            shipment_sent: 0,
            holding_cost: 0.0,
            backlog_cost: 0.0,
            total_cost_cumulative: 0.0,
        }
    }
}

/// Per-role snapshot history; entry `n` of a role's list is round `n`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotStore {
    by_role: PerRole<Vec<RoundSnapshot>>,
}

impl SnapshotStore {
    pub fn seeded(starting_inventory: u32) -> Self {
        Self {
            by_role: PerRole::from_fn(|role| vec![RoundSnapshot::initial(role, starting_inventory)]),
        }
    }

    pub fn get(&self, role: Role, round: u32) -> Option<&RoundSnapshot> {
        self.by_role[role].get(round as usize)
    }

    /// Like [`get`](Self::get) but treats absence as corrupted state.
    pub fn require(&self, role: Role, round: u32) -> Result<&RoundSnapshot, IntegrityError> {
        self.get(role, round)
            .ok_or(IntegrityError::MissingSnapshot { role, round })
    }

    pub fn latest(&self, role: Role) -> Option<&RoundSnapshot> {
        self.by_role[role].last()
    }

    pub fn history(&self, role: Role) -> &[RoundSnapshot] {
        &self.by_role[role]
    }

    /// Highest round every role has a snapshot for.
    pub fn last_complete_round(&self) -> Option<u32> {
        self.by_role
            .values()
            .map(|history| history.len())
            .min()
            .and_then(|len| len.checked_sub(1))
            .map(|round| round as u32)
    }

    /// Checks that `round` is the next round for every role.
    pub fn check_next(&self, round: u32) -> Result<(), IntegrityError> {
        for (role, history) in self.by_role.iter() {
            let expected = history.len() as u32;
            if expected == 0 {
                return Err(IntegrityError::MissingSnapshot { role, round: 0 });
            }
            if round != expected {
                return Err(IntegrityError::OutOfSequence { round, expected });
            }
        }
        Ok(())
    }

    /// Appends one round for all four roles. Callers run
    /// [`check_next`](Self::check_next) first.
    pub(crate) fn push_round(&mut self, snapshots: PerRole<RoundSnapshot>) {
        for snapshot in snapshots.into_inner() {
            self.by_role[snapshot.role].push(snapshot);
        }
    }

    #[cfg(test)]
    pub(crate) fn discard_latest(&mut self, role: Role) -> Option<RoundSnapshot> {
        self.by_role[role].pop()
    }

    #[cfg(test)]
    pub(crate) fn restore(&mut self, snapshot: RoundSnapshot) {
        self.by_role[snapshot.role].push(snapshot);
    }
}
