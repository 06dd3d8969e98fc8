// src/simulation/processor.rs

//! The per-round state transition shared by live games and offline runs.
//!
//! [`process_round`] is pure: it reads the round `r - 1` snapshots and the
//! ledger and returns everything round `r` produces as a [`RoundOutcome`].
//! Nothing is written until [`RoundOutcome::commit`], which checks every
//! precondition before touching either store, so a failed round leaves no
//! partial state behind.

use tracing::debug;

use crate::error::IntegrityError;
use crate::model::pipeline::{PipelineItem, PipelineKind, PipelineLedger};
use crate::model::role::{Downstream, PerRole, Role, Upstream};
use crate::model::snapshot::{RoundSnapshot, SnapshotStore};
use crate::simulation::config::GameConfig;

/// Result of shipping against one round's demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fulfillment {
    pub inventory_before: u32,
    pub shipment_sent: u32,
    pub inventory_after: u32,
    pub backlog_after: u32,
}

/// Receive goods, then ship as much of `incoming_order + backlog` as stock allows.
///
/// Backlog is the only carrier of unmet demand; nothing is held back when
/// stock suffices.
pub fn fulfil(
    previous_inventory: u32,
    previous_backlog: u32,
    incoming_shipment: u32,
    incoming_order: u32,
) -> Fulfillment {
    let inventory_before = previous_inventory.saturating_add(incoming_shipment);

    // Total obligation = New Order + Old Backlog
    let total_demand = incoming_order.saturating_add(previous_backlog);
    let shipment_sent = inventory_before.min(total_demand);

    Fulfillment {
        inventory_before,
        shipment_sent,
        inventory_after: inventory_before - shipment_sent,
        backlog_after: total_demand - shipment_sent,
    }
}

/// Items already in transit when round 1 opens, one per in-flight round on
/// every link, so play starts from a steady flow instead of an empty pipe.
pub fn seed_pipeline(config: &GameConfig) -> Vec<PipelineItem> {
    let flow = config.steady_demand();
    let mut items = Vec::new();

    for role in Role::ALL {
        items.extend(
            (1..=config.shipping_delay).filter_map(|due| PipelineItem::shipment(role, flow, None, due)),
        );
        items.extend(
            (1..=config.order_delay).filter_map(|due| PipelineItem::order(role, flow, None, due)),
        );
    }
    items.extend((1..=config.lead_time()).map(|due| PipelineItem::production(flow, None, due)));

    items
}

/// Everything one round produces, not yet written anywhere.
#[derive(Debug, Clone)]
pub struct RoundOutcome {
    pub round: u32,
    pub snapshots: PerRole<RoundSnapshot>,
    pub items: Vec<PipelineItem>,
}

impl RoundOutcome {
    /// Writes the round into both stores, or into neither.
    pub fn commit(
        self,
        ledger: &mut PipelineLedger,
        snapshots: &mut SnapshotStore,
    ) -> Result<(), IntegrityError> {
        snapshots.check_next(self.round)?;
        ledger.append_all(self.items)?;
        snapshots.push_round(self.snapshots);
        Ok(())
    }

    pub fn total_cost(&self) -> f64 {
        self.snapshots.values().map(|s| s.total_cost_cumulative).sum()
    }
}

/// Advances all four echelons through `round` together.
///
/// Every role works from its own round `r - 1` snapshot and from ledger
/// items created before this call, so no role sees another's round `r`
/// effects.
pub fn process_round(
    config: &GameConfig,
    round: u32,
    orders: &PerRole<u32>,
    ledger: &PipelineLedger,
    snapshots: &SnapshotStore,
) -> Result<RoundOutcome, IntegrityError> {
    snapshots.check_next(round)?;
    let mut items = Vec::with_capacity(7);

    let next = PerRole::try_from_fn(|role| {
        let previous = snapshots.require(role, round - 1)?;

        // MORNING: arrivals
        let incoming_shipment = ledger.due_at(role, round, PipelineKind::inbound(role));
        let incoming_order = match role.downstream() {
            Downstream::Consumer => config.demand_at(round),
            Downstream::Role(_) => ledger.due_at(role, round, &[PipelineKind::Order]),
        };

        // DAY: ship what we can, backlog the rest
        let filled = fulfil(
            previous.inventory_after,
            previous.backlog_after,
            incoming_shipment,
            incoming_order,
        );

        // EVENING: departures
        if let Some(shipment) = PipelineItem::shipment(
            role,
            filled.shipment_sent,
            Some(round),
            round + config.shipping_delay,
        ) {
            items.push(shipment);
        }
        let order_placed = orders[role];
        let replenishment = match role.upstream() {
            Upstream::Role(_) => {
                PipelineItem::order(role, order_placed, Some(round), round + config.order_delay)
            }
            Upstream::Production => Some(PipelineItem::production(
                order_placed,
                Some(round),
                round + config.lead_time(),
            )),
        };
        items.extend(replenishment);

        let holding_cost = f64::from(filled.inventory_after) * config.holding_cost;
        let backlog_cost = f64::from(filled.backlog_after) * config.backlog_cost;

        debug!(
            round,
            %role,
            incoming_order,
            incoming_shipment,
            shipped = filled.shipment_sent,
            inventory = filled.inventory_after,
            backlog = filled.backlog_after,
            order_placed,
            "echelon processed"
        );

        Ok::<_, IntegrityError>(RoundSnapshot {
            role,
            round,
            inventory_before: filled.inventory_before,
            inventory_after: filled.inventory_after,
            backlog_before: previous.backlog_after,
            backlog_after: filled.backlog_after,
            incoming_order,
            incoming_shipment,
            order_placed,
            shipment_sent: filled.shipment_sent,
            holding_cost,
            backlog_cost,
            total_cost_cumulative: previous.total_cost_cumulative + holding_cost + backlog_cost,
        })
    })?;

    Ok(RoundOutcome {
        round,
        snapshots: next,
        items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GameConfig {
        GameConfig {
            demand: vec![4, 4, 4, 4, 8],
            total_rounds: 8,
            ..GameConfig::default()
        }
        .validated()
        .unwrap()
    }

    fn seeded(config: &GameConfig) -> (PipelineLedger, SnapshotStore) {
        let mut ledger = PipelineLedger::new();
        ledger.append_all(seed_pipeline(config)).unwrap();
        (ledger, SnapshotStore::seeded(config.starting_inventory))
    }

    #[test]
    fn fulfil_ships_everything_when_stock_suffices() {
        let f = fulfil(12, 2, 4, 5);
        assert_eq!(f.inventory_before, 16);
        assert_eq!(f.shipment_sent, 7);
        assert_eq!(f.inventory_after, 9);
        assert_eq!(f.backlog_after, 0);
    }

    #[test]
    fn fulfil_backlogs_the_shortfall() {
        let f = fulfil(1, 3, 2, 4);
        assert_eq!(f.shipment_sent, 3);
        assert_eq!(f.inventory_after, 0);
        assert_eq!(f.backlog_after, 4);
    }

    #[test]
    fn seed_fills_every_in_flight_round() {
        let config = config();
        let items = seed_pipeline(&config);
        // 3 shipment links x 2 + 3 order links x 2 + 4 production rounds.
        assert_eq!(items.len(), 16);
        assert!(items.iter().all(|i| i.quantity == 4 && i.round_placed.is_none()));
        let production_due: Vec<u32> = items
            .iter()
            .filter(|i| i.kind == PipelineKind::Production)
            .map(|i| i.round_due)
            .collect();
        assert_eq!(production_due, vec![1, 2, 3, 4]);
    }

    #[test]
    fn process_is_pure_until_commit() {
        let config = config();
        let (mut ledger, mut snapshots) = seeded(&config);
        let before = ledger.len();

        let outcome =
            process_round(&config, 1, &PerRole::new([4, 4, 4, 4]), &ledger, &snapshots).unwrap();
        assert_eq!(ledger.len(), before);
        assert_eq!(snapshots.last_complete_round(), Some(0));

        // 3 shipments + 3 orders + 1 production.
        assert_eq!(outcome.items.len(), 7);
        outcome.commit(&mut ledger, &mut snapshots).unwrap();
        assert_eq!(ledger.len(), before + 7);
        assert_eq!(snapshots.last_complete_round(), Some(1));
    }

    #[test]
    fn steady_flow_keeps_inventory_flat() {
        let config = config();
        let (ledger, snapshots) = seeded(&config);
        let outcome =
            process_round(&config, 1, &PerRole::new([4, 4, 4, 4]), &ledger, &snapshots).unwrap();
        for (_, snapshot) in outcome.snapshots.iter() {
            assert_eq!(snapshot.incoming_order, 4);
            assert_eq!(snapshot.incoming_shipment, 4);
            assert_eq!(snapshot.inventory_after, 12);
            assert_eq!(snapshot.holding_cost, 6.0);
        }
    }

    #[test]
    fn orders_and_production_land_after_their_delays() {
        let config = config();
        let (ledger, snapshots) = seeded(&config);
        let outcome =
            process_round(&config, 1, &PerRole::new([9, 9, 9, 9]), &ledger, &snapshots).unwrap();

        let order = outcome
            .items
            .iter()
            .find(|i| i.kind == PipelineKind::Order && i.from_role == Role::Retailer)
            .unwrap();
        assert_eq!((order.to_role, order.round_due), (Role::Wholesaler, 3));

        let production = outcome
            .items
            .iter()
            .find(|i| i.kind == PipelineKind::Production)
            .unwrap();
        assert_eq!(production.round_due, 5);

        assert!(!outcome
            .items
            .iter()
            .any(|i| i.kind == PipelineKind::Shipment && i.from_role == Role::Retailer));
    }

    #[test]
    fn out_of_sequence_round_is_rejected() {
        let config = config();
        let (ledger, snapshots) = seeded(&config);
        let err = process_round(&config, 2, &PerRole::new([4, 4, 4, 4]), &ledger, &snapshots)
            .unwrap_err();
        assert_eq!(err, IntegrityError::OutOfSequence { round: 2, expected: 1 });
    }
}
