// src/strategy/implementations.rs

use crate::model::pipeline::PipelineKind;
use crate::model::role::PerRole;
use crate::strategy::traits::{OrderContext, OrderPolicy};

// =========================================================================
// 1. Pass-Through Policy (bot seats)
// =========================================================================

/// The "Panic" strategy. It simply orders exactly what was demanded of it
/// last round, ignoring inventory, backlog and the pipeline.
///
/// Drives bot seats in solo and test games. It is deliberately naive and is
/// not the reference the scoring compares against.
#[derive(Debug, Clone, Default)]
pub struct PassThroughPolicy;

impl PassThroughPolicy {
    pub fn new() -> Self {
        Self
    }
}

impl OrderPolicy for PassThroughPolicy {
    fn decide(&mut self, ctx: &OrderContext<'_>) -> u32 {
        if ctx.round <= 1 {
            ctx.config.steady_demand()
        } else {
            ctx.previous.incoming_order
        }
    }
}

// =========================================================================
// 2. Perfect Foresight Policy (order-up-to with known demand)
// =========================================================================

/// Order-up-to policy with full knowledge of the consumer demand sequence.
///
/// An order placed at round `r` lands at `r + L`, so the position has to
/// cover demand over `r..=r+L` (lead time plus the review round). That is
/// L + 1 rounds, one more than a plain "next L rounds" target; without the
/// review round the chain runs one round short when demand steps up:
///
/// Order = max(0, Demand[r..=r+L] - (Inventory - Backlog + Inbound + OnOrder))
///
/// Every role anchors on consumer demand rather than its incoming orders,
/// which is what removes the amplification.
#[derive(Debug, Clone, Default)]
pub struct PerfectForesightPolicy;

impl PerfectForesightPolicy {
    pub fn new() -> Self {
        Self
    }
}

impl OrderPolicy for PerfectForesightPolicy {
    fn decide(&mut self, ctx: &OrderContext<'_>) -> u32 {
        let from = ctx.round;
        let to = ctx.round + ctx.config.lead_time();

        let target: i64 = (from..=to).map(|r| i64::from(ctx.config.demand_at(r))).sum();

        // Inventory position: net stock plus everything already on its way in.
        let net_inventory =
            i64::from(ctx.previous.inventory_after) - i64::from(ctx.previous.backlog_after);
        let inbound = ctx
            .ledger
            .pending_window(ctx.role, from, to, PipelineKind::inbound(ctx.role));
        let on_order = ctx.ledger.outstanding_orders(ctx.role, from, to);
        let position = net_inventory + i64::from(inbound) + i64::from(on_order);

        // We cannot order negative amounts.
        (target - position).clamp(0, i64::from(u32::MAX)) as u32
    }
}

// =========================================================================
// 3. Replay Policy (recorded orders, then demand)
// =========================================================================

/// Replays a recorded order schedule, then continues with "order the current
/// consumer demand" once the recording runs out.
///
/// Used to stretch a game that was closed early to its full length so its
/// cost is comparable with complete games of the same configuration.
#[derive(Debug, Clone)]
pub struct ReplayPolicy {
    /// `orders[role][i]` is the order the role placed in round `i + 1`.
    orders: PerRole<Vec<u32>>,
}

impl ReplayPolicy {
    pub fn new(orders: PerRole<Vec<u32>>) -> Self {
        Self { orders }
    }

    pub fn recorded_rounds(&self) -> usize {
        self.orders.values().map(Vec::len).min().unwrap_or(0)
    }
}

impl OrderPolicy for ReplayPolicy {
    fn decide(&mut self, ctx: &OrderContext<'_>) -> u32 {
        let index = ctx.round.saturating_sub(1) as usize;
        match self.orders[ctx.role].get(index) {
            Some(&quantity) => quantity,
            None => ctx.config.demand_at(ctx.round),
        }
    }
}
