// src/model/pipeline.rs

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::model::role::{Downstream, Role, Upstream};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineKind {
    Order,
    Shipment,
    /// Factory self-loop standing in for manufacturing lead time.
    Production,
}

impl PipelineKind {
    /// Kinds that carry goods into `role`.
    pub fn inbound(role: Role) -> &'static [PipelineKind] {
        match role {
            Role::Factory => &[PipelineKind::Shipment, PipelineKind::Production],
            _ => &[PipelineKind::Shipment],
        }
    }
}

/// Something in transit between two echelons, due at a fixed round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineItem {
    pub kind: PipelineKind,
    pub from_role: Role,
    pub to_role: Role,
    pub quantity: u32,
    /// `None` for items seeded as already in transit when the game started.
    pub round_placed: Option<u32>,
    pub round_due: u32,
}

impl PipelineItem {
    /// An order from `from` to its upstream partner. `None` for the factory,
    /// which produces instead of ordering.
    pub fn order(from: Role, quantity: u32, round_placed: Option<u32>, round_due: u32) -> Option<Self> {
        match from.upstream() {
            Upstream::Role(to) => Some(Self {
                kind: PipelineKind::Order,
                from_role: from,
                to_role: to,
                quantity,
                round_placed,
                round_due,
            }),
            Upstream::Production => None,
        }
    }

    /// A shipment from `from` to its downstream partner. `None` for the
    /// retailer, whose deliveries leave the chain.
    pub fn shipment(from: Role, quantity: u32, round_placed: Option<u32>, round_due: u32) -> Option<Self> {
        match from.downstream() {
            Downstream::Role(to) => Some(Self {
                kind: PipelineKind::Shipment,
                from_role: from,
                to_role: to,
                quantity,
                round_placed,
                round_due,
            }),
            Downstream::Consumer => None,
        }
    }

    pub fn production(quantity: u32, round_placed: Option<u32>, round_due: u32) -> Self {
        Self {
            kind: PipelineKind::Production,
            from_role: Role::Factory,
            to_role: Role::Factory,
            quantity,
            round_placed,
            round_due,
        }
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.round_due == 0 {
            return Err(LedgerError::DueAtStart);
        }
        if let Some(placed) = self.round_placed {
            if self.round_due <= placed {
                return Err(LedgerError::DueNotAfterPlaced {
                    placed,
                    due: self.round_due,
                });
            }
        }
        let routed = match self.kind {
            PipelineKind::Order => self.from_role.upstream() == Upstream::Role(self.to_role),
            PipelineKind::Shipment => self.from_role.downstream() == Downstream::Role(self.to_role),
            PipelineKind::Production => {
                self.from_role == Role::Factory && self.to_role == Role::Factory
            }
        };
        if !routed {
            return Err(LedgerError::InvalidRoute {
                kind: self.kind,
                from: self.from_role,
                to: self.to_role,
            });
        }
        Ok(())
    }
}

/// Append-only record of everything ever put in transit for one game.
///
/// Items are never removed once due; they stay for audit and for the
/// "units in transit" views.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineLedger {
    items: Vec<PipelineItem>,
}

impl PipelineLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, item: PipelineItem) -> Result<(), LedgerError> {
        item.validate()?;
        self.items.push(item);
        Ok(())
    }

    /// Appends every item or none of them.
    pub fn append_all(&mut self, items: Vec<PipelineItem>) -> Result<(), LedgerError> {
        items.iter().try_for_each(PipelineItem::validate)?;
        self.items.extend(items);
        Ok(())
    }

    /// Sum of `kinds` addressed to `role` that fall due exactly at `round`.
    pub fn due_at(&self, role: Role, round: u32, kinds: &[PipelineKind]) -> u32 {
        self.pending_window(role, round, round, kinds)
    }

    /// Sum of `kinds` addressed to `role` falling due in `from..=to`.
    pub fn pending_window(&self, role: Role, from: u32, to: u32, kinds: &[PipelineKind]) -> u32 {
        sum(self.items.iter().filter(|item| {
            item.to_role == role
                && kinds.contains(&item.kind)
                && (from..=to).contains(&item.round_due)
        }))
    }

    /// Sum of orders placed by `role` that reach its supplier in `from..=to`.
    pub fn outstanding_orders(&self, role: Role, from: u32, to: u32) -> u32 {
        sum(self.items.iter().filter(|item| {
            item.from_role == role
                && item.kind == PipelineKind::Order
                && (from..=to).contains(&item.round_due)
        }))
    }

    /// Items still in transit once `round` has been processed.
    pub fn in_transit_after(&self, round: u32) -> impl Iterator<Item = &PipelineItem> {
        self.items.iter().filter(move |item| item.round_due > round)
    }

    pub fn items(&self) -> &[PipelineItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

fn sum<'a>(items: impl Iterator<Item = &'a PipelineItem>) -> u32 {
    items.fold(0u32, |acc, item| acc.saturating_add(item.quantity))
}
