// src/simulation/views.rs

//! Read models built from a session.
//!
//! A participant sees only its own echelon plus who has submitted; the full
//! view is for hosts, spectators and admins.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::pipeline::{PipelineItem, PipelineKind};
use crate::model::role::{PerRole, Role};
use crate::model::snapshot::RoundSnapshot;
use crate::simulation::session::{EndReason, GameId, GameMode, GameSession, GameStatus, Participant};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingItem {
    pub kind: PipelineKind,
    pub from_role: Role,
    pub to_role: Role,
    pub quantity: u32,
    pub round_due: u32,
    pub arrives_in_rounds: u32,
}

impl PendingItem {
    fn new(item: &PipelineItem, last_processed: u32) -> Self {
        Self {
            kind: item.kind,
            from_role: item.from_role,
            to_role: item.to_role,
            quantity: item.quantity,
            round_due: item.round_due,
            arrives_in_rounds: item.round_due.saturating_sub(last_processed),
        }
    }
}

/// One echelon as its own player sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleState {
    pub role: Role,
    pub inventory: u32,
    pub backlog: u32,
    pub total_cost: f64,
    /// Goods on their way in and orders this role placed that have not
    /// surfaced upstream yet. Orders addressed to the role stay hidden until
    /// they arrive.
    pub pending: Vec<PendingItem>,
    /// Played rounds, oldest first. Round 0 is not included.
    pub history: Vec<RoundSnapshot>,
}

impl RoleState {
    fn build(session: &GameSession, role: Role) -> Self {
        let snapshots = session.snapshots();
        let last_processed = session.rounds_played();
        let (inventory, backlog, total_cost) = match snapshots.latest(role) {
            Some(s) => (s.inventory_after, s.backlog_after, s.total_cost_cumulative),
            None => (session.config().starting_inventory, 0, 0.0),
        };
        let pending = session
            .ledger()
            .in_transit_after(last_processed)
            .filter(|item| visible_to(item, role))
            .map(|item| PendingItem::new(item, last_processed))
            .collect();
        let history = snapshots
            .history(role)
            .iter()
            .filter(|s| s.round > 0)
            .cloned()
            .collect();

        Self {
            role,
            inventory,
            backlog,
            total_cost,
            pending,
            history,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticipantView {
    pub game: GameId,
    pub status: GameStatus,
    pub current_round: Option<u32>,
    pub total_rounds: u32,
    pub state: RoleState,
    /// Who has ordered this round. Quantities stay private.
    pub submissions: PerRole<bool>,
    pub has_submitted: bool,
}

impl ParticipantView {
    pub fn build(session: &GameSession, role: Role) -> Self {
        let submissions = submissions(session);
        Self {
            game: session.id().clone(),
            status: session.status(),
            current_round: session.current_round_number(),
            total_rounds: session.config().total_rounds,
            state: RoleState::build(session, role),
            has_submitted: submissions[role],
            submissions,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FullView {
    pub game: GameId,
    pub status: GameStatus,
    pub mode: GameMode,
    pub end_reason: Option<EndReason>,
    pub current_round: Option<u32>,
    pub total_rounds: u32,
    pub roles: PerRole<RoleState>,
    pub submissions: PerRole<bool>,
    pub pipeline: Vec<PendingItem>,
    pub participants: Vec<Participant>,
}

impl FullView {
    pub fn build(session: &GameSession) -> Self {
        let last_processed = session.rounds_played();
        Self {
            game: session.id().clone(),
            status: session.status(),
            mode: session.mode(),
            end_reason: session.end_reason(),
            current_round: session.current_round_number(),
            total_rounds: session.config().total_rounds,
            roles: PerRole::from_fn(|role| RoleState::build(session, role)),
            submissions: submissions(session),
            pipeline: session
                .ledger()
                .in_transit_after(last_processed)
                .map(|item| PendingItem::new(item, last_processed))
                .collect(),
            participants: session.participants().to_vec(),
        }
    }
}

/// A line in the game list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameSummary {
    pub id: GameId,
    pub status: GameStatus,
    pub mode: GameMode,
    pub current_round: Option<u32>,
    pub rounds_played: u32,
    pub total_rounds: u32,
    pub seated: usize,
    pub created_at: DateTime<Utc>,
}

impl GameSummary {
    pub fn build(session: &GameSession) -> Self {
        Self {
            id: session.id().clone(),
            status: session.status(),
            mode: session.mode(),
            current_round: session.current_round_number(),
            rounds_played: session.rounds_played(),
            total_rounds: session.config().total_rounds,
            seated: session.seats().values().filter(|s| s.is_some()).count(),
            created_at: session.created_at(),
        }
    }
}

fn submissions(session: &GameSession) -> PerRole<bool> {
    session
        .current_round()
        .map(|round| round.submitted())
        .unwrap_or_default()
}

fn visible_to(item: &PipelineItem, role: Role) -> bool {
    let inbound_goods = item.to_role == role && PipelineKind::inbound(role).contains(&item.kind);
    let own_order = item.from_role == role && item.kind == PipelineKind::Order;
    inbound_goods || own_order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::config::GameConfig;
    use crate::simulation::session::{ParticipantId, ParticipantKind};

    fn multi_game() -> GameSession {
        let config = GameConfig {
            demand: vec![4],
            total_rounds: 8,
            ..GameConfig::default()
        };
        let mut session = GameSession::new(GameId::new("BEER-210"), config, GameMode::Multi).unwrap();
        for role in Role::ALL {
            let id = ParticipantId(role.index() as u64 + 1);
            session.join(id, role.as_str(), ParticipantKind::Human).unwrap();
            session.assign_role(id, role).unwrap();
        }
        session.start().unwrap();
        session
    }

    #[test]
    fn participant_sees_own_pipeline_and_who_submitted() {
        let mut session = multi_game();
        session.submit(Role::Wholesaler, 6).unwrap();

        let view = ParticipantView::build(&session, Role::Retailer);
        assert_eq!(view.current_round, Some(1));
        assert_eq!(view.state.inventory, 12);
        assert!(!view.has_submitted);
        assert!(view.submissions[Role::Wholesaler]);
        assert!(view.state.history.is_empty());
        assert!(view.state.pending.iter().all(|p| match p.kind {
            PipelineKind::Order => p.from_role == Role::Retailer,
            _ => p.to_role == Role::Retailer,
        }));
        // Two seeded shipments in and two seeded orders out.
        assert_eq!(view.state.pending.len(), 4);
        assert_eq!(view.state.pending.iter().map(|p| p.arrives_in_rounds).max(), Some(2));
    }

    #[test]
    fn full_view_covers_the_whole_chain() {
        let mut session = multi_game();
        for role in Role::ALL {
            session.submit(role, 4).unwrap();
        }
        let view = FullView::build(&session);
        assert_eq!(view.current_round, Some(2));
        assert!(view.submissions.values().all(|s| !s));
        for (_, state) in view.roles.iter() {
            assert_eq!(state.history.len(), 1);
        }
        assert!(view.pipeline.iter().all(|p| p.round_due > 1));
        assert_eq!(view.participants.len(), 4);

        let summary = GameSummary::build(&session);
        assert_eq!((summary.rounds_played, summary.seated), (1, 4));
    }

    #[test]
    fn downstream_order_stays_hidden_upstream_until_it_arrives() {
        let mut session = multi_game();
        session.submit(Role::Retailer, 37).unwrap();
        for role in [Role::Wholesaler, Role::Distributor, Role::Factory] {
            session.submit(role, 4).unwrap();
        }

        let wholesaler = ParticipantView::build(&session, Role::Wholesaler);
        assert!(wholesaler
            .state
            .pending
            .iter()
            .all(|p| p.kind != PipelineKind::Order || p.from_role == Role::Wholesaler));
        assert!(wholesaler.state.pending.iter().all(|p| p.quantity != 37));

        // The retailer still tracks its own order.
        let retailer = ParticipantView::build(&session, Role::Retailer);
        assert!(retailer.state.pending.iter().any(|p| {
            p.kind == PipelineKind::Order && p.to_role == Role::Wholesaler && p.quantity == 37
        }));
    }
}
