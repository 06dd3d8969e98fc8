// src/simulation/session.rs

//! One game: seats, rounds, the pipeline ledger and the snapshot history.
//!
//! A session is a plain state machine with no locking of its own. The
//! service wraps each one in a per-game lock and holds it for the whole
//! "record submission, then process if complete" sequence.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::{GameError, GameResult, IntegrityError};
use crate::model::pipeline::PipelineLedger;
use crate::model::role::{PerRole, Role};
use crate::model::snapshot::SnapshotStore;
use crate::simulation::config::GameConfig;
use crate::simulation::engine::{ChainSimulation, SimulationResult};
use crate::simulation::events::GameEvent;
use crate::simulation::processor::{process_round, seed_pipeline};
use crate::strategy::implementations::{PassThroughPolicy, ReplayPolicy};
use crate::strategy::traits::{OrderContext, OrderPolicy};

const MAX_PARTICIPANTS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GameId(String);

impl GameId {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParticipantId(pub u64);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    Lobby,
    Active,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EndReason {
    Natural,
    AdminClosed,
    AdminTerminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameMode {
    /// Four humans, one per role.
    Multi,
    /// One human; bots play the other three roles.
    Solo { human: Role },
    /// One controller submits all four orders at once.
    Test,
}

impl GameMode {
    /// Whether the bot policy fills `role` without being asked.
    pub fn is_bot(self, role: Role) -> bool {
        match self {
            GameMode::Multi => false,
            GameMode::Solo { human } => human != role,
            GameMode::Test => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParticipantKind {
    Human,
    Bot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub kind: ParticipantKind,
    pub role: Option<Role>,
    pub joined_at: DateTime<Utc>,
}

/// The submission record of one round. Orders are written once each.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Round {
    pub number: u32,
    pub orders: PerRole<Option<u32>>,
    pub opened_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl Round {
    fn open(number: u32) -> Self {
        Self {
            number,
            orders: PerRole::default(),
            opened_at: Utc::now(),
            processed_at: None,
        }
    }

    pub fn submitted(&self) -> PerRole<bool> {
        self.orders.map(|_, order| order.is_some())
    }

    pub fn missing_roles(&self) -> Vec<Role> {
        self.orders
            .iter()
            .filter(|(_, order)| order.is_none())
            .map(|(role, _)| role)
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.orders.values().all(Option::is_some)
    }
}

/// What a submission led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubmissionReceipt {
    pub round: u32,
    pub all_submitted: bool,
    /// The round was processed as part of this call.
    pub processed: bool,
    pub status: GameStatus,
}

pub struct GameSession {
    id: GameId,
    mode: GameMode,
    status: GameStatus,
    end_reason: Option<EndReason>,
    config: GameConfig,
    participants: Vec<Participant>,
    seats: PerRole<Option<ParticipantId>>,
    rounds: Vec<Round>,
    ledger: PipelineLedger,
    snapshots: SnapshotStore,
    bot: Box<dyn OrderPolicy>,
    events: Vec<GameEvent>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for GameSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameSession")
            .field("id", &self.id)
            .field("mode", &self.mode)
            .field("status", &self.status)
            .field("round", &self.current_round_number())
            .finish_non_exhaustive()
    }
}

impl GameSession {
    pub fn new(id: GameId, config: GameConfig, mode: GameMode) -> GameResult<Self> {
        Ok(Self {
            id,
            mode,
            status: GameStatus::Lobby,
            end_reason: None,
            config: config.validated()?,
            participants: Vec::new(),
            seats: PerRole::default(),
            rounds: Vec::new(),
            ledger: PipelineLedger::new(),
            snapshots: SnapshotStore::default(),
            bot: Box::new(PassThroughPolicy::new()),
            events: Vec::new(),
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        })
    }

    /// Swaps the policy used for bot-controlled seats.
    pub fn with_bot_policy(mut self, policy: Box<dyn OrderPolicy>) -> Self {
        self.bot = policy;
        self
    }

    // =====================================================================
    // Lobby
    // =====================================================================

    pub fn join(&mut self, id: ParticipantId, name: impl Into<String>, kind: ParticipantKind) -> GameResult<()> {
        self.ensure_lobby()?;
        if self.participants.len() >= MAX_PARTICIPANTS {
            return Err(GameError::LobbyFull);
        }
        self.participants.push(Participant {
            id,
            name: name.into(),
            kind,
            role: None,
            joined_at: Utc::now(),
        });
        Ok(())
    }

    /// Seats `participant` at `role`, freeing any seat they held before.
    pub fn assign_role(&mut self, participant: ParticipantId, role: Role) -> GameResult<()> {
        self.ensure_lobby()?;
        let index = self
            .participants
            .iter()
            .position(|p| p.id == participant)
            .ok_or(GameError::ParticipantNotFound(participant))?;
        if let Some(holder) = self.seats[role] {
            if holder != participant {
                return Err(GameError::RoleTaken { role, holder });
            }
        }

        if let Some(previous) = self.participants[index].role.replace(role) {
            self.seats[previous] = None;
        }
        self.seats[role] = Some(participant);
        self.events.push(GameEvent::RoleAssigned {
            game: self.id.clone(),
            participant,
            role,
        });
        Ok(())
    }

    /// Fills every empty seat the way the mode expects: bots where the bot
    /// policy plays, a single human seat for solo games.
    pub fn seat_automatically(&mut self, mut next_id: impl FnMut() -> ParticipantId) -> GameResult<()> {
        for role in Role::ALL {
            if self.seats[role].is_some() {
                continue;
            }
            let (name, kind) = if self.mode.is_bot(role) {
                (format!("{role} bot"), ParticipantKind::Bot)
            } else {
                (format!("{role} player"), ParticipantKind::Human)
            };
            let id = next_id();
            self.join(id, name, kind)?;
            self.assign_role(id, role)?;
        }
        Ok(())
    }

    pub fn missing_roles(&self) -> Vec<Role> {
        self.seats
            .iter()
            .filter(|(_, seat)| seat.is_none())
            .map(|(role, _)| role)
            .collect()
    }

    /// Replaces the demand pattern. Only possible before the game starts.
    pub fn set_demand(&mut self, demand: Vec<u32>) -> GameResult<()> {
        self.ensure_lobby()?;
        let config = GameConfig {
            demand,
            ..self.config.clone()
        }
        .validated()?;
        self.config = config;
        Ok(())
    }

    /// LOBBY -> ACTIVE: seeds the pipeline and round-0 snapshots, opens round 1.
    pub fn start(&mut self) -> GameResult<()> {
        self.ensure_lobby()?;
        let missing = self.missing_roles();
        if !missing.is_empty() {
            return Err(GameError::IncompleteRoles(missing));
        }

        let mut ledger = PipelineLedger::new();
        ledger
            .append_all(seed_pipeline(&self.config))
            .map_err(IntegrityError::from)?;

        self.ledger = ledger;
        self.snapshots = SnapshotStore::seeded(self.config.starting_inventory);
        self.rounds.push(Round::open(1));
        self.status = GameStatus::Active;
        self.started_at = Some(Utc::now());
        self.events.push(GameEvent::GameStarted {
            game: self.id.clone(),
            round: 1,
        });
        info!(game = %self.id, mode = ?self.mode, rounds = self.config.total_rounds, "game started");
        Ok(())
    }

    // =====================================================================
    // Rounds
    // =====================================================================

    /// Records one role's order. Completes the round when it is the last one.
    pub fn submit(&mut self, role: Role, quantity: i64) -> GameResult<SubmissionReceipt> {
        self.ensure_active()?;
        match self.mode {
            GameMode::Test => return Err(GameError::WrongMode(self.mode)),
            mode if mode.is_bot(role) => return Err(GameError::BotControlled(role)),
            _ => {}
        }
        let quantity = validate_quantity(quantity)?;
        self.record(role, quantity)?;

        if matches!(self.mode, GameMode::Solo { .. }) {
            self.fill_bot_orders()?;
        }
        self.complete_if_ready()
    }

    /// Submits all four orders at once. Test games only.
    pub fn submit_round(&mut self, orders: PerRole<i64>) -> GameResult<SubmissionReceipt> {
        self.ensure_active()?;
        if self.mode != GameMode::Test {
            return Err(GameError::WrongMode(self.mode));
        }
        let orders = PerRole::try_from_fn(|role| validate_quantity(orders[role]))?;
        let round = self.open_round()?;
        if let Some(role) = Role::ALL.into_iter().find(|&r| round.orders[r].is_some()) {
            return Err(GameError::AlreadySubmitted {
                role,
                round: round.number,
            });
        }

        for (role, &quantity) in orders.iter() {
            self.record(role, quantity)?;
        }
        self.complete_if_ready()
    }

    /// Lets the bot policy fill every outstanding order. Test games only.
    pub fn play_bot_round(&mut self) -> GameResult<SubmissionReceipt> {
        self.ensure_active()?;
        if self.mode != GameMode::Test {
            return Err(GameError::WrongMode(self.mode));
        }
        self.fill_bot_orders()?;
        self.complete_if_ready()
    }

    /// Re-runs processing of the open round once all four orders are in.
    pub fn retry(&mut self) -> GameResult<SubmissionReceipt> {
        self.ensure_active()?;
        let missing = self.open_round()?.missing_roles();
        if !missing.is_empty() {
            return Err(GameError::IncompleteRoles(missing));
        }
        self.complete_if_ready()
    }

    fn record(&mut self, role: Role, quantity: u32) -> GameResult<()> {
        let round = self.open_round_mut()?;
        if round.orders[role].is_some() {
            return Err(GameError::AlreadySubmitted {
                role,
                round: round.number,
            });
        }
        round.orders[role] = Some(quantity);
        let number = round.number;
        self.events.push(GameEvent::SubmissionRecorded {
            game: self.id.clone(),
            role,
            round: number,
        });
        Ok(())
    }

    fn fill_bot_orders(&mut self) -> GameResult<()> {
        let round = self.open_round()?;
        let number = round.number;
        let pending: Vec<Role> = round
            .missing_roles()
            .into_iter()
            .filter(|&role| self.mode.is_bot(role))
            .collect();

        for role in pending {
            let previous = self.snapshots.require(role, number - 1)?;
            let ctx = OrderContext {
                config: &self.config,
                role,
                round: number,
                previous,
                ledger: &self.ledger,
            };
            let quantity = self.bot.decide(&ctx);
            self.record(role, quantity)?;
        }
        Ok(())
    }

    fn complete_if_ready(&mut self) -> GameResult<SubmissionReceipt> {
        let round = self.open_round()?;
        let number = round.number;
        if !round.is_complete() {
            return Ok(SubmissionReceipt {
                round: number,
                all_submitted: false,
                processed: false,
                status: self.status,
            });
        }

        self.process_open_round()?;
        Ok(SubmissionReceipt {
            round: number,
            all_submitted: true,
            processed: true,
            status: self.status,
        })
    }

    /// Runs the round processor for the open round and commits it.
    ///
    /// Either every snapshot and pipeline item of the round is written and
    /// the next round opens, or nothing changes and the round stays open.
    fn process_open_round(&mut self) -> GameResult<()> {
        let round = self.open_round()?;
        let number = round.number;
        let orders = PerRole::try_from_fn(|role| {
            round.orders[role].ok_or(IntegrityError::MissingOrder { role, round: number })
        })?;

        let committed = process_round(&self.config, number, &orders, &self.ledger, &self.snapshots)
            .and_then(|outcome| outcome.commit(&mut self.ledger, &mut self.snapshots));
        if let Err(err) = committed {
            error!(game = %self.id, round = number, %err, "round processing failed, round left open");
            return Err(err.into());
        }

        if let Some(round) = self.rounds.last_mut() {
            round.processed_at = Some(Utc::now());
        }
        let finished = number >= self.config.total_rounds;
        self.events.push(GameEvent::RoundProcessed {
            game: self.id.clone(),
            round: number,
            next_round: (!finished).then_some(number + 1),
        });
        info!(game = %self.id, round = number, "round processed");

        if finished {
            self.finish(EndReason::Natural);
        } else {
            self.rounds.push(Round::open(number + 1));
        }
        Ok(())
    }

    // =====================================================================
    // Completion
    // =====================================================================

    /// Force-completes the game wherever it stands.
    pub fn close(&mut self, reason: EndReason) -> GameResult<()> {
        if self.status == GameStatus::Completed {
            return Err(GameError::AlreadyCompleted);
        }
        self.finish(reason);
        Ok(())
    }

    fn finish(&mut self, reason: EndReason) {
        self.status = GameStatus::Completed;
        self.end_reason = Some(reason);
        self.completed_at = Some(Utc::now());
        self.events.push(GameEvent::GameCompleted {
            game: self.id.clone(),
            reason,
        });
        info!(
            game = %self.id,
            ?reason,
            rounds_played = self.rounds_played(),
            "game completed"
        );
    }

    /// The full-length cost series this game contributes to the benchmark
    /// for its configuration.
    ///
    /// A game cut short is replayed from its recorded orders and continued
    /// with "order current demand" up to `total_rounds`. `None` when no
    /// round was ever played.
    pub fn benchmark_candidate(&self) -> Option<Result<SimulationResult, IntegrityError>> {
        let played = self.rounds_played();
        if played == 0 {
            return None;
        }
        if played >= self.config.total_rounds {
            return Some(Ok(SimulationResult::from_snapshots(&self.snapshots)));
        }

        let recorded = PerRole::from_fn(|role| {
            self.snapshots
                .history(role)
                .iter()
                .filter(|s| s.round > 0)
                .map(|s| s.order_placed)
                .collect::<Vec<_>>()
        });
        let policy = Box::new(ReplayPolicy::new(recorded));
        Some(ChainSimulation::new(self.config.clone(), policy).and_then(ChainSimulation::run))
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    // =====================================================================
    // Accessors
    // =====================================================================

    pub fn id(&self) -> &GameId {
        &self.id
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn end_reason(&self) -> Option<EndReason> {
        self.end_reason
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn seats(&self) -> &PerRole<Option<ParticipantId>> {
        &self.seats
    }

    pub fn rounds(&self) -> &[Round] {
        &self.rounds
    }

    pub fn ledger(&self) -> &PipelineLedger {
        &self.ledger
    }

    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// The round currently accepting orders, if the game is active.
    pub fn current_round(&self) -> Option<&Round> {
        match self.status {
            GameStatus::Active => self.rounds.last().filter(|r| r.processed_at.is_none()),
            _ => None,
        }
    }

    pub fn current_round_number(&self) -> Option<u32> {
        self.current_round().map(|r| r.number)
    }

    pub fn rounds_played(&self) -> u32 {
        self.snapshots.last_complete_round().unwrap_or(0)
    }

    fn open_round(&self) -> GameResult<&Round> {
        self.current_round().ok_or(GameError::NotActive(self.status))
    }

    fn open_round_mut(&mut self) -> GameResult<&mut Round> {
        let status = self.status;
        match self.rounds.last_mut() {
            Some(round) if status == GameStatus::Active && round.processed_at.is_none() => Ok(round),
            _ => Err(GameError::NotActive(status)),
        }
    }

    fn ensure_lobby(&self) -> GameResult<()> {
        match self.status {
            GameStatus::Lobby => Ok(()),
            status => Err(GameError::NotInLobby(status)),
        }
    }

    fn ensure_active(&self) -> GameResult<()> {
        match self.status {
            GameStatus::Active => Ok(()),
            GameStatus::Completed => Err(GameError::AlreadyCompleted),
            status => Err(GameError::NotActive(status)),
        }
    }
}

fn validate_quantity(quantity: i64) -> GameResult<u32> {
    u32::try_from(quantity).map_err(|_| GameError::InvalidQuantity(quantity))
}
