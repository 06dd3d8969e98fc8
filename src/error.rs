//! Error taxonomy for the engine.
//!
//! Validation failures are rejected at the call that caused them and leave
//! no trace in game state. Integrity failures abort round processing as a
//! whole. Benchmark failures live in [`crate::simulation::benchmark`] and
//! never reach callers of the game flow.

use thiserror::Error;

use crate::model::pipeline::PipelineKind;
use crate::model::role::Role;
use crate::simulation::config::ConfigError;
use crate::simulation::session::{GameId, GameMode, GameStatus, ParticipantId};

/// A pipeline item rejected by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("item due at round {due} is not after its placement round {placed}")]
    DueNotAfterPlaced { placed: u32, due: u32 },
    #[error("items cannot be due at round 0")]
    DueAtStart,
    #[error("{kind:?} cannot flow from {from} to {to}")]
    InvalidRoute {
        kind: PipelineKind,
        from: Role,
        to: Role,
    },
}

/// Corrupted or inconsistent state detected while processing a round.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityError {
    #[error("missing round {round} snapshot for {role}")]
    MissingSnapshot { role: Role, round: u32 },
    #[error("round {round} is out of sequence, expected round {expected}")]
    OutOfSequence { round: u32, expected: u32 },
    #[error("round {round} is missing the order from {role}")]
    MissingOrder { role: Role, round: u32 },
    #[error("round {0} was already processed")]
    AlreadyProcessed(u32),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Errors returned by game operations.
#[derive(Debug, Error)]
pub enum GameError {
    #[error("game {0} not found")]
    GameNotFound(GameId),
    #[error("participant {0} not found")]
    ParticipantNotFound(ParticipantId),
    #[error("{role} is already taken by participant {holder}")]
    RoleTaken { role: Role, holder: ParticipantId },
    #[error("game already has the maximum number of participants")]
    LobbyFull,
    #[error("roles still unassigned: {0:?}")]
    IncompleteRoles(Vec<Role>),
    #[error("{role} already submitted an order for round {round}")]
    AlreadySubmitted { role: Role, round: u32 },
    #[error("game is not active (status {0:?})")]
    NotActive(GameStatus),
    #[error("game is no longer in the lobby (status {0:?})")]
    NotInLobby(GameStatus),
    #[error("game is already completed")]
    AlreadyCompleted,
    #[error("game has not finished yet (status {0:?})")]
    NotCompleted(GameStatus),
    #[error("order quantity {0} is not a non-negative integer")]
    InvalidQuantity(i64),
    #[error("operation is not available in {0:?} mode")]
    WrongMode(GameMode),
    #[error("{0} is played by a bot")]
    BotControlled(Role),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("integrity failure: {0}")]
    Integrity(#[from] IntegrityError),
}

impl GameError {
    /// True for errors caused by the caller rather than by corrupted state.
    pub fn is_validation(&self) -> bool {
        !matches!(self, GameError::Integrity(_))
    }
}

pub type GameResult<T> = Result<T, GameError>;
