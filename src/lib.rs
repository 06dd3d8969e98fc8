//! Round-processing engine for the Beer Distribution Game.
//!
//! Four echelons (retailer, wholesaler, distributor, factory) pass orders up
//! and goods down a delayed pipeline. Each round every echelon receives,
//! ships against demand plus backlog, orders from upstream and pays for the
//! stock or backlog it ends with. The same processor drives live games and
//! the perfect-foresight reference games are scored against.

pub mod error;
pub mod io;
pub mod model;
pub mod simulation;
pub mod strategy;

pub use error::{GameError, GameResult, IntegrityError, LedgerError};
pub use model::pipeline::{PipelineItem, PipelineKind, PipelineLedger};
pub use model::role::{PerRole, Role};
pub use model::snapshot::{RoundSnapshot, SnapshotStore};
pub use simulation::benchmark::{Benchmark, BenchmarkError, BenchmarkStore, MemoryBenchmarkStore};
pub use simulation::config::{ConfigError, GameConfig};
pub use simulation::engine::{optimal_costs, ChainSimulation, SimulationResult};
pub use simulation::events::{CoalescingSink, EventSink, GameEvent, RecordingSink, TracingSink};
pub use simulation::results::GameResults;
pub use simulation::service::GameService;
pub use simulation::session::{
    EndReason, GameId, GameMode, GameSession, GameStatus, ParticipantId, SubmissionReceipt,
};
pub use strategy::traits::{OrderContext, OrderPolicy};
