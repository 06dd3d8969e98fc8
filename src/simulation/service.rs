// src/simulation/service.rs

//! The operation surface transports and admin tools call into.
//!
//! Every game sits behind its own lock. Submissions take the write lock for
//! the whole record-then-maybe-process sequence, so a round is processed
//! exactly once however the last submissions race. Views take the read lock.
//! Different games never contend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use rand::Rng;
use tracing::{debug, info, warn};

use crate::error::{GameError, GameResult, IntegrityError};
use crate::model::role::{PerRole, Role};
use crate::model::snapshot::SnapshotStore;
use crate::simulation::benchmark::{config_hash, Benchmark, BenchmarkError, BenchmarkStore, MemoryBenchmarkStore};
use crate::simulation::config::GameConfig;
use crate::simulation::engine::{optimal_costs, SimulationResult};
use crate::simulation::events::{EventSink, GameEvent, TracingSink};
use crate::simulation::results::GameResults;
use crate::simulation::session::{
    EndReason, GameId, GameMode, GameSession, GameStatus, ParticipantId, ParticipantKind,
    SubmissionReceipt,
};
use crate::simulation::views::{FullView, GameSummary, ParticipantView};

const CODE_ATTEMPTS: usize = 10;
const FALLBACK_CODE_START: u64 = 1000;

type SharedSession = Arc<RwLock<GameSession>>;

pub struct GameService {
    games: RwLock<HashMap<GameId, SharedSession>>,
    benchmarks: Arc<dyn BenchmarkStore>,
    events: Arc<dyn EventSink>,
    next_participant: AtomicU64,
    next_fallback_code: AtomicU64,
}

impl GameService {
    pub fn new(benchmarks: Arc<dyn BenchmarkStore>, events: Arc<dyn EventSink>) -> Self {
        Self {
            games: RwLock::new(HashMap::new()),
            benchmarks,
            events,
            next_participant: AtomicU64::new(1),
            next_fallback_code: AtomicU64::new(FALLBACK_CODE_START),
        }
    }

    /// In-memory benchmarks, events logged through `tracing`.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBenchmarkStore::new()), Arc::new(TracingSink))
    }

    // =====================================================================
    // Lifecycle
    // =====================================================================

    /// Creates a game in the lobby. Solo and test games are seated and
    /// started straight away.
    pub fn create_game(&self, config: GameConfig, mode: GameMode) -> GameResult<GameId> {
        let mut games = self.games.write();
        let id = self.generate_code(&games);
        let mut session = GameSession::new(id.clone(), config, mode)?;
        if mode != GameMode::Multi {
            session.seat_automatically(|| self.next_participant_id())?;
            session.start()?;
        }
        let events = session.drain_events();
        games.insert(id.clone(), Arc::new(RwLock::new(session)));
        drop(games);

        info!(game = %id, ?mode, "game created");
        self.publish(events);
        Ok(id)
    }

    pub fn join_game(&self, id: &GameId, name: &str) -> GameResult<ParticipantId> {
        let participant = self.next_participant_id();
        self.with_session(id, |session| {
            session.join(participant, name, ParticipantKind::Human)
        })?;
        Ok(participant)
    }

    pub fn assign_role(&self, id: &GameId, participant: ParticipantId, role: Role) -> GameResult<()> {
        self.with_session(id, |session| session.assign_role(participant, role))
    }

    pub fn start_game(&self, id: &GameId) -> GameResult<()> {
        self.with_session(id, GameSession::start)
    }

    pub fn set_demand(&self, id: &GameId, demand: Vec<u32>) -> GameResult<()> {
        self.with_session(id, |session| session.set_demand(demand))
    }

    pub fn close_game(&self, id: &GameId) -> GameResult<()> {
        self.with_session(id, |session| session.close(EndReason::AdminClosed))
    }

    pub fn terminate_game(&self, id: &GameId) -> GameResult<()> {
        self.with_session(id, |session| session.close(EndReason::AdminTerminated))
    }

    /// Removes the game entirely, whatever its state.
    pub fn delete_game(&self, id: &GameId) -> GameResult<()> {
        self.games
            .write()
            .remove(id)
            .ok_or_else(|| GameError::GameNotFound(id.clone()))?;
        info!(game = %id, "game deleted");
        self.publish(vec![GameEvent::GameDeleted { game: id.clone() }]);
        Ok(())
    }

    // =====================================================================
    // Rounds
    // =====================================================================

    pub fn submit_order(&self, id: &GameId, role: Role, quantity: i64) -> GameResult<SubmissionReceipt> {
        self.with_session(id, |session| session.submit(role, quantity))
    }

    pub fn submit_round(&self, id: &GameId, orders: PerRole<i64>) -> GameResult<SubmissionReceipt> {
        self.with_session(id, |session| session.submit_round(orders))
    }

    pub fn play_bot_round(&self, id: &GameId) -> GameResult<SubmissionReceipt> {
        self.with_session(id, GameSession::play_bot_round)
    }

    pub fn retry_round(&self, id: &GameId) -> GameResult<SubmissionReceipt> {
        self.with_session(id, GameSession::retry)
    }

    // =====================================================================
    // Views
    // =====================================================================

    pub fn participant_view(&self, id: &GameId, role: Role) -> GameResult<ParticipantView> {
        let session = self.session(id)?;
        let guard = session.read();
        Ok(ParticipantView::build(&guard, role))
    }

    pub fn full_view(&self, id: &GameId) -> GameResult<FullView> {
        let session = self.session(id)?;
        let guard = session.read();
        Ok(FullView::build(&guard))
    }

    /// Runs `f` over the game's snapshot history under the read lock.
    pub fn with_snapshots<T>(
        &self,
        id: &GameId,
        f: impl FnOnce(&GameId, &SnapshotStore) -> T,
    ) -> GameResult<T> {
        let session = self.session(id)?;
        let guard = session.read();
        Ok(f(guard.id(), guard.snapshots()))
    }

    pub fn list_games(&self) -> Vec<GameSummary> {
        let sessions: Vec<SharedSession> = self.games.read().values().cloned().collect();
        let mut summaries: Vec<GameSummary> = sessions
            .iter()
            .map(|session| GameSummary::build(&session.read()))
            .collect();
        summaries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        summaries
    }

    /// Scores a finished game. A missing optimal reference or benchmark is
    /// logged and left out rather than failing the call.
    pub fn results(&self, id: &GameId) -> GameResult<GameResults> {
        let session = self.session(id)?;
        let guard = session.read();
        if guard.status() != GameStatus::Completed {
            return Err(GameError::NotCompleted(guard.status()));
        }

        let optimal = match optimal_costs(guard.config()) {
            Ok(result) => Some(result),
            Err(err) => {
                warn!(game = %id, %err, "optimal reference unavailable");
                None
            }
        };
        let benchmark = self.benchmark(guard.config());
        Ok(GameResults::build(&guard, optimal, benchmark))
    }

    /// The stored best run for `config`, if any. The config is normalised
    /// the way `create_game` does it, so an unpadded demand finds the entry.
    pub fn benchmark(&self, config: &GameConfig) -> Option<Benchmark> {
        let config = match config.clone().validated() {
            Ok(config) => config,
            Err(err) => {
                warn!(%err, "benchmark lookup for an invalid config");
                return None;
            }
        };
        let lookup = config_hash(&config).and_then(|hash| self.benchmarks.get(&hash));
        match lookup {
            Ok(found) => found,
            Err(err) => {
                warn!(%err, "benchmark lookup failed");
                None
            }
        }
    }

    pub fn game_count(&self) -> usize {
        self.games.read().len()
    }

    // =====================================================================
    // Internals
    // =====================================================================

    fn session(&self, id: &GameId) -> GameResult<SharedSession> {
        self.games
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| GameError::GameNotFound(id.clone()))
    }

    /// Runs `op` under the game's write lock, then publishes whatever it
    /// queued and, if it finished the game, offers the result as a benchmark.
    fn with_session<T>(
        &self,
        id: &GameId,
        op: impl FnOnce(&mut GameSession) -> GameResult<T>,
    ) -> GameResult<T> {
        let session = self.session(id)?;
        let (result, events, finished) = {
            let mut guard = session.write();
            let was_completed = guard.status() == GameStatus::Completed;
            let result = op(&mut *guard);
            let events = guard.drain_events();
            let finished = if !was_completed && guard.status() == GameStatus::Completed {
                guard
                    .benchmark_candidate()
                    .map(|candidate| (guard.config().clone(), candidate))
            } else {
                None
            };
            (result, events, finished)
        };

        self.publish(events);
        if let Some((config, candidate)) = finished {
            self.offer_benchmark(id, &config, candidate);
        }
        result
    }

    fn offer_benchmark(
        &self,
        id: &GameId,
        config: &GameConfig,
        candidate: Result<SimulationResult, IntegrityError>,
    ) {
        let offered = candidate
            .map_err(BenchmarkError::from)
            .and_then(|result| {
                let hash = config_hash(config)?;
                self.benchmarks
                    .offer(Benchmark::from_result(hash, id.clone(), result))
            });
        match offered {
            Ok(true) => info!(game = %id, "new benchmark recorded"),
            Ok(false) => debug!(game = %id, "benchmark unchanged"),
            Err(err) => warn!(game = %id, %err, "benchmark update skipped"),
        }
    }

    fn publish(&self, events: Vec<GameEvent>) {
        for event in events {
            self.events.publish(event);
        }
    }

    fn next_participant_id(&self) -> ParticipantId {
        ParticipantId(self.next_participant.fetch_add(1, Ordering::Relaxed))
    }

    /// A `BEER-NNN` code not in use, falling back to a counter once random
    /// picks keep colliding.
    fn generate_code(&self, games: &HashMap<GameId, SharedSession>) -> GameId {
        let mut rng = rand::thread_rng();
        for _ in 0..CODE_ATTEMPTS {
            let code = GameId::new(format!("BEER-{}", rng.gen_range(100..=999)));
            if !games.contains_key(&code) {
                return code;
            }
        }
        loop {
            let n = self.next_fallback_code.fetch_add(1, Ordering::Relaxed);
            let code = GameId::new(format!("BEER-{n}"));
            if !games.contains_key(&code) {
                return code;
            }
        }
    }
}

impl Default for GameService {
    fn default() -> Self {
        Self::in_memory()
    }
}
