// src/simulation/events.rs

//! State-change notifications for transports and dashboards.
//!
//! The engine only knows the [`EventSink`] trait. Sessions queue events while
//! the per-game lock is held and the service publishes them once it is
//! released, so a slow sink never stalls a round.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::info;

use crate::model::role::Role;
use crate::simulation::session::{EndReason, GameId, ParticipantId};

const DEFAULT_WINDOW: Duration = Duration::from_millis(100);
const DEFAULT_MAX_BATCH: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    RoleAssigned {
        game: GameId,
        participant: ParticipantId,
        role: Role,
    },
    GameStarted {
        game: GameId,
        round: u32,
    },
    /// Carries no quantity: other seats only learn that a role has ordered.
    SubmissionRecorded {
        game: GameId,
        role: Role,
        round: u32,
    },
    RoundProcessed {
        game: GameId,
        round: u32,
        next_round: Option<u32>,
    },
    GameCompleted {
        game: GameId,
        reason: EndReason,
    },
    GameDeleted {
        game: GameId,
    },
}

impl GameEvent {
    pub fn game(&self) -> &GameId {
        match self {
            GameEvent::RoleAssigned { game, .. }
            | GameEvent::GameStarted { game, .. }
            | GameEvent::SubmissionRecorded { game, .. }
            | GameEvent::RoundProcessed { game, .. }
            | GameEvent::GameCompleted { game, .. }
            | GameEvent::GameDeleted { game } => game,
        }
    }

    /// Events after which nothing more will be said about the game.
    pub fn is_terminal(&self) -> bool {
        matches!(self, GameEvent::GameCompleted { .. } | GameEvent::GameDeleted { .. })
    }
}

pub trait EventSink: Send + Sync {
    fn publish(&self, event: GameEvent);
}

impl<S: EventSink + ?Sized> EventSink for Arc<S> {
    fn publish(&self, event: GameEvent) {
        (**self).publish(event);
    }
}

/// Logs every event and forwards nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn publish(&self, event: GameEvent) {
        info!(game = %event.game(), ?event, "game event");
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<GameEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<GameEvent> {
        self.events.lock().clone()
    }

    pub fn take(&self) -> Vec<GameEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl EventSink for RecordingSink {
    fn publish(&self, event: GameEvent) {
        self.events.lock().push(event);
    }
}

struct Batch {
    opened: Instant,
    events: Vec<GameEvent>,
}

/// Buffers events per game and forwards them in bursts.
///
/// A game's batch is forwarded when it is older than the window, when it
/// reaches the size cap, or immediately on a terminal event. Whatever is left
/// goes out on [`flush`](Self::flush) or drop.
pub struct CoalescingSink<S: EventSink> {
    inner: S,
    window: Duration,
    max_batch: usize,
    pending: Mutex<HashMap<GameId, Batch>>,
}

impl<S: EventSink> CoalescingSink<S> {
    pub fn new(inner: S) -> Self {
        Self::with_window(inner, DEFAULT_WINDOW, DEFAULT_MAX_BATCH)
    }

    pub fn with_window(inner: S, window: Duration, max_batch: usize) -> Self {
        Self {
            inner,
            window,
            max_batch: max_batch.max(1),
            pending: Mutex::new(HashMap::new()),
        }
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().values().map(|b| b.events.len()).sum()
    }

    pub fn flush(&self) {
        let drained: Vec<Batch> = self.pending.lock().drain().map(|(_, batch)| batch).collect();
        for batch in drained {
            self.forward(batch);
        }
    }

    fn forward(&self, batch: Batch) {
        for event in batch.events {
            self.inner.publish(event);
        }
    }
}

impl<S: EventSink> EventSink for CoalescingSink<S> {
    fn publish(&self, event: GameEvent) {
        let ready = {
            let mut pending = self.pending.lock();
            let game = event.game().clone();
            let terminal = event.is_terminal();
            let batch = pending.entry(game.clone()).or_insert_with(|| Batch {
                opened: Instant::now(),
                events: Vec::new(),
            });
            batch.events.push(event);

            let due = terminal
                || batch.events.len() >= self.max_batch
                || batch.opened.elapsed() >= self.window;
            if due {
                pending.remove(&game)
            } else {
                None
            }
        };

        if let Some(batch) = ready {
            self.forward(batch);
        }
    }
}

impl<S: EventSink> Drop for CoalescingSink<S> {
    fn drop(&mut self) {
        self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(code: &str) -> GameEvent {
        GameEvent::GameStarted {
            game: GameId::new(code),
            round: 1,
        }
    }

    #[test]
    fn coalescing_holds_until_flush() {
        let recorder = Arc::new(RecordingSink::new());
        let sink = CoalescingSink::with_window(recorder.clone(), Duration::from_secs(3600), 10);
        sink.publish(started("BEER-100"));
        sink.publish(started("BEER-200"));
        assert!(recorder.events().is_empty());
        assert_eq!(sink.pending_len(), 2);

        sink.flush();
        assert_eq!(recorder.events().len(), 2);
        assert_eq!(sink.pending_len(), 0);
    }

    #[test]
    fn terminal_event_flushes_its_game_in_order() {
        let recorder = Arc::new(RecordingSink::new());
        let sink = CoalescingSink::with_window(recorder.clone(), Duration::from_secs(3600), 10);
        let game = GameId::new("BEER-300");
        sink.publish(started("BEER-300"));
        sink.publish(started("BEER-400"));
        sink.publish(GameEvent::GameCompleted {
            game: game.clone(),
            reason: EndReason::Natural,
        });

        let events = recorder.take();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.game() == &game));
        assert!(events[1].is_terminal());
        assert_eq!(sink.pending_len(), 1);
    }

    #[test]
    fn batch_cap_forces_forwarding() {
        let recorder = Arc::new(RecordingSink::new());
        let sink = CoalescingSink::with_window(recorder.clone(), Duration::from_secs(3600), 2);
        sink.publish(started("BEER-500"));
        sink.publish(started("BEER-500"));
        assert_eq!(recorder.events().len(), 2);
    }

    #[test]
    fn dropping_flushes_leftovers() {
        let recorder = Arc::new(RecordingSink::new());
        {
            let sink = CoalescingSink::new(recorder.clone());
            sink.publish(started("BEER-600"));
        }
        assert_eq!(recorder.events().len(), 1);
    }
}
