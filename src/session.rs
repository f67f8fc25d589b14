use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::engine::GameEngine;
use crate::input::sanitize_player_name;
use crate::score_store::ScoreStore;
use crate::types::{GamePhase, GameSummary, RuntimeEvent, Score, Snapshot};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PersistenceResult {
    pub generation: u64,
    pub final_score: u32,
    pub remote_saved: bool,
}

pub struct SessionRunner {
    engine: GameEngine,
    store: Arc<ScoreStore>,
    player_name: String,
    generation: u64,
    results_tx: mpsc::UnboundedSender<PersistenceResult>,
    results_rx: mpsc::UnboundedReceiver<PersistenceResult>,
    pending_save: Option<JoinHandle<()>>,
    last_result: Option<PersistenceResult>,
    last_summary: Option<GameSummary>,
}

impl SessionRunner {
    pub fn new(engine: GameEngine, store: Arc<ScoreStore>) -> Self {
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        let player_name = store.get_player_name();
        Self {
            engine,
            store,
            player_name,
            generation: 0,
            results_tx,
            results_rx,
            pending_save: None,
            last_result: None,
            last_summary: None,
        }
    }

    pub fn engine(&self) -> &GameEngine {
        &self.engine
    }

    pub fn phase(&self) -> GamePhase {
        self.engine.phase()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn player_name(&self) -> &str {
        &self.player_name
    }

    pub fn last_summary(&self) -> Option<&GameSummary> {
        self.last_summary.as_ref()
    }

    pub fn store(&self) -> &Arc<ScoreStore> {
        &self.store
    }

    /// Starts a fresh session. Must run inside a Tokio runtime: queued scores
    /// are flushed in the background.
    pub fn start(&mut self, player_name: &str) {
        self.player_name = sanitize_player_name(player_name);
        self.store.set_player_name(&self.player_name);
        self.generation += 1;
        self.last_result = None;
        self.last_summary = None;
        self.engine.start();

        let store = self.store.clone();
        tokio::spawn(async move {
            store.sync_pending_scores().await;
        });
    }

    pub fn advance(&mut self, dt_ms: u64) -> Vec<RuntimeEvent> {
        self.engine.advance(dt_ms);
        self.persist_if_over();
        self.engine.drain_events()
    }

    pub fn tap(&mut self, ghost_id: u64) -> bool {
        self.engine.tap_ghost(ghost_id)
    }

    pub fn end(&mut self) {
        self.engine.end();
        self.persist_if_over();
    }

    pub fn snapshot(&mut self) -> Snapshot {
        self.engine.build_snapshot(true)
    }

    pub fn poll_persistence(&mut self) -> Option<PersistenceResult> {
        while let Ok(result) = self.results_rx.try_recv() {
            if result.generation != self.generation {
                log::debug!(
                    target: "session",
                    "discarding stale persistence result from generation {}",
                    result.generation
                );
                continue;
            }
            self.last_result = Some(result);
        }
        self.last_result.clone()
    }

    pub async fn wait_for_persistence(&mut self) -> Option<PersistenceResult> {
        if let Some(handle) = self.pending_save.take() {
            if let Err(error) = handle.await {
                log::error!(target: "session", "persistence task failed: {error}");
            }
        }
        self.poll_persistence()
    }

    pub async fn refresh_leaderboard(&self) -> Vec<Score> {
        self.store.sync_pending_scores().await;
        self.store.get_scores().await
    }

    fn persist_if_over(&mut self) {
        let Some(summary) = self.engine.take_summary() else {
            return;
        };
        log::info!(
            target: "session",
            "game over: score={} elapsed_ms={} tapped={}",
            summary.final_score,
            summary.elapsed_ms,
            summary.ghosts_tapped
        );
        let final_score = summary.final_score;
        self.last_summary = Some(summary);
        if final_score == 0 {
            return;
        }

        let store = self.store.clone();
        let tx = self.results_tx.clone();
        let generation = self.generation;
        let name = self.player_name.clone();
        self.pending_save = Some(tokio::spawn(async move {
            let remote_saved = store.save_score(&name, i64::from(final_score)).await;
            let _ = tx.send(PersistenceResult {
                generation,
                final_score,
                remote_saved,
            });
        }));
    }
}

pub fn run_realtime(runner: Arc<Mutex<SessionRunner>>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        let mut last = tokio::time::Instant::now();
        loop {
            interval.tick().await;
            let dt_ms = consume_whole_millis(&mut last, tokio::time::Instant::now());

            let mut guard = runner.lock().await;
            if guard.phase() != GamePhase::Playing {
                break;
            }
            guard.advance(dt_ms);
            if guard.phase() != GamePhase::Playing {
                break;
            }
        }
    })
}

// Sub-millisecond remainders stay on `last` and count toward the next tick.
fn consume_whole_millis(last: &mut tokio::time::Instant, now: tokio::time::Instant) -> u64 {
    let dt_ms = now.duration_since(*last).as_millis() as u64;
    *last += Duration::from_millis(dt_ms);
    dt_ms
}
