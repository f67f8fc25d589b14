use std::collections::BTreeMap;

use crate::constants::{
    COLLISION_RADIUS, DIFFICULTY_TICK_MS, GHOST_FADE_IN_MS, GHOST_MAX_BASE_SPEED,
    GHOST_MIN_BASE_SPEED, MOVE_TICK_MS, SIDE_SPAWN_BOTTOM_INSET, SPAWN_MARGIN,
    SPEED_BOOST_STEP, STARTING_LIVES, TAP_SCORE, TAP_SPEED_NUDGE,
};
use crate::rng::Rng;
use crate::types::{
    GamePhase, GameSummary, Ghost, RuntimeEvent, Snapshot, SpawnEdge, Vec2, Viewport,
};

pub mod scheduler;
mod spawn_system;
pub mod utils;

use self::scheduler::{Scheduler, TimerKind};
use self::utils::{difficulty_for_elapsed, round3, spawn_interval_ms, spawn_probability};

#[derive(Clone, Debug)]
pub struct GameEngine {
    viewport: Viewport,
    rng: Rng,
    scheduler: Scheduler,
    phase: GamePhase,
    lives: i32,
    score: u32,
    ghosts: BTreeMap<u64, Ghost>,
    difficulty: f32,
    speed_boost: f32,
    session_started_ms: u64,
    tick_counter: u64,
    next_ghost_id: u64,
    end_scheduled: bool,
    ghosts_spawned: u32,
    ghosts_tapped: u32,
    events: Vec<RuntimeEvent>,
    summary: Option<GameSummary>,
}

impl GameEngine {
    pub fn new(seed: u32, viewport: Viewport) -> Self {
        Self {
            viewport,
            rng: Rng::new(seed),
            scheduler: Scheduler::new(),
            phase: GamePhase::Menu,
            lives: STARTING_LIVES,
            score: 0,
            ghosts: BTreeMap::new(),
            difficulty: 1.0,
            speed_boost: 1.0,
            session_started_ms: 0,
            tick_counter: 0,
            next_ghost_id: 0,
            end_scheduled: false,
            ghosts_spawned: 0,
            ghosts_tapped: 0,
            events: Vec::new(),
            summary: None,
        }
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn is_ended(&self) -> bool {
        self.phase == GamePhase::GameOver
    }

    pub fn lives(&self) -> i32 {
        self.lives
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn difficulty(&self) -> f32 {
        self.difficulty
    }

    pub fn speed_boost(&self) -> f32 {
        self.speed_boost
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn elapsed_ms(&self) -> u64 {
        match self.phase {
            GamePhase::Menu => 0,
            _ => self
                .scheduler
                .now_ms()
                .saturating_sub(self.session_started_ms),
        }
    }

    pub fn ghosts(&self) -> impl Iterator<Item = &Ghost> {
        self.ghosts.values()
    }

    pub fn ghost(&self, id: u64) -> Option<&Ghost> {
        self.ghosts.get(&id)
    }

    pub fn start(&mut self) {
        self.lives = STARTING_LIVES;
        self.score = 0;
        self.ghosts.clear();
        self.difficulty = 1.0;
        self.speed_boost = 1.0;
        self.end_scheduled = false;
        self.ghosts_spawned = 0;
        self.ghosts_tapped = 0;
        self.summary = None;
        self.events.clear();
        self.session_started_ms = self.scheduler.now_ms();
        self.phase = GamePhase::Playing;

        self.scheduler.cancel_all();
        self.scheduler.arm(TimerKind::Difficulty, DIFFICULTY_TICK_MS);
        self.scheduler
            .arm(TimerKind::Spawn, spawn_interval_ms(self.difficulty));
        self.scheduler.arm(TimerKind::Movement, MOVE_TICK_MS);
    }

    pub fn advance(&mut self, dt_ms: u64) {
        let until_ms = self.scheduler.now_ms().saturating_add(dt_ms);
        while let Some(kind) = self.scheduler.pop_due(until_ms) {
            match kind {
                TimerKind::Difficulty => {
                    self.difficulty_tick();
                    self.scheduler.rearm(kind, DIFFICULTY_TICK_MS);
                }
                TimerKind::Spawn => {
                    self.spawn_tick();
                    self.scheduler
                        .rearm(kind, spawn_interval_ms(self.difficulty));
                }
                TimerKind::Movement => {
                    self.tick();
                    self.scheduler.rearm(kind, MOVE_TICK_MS);
                }
            }
        }
        self.scheduler.finish(until_ms);
    }

    pub fn tick(&mut self) {
        if self.phase != GamePhase::Playing {
            return;
        }
        self.tick_counter += 1;

        let target = self.viewport.center();
        let fade_step = MOVE_TICK_MS as f32 / GHOST_FADE_IN_MS as f32;
        let mut lives = self.lives;
        let mut updated = BTreeMap::new();

        for (id, ghost) in std::mem::take(&mut self.ghosts) {
            let dx = target.x - ghost.x;
            let dy = target.y - ghost.y;
            let distance = (dx * dx + dy * dy).sqrt();

            if distance < COLLISION_RADIUS {
                lives -= 1;
                self.events.push(RuntimeEvent::LifeLost { ghost_id: id, lives });
                if lives <= 0 && !self.end_scheduled {
                    self.end_scheduled = true;
                }
                continue;
            }

            let distance = if distance == 0.0 { 1.0 } else { distance };
            updated.insert(
                id,
                Ghost {
                    x: ghost.x + (dx / distance) * ghost.speed,
                    y: ghost.y + (dy / distance) * ghost.speed,
                    fade: (ghost.fade + fade_step).min(1.0),
                    ..ghost
                },
            );
        }

        self.ghosts = updated;
        self.lives = lives;
        if self.end_scheduled {
            self.end();
        }
    }

    pub fn spawn_tick(&mut self) {
        if self.phase != GamePhase::Playing {
            return;
        }
        if self.rng.bool(spawn_probability(self.difficulty)) {
            self.spawn_ghost();
        }
    }

    pub fn difficulty_tick(&mut self) {
        if self.phase != GamePhase::Playing {
            return;
        }
        self.difficulty = difficulty_for_elapsed(self.elapsed_ms());
    }

    pub fn tap_ghost(&mut self, id: u64) -> bool {
        if self.phase != GamePhase::Playing {
            return false;
        }
        if self.ghosts.remove(&id).is_none() {
            return false;
        }

        self.score += TAP_SCORE;
        self.speed_boost = round3(self.speed_boost + SPEED_BOOST_STEP);
        for ghost in self.ghosts.values_mut() {
            ghost.speed *= TAP_SPEED_NUDGE;
        }
        self.ghosts_tapped += 1;
        self.events.push(RuntimeEvent::GhostTapped {
            ghost_id: id,
            score: self.score,
        });
        true
    }

    pub fn end(&mut self) {
        if self.phase != GamePhase::Playing {
            return;
        }
        self.phase = GamePhase::GameOver;
        self.scheduler.cancel_all();
        self.summary = Some(GameSummary {
            final_score: self.score,
            elapsed_ms: self.elapsed_ms(),
            ghosts_spawned: self.ghosts_spawned,
            ghosts_tapped: self.ghosts_tapped,
        });
        self.events.push(RuntimeEvent::GameOver {
            final_score: self.score,
        });
    }

    pub fn take_summary(&mut self) -> Option<GameSummary> {
        self.summary.take()
    }

    pub fn drain_events(&mut self) -> Vec<RuntimeEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn build_snapshot(&mut self, include_events: bool) -> Snapshot {
        Snapshot {
            tick: self.tick_counter,
            elapsed_ms: self.elapsed_ms(),
            phase: self.phase,
            lives: self.lives,
            score: self.score,
            difficulty: self.difficulty,
            speed_boost: self.speed_boost,
            ghosts: self.ghosts.values().cloned().collect(),
            events: if include_events {
                self.drain_events()
            } else {
                Vec::new()
            },
        }
    }
}
