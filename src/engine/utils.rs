use std::time::{SystemTime, UNIX_EPOCH};

use crate::constants::{
    BASE_SPAWN_INTERVAL_MS, BASE_SPAWN_PROBABILITY, DIFFICULTY_PER_SECOND,
    MAX_DIFFICULTY, MAX_SPAWN_INTERVAL_REDUCTION_MS, MAX_SPAWN_PROBABILITY,
    MIN_SPAWN_INTERVAL_MS, SPAWN_INTERVAL_REDUCTION_PER_DIFFICULTY_MS,
    SPAWN_PROBABILITY_PER_DIFFICULTY,
};

pub fn now_ms() -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    now as u64
}

pub fn round3(value: f32) -> f32 {
    (value * 1000.0).round() / 1000.0
}

pub fn difficulty_for_elapsed(elapsed_ms: u64) -> f32 {
    let elapsed_secs = (elapsed_ms / 1000) as f32;
    (1.0 + elapsed_secs * DIFFICULTY_PER_SECOND).min(MAX_DIFFICULTY)
}

pub fn spawn_interval_ms(difficulty: f32) -> u64 {
    let reduction = ((difficulty - 1.0).max(0.0) * SPAWN_INTERVAL_REDUCTION_PER_DIFFICULTY_MS)
        .min(MAX_SPAWN_INTERVAL_REDUCTION_MS as f32) as u64;
    BASE_SPAWN_INTERVAL_MS
        .saturating_sub(reduction)
        .max(MIN_SPAWN_INTERVAL_MS)
}

pub fn spawn_probability(difficulty: f32) -> f32 {
    (BASE_SPAWN_PROBABILITY + (difficulty - 1.0).max(0.0) * SPAWN_PROBABILITY_PER_DIFFICULTY)
        .min(MAX_SPAWN_PROBABILITY)
}
