pub const MOVE_TICK_MS: u64 = 50;
pub const DIFFICULTY_TICK_MS: u64 = 1_000;

pub const BASE_SPAWN_INTERVAL_MS: u64 = 600;
pub const MAX_SPAWN_INTERVAL_REDUCTION_MS: u64 = 150;
pub const MIN_SPAWN_INTERVAL_MS: u64 = 250;
pub const SPAWN_INTERVAL_REDUCTION_PER_DIFFICULTY_MS: f32 = 75.0;

pub const BASE_SPAWN_PROBABILITY: f32 = 0.6;
pub const MAX_SPAWN_PROBABILITY: f32 = 0.95;
pub const SPAWN_PROBABILITY_PER_DIFFICULTY: f32 = 0.175;

pub const STARTING_LIVES: i32 = 3;
pub const TAP_SCORE: u32 = 10;
pub const SPEED_BOOST_STEP: f32 = 0.02;
pub const TAP_SPEED_NUDGE: f32 = 1.02;

pub const DIFFICULTY_PER_SECOND: f32 = 0.02;
pub const MAX_DIFFICULTY: f32 = 3.0;

pub const COLLISION_RADIUS: f32 = 50.0;
pub const SPAWN_MARGIN: f32 = 50.0;
pub const SIDE_SPAWN_BOTTOM_INSET: f32 = 200.0;
pub const GHOST_MIN_BASE_SPEED: f32 = 1.0;
pub const GHOST_MAX_BASE_SPEED: f32 = 3.0;
pub const GHOST_FADE_IN_MS: u64 = 500;

pub const DEFAULT_VIEWPORT_WIDTH: f32 = 390.0;
pub const DEFAULT_VIEWPORT_HEIGHT: f32 = 844.0;

pub const LEADERBOARD_LIMIT: usize = 100;
pub const MAX_PLAYER_NAME_LEN: usize = 20;
pub const ANONYMOUS_PLAYER: &str = "Anonymous";
