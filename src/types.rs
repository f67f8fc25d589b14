use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_VIEWPORT_HEIGHT, DEFAULT_VIEWPORT_WIDTH};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    Menu,
    Playing,
    GameOver,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpawnEdge {
    Left,
    Right,
    Top,
    Bottom,
}

impl SpawnEdge {
    pub const ALL: [SpawnEdge; 4] = [Self::Left, Self::Right, Self::Top, Self::Bottom];
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

/// Screen-space play area. The ghosts' target is its center.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> Vec2 {
        Vec2 {
            x: self.width / 2.0,
            y: self.height / 2.0,
        }
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        (0.0..=self.width).contains(&x) && (0.0..=self.height).contains(&y)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(DEFAULT_VIEWPORT_WIDTH, DEFAULT_VIEWPORT_HEIGHT)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Ghost {
    pub id: u64,
    pub x: f32,
    pub y: f32,
    pub speed: f32,
    /// Fade-in progress, 0.0 on spawn up to 1.0.
    pub fade: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeEvent {
    GhostSpawned {
        #[serde(rename = "ghostId")]
        ghost_id: u64,
        edge: SpawnEdge,
    },
    GhostTapped {
        #[serde(rename = "ghostId")]
        ghost_id: u64,
        score: u32,
    },
    LifeLost {
        #[serde(rename = "ghostId")]
        ghost_id: u64,
        lives: i32,
    },
    GameOver {
        #[serde(rename = "finalScore")]
        final_score: u32,
    },
}

#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    #[serde(rename = "elapsedMs")]
    pub elapsed_ms: u64,
    pub phase: GamePhase,
    pub lives: i32,
    pub score: u32,
    pub difficulty: f32,
    #[serde(rename = "speedBoost")]
    pub speed_boost: f32,
    pub ghosts: Vec<Ghost>,
    pub events: Vec<RuntimeEvent>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GameSummary {
    #[serde(rename = "finalScore")]
    pub final_score: u32,
    #[serde(rename = "elapsedMs")]
    pub elapsed_ms: u64,
    #[serde(rename = "ghostsSpawned")]
    pub ghosts_spawned: u32,
    #[serde(rename = "ghostsTapped")]
    pub ghosts_tapped: u32,
}

/// A persisted leaderboard row. Field names follow the remote table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub id: String,
    pub player_name: String,
    pub score: i64,
    pub created_at: String,
}

impl Score {
    pub fn to_new_score(&self) -> NewScore {
        NewScore {
            player_name: self.player_name.clone(),
            score: self.score,
        }
    }
}

/// Insert payload accepted by the remote store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewScore {
    pub player_name: String,
    pub score: i64,
}
