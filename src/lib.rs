pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod input;
pub mod kv_store;
pub mod leaderboard_server;
pub mod remote;
pub mod rng;
pub mod score_store;
pub mod session;
pub mod types;
