use clap::Parser;
use haunting::config::AppConfig;
use haunting::constants::MOVE_TICK_MS;
use haunting::engine::utils::now_ms;
use haunting::engine::GameEngine;
use haunting::rng::Rng;
use haunting::score_store::ScoreStore;
use haunting::session::SessionRunner;
use haunting::types::{GamePhase, GameSummary, RuntimeEvent, Viewport};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about = "Plays headless sessions and records their scores")]
struct Cli {
    #[arg(long, default_value_t = 3)]
    sessions: u32,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, default_value = "")]
    name: String,
    /// Milliseconds a ghost must be on screen before the bot taps it.
    #[arg(long, default_value_t = 400)]
    reaction_ms: u64,
    /// Minimum milliseconds between two taps.
    #[arg(long, default_value_t = 300)]
    tap_cooldown_ms: u64,
    /// Chance the bot never notices a ghost.
    #[arg(long, default_value_t = 0.15)]
    miss_rate: f32,
    #[arg(long)]
    width: Option<f32>,
    #[arg(long)]
    height: Option<f32>,
    /// Ignore LEADERBOARD_URL/LEADERBOARD_KEY.
    #[arg(long)]
    local_only: bool,
    #[arg(long, default_value_t = 10)]
    top: usize,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug)]
struct BotProfile {
    reaction_ms: u64,
    tap_cooldown_ms: u64,
    miss_rate: f32,
}

/// Scripted player: taps the oldest noticed ghost once it has been visible
/// for the reaction time, no faster than the cooldown allows.
struct TapBot {
    profile: BotProfile,
    rng: Rng,
    first_seen_ms: HashMap<u64, u64>,
    ignored: HashMap<u64, bool>,
    last_tap_ms: Option<u64>,
}

impl TapBot {
    fn new(profile: BotProfile, seed: u32) -> Self {
        Self {
            profile,
            rng: Rng::new(seed),
            first_seen_ms: HashMap::new(),
            ignored: HashMap::new(),
            last_tap_ms: None,
        }
    }

    fn reset(&mut self) {
        self.first_seen_ms.clear();
        self.ignored.clear();
        self.last_tap_ms = None;
    }

    fn choose(&mut self, engine: &GameEngine, now_ms: u64) -> Option<u64> {
        for ghost in engine.ghosts() {
            self.first_seen_ms.entry(ghost.id).or_insert(now_ms);
            let miss_rate = self.profile.miss_rate;
            let rng = &mut self.rng;
            self.ignored
                .entry(ghost.id)
                .or_insert_with(|| rng.bool(miss_rate));
        }
        if let Some(last) = self.last_tap_ms {
            if now_ms.saturating_sub(last) < self.profile.tap_cooldown_ms {
                return None;
            }
        }
        let target = engine
            .ghosts()
            .filter(|ghost| !self.ignored.get(&ghost.id).copied().unwrap_or(false))
            .filter_map(|ghost| self.first_seen_ms.get(&ghost.id).map(|seen| (*seen, ghost.id)))
            .filter(|(seen, _)| now_ms.saturating_sub(*seen) >= self.profile.reaction_ms)
            .min()
            .map(|(_, id)| id)?;
        self.last_tap_ms = Some(now_ms);
        Some(target)
    }
}

#[derive(Clone, Debug, Serialize)]
struct SessionResultLine {
    session: u32,
    seed: u32,
    #[serde(rename = "finalScore")]
    final_score: u32,
    #[serde(rename = "durationMs")]
    duration_ms: u64,
    #[serde(rename = "ghostsSpawned")]
    ghosts_spawned: u32,
    #[serde(rename = "ghostsTapped")]
    ghosts_tapped: u32,
    #[serde(rename = "peakDifficulty")]
    peak_difficulty: f32,
    #[serde(rename = "remoteSaved")]
    remote_saved: Option<bool>,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    #[serde(rename = "runId")]
    run_id: String,
    #[serde(rename = "startedAtMs")]
    started_at_ms: u64,
    #[serde(rename = "finishedAtMs")]
    finished_at_ms: u64,
    #[serde(rename = "sessionCount")]
    session_count: usize,
    #[serde(rename = "bestScore")]
    best_score: u32,
    #[serde(rename = "averageScore")]
    average_score: u32,
    #[serde(rename = "averageDurationMs")]
    average_duration_ms: u64,
    #[serde(rename = "pendingScores")]
    pending_scores: usize,
    sessions: Vec<SessionResultLine>,
}

#[derive(Clone, Debug, Serialize)]
struct StructuredLogLine {
    #[serde(rename = "timestampMs")]
    timestamp_ms: u64,
    event: String,
    #[serde(rename = "runId")]
    run_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    session: Option<u32>,
    details: Value,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let seed = normalize_seed(cli.seed.unwrap_or_else(now_ms));
    let run_started_at_ms = now_ms();
    let run_id = default_run_id(seed, run_started_at_ms);

    let mut config = AppConfig::from_env();
    if cli.local_only {
        config.remote = None;
    }
    let store = Arc::new(ScoreStore::from_config(&config));
    let viewport = resolve_viewport(cli.width, cli.height);
    let mut runner = SessionRunner::new(GameEngine::new(seed, viewport), store.clone());
    let name = if cli.name.trim().is_empty() {
        runner.player_name().to_string()
    } else {
        cli.name.clone()
    };
    let mut bot = TapBot::new(
        BotProfile {
            reaction_ms: cli.reaction_ms,
            tap_cooldown_ms: cli.tap_cooldown_ms,
            miss_rate: cli.miss_rate.clamp(0.0, 1.0),
        },
        seed.wrapping_add(1),
    );

    emit_log(
        "run_started",
        &run_id,
        None,
        json!({
            "seed": seed,
            "sessions": cli.sessions,
            "remote": store.has_remote(),
            "dataDir": config.data_dir.to_string_lossy(),
        }),
    );

    let mut results = Vec::new();
    for session in 1..=cli.sessions {
        let result = play_session(&mut runner, &mut bot, &name, session, seed, &run_id).await;
        println!(
            "{}",
            serde_json::to_string(&result).expect("session result should serialize")
        );
        results.push(result);
    }

    let leaderboard = runner.refresh_leaderboard().await;
    for (rank, score) in leaderboard.iter().take(cli.top).enumerate() {
        println!(
            "{:>3}. {:<20} {:>6}  {}",
            rank + 1,
            score.player_name,
            score.score,
            score.created_at
        );
    }

    let summary = build_run_summary(
        run_id.clone(),
        run_started_at_ms,
        now_ms(),
        results,
        store.pending_count(),
    );

    let mut summary_out_written: Option<String> = None;
    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(error) = write_summary(path, &summary) {
            log::error!(
                target: "simulate",
                "failed to write summary to {}: {error}",
                path.to_string_lossy()
            );
            std::process::exit(2);
        }
        summary_out_written = Some(path.to_string_lossy().to_string());
    }

    emit_log(
        "run_finished",
        &run_id,
        None,
        json!({
            "sessionCount": summary.session_count,
            "bestScore": summary.best_score,
            "averageScore": summary.average_score,
            "pendingScores": summary.pending_scores,
            "summaryOut": summary_out_written,
        }),
    );
}

async fn play_session(
    runner: &mut SessionRunner,
    bot: &mut TapBot,
    name: &str,
    session: u32,
    seed: u32,
    run_id: &str,
) -> SessionResultLine {
    runner.start(name);
    bot.reset();
    emit_log(
        "session_started",
        run_id,
        Some(session),
        json!({ "player": runner.player_name() }),
    );

    let mut clock_ms = 0u64;
    let mut peak_difficulty = 1.0f32;
    while runner.phase() == GamePhase::Playing {
        for event in runner.advance(MOVE_TICK_MS) {
            if let RuntimeEvent::LifeLost { lives, .. } = event {
                log::debug!(target: "simulate", "session {session}: life lost, {lives} left");
            }
        }
        clock_ms += MOVE_TICK_MS;
        peak_difficulty = peak_difficulty.max(runner.engine().difficulty());
        if runner.phase() != GamePhase::Playing {
            break;
        }
        if let Some(id) = bot.choose(runner.engine(), clock_ms) {
            runner.tap(id);
        }
    }

    let persisted = runner.wait_for_persistence().await;
    let summary = runner.last_summary().cloned().unwrap_or(GameSummary {
        final_score: runner.engine().score(),
        elapsed_ms: runner.engine().elapsed_ms(),
        ghosts_spawned: 0,
        ghosts_tapped: 0,
    });
    let result = SessionResultLine {
        session,
        seed,
        final_score: summary.final_score,
        duration_ms: summary.elapsed_ms,
        ghosts_spawned: summary.ghosts_spawned,
        ghosts_tapped: summary.ghosts_tapped,
        peak_difficulty,
        remote_saved: persisted.map(|outcome| outcome.remote_saved),
    };
    emit_log(
        "session_finished",
        run_id,
        Some(session),
        json!({
            "finalScore": result.final_score,
            "durationMs": result.duration_ms,
            "remoteSaved": result.remote_saved,
        }),
    );
    result
}

fn resolve_viewport(width: Option<f32>, height: Option<f32>) -> Viewport {
    let default = Viewport::default();
    Viewport::new(
        width.filter(|value| *value > 0.0).unwrap_or(default.width),
        height.filter(|value| *value > 0.0).unwrap_or(default.height),
    )
}

fn normalize_seed(seed: u64) -> u32 {
    (seed & 0xffff_ffff) as u32
}

fn default_run_id(seed: u32, timestamp_ms: u64) -> String {
    format!("sim-{seed}-{timestamp_ms}")
}

fn build_run_summary(
    run_id: String,
    started_at_ms: u64,
    finished_at_ms: u64,
    sessions: Vec<SessionResultLine>,
    pending_scores: usize,
) -> RunSummary {
    let session_count = sessions.len();
    let best_score = sessions
        .iter()
        .map(|session| session.final_score)
        .max()
        .unwrap_or(0);
    let (average_score, average_duration_ms) = if session_count == 0 {
        (0, 0)
    } else {
        let total_score: u64 = sessions.iter().map(|s| u64::from(s.final_score)).sum();
        let total_duration: u64 = sessions.iter().map(|s| s.duration_ms).sum();
        (
            (total_score / session_count as u64) as u32,
            total_duration / session_count as u64,
        )
    };
    RunSummary {
        run_id,
        started_at_ms,
        finished_at_ms,
        session_count,
        best_score,
        average_score,
        average_duration_ms,
        pending_scores,
        sessions,
    }
}

fn emit_log(event: &str, run_id: &str, session: Option<u32>, details: Value) {
    let log_line = StructuredLogLine {
        timestamp_ms: now_ms(),
        event: event.to_string(),
        run_id: run_id.to_string(),
        session,
        details,
    };
    log::info!(
        target: "simulate",
        "{}",
        serde_json::to_string(&log_line).expect("structured log should serialize")
    );
}

fn write_summary(path: &Path, summary: &RunSummary) -> io::Result<()> {
    let summary_text = serde_json::to_string_pretty(summary).expect("run summary should serialize");
    std::fs::write(path, summary_text)
}
