use haunting::config::ServerConfig;
use haunting::kv_store::FileKeyValueStore;
use haunting::leaderboard_server::{router, LeaderboardTable, ServerState};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::from_env();
    if config.api_key.is_none() {
        log::warn!(target: "server", "LEADERBOARD_KEY not set, accepting unauthenticated requests");
    }
    log::info!(
        target: "server",
        "leaderboard storage: {}",
        config.db_path.to_string_lossy()
    );

    let table = LeaderboardTable::new(Box::new(FileKeyValueStore::new(config.db_path.clone())));
    let app = router(ServerState::new(table, config.api_key.clone()));

    let bind_addr = format!("0.0.0.0:{}", config.port);
    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(error) => {
            log::error!(target: "server", "failed to bind {bind_addr}: {error}");
            std::process::exit(1);
        }
    };

    log::info!(target: "server", "listening on :{}", config.port);
    if let Err(error) = axum::serve(listener, app).await {
        log::error!(target: "server", "server runtime failed: {error}");
        std::process::exit(1);
    }
}
