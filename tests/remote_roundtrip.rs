use std::net::SocketAddr;
use std::sync::Arc;

use haunting::config::RemoteConfig;
use haunting::kv_store::MemoryKeyValueStore;
use haunting::leaderboard_server::{router, LeaderboardTable, ServerState};
use haunting::remote::{RemoteScores, RestRemote};
use haunting::score_store::{ScoreStore, SyncOutcome};
use haunting::types::NewScore;

const API_KEY: &str = "test-anon-key";

async fn spawn_server() -> SocketAddr {
    let table = LeaderboardTable::new(Box::new(MemoryKeyValueStore::new()));
    let app = router(ServerState::new(table, Some(API_KEY.to_string())));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    addr
}

fn remote_for(addr: SocketAddr, api_key: &str) -> RestRemote {
    RestRemote::new(&RemoteConfig {
        base_url: format!("http://{addr}"),
        api_key: api_key.to_string(),
    })
}

fn row(name: &str, score: i64) -> NewScore {
    NewScore {
        player_name: name.to_string(),
        score,
    }
}

#[tokio::test]
async fn rest_remote_inserts_and_reads_top_scores() {
    let addr = spawn_server().await;
    let remote = remote_for(addr, API_KEY);

    remote
        .insert(vec![row("a", 30), row("b", 90), row("c", 60)])
        .await
        .expect("insert batch");
    let top = remote.top(2).await.expect("read top");
    assert_eq!(top.len(), 2);
    assert_eq!(top[0].player_name, "b");
    assert_eq!(top[0].score, 90);
    assert_eq!(top[1].score, 60);
    assert!(!top[0].id.is_empty());
    assert!(!top[0].created_at.is_empty());
}

#[tokio::test]
async fn wrong_key_is_rejected() {
    let addr = spawn_server().await;
    let remote = remote_for(addr, "nope");
    let error = remote.insert(vec![row("a", 1)]).await.expect_err("unauthorized");
    assert!(error.to_string().contains("401"));
    assert!(remote.top(10).await.is_err());
}

#[tokio::test]
async fn score_store_saves_through_remote() {
    let addr = spawn_server().await;
    let store = ScoreStore::new(
        Box::new(MemoryKeyValueStore::new()),
        Some(Box::new(remote_for(addr, API_KEY))),
    );

    assert!(store.save_score("Ghost", 50).await);
    assert_eq!(store.pending_count(), 0);
    let scores = store.get_scores().await;
    assert_eq!(scores.len(), 1);
    assert_eq!(scores[0].player_name, "Ghost");
    assert_eq!(scores[0].score, 50);
}

#[tokio::test]
async fn queued_scores_reach_the_server_once_it_is_reachable() {
    // Reserve a port, then release it so the first writes fail to connect.
    let reserved = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind reserved port");
    let dead_addr = reserved.local_addr().expect("reserved addr");
    drop(reserved);

    let kv: Arc<MemoryKeyValueStore> = Arc::new(MemoryKeyValueStore::new());
    let offline = ScoreStore::new(
        Box::new(kv.clone()),
        Some(Box::new(remote_for(dead_addr, API_KEY))),
    );
    assert!(!offline.save_score("Early", 40).await);
    assert!(!offline.save_score("Later", 70).await);
    assert_eq!(offline.pending_count(), 2);
    assert_eq!(offline.sync_pending_scores().await, SyncOutcome::Failed);
    assert_eq!(offline.pending_count(), 2);

    let local_view = offline.get_scores().await;
    assert_eq!(
        local_view.iter().map(|s| s.score).collect::<Vec<_>>(),
        vec![70, 40]
    );

    let addr = spawn_server().await;
    let online = ScoreStore::new(
        Box::new(kv),
        Some(Box::new(remote_for(addr, API_KEY))),
    );
    assert_eq!(online.sync_pending_scores().await, SyncOutcome::Synced(2));
    assert_eq!(online.pending_count(), 0);
    assert_eq!(online.sync_pending_scores().await, SyncOutcome::Skipped);

    let remote_view = online.get_scores().await;
    assert_eq!(remote_view.len(), 2);
    assert_eq!(remote_view[0].player_name, "Later");
}
