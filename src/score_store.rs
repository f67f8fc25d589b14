use std::collections::HashSet;

use chrono::{SecondsFormat, Utc};
use rand::distr::Alphanumeric;
use rand::Rng as _;

use crate::config::AppConfig;
use crate::constants::{ANONYMOUS_PLAYER, LEADERBOARD_LIMIT};
use crate::engine::utils::now_ms;
use crate::error::StoreError;
use crate::kv_store::{FileKeyValueStore, KeyValueStore};
use crate::remote::{RemoteScores, RestRemote};
use crate::types::{NewScore, Score};

pub const SCORES_KEY: &str = "@horror_game_scores";
pub const PLAYER_NAME_KEY: &str = "@horror_game_player_name";
pub const PENDING_SCORES_KEY: &str = "@horror_game_pending_scores";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncOutcome {
    Skipped,
    Synced(usize),
    /// The batch failed; the queue is left exactly as it was.
    Failed,
}

pub struct ScoreStore {
    kv: Box<dyn KeyValueStore>,
    remote: Option<Box<dyn RemoteScores>>,
}

impl ScoreStore {
    pub fn new(kv: Box<dyn KeyValueStore>, remote: Option<Box<dyn RemoteScores>>) -> Self {
        Self { kv, remote }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let remote = config.remote.as_ref().map(|remote_config| {
            Box::new(RestRemote::new(remote_config)) as Box<dyn RemoteScores>
        });
        if remote.is_none() {
            log::info!(target: "score_store", "remote leaderboard not configured, running local-only");
        }
        Self::new(
            Box::new(FileKeyValueStore::new(config.data_dir.clone())),
            remote,
        )
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    pub async fn save_score(&self, player_name: &str, value: i64) -> bool {
        if value < 0 {
            log::warn!(target: "score_store", "refusing to store negative score {value}");
            return false;
        }
        let score = make_score(player_name, value);

        let remote_ok = match self.remote.as_ref() {
            Some(remote) => match remote.insert(vec![score.to_new_score()]).await {
                Ok(()) => true,
                Err(error) => {
                    log::warn!(target: "score_store", "remote save failed, queueing score: {error}");
                    false
                }
            },
            None => false,
        };

        let mut local = self.load_scores(SCORES_KEY);
        local.push(score.clone());
        self.write_scores(SCORES_KEY, &local);

        if !remote_ok {
            let mut pending = self.load_scores(PENDING_SCORES_KEY);
            pending.push(score);
            self.write_scores(PENDING_SCORES_KEY, &pending);
        }
        remote_ok
    }

    pub async fn get_scores(&self) -> Vec<Score> {
        if let Some(remote) = self.remote.as_ref() {
            match remote.top(LEADERBOARD_LIMIT).await {
                Ok(rows) => return rows,
                Err(error) => {
                    log::warn!(target: "score_store", "remote read failed, using local cache: {error}");
                }
            }
        }
        self.local_scores()
    }

    /// Local cache sorted by score, highest first. Ties keep insertion order.
    pub fn local_scores(&self) -> Vec<Score> {
        let mut scores = self.load_scores(SCORES_KEY);
        scores.sort_by(|a, b| b.score.cmp(&a.score));
        scores
    }

    pub async fn sync_pending_scores(&self) -> SyncOutcome {
        let Some(remote) = self.remote.as_ref() else {
            return SyncOutcome::Skipped;
        };
        let pending = self.load_scores(PENDING_SCORES_KEY);
        if pending.is_empty() {
            return SyncOutcome::Skipped;
        }

        let rows: Vec<NewScore> = pending.iter().map(Score::to_new_score).collect();
        match remote.insert(rows).await {
            Ok(()) => {
                self.drop_pending(&pending);
                log::info!(target: "score_store", "synced {} pending scores", pending.len());
                SyncOutcome::Synced(pending.len())
            }
            Err(error) => {
                log::warn!(target: "score_store", "pending sync failed, keeping {} scores queued: {error}", pending.len());
                SyncOutcome::Failed
            }
        }
    }

    // Scores queued while the batch was in flight stay queued.
    fn drop_pending(&self, delivered: &[Score]) {
        let delivered: HashSet<&str> = delivered.iter().map(|score| score.id.as_str()).collect();
        let remaining: Vec<Score> = self
            .load_scores(PENDING_SCORES_KEY)
            .into_iter()
            .filter(|score| !delivered.contains(score.id.as_str()))
            .collect();
        let result = if remaining.is_empty() {
            self.kv.remove(PENDING_SCORES_KEY)
        } else {
            serde_json::to_string(&remaining)
                .map_err(StoreError::from)
                .and_then(|json| self.kv.set(PENDING_SCORES_KEY, &json))
        };
        if let Err(error) = result {
            log::error!(target: "score_store", "failed to update pending queue: {error}");
        }
    }

    pub fn pending_count(&self) -> usize {
        self.load_scores(PENDING_SCORES_KEY).len()
    }

    pub fn clear_scores(&self) {
        if let Err(error) = self.kv.remove(SCORES_KEY) {
            log::error!(target: "score_store", "failed to clear scores: {error}");
        }
    }

    pub fn get_player_name(&self) -> String {
        let raw = match self.kv.get(PLAYER_NAME_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return String::new(),
            Err(error) => {
                log::error!(target: "score_store", "failed to read player name: {error}");
                return String::new();
            }
        };
        match serde_json::from_str::<String>(&raw) {
            Ok(name) => name,
            Err(error) => {
                log::warn!(target: "score_store", "failed to parse player name: {error}");
                String::new()
            }
        }
    }

    pub fn set_player_name(&self, name: &str) {
        let result = serde_json::to_string(name)
            .map_err(StoreError::from)
            .and_then(|json| self.kv.set(PLAYER_NAME_KEY, &json));
        if let Err(error) = result {
            log::error!(target: "score_store", "failed to write player name: {error}");
        }
    }

    fn load_scores(&self, key: &str) -> Vec<Score> {
        let text = match self.kv.get(key) {
            Ok(Some(text)) => text,
            Ok(None) => return Vec::new(),
            Err(error) => {
                log::error!(target: "score_store", "failed to read {key}: {error}");
                return Vec::new();
            }
        };
        let raw = match serde_json::from_str::<Vec<serde_json::Value>>(&text) {
            Ok(raw) => raw,
            Err(error) => {
                log::error!(target: "score_store", "failed to parse {key}: {error}");
                return Vec::new();
            }
        };

        raw.into_iter()
            .filter_map(|value| match serde_json::from_value::<Score>(value) {
                Ok(score) if score.score >= 0 => Some(score),
                Ok(score) => {
                    log::warn!(target: "score_store", "dropping negative score entry '{}' in {key}", score.id);
                    None
                }
                Err(error) => {
                    log::warn!(target: "score_store", "dropping malformed entry in {key}: {error}");
                    None
                }
            })
            .collect()
    }

    fn write_scores(&self, key: &str, scores: &[Score]) {
        let result = serde_json::to_string(scores)
            .map_err(StoreError::from)
            .and_then(|json| self.kv.set(key, &json));
        if let Err(error) = result {
            log::error!(target: "score_store", "failed to write {key}: {error}");
        }
    }
}

pub fn normalize_player_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        ANONYMOUS_PLAYER.to_string()
    } else {
        trimmed.to_string()
    }
}

fn make_score(player_name: &str, value: i64) -> Score {
    let suffix: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    Score {
        id: format!("{}-{suffix}", now_ms()),
        player_name: normalize_player_name(player_name),
        score: value,
        created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use futures_util::future::BoxFuture;
    use futures_util::FutureExt;
    use proptest::prelude::*;

    use super::*;
    use crate::error::StoreResult;
    use crate::kv_store::MemoryKeyValueStore;

    #[derive(Default)]
    struct FakeRemote {
        rows: Mutex<Vec<NewScore>>,
        failing: AtomicBool,
        insert_calls: AtomicUsize,
    }

    impl FakeRemote {
        fn stored(&self) -> Vec<NewScore> {
            self.rows.lock().expect("rows lock").clone()
        }
    }

    impl RemoteScores for Arc<FakeRemote> {
        fn insert(&self, rows: Vec<NewScore>) -> BoxFuture<'_, StoreResult<()>> {
            async move {
                self.insert_calls.fetch_add(1, Ordering::SeqCst);
                if self.failing.load(Ordering::SeqCst) {
                    return Err(StoreError::Status {
                        status: 503,
                        body: "unavailable".to_string(),
                    });
                }
                self.rows.lock().expect("rows lock").extend(rows);
                Ok(())
            }
            .boxed()
        }

        fn top(&self, limit: usize) -> BoxFuture<'_, StoreResult<Vec<Score>>> {
            async move {
                if self.failing.load(Ordering::SeqCst) {
                    return Err(StoreError::NotConfigured);
                }
                let mut rows: Vec<Score> = self
                    .stored()
                    .into_iter()
                    .enumerate()
                    .map(|(idx, row)| Score {
                        id: format!("remote-{idx}"),
                        player_name: row.player_name,
                        score: row.score,
                        created_at: "2026-01-01T00:00:00.000Z".to_string(),
                    })
                    .collect();
                rows.sort_by(|a, b| b.score.cmp(&a.score));
                rows.truncate(limit);
                Ok(rows)
            }
            .boxed()
        }
    }

    fn local_store() -> ScoreStore {
        ScoreStore::new(Box::new(MemoryKeyValueStore::new()), None)
    }

    fn remote_store(remote: &Arc<FakeRemote>) -> ScoreStore {
        ScoreStore::new(
            Box::new(MemoryKeyValueStore::new()),
            Some(Box::new(remote.clone())),
        )
    }

    #[tokio::test]
    async fn local_only_save_is_cached_and_queued() {
        let store = local_store();
        assert!(!store.save_score("Ghost", 50).await);

        let scores = store.get_scores().await;
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].player_name, "Ghost");
        assert_eq!(scores[0].score, 50);
        assert_eq!(store.pending_count(), 1);

        assert_eq!(store.sync_pending_scores().await, SyncOutcome::Skipped);
        assert_eq!(store.pending_count(), 1);
    }

    #[tokio::test]
    async fn local_scores_sort_descending_with_stable_ties() {
        let store = local_store();
        for (name, value) in [("a", 30), ("b", 90), ("c", 60), ("d", 60)] {
            store.save_score(name, value).await;
        }
        let scores = store.get_scores().await;
        let values: Vec<i64> = scores.iter().map(|score| score.score).collect();
        assert_eq!(values, vec![90, 60, 60, 30]);
        assert_eq!(scores[1].player_name, "c");
        assert_eq!(scores[2].player_name, "d");
    }

    #[tokio::test]
    async fn blank_names_become_anonymous() {
        let store = local_store();
        store.save_score("   ", 10).await;
        assert_eq!(store.get_scores().await[0].player_name, "Anonymous");
    }

    #[tokio::test]
    async fn negative_scores_are_rejected() {
        let store = local_store();
        assert!(!store.save_score("x", -5).await);
        assert!(store.get_scores().await.is_empty());
        assert_eq!(store.pending_count(), 0);
    }

    #[tokio::test]
    async fn remote_success_skips_the_queue() {
        let remote = Arc::new(FakeRemote::default());
        let store = remote_store(&remote);
        assert!(store.save_score("Ann", 70).await);
        assert_eq!(store.pending_count(), 0);
        assert_eq!(store.local_scores().len(), 1);
        assert_eq!(
            remote.stored(),
            vec![NewScore {
                player_name: "Ann".to_string(),
                score: 70
            }]
        );
    }

    #[tokio::test]
    async fn failed_remote_save_is_synced_later() {
        let remote = Arc::new(FakeRemote::default());
        remote.failing.store(true, Ordering::SeqCst);
        let store = remote_store(&remote);

        assert!(!store.save_score("Ann", 10).await);
        assert!(!store.save_score("Bob", 20).await);
        assert_eq!(store.pending_count(), 2);

        assert_eq!(store.sync_pending_scores().await, SyncOutcome::Failed);
        assert_eq!(store.pending_count(), 2);

        remote.failing.store(false, Ordering::SeqCst);
        assert_eq!(store.sync_pending_scores().await, SyncOutcome::Synced(2));
        assert_eq!(store.pending_count(), 0);
        assert_eq!(remote.stored().len(), 2);
    }

    #[tokio::test]
    async fn syncing_an_empty_queue_is_a_no_op() {
        let remote = Arc::new(FakeRemote::default());
        let store = remote_store(&remote);
        assert_eq!(store.sync_pending_scores().await, SyncOutcome::Skipped);
        assert_eq!(store.sync_pending_scores().await, SyncOutcome::Skipped);
        assert_eq!(remote.insert_calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.pending_count(), 0);
    }

    #[tokio::test]
    async fn reads_prefer_remote_and_fall_back_to_cache() {
        let remote = Arc::new(FakeRemote::default());
        let store = remote_store(&remote);
        store.save_score("Ann", 40).await;
        remote.rows.lock().expect("rows lock").push(NewScore {
            player_name: "Elsewhere".to_string(),
            score: 99,
        });

        let remote_view = store.get_scores().await;
        assert_eq!(remote_view[0].player_name, "Elsewhere");
        assert_eq!(remote_view.len(), 2);

        remote.failing.store(true, Ordering::SeqCst);
        let local_view = store.get_scores().await;
        assert_eq!(local_view.len(), 1);
        assert_eq!(local_view[0].player_name, "Ann");
    }

    #[tokio::test]
    async fn clear_scores_keeps_pending_queue() {
        let store = local_store();
        store.save_score("Ann", 10).await;
        store.clear_scores();
        assert!(store.get_scores().await.is_empty());
        assert_eq!(store.pending_count(), 1);
    }

    #[test]
    fn load_keeps_valid_entries_when_invalid_entries_exist() {
        let kv = MemoryKeyValueStore::new();
        kv.set(
            SCORES_KEY,
            r#"[
  {"id": "1", "player_name": "Alice", "score": 120, "created_at": "2026-01-01T00:00:00.000Z"},
  {"id": "2", "player_name": "Broken"},
  {"id": "3", "player_name": "Negative", "score": -4, "created_at": "2026-01-01T00:00:00.000Z"}
]"#,
        )
        .expect("seed");
        let store = ScoreStore::new(Box::new(kv), None);
        let scores = store.local_scores();
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].player_name, "Alice");
    }

    #[test]
    fn corrupt_cache_reads_as_empty() {
        let kv = MemoryKeyValueStore::new();
        kv.set(SCORES_KEY, "not json").expect("seed");
        kv.set(PLAYER_NAME_KEY, "{").expect("seed");
        let store = ScoreStore::new(Box::new(kv), None);
        assert!(store.local_scores().is_empty());
        assert_eq!(store.get_player_name(), "");
    }

    #[test]
    fn unset_player_name_is_empty() {
        assert_eq!(local_store().get_player_name(), "");
    }

    #[test]
    fn score_ids_are_unique() {
        let a = make_score("a", 1);
        let b = make_score("a", 1);
        assert_ne!(a.id, b.id);
        assert!(a.created_at.ends_with('Z'));
    }

    struct QueueingRemote {
        kv: Arc<MemoryKeyValueStore>,
        late: Score,
        rows: Mutex<Vec<NewScore>>,
    }

    impl RemoteScores for QueueingRemote {
        // Another save queues its score while this batch is in flight.
        fn insert(&self, rows: Vec<NewScore>) -> BoxFuture<'_, StoreResult<()>> {
            async move {
                let text = self.kv.get(PENDING_SCORES_KEY)?.unwrap_or_else(|| "[]".to_string());
                let mut pending: Vec<Score> = serde_json::from_str(&text)?;
                pending.push(self.late.clone());
                self.kv.set(PENDING_SCORES_KEY, &serde_json::to_string(&pending)?)?;
                self.rows.lock().expect("rows lock").extend(rows);
                Ok(())
            }
            .boxed()
        }

        fn top(&self, _limit: usize) -> BoxFuture<'_, StoreResult<Vec<Score>>> {
            async move { Ok(Vec::new()) }.boxed()
        }
    }

    #[tokio::test]
    async fn sync_keeps_scores_queued_during_the_batch() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let offline = ScoreStore::new(Box::new(kv.clone()), None);
        offline.save_score("Early", 10).await;
        assert_eq!(offline.pending_count(), 1);

        let store = ScoreStore::new(
            Box::new(kv.clone()),
            Some(Box::new(QueueingRemote {
                kv: kv.clone(),
                late: make_score("Late", 20),
                rows: Mutex::new(Vec::new()),
            })),
        );
        assert_eq!(store.sync_pending_scores().await, SyncOutcome::Synced(1));

        let left = store.load_scores(PENDING_SCORES_KEY);
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].player_name, "Late");
    }

    #[tokio::test]
    async fn sync_clears_the_queue_key_when_everything_was_delivered() {
        let remote = Arc::new(FakeRemote::default());
        remote.failing.store(true, Ordering::SeqCst);
        let kv = Arc::new(MemoryKeyValueStore::new());
        let store = ScoreStore::new(Box::new(kv.clone()), Some(Box::new(remote.clone())));
        store.save_score("Ann", 10).await;

        remote.failing.store(false, Ordering::SeqCst);
        assert_eq!(store.sync_pending_scores().await, SyncOutcome::Synced(1));
        assert_eq!(kv.get(PENDING_SCORES_KEY).expect("read"), None);
    }

    proptest! {
        #[test]
        fn player_name_round_trips(name in "\\PC{0,20}") {
            let store = local_store();
            store.set_player_name(&name);
            prop_assert_eq!(store.get_player_name(), name);
        }
    }
}
