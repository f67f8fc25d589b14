use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;

use crate::constants::LEADERBOARD_LIMIT;
use crate::error::StoreResult;
use crate::kv_store::KeyValueStore;
use crate::score_store::normalize_player_name;
use crate::types::{NewScore, Score};

const ROWS_KEY: &str = "leaderboard_rows";

pub struct LeaderboardTable {
    kv: Box<dyn KeyValueStore>,
    next_id: u64,
}

impl LeaderboardTable {
    pub fn new(kv: Box<dyn KeyValueStore>) -> Self {
        let mut table = Self { kv, next_id: 1 };
        table.next_id = table
            .load_rows()
            .iter()
            .filter_map(|row| row.id.parse::<u64>().ok())
            .max()
            .map_or(1, |max| max + 1);
        table
    }

    pub fn insert(&mut self, rows: Vec<NewScore>) -> StoreResult<Vec<Score>> {
        let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let mut stored = self.load_rows();
        let mut inserted = Vec::with_capacity(rows.len());
        let mut next_id = self.next_id;
        for row in rows {
            let score = Score {
                id: next_id.to_string(),
                player_name: normalize_player_name(&row.player_name),
                score: row.score,
                created_at: created_at.clone(),
            };
            next_id += 1;
            inserted.push(score);
        }
        stored.extend(inserted.iter().cloned());
        self.kv.set(ROWS_KEY, &serde_json::to_string(&stored)?)?;
        self.next_id = next_id;
        Ok(inserted)
    }

    pub fn top(&self, limit: usize) -> Vec<Score> {
        let mut rows = self.load_rows();
        rows.sort_by(|a, b| b.score.cmp(&a.score));
        rows.truncate(limit);
        rows
    }

    fn load_rows(&self) -> Vec<Score> {
        let text = match self.kv.get(ROWS_KEY) {
            Ok(Some(text)) => text,
            Ok(None) => return Vec::new(),
            Err(error) => {
                log::error!(target: "leaderboard", "failed to read rows: {error}");
                return Vec::new();
            }
        };
        match serde_json::from_str::<Vec<Score>>(&text) {
            Ok(rows) => rows,
            Err(error) => {
                log::error!(target: "leaderboard", "failed to parse rows: {error}");
                Vec::new()
            }
        }
    }
}

pub struct ServerState {
    table: Mutex<LeaderboardTable>,
    api_key: Option<String>,
}

pub type SharedState = Arc<ServerState>;

impl ServerState {
    pub fn new(table: LeaderboardTable, api_key: Option<String>) -> SharedState {
        Arc::new(Self {
            table: Mutex::new(table),
            api_key,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InsertPayload {
    Many(Vec<NewScore>),
    One(NewScore),
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    order: Option<String>,
    limit: Option<String>,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/rest/v1/scores", get(list_handler).post(insert_handler))
        .with_state(state)
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn insert_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(payload): Json<InsertPayload>,
) -> Response {
    if !is_authorized(&state, &headers) {
        return error_response(StatusCode::UNAUTHORIZED, "invalid api key");
    }
    let rows = match payload {
        InsertPayload::Many(rows) => rows,
        InsertPayload::One(row) => vec![row],
    };
    if rows.iter().any(|row| row.score < 0) {
        return error_response(StatusCode::BAD_REQUEST, "score must be non-negative");
    }

    let mut table = state.table.lock().await;
    match table.insert(rows) {
        Ok(inserted) => {
            log::info!(target: "leaderboard", "inserted {} rows", inserted.len());
            StatusCode::CREATED.into_response()
        }
        Err(error) => {
            log::error!(target: "leaderboard", "insert failed: {error}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "storage failure")
        }
    }
}

async fn list_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Response {
    if !is_authorized(&state, &headers) {
        return error_response(StatusCode::UNAUTHORIZED, "invalid api key");
    }
    if let Some(order) = query.order.as_deref() {
        if order != "score.desc" {
            return error_response(StatusCode::BAD_REQUEST, "unsupported order");
        }
    }
    let limit = parse_limit(query.limit.as_deref());
    let table = state.table.lock().await;
    Json(table.top(limit)).into_response()
}

fn is_authorized(state: &ServerState, headers: &HeaderMap) -> bool {
    let Some(expected) = state.api_key.as_deref() else {
        return true;
    };
    headers
        .get("apikey")
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == expected)
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

pub fn parse_limit(raw: Option<&str>) -> usize {
    raw.and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(LEADERBOARD_LIMIT)
        .clamp(1, LEADERBOARD_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv_store::MemoryKeyValueStore;

    fn row(name: &str, score: i64) -> NewScore {
        NewScore {
            player_name: name.to_string(),
            score,
        }
    }

    #[test]
    fn limit_parsing_is_lenient_and_clamped() {
        assert_eq!(parse_limit(Some("8")), 8);
        assert_eq!(parse_limit(Some("0")), 1);
        assert_eq!(parse_limit(Some("999")), 100);
        assert_eq!(parse_limit(Some("abc")), 100);
        assert_eq!(parse_limit(None), 100);
    }

    #[test]
    fn table_assigns_ids_and_orders_rows() {
        let mut table = LeaderboardTable::new(Box::new(MemoryKeyValueStore::new()));
        let inserted = table
            .insert(vec![row("a", 30), row("", 90), row("c", 60)])
            .expect("insert");
        assert_eq!(
            inserted.iter().map(|s| s.id.as_str()).collect::<Vec<_>>(),
            vec!["1", "2", "3"]
        );
        let top = table.top(2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].score, 90);
        assert_eq!(top[0].player_name, "Anonymous");
        assert_eq!(top[1].score, 60);
    }

    #[test]
    fn ids_continue_after_reload() {
        let kv = MemoryKeyValueStore::new();
        kv.set(
            ROWS_KEY,
            r#"[{"id": "41", "player_name": "x", "score": 1, "created_at": "2026-01-01T00:00:00.000Z"}]"#,
        )
        .expect("seed");
        let mut table = LeaderboardTable::new(Box::new(kv));
        let inserted = table.insert(vec![row("y", 2)]).expect("insert");
        assert_eq!(inserted[0].id, "42");
        assert_eq!(table.top(100).len(), 2);
    }

    #[test]
    fn insert_payload_accepts_object_or_array() {
        let one: InsertPayload =
            serde_json::from_str(r#"{"player_name": "a", "score": 1}"#).expect("object");
        assert!(matches!(one, InsertPayload::One(_)));
        let many: InsertPayload =
            serde_json::from_str(r#"[{"player_name": "a", "score": 1}]"#).expect("array");
        assert!(matches!(many, InsertPayload::Many(rows) if rows.len() == 1));
    }
}
