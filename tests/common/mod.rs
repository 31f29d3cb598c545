//! In-process fake of the Snowflake session and query endpoints.
//!
//! Responses are canned per SQL text. The fake counts logins, logouts,
//! statements and chunk downloads, and tracks which session tokens are
//! still open so tests can assert that every session was released.

#![allow(dead_code)]

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value as JsonValue, json};
use snowflake_driver::ConnectionConfig;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const PASSWORD: &str = "secret";
pub const CHUNK_KEY_HEADER: &str = "x-test-chunk-key";
pub const CHUNK_KEY: &str = "chunk-key-1";

/// Rows per remote chunk of `BIG_TABLE`.
pub const CHUNK_ROWS: usize = 2;
pub const CHUNK_COUNT: usize = 3;
pub const BIG_INLINE_ROWS: usize = 2;

pub const MISSING_TABLE_MESSAGE: &str =
    "SQL compilation error:\nObject 'MISSING_TABLE' does not exist or not authorized.";

#[derive(Default)]
pub struct FakeState {
    pub base_url: String,
    pub logins: AtomicUsize,
    pub logouts: AtomicUsize,
    pub statements: AtomicUsize,
    pub chunk_fetches: AtomicUsize,
    pub polls: AtomicUsize,
    next_token: AtomicUsize,
    /// Open session token -> database selected at login
    active: Mutex<HashMap<String, Option<String>>>,
    pub last_login_params: Mutex<HashMap<String, String>>,
    pub last_login_body: Mutex<JsonValue>,
    pub sql_log: Mutex<Vec<String>>,
}

impl FakeState {
    pub fn logins(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    pub fn logouts(&self) -> usize {
        self.logouts.load(Ordering::SeqCst)
    }

    pub fn statements(&self) -> usize {
        self.statements.load(Ordering::SeqCst)
    }

    pub fn chunk_fetches(&self) -> usize {
        self.chunk_fetches.load(Ordering::SeqCst)
    }

    pub fn open_sessions(&self) -> usize {
        self.active.lock().unwrap().len()
    }
}

pub struct FakeSnowflake {
    pub url: String,
    pub state: Arc<FakeState>,
}

impl FakeSnowflake {
    /// Bind on an ephemeral port and serve in the background.
    pub async fn start() -> Self {
        Self::start_under("").await
    }

    /// Serve every endpoint below a path prefix, like a reverse proxy would.
    pub async fn start_under(prefix: &str) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}{}", listener.local_addr().unwrap(), prefix);

        let state = Arc::new(FakeState {
            base_url: url.clone(),
            ..Default::default()
        });

        let app = Router::new()
            .route("/session/v1/login-request", post(login))
            .route("/queries/v1/query-request", post(query))
            .route("/queries/{id}/result", get(query_result))
            .route("/chunks/{index}", get(chunk))
            .route("/session", post(logout))
            .with_state(state.clone());
        let app = if prefix.is_empty() {
            app
        } else {
            Router::new().nest(prefix, app)
        };

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { url, state }
    }

    /// Connection settings pointing at this fake.
    pub fn config(&self) -> ConnectionConfig {
        ConnectionConfig::new("testacct", "tester", PASSWORD)
            .with_name("fake")
            .with_endpoint(&self.url)
            .with_warehouse("COMPUTE_WH")
            .with_database("SQLPAD")
            .with_login_timeout(5)
    }

    /// Wait until every opened session has been logged out.
    pub async fn wait_for_release(&self) -> bool {
        for _ in 0..100 {
            if self.state.open_sessions() == 0 {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        false
    }
}

// =============================================================================
// Handlers
// =============================================================================

fn failure(code: &str, message: &str, data: JsonValue) -> Json<JsonValue> {
    Json(json!({ "success": false, "code": code, "message": message, "data": data }))
}

fn token_from(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Snowflake Token=\"")?
        .strip_suffix('"')
        .map(String::from)
}

/// Database of the session behind the request, or an expired-session failure.
fn authorize(state: &FakeState, headers: &HeaderMap) -> Result<Option<String>, Json<JsonValue>> {
    let active = state.active.lock().unwrap();
    token_from(headers)
        .and_then(|token| active.get(&token).cloned())
        .ok_or_else(|| {
            failure(
                "390112",
                "Your session has expired. Please login again.",
                JsonValue::Null,
            )
        })
}

async fn login(
    State(state): State<Arc<FakeState>>,
    Query(params): Query<HashMap<String, String>>,
    Json(body): Json<JsonValue>,
) -> Json<JsonValue> {
    *state.last_login_params.lock().unwrap() = params.clone();
    *state.last_login_body.lock().unwrap() = body.clone();

    if body["data"]["PASSWORD"] != json!(PASSWORD) {
        return failure(
            "390100",
            "Incorrect username or password was specified.",
            JsonValue::Null,
        );
    }

    state.logins.fetch_add(1, Ordering::SeqCst);
    let token = format!("token-{}", state.next_token.fetch_add(1, Ordering::SeqCst));
    let database = params.get("databaseName").cloned();
    state
        .active
        .lock()
        .unwrap()
        .insert(token.clone(), database.clone());

    Json(json!({
        "success": true,
        "code": null,
        "message": null,
        "data": {
            "token": token,
            "masterToken": "master",
            "sessionInfo": {
                "databaseName": database,
                "schemaName": "PUBLIC",
                "warehouseName": params.get("warehouse"),
                "roleName": "SYSADMIN"
            }
        }
    }))
}

async fn query(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Json(body): Json<JsonValue>,
) -> Json<JsonValue> {
    let database = match authorize(&state, &headers) {
        Ok(database) => database,
        Err(expired) => return expired,
    };

    state.statements.fetch_add(1, Ordering::SeqCst);
    let sql = body["sqlText"].as_str().unwrap_or_default().to_string();
    state.sql_log.lock().unwrap().push(sql.clone());

    respond_to(&state, &sql, database.as_deref())
}

async fn query_result(
    State(state): State<Arc<FakeState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Json<JsonValue> {
    if let Err(expired) = authorize(&state, &headers) {
        return expired;
    }
    state.polls.fetch_add(1, Ordering::SeqCst);

    match id.as_str() {
        "q-later" => success(
            "q-later",
            vec![column("ANSWER", "text")],
            vec![vec![json!("later")]],
        ),
        _ => in_progress("333334", &id),
    }
}

async fn chunk(
    State(state): State<Arc<FakeState>>,
    Path(index): Path<usize>,
    headers: HeaderMap,
) -> (StatusCode, String) {
    let key = headers.get(CHUNK_KEY_HEADER).and_then(|v| v.to_str().ok());
    if key != Some(CHUNK_KEY) {
        return (StatusCode::FORBIDDEN, "missing chunk key".to_string());
    }
    state.chunk_fetches.fetch_add(1, Ordering::SeqCst);

    let first = BIG_INLINE_ROWS + index * CHUNK_ROWS + 1;
    let body = (first..first + CHUNK_ROWS)
        .map(|id| format!("[\"{}\"]", id))
        .collect::<Vec<_>>()
        .join(",");
    (StatusCode::OK, body)
}

async fn logout(
    State(state): State<Arc<FakeState>>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Json<JsonValue> {
    if params.get("delete").map(String::as_str) != Some("true") {
        return failure("390000", "unsupported session request", JsonValue::Null);
    }
    let removed = token_from(&headers)
        .and_then(|token| state.active.lock().unwrap().remove(&token))
        .is_some();
    if removed {
        state.logouts.fetch_add(1, Ordering::SeqCst);
    }
    Json(json!({ "success": true, "code": null, "message": null, "data": null }))
}

// =============================================================================
// Canned responses
// =============================================================================

fn column(name: &str, type_name: &str) -> JsonValue {
    match type_name {
        "fixed" => json!({ "name": name, "type": "fixed", "nullable": false, "scale": 0, "precision": 38 }),
        _ => json!({ "name": name, "type": type_name, "nullable": true }),
    }
}

fn success(query_id: &str, rowtype: Vec<JsonValue>, rowset: Vec<Vec<JsonValue>>) -> Json<JsonValue> {
    let total = rowset.len();
    Json(json!({
        "success": true,
        "code": null,
        "message": null,
        "data": {
            "queryId": query_id,
            "rowtype": rowtype,
            "rowset": rowset,
            "total": total,
            "returned": total
        }
    }))
}

fn in_progress(code: &str, query_id: &str) -> Json<JsonValue> {
    Json(json!({
        "success": true,
        "code": code,
        "message": "Asynchronous execution in progress.",
        "data": {
            "queryId": query_id,
            "getResultUrl": format!("/queries/{}/result", query_id)
        }
    }))
}

fn respond_to(state: &FakeState, sql: &str, database: Option<&str>) -> Json<JsonValue> {
    if sql.contains("MISSING_TABLE") {
        return failure(
            "002003",
            MISSING_TABLE_MESSAGE,
            json!({ "sqlState": "42S02", "queryId": "q-missing", "errorCode": "002003" }),
        );
    }

    if sql.contains("INFORMATION_SCHEMA.COLUMNS") {
        if database == Some("NO_ACCESS") {
            return failure(
                "002003",
                "SQL compilation error:\nDatabase 'NO_ACCESS' does not exist or not authorized.",
                json!({ "sqlState": "02000", "queryId": "q-catalog" }),
            );
        }
        let rowtype = ["table_schema", "table_name", "column_name", "data_type", "description"]
            .iter()
            .map(|name| column(name, "text"))
            .collect();
        return success(
            "q-catalog",
            rowtype,
            vec![
                vec![json!("ANALYTICS"), json!("EVENTS"), json!("TS"), json!("TIMESTAMP_NTZ"), json!(null)],
                vec![json!("SQLPAD"), json!("ORDERS"), json!("ORDER_ID"), json!("NUMBER"), json!(null)],
                vec![json!("SQLPAD"), json!("TEST"), json!("ID"), json!("NUMBER"), json!(null)],
                vec![json!("SQLPAD"), json!("TEST"), json!("NAME"), json!("TEXT"), json!("display name")],
            ],
        );
    }

    if sql.contains("BIG_TABLE") {
        let chunks: Vec<JsonValue> = (0..CHUNK_COUNT)
            .map(|i| {
                json!({
                    "url": format!("{}/chunks/{}", state.base_url, i),
                    "rowCount": CHUNK_ROWS,
                    "uncompressedSize": 64
                })
            })
            .collect();
        let rowset: Vec<Vec<String>> = (1..=BIG_INLINE_ROWS).map(|i| vec![i.to_string()]).collect();
        let total = BIG_INLINE_ROWS + CHUNK_COUNT * CHUNK_ROWS;
        return Json(json!({
            "success": true,
            "code": null,
            "message": null,
            "data": {
                "queryId": "q-big",
                "rowtype": [column("ID", "fixed")],
                "rowset": rowset,
                "total": total,
                "returned": BIG_INLINE_ROWS,
                "chunks": chunks,
                "chunkHeaders": { (CHUNK_KEY_HEADER): CHUNK_KEY }
            }
        }));
    }

    if sql.contains("BROKEN_CHUNKS") {
        // Chunk key withheld: every download is rejected
        return Json(json!({
            "success": true,
            "code": null,
            "message": null,
            "data": {
                "queryId": "q-broken",
                "rowtype": [column("ID", "fixed")],
                "rowset": [["1"]],
                "total": 1 + CHUNK_ROWS,
                "returned": 1,
                "chunks": [{
                    "url": format!("{}/chunks/0", state.base_url),
                    "rowCount": CHUNK_ROWS
                }]
            }
        }));
    }

    if sql.contains("SYSTEM$WAIT") {
        return in_progress("333334", "q-slow");
    }

    if sql.contains("'later'") {
        return in_progress("333333", "q-later");
    }

    if sql.contains("TEST") {
        return success(
            "q-test",
            vec![column("ID", "fixed"), column("NAME", "text")],
            vec![
                vec![json!("1"), json!("one")],
                vec![json!("2"), json!("two")],
                vec![json!("3"), json!(null)],
            ],
        );
    }

    success("q-one", vec![column("1", "fixed")], vec![vec![json!("1")]])
}
