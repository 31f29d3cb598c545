//! HTTP client for the Snowflake session and query endpoints.
//!
//! Every response from Snowflake uses the same envelope:
//! `{ "success": bool, "code": "...", "message": "...", "data": {...} }`.
//! A `success: false` envelope becomes a [`VendorError`] that carries the
//! message verbatim together with the code, SQLSTATE and query id.

use crate::error::{VendorError, VendorResult};
use crate::models::ConnectionConfig;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, trace};
use url::Url;
use uuid::Uuid;

pub const CLIENT_APP_ID: &str = "snowflake-driver-rs";

const LOGIN_PATH: &str = "session/v1/login-request";
const QUERY_PATH: &str = "queries/v1/query-request";
const SESSION_PATH: &str = "session";

const SNOWFLAKE_ACCEPT: &str = "application/snowflake";

/// Query still running; poll `getResultUrl`.
const QUERY_IN_PROGRESS_CODE: &str = "333333";
const QUERY_IN_PROGRESS_ASYNC_CODE: &str = "333334";
const POLL_INTERVAL: Duration = Duration::from_millis(500);

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    code: Option<JsonValue>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<JsonValue>,
}

impl Envelope {
    /// Snowflake sends codes as strings, but older endpoints use numbers.
    fn code(&self) -> Option<String> {
        match &self.code {
            Some(JsonValue::String(s)) => Some(s.clone()),
            Some(JsonValue::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }

    fn is_in_progress(&self) -> bool {
        matches!(
            self.code().as_deref(),
            Some(QUERY_IN_PROGRESS_CODE) | Some(QUERY_IN_PROGRESS_ASYNC_CODE)
        )
    }

    fn data_str(&self, key: &str) -> Option<String> {
        self.data
            .as_ref()
            .and_then(|d| d.get(key))
            .and_then(JsonValue::as_str)
            .map(String::from)
    }

    fn into_error(self) -> VendorError {
        let mut err = VendorError::new(
            self.message
                .clone()
                .unwrap_or_else(|| "Snowflake reported a failure without a message".to_string()),
        );
        err.code = self.code();
        err.sql_state = self.data_str("sqlState");
        err.query_id = self.data_str("queryId");
        err
    }

    fn into_data<T: DeserializeOwned>(self) -> VendorResult<T> {
        if !self.success {
            return Err(self.into_error());
        }
        let data = self.data.unwrap_or(JsonValue::Null);
        Ok(serde_json::from_value(data)?)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct LoginRequestData<'a> {
    client_app_id: &'a str,
    client_app_version: &'a str,
    account_name: &'a str,
    login_name: &'a str,
    password: &'a str,
    client_environment: HashMap<&'static str, &'a str>,
    session_parameters: HashMap<&'static str, JsonValue>,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    data: LoginRequestData<'a>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub database_name: Option<String>,
    pub schema_name: Option<String>,
    pub warehouse_name: Option<String>,
    pub role_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
    pub token: String,
    #[serde(default)]
    pub session_info: SessionInfo,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    sql_text: &'a str,
    async_exec: bool,
    sequence_id: u64,
    query_submission_time: u128,
}

/// Column description from `data.rowtype`.
#[derive(Debug, Clone, Deserialize)]
pub struct RowType {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub scale: Option<i64>,
    #[serde(default)]
    pub precision: Option<i64>,
}

/// Remote result chunk from `data.chunks`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkInfo {
    pub url: String,
    pub row_count: u64,
    #[serde(default)]
    pub uncompressed_size: Option<u64>,
}

/// Successful query response payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryData {
    #[serde(default)]
    pub rowtype: Vec<RowType>,
    /// Inline rows; cells are strings or null
    #[serde(default)]
    pub rowset: Vec<Vec<JsonValue>>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub returned: Option<u64>,
    #[serde(default)]
    pub query_id: Option<String>,
    #[serde(default)]
    pub chunks: Vec<ChunkInfo>,
    #[serde(default)]
    pub chunk_headers: HashMap<String, String>,
    /// Key for server-side encrypted chunks when no chunk headers are sent
    #[serde(default)]
    pub qrmk: Option<String>,
}

impl QueryData {
    /// Headers required to download this result's chunks.
    pub fn chunk_request_headers(&self) -> VendorResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        if !self.chunk_headers.is_empty() {
            for (name, value) in &self.chunk_headers {
                headers.insert(header_name(name)?, header_value(value)?);
            }
        } else if let Some(qrmk) = &self.qrmk {
            headers.insert(
                HeaderName::from_static("x-amz-server-side-encryption-customer-algorithm"),
                HeaderValue::from_static("AES256"),
            );
            headers.insert(
                HeaderName::from_static("x-amz-server-side-encryption-customer-key"),
                header_value(qrmk)?,
            );
        }
        Ok(headers)
    }
}

fn header_name(name: &str) -> VendorResult<HeaderName> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| VendorError::new(format!("Invalid chunk header name '{}': {}", name, e)))
}

fn header_value(value: &str) -> VendorResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| VendorError::new(format!("Invalid chunk header value: {}", e)))
}

// =============================================================================
// Client
// =============================================================================

/// Thin client over one Snowflake endpoint. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SnowflakeClient {
    http: reqwest::Client,
    base_url: Url,
}

impl SnowflakeClient {
    /// Create a client for the given base URL.
    pub fn new(http: reqwest::Client, mut base_url: Url) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve an endpoint path under the base URL. Server-sent paths such as
    /// `getResultUrl` start with `/`; they stay relative to any proxy prefix.
    fn endpoint(&self, path: &str) -> VendorResult<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| VendorError::new(format!("Invalid endpoint path '{}': {}", path, e)))
    }

    fn auth_header(token: &str) -> VendorResult<HeaderValue> {
        header_value(&format!("Snowflake Token=\"{}\"", token))
    }

    /// Send a request and parse the response envelope.
    async fn send(&self, request: reqwest::RequestBuilder) -> VendorResult<Envelope> {
        let response = request.header(ACCEPT, SNOWFLAKE_ACCEPT).send().await?;
        let status = response.status();
        let text = response.text().await?;
        trace!(status = %status, body_len = text.len(), "Snowflake response");

        match serde_json::from_str::<Envelope>(&text) {
            Ok(envelope) => Ok(envelope),
            Err(_) if !status.is_success() => {
                Err(VendorError::new(format!("HTTP {}: {}", status, text.trim())))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Authenticate and open a session.
    pub async fn login(&self, config: &ConnectionConfig) -> VendorResult<LoginData> {
        let url = self.endpoint(LOGIN_PATH)?;

        let mut params: Vec<(&str, String)> = vec![("request_id", Uuid::new_v4().to_string())];
        if let Some(warehouse) = &config.warehouse {
            params.push(("warehouse", warehouse.clone()));
        }
        if let Some(database) = &config.database {
            params.push(("databaseName", database.clone()));
        }
        if let Some(schema) = &config.schema {
            params.push(("schemaName", schema.clone()));
        }
        if let Some(role) = &config.role {
            params.push(("roleName", role.clone()));
        }

        // Account locator without region/cloud suffix
        let account_name = config.account.split('.').next().unwrap_or(&config.account);

        let body = LoginRequest {
            data: LoginRequestData {
                client_app_id: CLIENT_APP_ID,
                client_app_version: env!("CARGO_PKG_VERSION"),
                account_name,
                login_name: &config.username,
                password: &config.password,
                client_environment: HashMap::from([
                    ("APPLICATION", config.name.as_str()),
                    ("OS", std::env::consts::OS),
                ]),
                session_parameters: HashMap::from([(
                    "QUERY_RESULT_FORMAT",
                    JsonValue::from("JSON"),
                )]),
            },
        };

        debug!(
            account = %config.account,
            username = %config.username,
            warehouse = ?config.warehouse,
            database = ?config.database,
            "Logging in to Snowflake"
        );

        let request = self
            .http
            .post(url)
            .query(&params)
            .timeout(config.login_timeout())
            .json(&body);
        self.send(request).await?.into_data()
    }

    /// Execute a statement, polling until the result is available.
    ///
    /// Polling has no upper bound of its own: a statement that never finishes
    /// is polled until the caller drops the future (see
    /// `ConnectionConfig::with_query_timeout`).
    pub async fn query(&self, token: &str, sql: &str, sequence_id: u64) -> VendorResult<QueryData> {
        let mut url = self.endpoint(QUERY_PATH)?;
        url.query_pairs_mut()
            .append_pair("requestId", &Uuid::new_v4().to_string());

        let submitted = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let body = QueryRequest {
            sql_text: sql,
            async_exec: false,
            sequence_id,
            query_submission_time: submitted,
        };

        let request = self
            .http
            .post(url)
            .header(AUTHORIZATION, Self::auth_header(token)?)
            .json(&body);
        let mut envelope = self.send(request).await?;

        while envelope.is_in_progress() {
            let Some(result_url) = envelope.data_str("getResultUrl") else {
                return Err(envelope.into_error());
            };
            debug!(query_id = ?envelope.data_str("queryId"), "Query in progress, polling");
            tokio::time::sleep(POLL_INTERVAL).await;

            let request = self
                .http
                .get(self.endpoint(&result_url)?)
                .header(AUTHORIZATION, Self::auth_header(token)?);
            envelope = self.send(request).await?;
        }

        envelope.into_data()
    }

    /// Download one result chunk. The body is a comma-separated list of row arrays.
    pub async fn fetch_chunk(
        &self,
        chunk: &ChunkInfo,
        headers: &HeaderMap,
    ) -> VendorResult<Vec<Vec<JsonValue>>> {
        debug!(
            row_count = chunk.row_count,
            uncompressed_size = ?chunk.uncompressed_size,
            "Downloading result chunk"
        );

        let response = self
            .http
            .get(&chunk.url)
            .headers(headers.clone())
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(VendorError::new(format!(
                "Result chunk download failed with HTTP {}: {}",
                status,
                text.trim()
            )));
        }

        parse_chunk_body(&text)
    }

    /// Close a session.
    pub async fn logout(&self, token: &str) -> VendorResult<()> {
        let mut url = self.endpoint(SESSION_PATH)?;
        url.query_pairs_mut().append_pair("delete", "true");

        let request = self
            .http
            .post(url)
            .header(AUTHORIZATION, Self::auth_header(token)?);
        let envelope = self.send(request).await?;
        if envelope.success {
            Ok(())
        } else {
            Err(envelope.into_error())
        }
    }
}

/// Parse a chunk body (`[..],[..]`) into rows.
pub fn parse_chunk_body(body: &str) -> VendorResult<Vec<Vec<JsonValue>>> {
    let trimmed = body.trim().trim_end_matches(',');
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(&format!("[{}]", trimmed))?)
}
