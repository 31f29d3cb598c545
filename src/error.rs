//! Error types for the Snowflake driver.
//!
//! Every failure surfaced to callers is a [`DriverError`]. Vendor failures keep
//! the original Snowflake diagnostic text verbatim inside a [`VendorError`], so
//! identifiers such as missing object names stay visible in the error's
//! `Display` form, while the vendor code and SQLSTATE remain inspectable as
//! structured fields.

use std::fmt;
use thiserror::Error;

/// Snowflake code for an expired session token.
pub const SESSION_EXPIRED_CODE: &str = "390112";

/// Login rejections: incorrect credentials, locked user, disabled user.
pub const AUTH_FAILURE_CODES: &[&str] = &["390100", "390101", "390102"];

/// Structured diagnostic reported by Snowflake (or by the transport beneath it).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorError {
    /// Vendor message, unmodified.
    pub message: String,
    /// e.g. "002003" for a missing object
    pub code: Option<String>,
    /// e.g. "42S02"
    pub sql_state: Option<String>,
    pub query_id: Option<String>,
}

impl VendorError {
    /// Create a vendor error carrying only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            sql_state: None,
            query_id: None,
        }
    }

    /// Set the vendor error code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Set the SQLSTATE.
    pub fn with_sql_state(mut self, sql_state: impl Into<String>) -> Self {
        self.sql_state = Some(sql_state.into());
        self
    }

    /// Set the query id the failure belongs to.
    pub fn with_query_id(mut self, query_id: impl Into<String>) -> Self {
        self.query_id = Some(query_id.into());
        self
    }

    /// Check whether Snowflake reported the session token as expired.
    pub fn is_session_expired(&self) -> bool {
        self.code.as_deref() == Some(SESSION_EXPIRED_CODE)
    }

    /// Check whether Snowflake rejected the credentials themselves.
    pub fn is_auth_failure(&self) -> bool {
        self.code
            .as_deref()
            .is_some_and(|code| AUTH_FAILURE_CODES.contains(&code))
    }
}

impl fmt::Display for VendorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        match (&self.code, &self.sql_state) {
            (Some(code), Some(state)) => write!(f, " (code: {}, SQLSTATE: {})", code, state),
            (Some(code), None) => write!(f, " (code: {})", code),
            (None, Some(state)) => write!(f, " (SQLSTATE: {})", state),
            (None, None) => Ok(()),
        }
    }
}

impl std::error::Error for VendorError {}

/// Transport failures carry no vendor code; the reqwest text is kept as-is.
impl From<reqwest::Error> for VendorError {
    fn from(err: reqwest::Error) -> Self {
        VendorError::new(err.to_string())
    }
}

impl From<serde_json::Error> for VendorError {
    fn from(err: serde_json::Error) -> Self {
        VendorError::new(format!("Malformed response from Snowflake: {}", err))
    }
}

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("Connection failed: {0}")]
    Connection(VendorError),

    #[error("Query failed: {0}")]
    Query(VendorError),

    #[error("Schema query failed: {0}")]
    Schema(VendorError),

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Timeout: {operation} exceeded {elapsed_secs}s")]
    Timeout {
        operation: String,
        elapsed_secs: u64,
    },
}

impl DriverError {
    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, elapsed_secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    /// Get the underlying vendor diagnostic, if this error came from Snowflake.
    pub fn vendor(&self) -> Option<&VendorError> {
        match self {
            Self::Connection(v) | Self::Query(v) | Self::Schema(v) => Some(v),
            _ => None,
        }
    }

    /// Vendor error code, if reported.
    pub fn code(&self) -> Option<&str> {
        self.vendor().and_then(|v| v.code.as_deref())
    }

    /// SQLSTATE, if reported.
    pub fn sql_state(&self) -> Option<&str> {
        self.vendor().and_then(|v| v.sql_state.as_deref())
    }

    /// Check if this error is worth retrying. The driver itself never retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection(v) => !v.is_auth_failure(),
            Self::Timeout { .. } => true,
            Self::Query(v) | Self::Schema(v) => v.is_session_expired(),
            Self::InvalidConfig { .. } => false,
        }
    }
}

/// Result type alias for driver operations.
pub type DriverResult<T> = Result<T, DriverError>;

/// Result type alias for raw vendor calls, before they are classified.
pub type VendorResult<T> = Result<T, VendorError>;
