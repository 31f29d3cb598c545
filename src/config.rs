//! Command-line configuration for the `snowflake-driver` binary.
//!
//! Every connection field can be given as a flag or through a `SNOWFLAKE_*`
//! environment variable.

use crate::models::{ConnectionConfig, DEFAULT_MAX_ROWS};
use clap::{Parser, Subcommand};

/// Operation to run against the configured connection.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Log in and out without running a statement
    TestConnection,
    /// Run one SQL statement and print the rows as JSON
    Query {
        /// SQL text to execute
        sql: String,
    },
    /// Print the schema, table and column tree as JSON
    Schema,
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TestConnection => write!(f, "test-connection"),
            Self::Query { .. } => write!(f, "query"),
            Self::Schema => write!(f, "schema"),
        }
    }
}

#[derive(Debug, Clone, Parser)]
#[command(
    name = "snowflake-driver",
    about = "Test connections, run capped queries and read schema metadata from Snowflake",
    version,
    author
)]
pub struct Config {
    /// Account identifier (e.g. "xy12345.us-east-1")
    #[arg(long, env = "SNOWFLAKE_ACCOUNT")]
    pub account: String,

    #[arg(short, long, env = "SNOWFLAKE_USERNAME")]
    pub username: String,

    /// Password (prefer the environment variable over the flag)
    #[arg(long, env = "SNOWFLAKE_PASSWORD", hide_env_values = true)]
    pub password: String,

    #[arg(long, env = "SNOWFLAKE_WAREHOUSE")]
    pub warehouse: Option<String>,

    #[arg(long, env = "SNOWFLAKE_DATABASE")]
    pub database: Option<String>,

    #[arg(long, env = "SNOWFLAKE_SCHEMA")]
    pub schema: Option<String>,

    #[arg(long, env = "SNOWFLAKE_ROLE")]
    pub role: Option<String>,

    /// Override the endpoint derived from the account (proxy, private link)
    #[arg(long, env = "SNOWFLAKE_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Maximum number of rows returned by a query
    #[arg(long, default_value_t = DEFAULT_MAX_ROWS, env = "SNOWFLAKE_MAX_ROWS")]
    pub max_rows: u32,

    /// Query timeout in seconds
    #[arg(long, env = "SNOWFLAKE_QUERY_TIMEOUT")]
    pub query_timeout: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", env = "SNOWFLAKE_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "SNOWFLAKE_JSON_LOGS")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Config {
    /// Parse configuration from command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Build the driver-level connection configuration.
    pub fn to_connection_config(&self) -> ConnectionConfig {
        let mut config =
            ConnectionConfig::new(&self.account, &self.username, &self.password)
                .with_max_rows(self.max_rows);
        config.warehouse = self.warehouse.clone();
        config.database = self.database.clone();
        config.schema = self.schema.clone();
        config.role = self.role.clone();
        config.endpoint = self.endpoint.clone();
        config.query_timeout_secs = self.query_timeout;
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let base = [
            "snowflake-driver",
            "--account",
            "xy12345",
            "--username",
            "alice",
            "--password",
            "secret",
        ];
        Config::try_parse_from(base.iter().chain(args.iter())).unwrap()
    }

    #[test]
    fn test_query_subcommand() {
        let config = parse(&["query", "SELECT 1"]);
        assert_eq!(
            config.command,
            Command::Query {
                sql: "SELECT 1".to_string()
            }
        );
        assert_eq!(config.max_rows, DEFAULT_MAX_ROWS);
        assert_eq!(config.command.to_string(), "query");
    }

    #[test]
    fn test_to_connection_config() {
        let config = parse(&[
            "--warehouse",
            "COMPUTE_WH",
            "--database",
            "SQLPAD",
            "--role",
            "ANALYST",
            "--max-rows",
            "50",
            "--query-timeout",
            "10",
            "schema",
        ]);
        let conn = config.to_connection_config();
        assert_eq!(conn.account, "xy12345");
        assert_eq!(conn.username, "alice");
        assert_eq!(conn.password, "secret");
        assert_eq!(conn.warehouse.as_deref(), Some("COMPUTE_WH"));
        assert_eq!(conn.database.as_deref(), Some("SQLPAD"));
        assert_eq!(conn.role.as_deref(), Some("ANALYST"));
        assert_eq!(conn.max_rows, 50);
        assert_eq!(conn.query_timeout_secs, Some(10));
        assert!(conn.validate().is_ok());
    }

    #[test]
    fn test_subcommand_required() {
        let result = Config::try_parse_from([
            "snowflake-driver",
            "--account",
            "a",
            "--username",
            "u",
            "--password",
            "p",
        ]);
        assert!(result.is_err());
    }
}
