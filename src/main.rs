//! Snowflake Driver - command-line entry point.
//!
//! Runs one driver operation against the configured connection and prints
//! the result as JSON on stdout. Logs go to stderr.

use snowflake_driver::config::{Command, Config};
use snowflake_driver::{Driver, SnowflakeDriver};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse_args();
    init_tracing(&config);

    let connection = config.to_connection_config();
    let driver = SnowflakeDriver::new();

    info!(
        command = %config.command,
        account = %connection.account,
        "Starting snowflake-driver v{}",
        env!("CARGO_PKG_VERSION")
    );

    let output = match &config.command {
        Command::TestConnection => driver
            .test_connection(&connection)
            .await
            .map(|()| serde_json::json!({ "ok": true })),
        Command::Query { sql } => driver
            .run_query(sql, &connection)
            .await
            .map(|result| serde_json::json!(result)),
        Command::Schema => driver
            .get_schema(&connection)
            .await
            .map(|schema| serde_json::json!(schema)),
    };

    match output {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Driver call failed");
            Err(e.into())
        }
    }
}
