use std::str::FromStr;
use std::time::Duration;

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines (default).
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}' (expected 'text' or 'json')")),
        }
    }
}

/// Headroom above the worst-case run for store writes and serialization.
pub const REQUEST_TIMEOUT_SLACK_SECS: u64 = 30;

/// Default request timeout for a pipeline whose slowest run takes
/// `run_budget`.
pub fn default_request_timeout_secs(run_budget: Duration) -> u64 {
    run_budget.as_secs_f64().ceil() as u64 + REQUEST_TIMEOUT_SLACK_SECS
}

/// Server configuration loaded from environment variables.
///
/// All fields except `database_url` have defaults suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// HTTP request timeout in seconds. Defaults to the worst-case pipeline
    /// run plus [`REQUEST_TIMEOUT_SLACK_SECS`], so the timeout layer never
    /// answers while provider retries are still in flight.
    pub request_timeout_secs: u64,
    /// Upper bound on post-shutdown cleanup in seconds (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Postgres connection string.
    pub database_url: String,
    pub log_format: LogFormat,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    /// `run_budget` is the longest a pipeline run can take (see
    /// `PipelineOrchestrator::worst_case_run`).
    ///
    /// | Env Var                 | Default    |
    /// |-------------------------|------------|
    /// | `HOST`                  | `0.0.0.0`  |
    /// | `PORT`                  | `3000`     |
    /// | `REQUEST_TIMEOUT_SECS`  | (derived)  |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `30`       |
    /// | `DATABASE_URL`          | (required) |
    /// | `LOG_FORMAT`            | `text`     |
    pub fn from_env(run_budget: Duration) -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .map(|v| v.parse().expect("REQUEST_TIMEOUT_SECS must be a valid u64"))
            .unwrap_or_else(|_| default_request_timeout_secs(run_budget));

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let log_format: LogFormat = std::env::var("LOG_FORMAT")
            .unwrap_or_default()
            .parse()
            .unwrap_or_else(|e| panic!("LOG_FORMAT is invalid: {e}"));

        Self {
            host,
            port,
            request_timeout_secs,
            shutdown_timeout_secs,
            database_url,
            log_format,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_parses_case_insensitively() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("text".parse::<LogFormat>(), Ok(LogFormat::Text));
    }

    #[test]
    fn empty_log_format_is_text() {
        assert_eq!("".parse::<LogFormat>(), Ok(LogFormat::Text));
    }

    #[test]
    fn default_request_timeout_outlasts_the_run_budget() {
        let budget = Duration::from_millis(1_084_500);
        let secs = default_request_timeout_secs(budget);
        assert!(Duration::from_secs(secs) > budget);
        assert_eq!(secs, 1_085 + REQUEST_TIMEOUT_SLACK_SECS);
    }

    #[test]
    fn unknown_log_format_is_rejected() {
        assert!("yaml".parse::<LogFormat>().is_err());
    }
}
