use crate::errors::ToolError;
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://localhost:9999/pf-admin-api/v1";
pub const DEFAULT_USERNAME: &str = "Administrator";
pub const DEFAULT_PASSWORD: &str = "2FederateM0re";
pub const DEFAULT_TIMEOUT_SECS: f64 = 30.0;

/// Immutable endpoint configuration, built once at startup from the
/// environment. The gateway reads it by `Arc`; nothing mutates it afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub verify_tls: bool,
    pub timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ToolError> {
        let base_url = normalize_base_url(
            &std::env::var("PF_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
        )?;
        let username =
            std::env::var("PF_USERNAME").unwrap_or_else(|_| DEFAULT_USERNAME.to_string());
        let password =
            std::env::var("PF_PASSWORD").unwrap_or_else(|_| DEFAULT_PASSWORD.to_string());
        // Skipping certificate validation is security relevant, so the flag is
        // explicit and defaults to off only because local instances ship with
        // self-signed certificates.
        let verify_tls = env_flag("PF_VERIFY_TLS", false);
        let timeout = parse_timeout(std::env::var("PF_TIMEOUT").ok().as_deref())?;

        Ok(Self {
            base_url,
            username,
            password,
            verify_tls,
            timeout,
        })
    }
}

/// Parse boolean-ish environment variables. Recognized falsy tokens:
/// "0", "false", "no", "off", "". Anything else is truthy.
pub fn env_flag(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(raw) => parse_flag(&raw),
        Err(_) => default,
    }
}

pub fn parse_flag(raw: &str) -> bool {
    !matches!(
        raw.trim().to_lowercase().as_str(),
        "0" | "false" | "no" | "off" | ""
    )
}

fn parse_timeout(raw: Option<&str>) -> Result<Duration, ToolError> {
    let raw = match raw {
        Some(raw) => raw.trim().to_string(),
        None => return Ok(Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS)),
    };
    let seconds: f64 = raw.parse().map_err(|_| {
        ToolError::invalid_params(format!("PF_TIMEOUT must be a number of seconds, got '{}'", raw))
    })?;
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(ToolError::invalid_params(format!(
            "PF_TIMEOUT must be a positive number of seconds, got '{}'",
            raw
        )));
    }
    Ok(Duration::from_secs_f64(seconds))
}

fn normalize_base_url(raw: &str) -> Result<String, ToolError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ToolError::invalid_params("PF_BASE_URL must not be empty"));
    }
    let url = Url::parse(raw).map_err(|_| {
        ToolError::invalid_params("Invalid PF_BASE_URL")
            .with_hint("Expected a valid URL, e.g. \"https://localhost:9999/pf-admin-api/v1\".")
            .with_details(serde_json::json!({ "base_url": raw }))
    })?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ToolError::invalid_params(format!(
            "PF_BASE_URL must use http or https, got '{}'",
            url.scheme()
        )));
    }
    Ok(raw.trim_end_matches('/').to_string())
}
