use crate::error::{AssistantError, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";
pub const DEFAULT_PIPELINE_TIMEOUT_SECS: u64 = 30;

/// Values that are clearly not a real API key.
const PLACEHOLDER_KEYS: &[&str] = &[
    "default-key",
    "dummy-api-key",
    "your-api-key",
    "your_api_key",
    "sk-...",
    "sk-xxx",
    "changeme",
    "placeholder",
];

/// Command-line values that win over the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub bind_addr: Option<String>,
    pub history_log: Option<PathBuf>,
    pub pipeline_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub bind_addr: String,
    pub history_log: Option<PathBuf>,
    pub pipeline_timeout: Duration,
}

impl AppConfig {
    /// Build from overrides and the process environment (`.env` already loaded).
    pub fn load(overrides: ConfigOverrides) -> Result<Self> {
        Self::resolve(overrides, |key| std::env::var(key).ok())
    }

    /// Build from overrides and an arbitrary variable lookup.
    ///
    /// Fails with `MissingCredential` before anything else is checked.
    pub fn resolve(
        overrides: ConfigOverrides,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let api_key = validate_credential(
            overrides
                .api_key
                .or_else(|| lookup("OPENAI_API_KEY"))
                .as_deref(),
        )?;

        let pipeline_timeout_secs = match overrides.pipeline_timeout_secs {
            Some(secs) => secs,
            None => match lookup("CDP_PIPELINE_TIMEOUT_SECS") {
                Some(raw) => raw.trim().parse().map_err(|_| {
                    AssistantError::Config(format!(
                        "CDP_PIPELINE_TIMEOUT_SECS is not a number: {}",
                        raw
                    ))
                })?,
                None => DEFAULT_PIPELINE_TIMEOUT_SECS,
            },
        };
        if pipeline_timeout_secs == 0 {
            return Err(AssistantError::Config(
                "pipeline timeout must be at least 1 second".to_string(),
            ));
        }

        Ok(Self {
            api_key,
            model: overrides
                .model
                .or_else(|| lookup("OPENAI_MODEL"))
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: overrides
                .base_url
                .or_else(|| lookup("OPENAI_BASE_URL"))
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            bind_addr: overrides
                .bind_addr
                .or_else(|| lookup("CDP_BIND_ADDR"))
                .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            history_log: overrides.history_log.or_else(|| {
                lookup("CDP_HISTORY_LOG")
                    .filter(|p| !p.trim().is_empty())
                    .map(PathBuf::from)
            }),
            pipeline_timeout: Duration::from_secs(pipeline_timeout_secs),
        })
    }
}

/// Reject an absent, empty, or placeholder API key.
pub fn validate_credential(api_key: Option<&str>) -> Result<String> {
    let key = match api_key.map(str::trim) {
        Some(key) if !key.is_empty() => key,
        _ => {
            return Err(AssistantError::MissingCredential(
                "OPENAI_API_KEY is not set. Export it or add it to .env before starting the server"
                    .to_string(),
            ))
        }
    };

    let lowered = key.to_lowercase();
    let is_placeholder = PLACEHOLDER_KEYS.contains(&lowered.as_str())
        || lowered.starts_with("your")
        || (lowered.starts_with('<') && lowered.ends_with('>'));
    if is_placeholder {
        return Err(AssistantError::MissingCredential(format!(
            "OPENAI_API_KEY looks like a placeholder ({}). Set a real API key",
            key
        )));
    }

    Ok(key.to_string())
}
