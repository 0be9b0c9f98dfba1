use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const API_URL_ENV: &str = "CHATDESK_API_URL";
pub const BUCKET_ENV: &str = "CHATDESK_BUCKET";

fn default_api_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_user_bucket() -> String {
    "default".to_string()
}

fn default_stream_idle_timeout_secs() -> u64 {
    120
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_deploy_poll_interval_ms() -> u64 {
    5_000
}

fn default_playback_step_delay_ms() -> u64 {
    1_000
}

fn default_temperature() -> f32 {
    1.0
}

fn default_recent_models_limit() -> usize {
    5
}

fn default_model_id() -> String {
    "gpt-4".to_string()
}

/// Static configuration of the core: backend location and timing knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Bucket of the signed-in user; own entities live under it.
    #[serde(default = "default_user_bucket")]
    pub user_bucket: String,
    #[serde(default = "default_stream_idle_timeout_secs")]
    pub stream_idle_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_deploy_poll_interval_ms")]
    pub deploy_poll_interval_ms: u64,
    /// Give up polling a deployment after this many attempts. Unlimited when unset.
    #[serde(default)]
    pub max_poll_attempts: Option<u32>,
    #[serde(default = "default_playback_step_delay_ms")]
    pub playback_step_delay_ms: u64,
    /// Sent when the model does not accept a temperature.
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,
    #[serde(default = "default_recent_models_limit")]
    pub recent_models_limit: usize,
    #[serde(default = "default_model_id")]
    pub default_model_id: String,
}

impl AppConfig {
    pub fn new(api_base_url: impl Into<String>, user_bucket: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            user_bucket: user_bucket.into(),
            ..Self::default()
        }
    }

    pub fn stream_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.stream_idle_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn deploy_poll_interval(&self) -> Duration {
        Duration::from_millis(self.deploy_poll_interval_ms)
    }

    pub fn playback_step_delay(&self) -> Duration {
        Duration::from_millis(self.playback_step_delay_ms)
    }

    /// Apply `CHATDESK_API_URL` / `CHATDESK_BUCKET` style overrides from `lookup`.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(API_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.api_base_url = url;
        }
        if let Some(bucket) = lookup(BUCKET_ENV).filter(|v| !v.trim().is_empty()) {
            self.user_bucket = bucket;
        }
        self
    }

    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            user_bucket: default_user_bucket(),
            stream_idle_timeout_secs: default_stream_idle_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            deploy_poll_interval_ms: default_deploy_poll_interval_ms(),
            max_poll_attempts: None,
            playback_step_delay_ms: default_playback_step_delay_ms(),
            default_temperature: default_temperature(),
            recent_models_limit: default_recent_models_limit(),
            default_model_id: default_model_id(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"user_bucket":"abc"}"#).unwrap();
        assert_eq!(config.user_bucket, "abc");
        assert_eq!(config.stream_idle_timeout(), Duration::from_secs(120));
        assert_eq!(config.deploy_poll_interval(), Duration::from_secs(5));
        assert_eq!(config.playback_step_delay(), Duration::from_secs(1));
        assert_eq!(config.max_poll_attempts, None);
    }

    #[test]
    fn test_overrides_replace_non_empty_values() {
        let config = AppConfig::default().with_overrides(|key| match key {
            API_URL_ENV => Some("https://chat.example.com".into()),
            BUCKET_ENV => Some("  ".into()),
            _ => None,
        });
        assert_eq!(config.api_base_url, "https://chat.example.com");
        assert_eq!(config.user_bucket, "default");
    }
}
