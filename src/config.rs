// src/config.rs
//! Environment-driven runtime configuration. Everything optional degrades:
//! no Gemini key means the mock classifier serves every request, no auth
//! service means the auth endpoints answer with a friendly refusal.

use std::time::Duration;

use tracing::{info, warn};

pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_GEMINI_MODEL: &str = "GEMINI_MODEL";
pub const ENV_GEMINI_BASE_URL: &str = "GEMINI_BASE_URL";
pub const ENV_GEMINI_TIMEOUT_SECS: &str = "GEMINI_TIMEOUT_SECS";
pub const ENV_AI_TEST_MODE: &str = "AI_TEST_MODE";
pub const ENV_AUTH_SERVICE_URL: &str = "AUTH_SERVICE_URL";
pub const ENV_AUTH_SERVICE_KEY: &str = "AUTH_SERVICE_KEY";

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_TIMEOUT_SECS: u64 = 30;

/// Gemini gateway settings. Present only when an API key is configured.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

/// Upstream auth service settings (URL plus the service key sent as
/// `apikey`).
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub base_url: String,
    pub service_key: String,
}

#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub gemini: Option<GeminiConfig>,
    /// `AI_TEST_MODE=mock` pins every analysis to the mock classifier even
    /// when a key is present.
    pub force_mock: bool,
    pub auth: Option<AuthConfig>,
}

impl AppConfig {
    /// Read the whole configuration from the process environment. Values are
    /// summarized to the log without ever echoing a secret.
    pub fn from_env() -> Self {
        let force_mock = std::env::var(ENV_AI_TEST_MODE)
            .map(|v| v.trim() == "mock")
            .unwrap_or(false);

        let gemini = env_nonempty(ENV_GEMINI_API_KEY).map(|api_key| {
            let model =
                env_nonempty(ENV_GEMINI_MODEL).unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());
            let base_url = env_nonempty(ENV_GEMINI_BASE_URL)
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string());
            let timeout = Duration::from_secs(timeout_secs_from_env());
            info!(
                model = %model,
                timeout_s = timeout.as_secs(),
                key_len = api_key.len(),
                "gemini gateway configured"
            );
            GeminiConfig {
                api_key,
                model,
                base_url,
                timeout,
            }
        });
        if gemini.is_none() {
            info!("no GEMINI_API_KEY, analyses will use the mock classifier");
        }
        if force_mock {
            info!("AI_TEST_MODE=mock, gateway disabled for this process");
        }

        let auth = match (
            env_nonempty(ENV_AUTH_SERVICE_URL),
            env_nonempty(ENV_AUTH_SERVICE_KEY),
        ) {
            (Some(base_url), Some(service_key)) => Some(AuthConfig {
                base_url,
                service_key,
            }),
            (Some(_), None) => {
                warn!("AUTH_SERVICE_URL set without AUTH_SERVICE_KEY, auth endpoints disabled");
                None
            }
            _ => None,
        };

        Self {
            gemini,
            force_mock,
            auth,
        }
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Timeout with a sanity clamp; nonsense values fall back to the default.
fn timeout_secs_from_env() -> u64 {
    match std::env::var(ENV_GEMINI_TIMEOUT_SECS) {
        Ok(raw) => match raw.trim().parse::<u64>() {
            Ok(secs) if (1..=300).contains(&secs) => secs,
            _ => {
                warn!(
                    value = %raw,
                    default = DEFAULT_GEMINI_TIMEOUT_SECS,
                    "ignoring invalid GEMINI_TIMEOUT_SECS"
                );
                DEFAULT_GEMINI_TIMEOUT_SECS
            }
        },
        Err(_) => DEFAULT_GEMINI_TIMEOUT_SECS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    /// Restores the previous value on drop so tests do not leak environment
    /// state into each other.
    struct EnvVarGuard {
        key: &'static str,
        prev: Option<String>,
    }

    impl EnvVarGuard {
        fn set(key: &'static str, value: &str) -> Self {
            let prev = env::var(key).ok();
            env::set_var(key, value);
            Self { key, prev }
        }

        fn unset(key: &'static str) -> Self {
            let prev = env::var(key).ok();
            env::remove_var(key);
            Self { key, prev }
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            match &self.prev {
                Some(v) => env::set_var(self.key, v),
                None => env::remove_var(self.key),
            }
        }
    }

    #[test]
    #[serial]
    fn missing_key_disables_the_gateway() {
        let _k = EnvVarGuard::unset(ENV_GEMINI_API_KEY);
        let _m = EnvVarGuard::unset(ENV_AI_TEST_MODE);
        let cfg = AppConfig::from_env();
        assert!(cfg.gemini.is_none());
        assert!(!cfg.force_mock);
    }

    #[test]
    #[serial]
    fn blank_key_counts_as_missing() {
        let _k = EnvVarGuard::set(ENV_GEMINI_API_KEY, "   ");
        let cfg = AppConfig::from_env();
        assert!(cfg.gemini.is_none());
    }

    #[test]
    #[serial]
    fn configured_gateway_uses_defaults_for_the_rest() {
        let _k = EnvVarGuard::set(ENV_GEMINI_API_KEY, "test-key");
        let _m = EnvVarGuard::unset(ENV_GEMINI_MODEL);
        let _u = EnvVarGuard::unset(ENV_GEMINI_BASE_URL);
        let _t = EnvVarGuard::unset(ENV_GEMINI_TIMEOUT_SECS);
        let cfg = AppConfig::from_env();
        let gemini = cfg.gemini.unwrap();
        assert_eq!(gemini.api_key, "test-key");
        assert_eq!(gemini.model, DEFAULT_GEMINI_MODEL);
        assert_eq!(gemini.base_url, DEFAULT_GEMINI_BASE_URL);
        assert_eq!(gemini.timeout, Duration::from_secs(DEFAULT_GEMINI_TIMEOUT_SECS));
    }

    #[test]
    #[serial]
    fn timeout_rejects_nonsense_values() {
        let _k = EnvVarGuard::set(ENV_GEMINI_API_KEY, "test-key");
        let _t = EnvVarGuard::set(ENV_GEMINI_TIMEOUT_SECS, "zero");
        assert_eq!(
            AppConfig::from_env().gemini.unwrap().timeout,
            Duration::from_secs(DEFAULT_GEMINI_TIMEOUT_SECS)
        );

        let _t = EnvVarGuard::set(ENV_GEMINI_TIMEOUT_SECS, "0");
        assert_eq!(
            AppConfig::from_env().gemini.unwrap().timeout,
            Duration::from_secs(DEFAULT_GEMINI_TIMEOUT_SECS)
        );

        let _t = EnvVarGuard::set(ENV_GEMINI_TIMEOUT_SECS, "45");
        assert_eq!(
            AppConfig::from_env().gemini.unwrap().timeout,
            Duration::from_secs(45)
        );
    }

    #[test]
    #[serial]
    fn mock_mode_is_an_exact_match() {
        let _m = EnvVarGuard::set(ENV_AI_TEST_MODE, "mock");
        assert!(AppConfig::from_env().force_mock);

        let _m = EnvVarGuard::set(ENV_AI_TEST_MODE, "MOCK");
        assert!(!AppConfig::from_env().force_mock);
    }

    #[test]
    #[serial]
    fn auth_needs_both_url_and_key() {
        let _u = EnvVarGuard::set(ENV_AUTH_SERVICE_URL, "http://auth.local");
        let _k = EnvVarGuard::unset(ENV_AUTH_SERVICE_KEY);
        assert!(AppConfig::from_env().auth.is_none());

        let _k = EnvVarGuard::set(ENV_AUTH_SERVICE_KEY, "svc-key");
        let auth = AppConfig::from_env().auth.unwrap();
        assert_eq!(auth.base_url, "http://auth.local");
        assert_eq!(auth.service_key, "svc-key");
    }
}
