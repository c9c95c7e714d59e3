use std::{net::SocketAddr, time::Duration};

use crate::error::ConfigError;

pub const DEFAULT_GEMINI_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent";
pub const DEFAULT_PROXY_ADDR: &str = "0.0.0.0:8888";
pub const DEFAULT_QUESTIONS_URL: &str =
    "http://localhost:8888/.netlify/functions/generate-questions";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Settings of the `generate-questions` proxy.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub api_key: String,
    pub listen_addr: SocketAddr,
    pub gemini_url: String,
    pub request_timeout: Duration,
}

impl ProxyConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_key = lookup("API_KEY")
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::Missing("API_KEY"))?;

        let addr = lookup("PROXY_ADDR").unwrap_or_else(|| DEFAULT_PROXY_ADDR.to_string());
        let listen_addr = match addr.parse::<SocketAddr>() {
            Ok(listen_addr) => listen_addr,
            Err(e) => {
                return Err(ConfigError::Invalid {
                    name: "PROXY_ADDR",
                    value: addr,
                    reason: e.to_string(),
                })
            }
        };

        Ok(Self {
            api_key,
            listen_addr,
            gemini_url: lookup("GEMINI_URL").unwrap_or_else(|| DEFAULT_GEMINI_URL.to_string()),
            request_timeout: timeout(&lookup)?,
        })
    }
}

/// Settings of the quiz bot. The Telegram token itself is read by teloxide.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub questions_url: String,
    pub request_timeout: Duration,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            questions_url: lookup("QUESTIONS_URL")
                .unwrap_or_else(|| DEFAULT_QUESTIONS_URL.to_string()),
            request_timeout: timeout(&lookup)?,
        })
    }
}

fn timeout(lookup: &impl Fn(&str) -> Option<String>) -> Result<Duration, ConfigError> {
    let Some(raw) = lookup("REQUEST_TIMEOUT_SECS") else {
        return Ok(Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    };
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::Invalid {
            name: "REQUEST_TIMEOUT_SECS",
            value: raw,
            reason: "must be at least 1".to_string(),
        }),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(e) => Err(ConfigError::Invalid {
            name: "REQUEST_TIMEOUT_SECS",
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn proxy_requires_api_key() {
        let err = ProxyConfig::from_lookup(env(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("API_KEY")));

        let err = ProxyConfig::from_lookup(env(&[("API_KEY", "")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("API_KEY")));
    }

    #[test]
    fn proxy_defaults() {
        let config = ProxyConfig::from_lookup(env(&[("API_KEY", "secret")])).unwrap();
        assert_eq!(config.api_key, "secret");
        assert_eq!(config.listen_addr, "0.0.0.0:8888".parse().unwrap());
        assert_eq!(config.gemini_url, DEFAULT_GEMINI_URL);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn proxy_overrides() {
        let config = ProxyConfig::from_lookup(env(&[
            ("API_KEY", "secret"),
            ("PROXY_ADDR", "127.0.0.1:9000"),
            ("GEMINI_URL", "http://localhost:1234/generate"),
            ("REQUEST_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.gemini_url, "http://localhost:1234/generate");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn bad_values_name_the_variable() {
        let err = ProxyConfig::from_lookup(env(&[("API_KEY", "k"), ("PROXY_ADDR", "nowhere")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PROXY_ADDR", .. }));

        let err = BotConfig::from_lookup(env(&[("REQUEST_TIMEOUT_SECS", "soon")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "REQUEST_TIMEOUT_SECS", .. }));

        let err = BotConfig::from_lookup(env(&[("REQUEST_TIMEOUT_SECS", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "REQUEST_TIMEOUT_SECS", .. }));
    }

    #[test]
    fn bot_defaults_to_local_proxy() {
        let config = BotConfig::from_lookup(env(&[])).unwrap();
        assert_eq!(config.questions_url, DEFAULT_QUESTIONS_URL);
    }
}
