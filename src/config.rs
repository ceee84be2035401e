use std::env;
use std::time::Duration;

use anyhow::{Context, anyhow};
use chrono_tz::Tz;

#[derive(Clone, Debug)]
pub struct Config {
    pub api_base_url: String,
    pub api_timeout: Duration,
    pub bind_addr: String,
    pub business_timezone: Tz,
    pub success_close_delay: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let api_base_url = lookup("API_BASE_URL")
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| anyhow!("API_BASE_URL must be set"))?;
        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| "127.0.0.1:8080".to_string());
        let api_timeout_ms = lookup("API_TIMEOUT_MS")
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(15_000);
        let success_close_delay_ms = lookup("SUCCESS_CLOSE_DELAY_MS")
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(1_500);
        let tz_name = lookup("BUSINESS_TIMEZONE").unwrap_or_else(|| "America/Sao_Paulo".to_string());
        let business_timezone = tz_name
            .parse::<Tz>()
            .map_err(|e| anyhow!("{e}"))
            .with_context(|| format!("BUSINESS_TIMEZONE `{tz_name}` is not an IANA zone"))?;

        Ok(Self {
            api_base_url,
            api_timeout: Duration::from_millis(api_timeout_ms),
            bind_addr,
            business_timezone,
            success_close_delay: Duration::from_millis(success_close_delay_ms),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply() {
        let cfg = Config::from_lookup(lookup(&[("API_BASE_URL", "http://localhost:3010")])).unwrap();
        assert_eq!(cfg.bind_addr, "127.0.0.1:8080");
        assert_eq!(cfg.api_timeout, Duration::from_millis(15_000));
        assert_eq!(cfg.success_close_delay, Duration::from_millis(1_500));
        assert_eq!(cfg.business_timezone, chrono_tz::America::Sao_Paulo);
    }

    #[test]
    fn base_url_is_required() {
        assert!(Config::from_lookup(lookup(&[])).is_err());
    }

    #[test]
    fn unknown_timezone_is_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("API_BASE_URL", "http://localhost:3010"),
            ("BUSINESS_TIMEZONE", "Mars/Olympus"),
        ]));
        assert!(err.is_err());
    }
}
