use std::time::Duration;

use anyhow::Result;

use crate::error::HunterError;

const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_APIFY_ACTOR: &str = "compass~crawler-google-places";
const DEFAULT_LANGUAGE: &str = "es";
const DEFAULT_INTERVAL_SECS: u64 = 3600;

/// Where campaigns and prospects live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    /// Supabase / PostgREST over HTTP.
    Postgrest { url: String, key: String },
    /// Direct Postgres connection.
    Postgres { database_url: String },
}

/// Worker configuration. Built once at startup and passed down; nothing else
/// reads the process environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub store: StoreConfig,

    // Crawling
    pub apify_api_key: String,
    pub apify_actor: String,

    // Planning
    pub google_api_key: String,
    pub gemini_model: String,

    /// Language passed to the crawler and used for planning prompts.
    pub language: String,
    /// Pause between harvest cycles.
    pub cycle_interval: Duration,
}

impl Config {
    /// Load configuration from the process environment (and `.env` if present).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self::from_lookup(|key| std::env::var(key).ok())?;
        config.log_keys();
        Ok(config)
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| HunterError::Config(format!("{key} environment variable is required")))
        };

        let store = match get("DATABASE_URL") {
            Some(database_url) => StoreConfig::Postgres { database_url },
            None => match (get("SUPABASE_URL"), get("SUPABASE_KEY")) {
                (Some(url), Some(key)) => StoreConfig::Postgrest { url, key },
                _ => {
                    return Err(HunterError::Config(
                        "set DATABASE_URL, or both SUPABASE_URL and SUPABASE_KEY".to_string(),
                    )
                    .into())
                }
            },
        };

        let cycle_interval = match get("HUNTER_INTERVAL_SECS") {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| {
                    HunterError::Config(format!("HUNTER_INTERVAL_SECS must be a number, got {raw:?}"))
                })?;
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_INTERVAL_SECS),
        };

        Ok(Self {
            store,
            apify_api_key: required("APIFY_KEY")?,
            apify_actor: get("APIFY_ACTOR").unwrap_or_else(|| DEFAULT_APIFY_ACTOR.to_string()),
            google_api_key: required("GOOGLE_API_KEY")?,
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            language: get("HUNTER_LANGUAGE").unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            cycle_interval,
        })
    }

    fn log_keys(&self) {
        fn preview(val: &str) -> String {
            let head: String = val.chars().take(5).collect();
            format!("{}...({} chars)", head, val.len())
        }

        tracing::info!("Config loaded:");
        match &self.store {
            StoreConfig::Postgrest { url, key } => {
                tracing::info!("  SUPABASE_URL: {}", url);
                tracing::info!("  SUPABASE_KEY: {}", preview(key));
            }
            StoreConfig::Postgres { database_url } => {
                tracing::info!("  DATABASE_URL: {}", preview(database_url));
            }
        }
        tracing::info!("  APIFY_KEY: {}", preview(&self.apify_api_key));
        tracing::info!("  APIFY_ACTOR: {}", self.apify_actor);
        tracing::info!("  GOOGLE_API_KEY: {}", preview(&self.google_api_key));
        tracing::info!("  GEMINI_MODEL: {}", self.gemini_model);
        tracing::info!("  HUNTER_LANGUAGE: {}", self.language);
        tracing::info!("  HUNTER_INTERVAL_SECS: {}", self.cycle_interval.as_secs());
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
    fn supabase_config_with_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("SUPABASE_URL", "https://xyz.supabase.co"),
            ("SUPABASE_KEY", "service-key"),
            ("APIFY_KEY", "apify"),
            ("GOOGLE_API_KEY", "google"),
        ]))
        .unwrap();

        assert_eq!(
            config.store,
            StoreConfig::Postgrest {
                url: "https://xyz.supabase.co".into(),
                key: "service-key".into()
            }
        );
        assert_eq!(config.gemini_model, "gemini-1.5-flash");
        assert_eq!(config.apify_actor, "compass~crawler-google-places");
        assert_eq!(config.language, "es");
        assert_eq!(config.cycle_interval, Duration::from_secs(3600));
    }

    #[test]
    fn database_url_takes_precedence() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/leads"),
            ("SUPABASE_URL", "https://xyz.supabase.co"),
            ("SUPABASE_KEY", "k"),
            ("APIFY_KEY", "apify"),
            ("GOOGLE_API_KEY", "google"),
            ("HUNTER_INTERVAL_SECS", "60"),
        ]))
        .unwrap();

        assert!(matches!(config.store, StoreConfig::Postgres { .. }));
        assert_eq!(config.cycle_interval, Duration::from_secs(60));
    }

    #[test]
    fn missing_store_is_fatal() {
        let err = Config::from_lookup(lookup(&[
            ("SUPABASE_URL", "https://xyz.supabase.co"),
            ("APIFY_KEY", "apify"),
            ("GOOGLE_API_KEY", "google"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("SUPABASE_KEY"));
    }

    #[test]
    fn blank_required_key_counts_as_missing() {
        let err = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/leads"),
            ("APIFY_KEY", "  "),
            ("GOOGLE_API_KEY", "google"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("APIFY_KEY"));
    }

    #[test]
    fn bad_interval_is_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/leads"),
            ("APIFY_KEY", "a"),
            ("GOOGLE_API_KEY", "g"),
            ("HUNTER_INTERVAL_SECS", "hourly"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("HUNTER_INTERVAL_SECS"));
    }
}
