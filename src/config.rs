use crate::scrapers::types::Criteria;
use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_SOURCES: &[&str] = &["gewobag", "wbm", "inberlinwohnen"];

/// Outbound HTTP pool settings
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub max_connections: usize,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(12),
            max_connections: 20,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64; rv:122.0) Gecko/20100101 Firefox/122.0"
                .to_string(),
        }
    }
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_token: String,
    pub telegram_chat_id: String,
    pub state_file: PathBuf,
    pub cron_schedule: String,
    pub sources: Vec<String>,
    pub http: HttpSettings,
    pub render_timeout: Duration,
    base_criteria: Criteria,
    criteria: HashMap<String, Criteria>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("{} must be set", key))
        };

        let telegram_token = required("TELEGRAM_BOT_TOKEN")?;
        let telegram_chat_id = required("TELEGRAM_USER_ID")?;

        let sources: Vec<String> = match lookup("SOURCES") {
            Some(list) => list
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            None => DEFAULT_SOURCES.iter().map(|s| s.to_string()).collect(),
        };

        let http = HttpSettings {
            timeout: Duration::from_secs(parse_or(&lookup, "HTTP_TIMEOUT_SECS", 12)?),
            max_connections: parse_or(&lookup, "HTTP_MAX_CONNECTIONS", 20)?,
            ..HttpSettings::default()
        };

        let base_criteria = Criteria {
            min_rooms: parse_or(&lookup, "MIN_ROOMS", Criteria::default().min_rooms)?,
            min_sqm: parse_or(&lookup, "MIN_SQM", Criteria::default().min_sqm)?,
            max_rent: None,
        };

        let mut criteria = HashMap::new();
        for prefix in &sources {
            let defaults = builtin_criteria(prefix, base_criteria);
            criteria.insert(prefix.clone(), source_criteria(&lookup, prefix, defaults)?);
        }

        Ok(Self {
            telegram_token,
            telegram_chat_id,
            state_file: lookup("STATE_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./notified.json")),
            cron_schedule: lookup("CRON_SCHEDULE").unwrap_or_else(|| "0 */2 * * * *".to_string()),
            sources,
            http,
            render_timeout: Duration::from_secs(parse_or(&lookup, "RENDER_TIMEOUT_SECS", 15)?),
            base_criteria,
            criteria,
        })
    }

    /// Acceptance thresholds for a source prefix
    pub fn criteria_for(&self, prefix: &str) -> Criteria {
        self.criteria
            .get(prefix)
            .copied()
            .unwrap_or_else(|| builtin_criteria(prefix, self.base_criteria))
    }

    pub fn is_enabled(&self, prefix: &str) -> bool {
        self.sources.iter().any(|s| s == prefix)
    }
}

fn builtin_criteria(prefix: &str, base: Criteria) -> Criteria {
    match prefix {
        "inberlinwohnen" => Criteria {
            min_rooms: 3.0,
            min_sqm: 0.0,
            max_rent: Some(1600.0),
        },
        _ => base,
    }
}

fn source_criteria<F>(lookup: &F, prefix: &str, defaults: Criteria) -> Result<Criteria>
where
    F: Fn(&str) -> Option<String>,
{
    let key = prefix.to_uppercase();
    Ok(Criteria {
        min_rooms: parse_or(lookup, &format!("{}_MIN_ROOMS", key), defaults.min_rooms)?,
        min_sqm: parse_or(lookup, &format!("{}_MIN_SQM", key), defaults.min_sqm)?,
        max_rent: match lookup(&format!("{}_MAX_RENT", key)) {
            Some(raw) => Some(
                raw.trim()
                    .parse()
                    .with_context(|| format!("{}_MAX_RENT must be a number", key))?,
            ),
            None => defaults.max_rent,
        },
    })
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid number", key)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const CREDS: [(&str, &str); 2] = [("TELEGRAM_BOT_TOKEN", "t0k3n"), ("TELEGRAM_USER_ID", "42")];

    #[test]
    fn test_missing_credentials_fail() {
        let err = Config::from_lookup(lookup_from(&[("TELEGRAM_USER_ID", "42")])).unwrap_err();
        assert!(err.to_string().contains("TELEGRAM_BOT_TOKEN"));

        let err = Config::from_lookup(lookup_from(&[("TELEGRAM_BOT_TOKEN", "x")])).unwrap_err();
        assert!(err.to_string().contains("TELEGRAM_USER_ID"));

        assert!(Config::from_lookup(lookup_from(&[
            ("TELEGRAM_BOT_TOKEN", " "),
            ("TELEGRAM_USER_ID", "42"),
        ]))
        .is_err());
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&CREDS)).unwrap();
        assert_eq!(config.state_file, PathBuf::from("./notified.json"));
        assert_eq!(config.cron_schedule, "0 */2 * * * *");
        assert_eq!(config.sources, vec!["gewobag", "wbm", "inberlinwohnen"]);
        assert_eq!(config.http.timeout, Duration::from_secs(12));
        assert_eq!(config.render_timeout, Duration::from_secs(15));

        assert_eq!(config.criteria_for("wbm"), Criteria::default());
        let inberlin = config.criteria_for("inberlinwohnen");
        assert_eq!(inberlin.min_rooms, 3.0);
        assert_eq!(inberlin.max_rent, Some(1600.0));
    }

    #[test]
    fn test_criteria_overrides() {
        let mut pairs = CREDS.to_vec();
        pairs.extend([
            ("MIN_ROOMS", "2"),
            ("GEWOBAG_MIN_SQM", "70"),
            ("INBERLINWOHNEN_MAX_RENT", "1400"),
        ]);
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();

        assert_eq!(config.criteria_for("wbm").min_rooms, 2.0);
        assert_eq!(config.criteria_for("gewobag").min_sqm, 70.0);
        assert_eq!(config.criteria_for("inberlinwohnen").max_rent, Some(1400.0));
    }

    #[test]
    fn test_sources_list() {
        let mut pairs = CREDS.to_vec();
        pairs.push(("SOURCES", "WBM, degewo,,"));
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();
        assert!(config.is_enabled("wbm"));
        assert!(config.is_enabled("degewo"));
        assert!(!config.is_enabled("gewobag"));
    }

    #[test]
    fn test_bad_number_is_error() {
        let mut pairs = CREDS.to_vec();
        pairs.push(("MIN_SQM", "sixty"));
        let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(err.to_string().contains("MIN_SQM"));
    }
}
