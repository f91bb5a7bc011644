use std::{env, fmt::Display, str::FromStr};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub secret: String,
    pub base_url: String,
    pub token_hours: i64,
    pub max_connections: u32,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Environment variable {0} is required")]
    Missing(&'static str),

    #[error("Invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url: String = try_load(&lookup, "FOODGRAM_BASE_URL", "http://localhost:8000")?;
        let token_hours: i64 = try_load(&lookup, "FOODGRAM_TOKEN_HOURS", "24")?;
        let max_connections: u32 = try_load(&lookup, "FOODGRAM_MAX_CONNECTIONS", "5")?;

        if token_hours <= 0 {
            return Err(ConfigError::Invalid {
                key: "FOODGRAM_TOKEN_HOURS",
                value: token_hours.to_string(),
                reason: "must be positive".into(),
            });
        }
        if max_connections == 0 {
            return Err(ConfigError::Invalid {
                key: "FOODGRAM_MAX_CONNECTIONS",
                value: "0".into(),
                reason: "must be positive".into(),
            });
        }

        Ok(Self {
            database_url: required(&lookup, "DATABASE_URL")?,
            port: try_load(&lookup, "FOODGRAM_PORT", "8000")?,
            secret: required(&lookup, "FOODGRAM_SECRET")?,
            base_url: base_url.trim_end_matches('/').to_string(),
            token_hours,
            max_connections,
        })
    }
}

fn var<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|v| !v.trim().is_empty())
}

fn required<F>(lookup: &F, key: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    var(lookup, key).ok_or(ConfigError::Missing(key))
}

fn try_load<F, T>(lookup: &F, key: &'static str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    let value = var(lookup, key).unwrap_or_else(|| {
        log::info!("{key} not set, using default: {default}");
        default.to_string()
    });

    let parsed = value.trim().parse::<T>();

    parsed.map_err(|e| ConfigError::Invalid {
        key,
        reason: e.to_string(),
        value,
    })
}
