use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value `{value}` for {key}")]
    Invalid { key: &'static str, value: String },
}

/// Server settings, read from the environment (and `.env` when present).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub app_name: String,
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub pool_size: u32,
    pub cors_origin: String,
}

impl Config {
    pub fn new() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| dotenvy::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            app_name: lookup("APP_NAME").unwrap_or_else(|| "todos".to_string()),
            host: lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse(&lookup, "PORT", 5001)?,
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| ":memory:".to_string()),
            pool_size: parse(&lookup, "DATABASE_POOL_SIZE", 8)?,
            cors_origin: lookup("CORS_ORIGIN")
                .unwrap_or_else(|| "http://localhost:3001".to_string()),
        })
    }
}

/// Where the client finds the todo API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_url: String,
}

impl ClientConfig {
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            api_url: lookup("TODO_API_URL").unwrap_or_else(|| "http://localhost:5001".to_string()),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

fn parse<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}
