use log::warn;
use std::{env, str::FromStr};

const DEFAULT_DATABASE_URL: &str = "sqlite://courses.db?mode=rwc";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_SESSION_TTL_MINUTES: i64 = 120;

/// Runtime settings, read from the environment and an optional `.env` file
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    /// Idle time after which a session expires
    pub session_ttl_minutes: i64,
    /// Marks the session cookie `Secure`; enable behind HTTPS
    pub secure_cookies: bool,
    /// Insert demo content when the database has no users
    pub seed_sample_data: bool,
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid value {raw:?} for {key}");
            default
        }),
        Err(_) => default,
    }
}

impl Config {
    pub fn from_env() -> Self {
        if dotenvy::dotenv().is_err() {
            warn!("No .env file found, using the process environment");
        }

        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            session_ttl_minutes: parse_or("SESSION_TTL_MINUTES", DEFAULT_SESSION_TTL_MINUTES),
            secure_cookies: parse_or("SECURE_COOKIES", false),
            seed_sample_data: parse_or("SEED_SAMPLE_DATA", false),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            session_ttl_minutes: DEFAULT_SESSION_TTL_MINUTES,
            secure_cookies: false,
            seed_sample_data: false,
        }
    }
}
