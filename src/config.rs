use std::{env, fmt::Display, fs::read_to_string, path::PathBuf, str::FromStr};

use tracing::{info, warn};

pub struct Config {
    pub snapshot_path: PathBuf,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub fetch_concurrency: usize,
    pub rating_threshold: i64,
    pub smtp_host: String,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub sender: String,
    pub recipients: Vec<String>,
}

impl Config {
    pub fn load() -> Self {
        Self {
            snapshot_path: try_load("CF_SNAPSHOT_PATH", "data/codeforces.csv"),
            api_key: read_secret_opt("CF_API_KEY"),
            api_secret: read_secret_opt("CF_API_SECRET"),
            fetch_concurrency: try_load("CF_FETCH_CONCURRENCY", "8"),
            rating_threshold: try_load("CF_RATING_THRESHOLD", "2000"),
            smtp_host: try_load("CF_SMTP_HOST", "localhost"),
            smtp_username: read_secret_opt("CF_SMTP_USERNAME"),
            smtp_password: read_secret_opt("CF_SMTP_PASSWORD"),
            sender: try_load("CF_MAIL_FROM", "codeforces-updates@localhost"),
            recipients: load_recipients("CF_MAIL_TO"),
        }
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found, using default");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
        })
        .expect("Environment misconfigured!")
}

/// Secrets come from `/run/secrets` when deployed, from the environment
/// otherwise. Both optional: without API credentials the job runs with
/// unsigned public calls, and without SMTP credentials the relay is
/// expected to accept unauthenticated mail.
fn read_secret_opt(secret_name: &str) -> Option<String> {
    let path = format!("/run/secrets/{secret_name}");

    if let Ok(s) = read_to_string(&path) {
        return Some(s.trim().to_string());
    }

    env::var(secret_name).ok().filter(|s| !s.is_empty())
}

fn load_recipients(key: &str) -> Vec<String> {
    var(key)
        .map(|raw| {
            raw.split(',')
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty())
                .collect()
        })
        .unwrap_or_default()
}
