use std::time::Duration;

use anyhow::{Context, Result, anyhow};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub jwt_secret: String,
    pub token_ttl_minutes: i64,
    pub cors_allowed_origins: Vec<String>,
    pub visitor_window: Duration,
    pub visitor_limit: usize,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let jwt_secret = std::env::var("JWT_SECRET").context("JWT_SECRET missing")?;
        if jwt_secret.len() < 32 {
            return Err(anyhow!("JWT_SECRET must be at least 32 bytes"));
        }

        let token_ttl_minutes = env_parsed("TOKEN_TTL_MINUTES", 30)?;

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .filter_map(|s| {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            })
            .collect::<Vec<_>>();

        let visitor_window =
            Duration::from_secs(env_parsed("VISITOR_RATE_WINDOW_SECS", 3600u64)?);
        let visitor_limit = env_parsed("VISITOR_RATE_LIMIT", 10usize)?;

        Ok(Self {
            jwt_secret,
            token_ttl_minutes,
            cors_allowed_origins,
            visitor_window,
            visitor_limit,
        })
    }
}

fn env_parsed<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid {}", key)),
        Err(_) => Ok(default),
    }
}
