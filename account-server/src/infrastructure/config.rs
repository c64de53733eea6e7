use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub mongodb_uri: String,
    pub mongodb_database: String,
    pub mongodb_max_pool_size: u32,
    pub mongodb_min_pool_size: u32,
    pub mongodb_timeout: Duration,
    pub jwt_secret: String,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let host = var("HOST").unwrap_or_else(|| "127.0.0.1".into());
        let port = parse_or(&var, "PORT", 3000u16)?;
        let mongodb_uri =
            var("MONGODB_URI").ok_or_else(|| anyhow::anyhow!("MONGODB_URI must be set"))?;
        let mongodb_database = var("MONGODB_DATABASE").unwrap_or_else(|| "accounts".into());
        let mongodb_max_pool_size = parse_or(&var, "MONGODB_MAX_POOL_SIZE", 20u32)?;
        let mongodb_min_pool_size = parse_or(&var, "MONGODB_MIN_POOL_SIZE", 5u32)?;
        let mongodb_timeout = Duration::from_secs(parse_or(&var, "MONGODB_TIMEOUT_SECS", 5u64)?);
        let jwt_secret = var("JWT_SECRET").ok_or_else(|| anyhow::anyhow!("JWT_SECRET must be set"))?;
        let cors_origins = var("CORS_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if mongodb_min_pool_size > mongodb_max_pool_size {
            anyhow::bail!("MONGODB_MIN_POOL_SIZE must not exceed MONGODB_MAX_POOL_SIZE");
        }

        Ok(Self {
            host,
            port,
            mongodb_uri,
            mongodb_database,
            mongodb_max_pool_size,
            mongodb_min_pool_size,
            mongodb_timeout,
            jwt_secret,
            cors_origins,
        })
    }
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match var(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {}: {}", name, e)),
        None => Ok(default),
    }
}
