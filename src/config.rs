use crate::error::{AppError, AppResult};
use serde::Deserialize;
use std::env;
use std::str::FromStr;

mod auth;
mod cache;
mod cors;
mod database;
mod jobs;
mod links;
mod rate_limit;
mod server;

pub use auth::AuthConfig;
pub use cache::CacheConfig;
pub use cors::CorsConfig;
pub use database::DatabaseConfig;
pub use jobs::JobsConfig;
pub use links::LinkConfig;
pub use rate_limit::RateLimitConfig;
pub use server::ServerConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub links: LinkConfig,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
    pub cors: CorsConfig,
    pub jobs: JobsConfig,
}

/// Read an optional variable, falling back to `default` and parsing into `T`
fn env_or<T: FromStr>(key: &str, default: &str) -> AppResult<T> {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|_| AppError::Configuration(format!("Invalid {}", key)))
}

fn env_required(key: &str) -> AppResult<String> {
    env::var(key).map_err(|_| AppError::MissingEnvVar(key.to_string()))
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();

        let server = ServerConfig {
            host: env_or("SERVER_HOST", "127.0.0.1")?,
            port: env_or("SERVER_PORT", "3000")?,
        };

        let database = DatabaseConfig {
            url: env_required("DATABASE_URL")?,
            max_connections: env_or("DB_MAX_CONNECTIONS", "10")?,
            min_connections: env_or("DB_MIN_CONNECTIONS", "1")?,
            acquire_timeout_seconds: env_or("DB_ACQUIRE_TIMEOUT_SECONDS", "30")?,
        };

        let cache = CacheConfig {
            enabled: env_or("CACHE_ENABLED", "true")?,
            url: env_or("REDIS_URL", "redis://127.0.0.1:6379")?,
            max_connections: env_or("CACHE_MAX_CONNECTIONS", "10")?,
            default_ttl_seconds: env_or("CACHE_DEFAULT_TTL_SECONDS", "3600")?,
        };

        let default_base_url = format!("http://{}", server.addr());
        let links = LinkConfig {
            short_code_length: env_or("SHORT_CODE_LENGTH", "6")?,
            short_code_max_attempts: env_or("SHORT_CODE_MAX_ATTEMPTS", "5")?,
            base_url: env_or("BASE_URL", &default_base_url)?,
            landing_path: env_or("LANDING_PATH", "/")?,
        };

        // Authentication config
        let auth = AuthConfig {
            jwt_secret: env_required("JWT_SECRET")?,
            jwt_expiration_hours: env_or("JWT_EXPIRATION_HOURS", "24")?,
            bcrypt_cost: env_or("BCRYPT_COST", &bcrypt::DEFAULT_COST.to_string())?,
        };

        // Rate limit config
        let rate_limit = RateLimitConfig {
            requests_per_minute: env_or("RATE_LIMIT_PER_MINUTE", "60")?,
            burst_size: env_or("RATE_LIMIT_BURST", "10")?,
        };

        // CORS config
        let cors = CorsConfig::parse(&env_or::<String>("ALLOWED_ORIGINS", "*")?);

        let jobs = JobsConfig {
            max_retries: env_or("WORKER_MAX_RETRIES", "3")?,
            retry_delay_ms: env_or("WORKER_RETRY_DELAY_MS", "1000")?,
        };

        let config = Config {
            server,
            database,
            cache,
            links,
            auth,
            rate_limit,
            cors,
            jobs,
        };

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> AppResult<()> {
        self.database
            .validate()
            .and_then(|_| self.cache.validate())
            .and_then(|_| self.links.validate())
            .and_then(|_| self.auth.validate())
            .and_then(|_| self.rate_limit.validate())
            .and_then(|_| self.jobs.validate())
            .map_err(AppError::Configuration)
    }
}
