use crate::error::{AppError, AppResult};
use deadpool_redis::redis::{pipe, AsyncCommands, Script};
use deadpool_redis::{Manager, Pool, Runtime};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::Duration;

/// How long an invalidation blocks refills of the same code.
///
/// A resolver that read the old row before the write committed must finish
/// its refill within this window, or it could cache the old target.
const FILL_GUARD: Duration = Duration::from_secs(5);

/// KEYS[1] target, KEYS[2] guard; ARGV[1] value, ARGV[2] ttl seconds
static FILL_SCRIPT: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r"
        if redis.call('EXISTS', KEYS[2]) == 1 then
            return 0
        end
        redis.call('SET', KEYS[1], ARGV[1], 'EX', ARGV[2])
        return 1
        ",
    )
});

/// What the resolver needs to redirect without touching the database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedTarget {
    pub short_code: String,
    pub target_url: String,
}

/// Redis cache of short code lookups
#[derive(Clone)]
pub struct Cache {
    pool: Pool,
    default_ttl: Duration,
}

impl Cache {
    const KEY_PREFIX: &'static str = "link";

    /// Create a new cache connection pool
    pub fn new(redis_url: &str, max_connections: u32, default_ttl_seconds: u64) -> AppResult<Self> {
        let manager = Manager::new(redis_url)
            .map_err(|e| AppError::Configuration(format!("Invalid Redis URL: {}", e)))?;

        let pool = Pool::builder(manager)
            .max_size(max_connections as usize)
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to create Redis pool: {}", e)))?;

        Ok(Self {
            pool,
            default_ttl: Duration::from_secs(default_ttl_seconds),
        })
    }

    /// Ping the Redis server to check connectivity
    pub async fn ping(&self) -> AppResult<String> {
        let mut conn = self.pool.get().await?;
        let response: String = deadpool_redis::redis::cmd("PING")
            .query_async(&mut conn)
            .await?;
        Ok(response)
    }

    /// Get a cached target by short code
    pub async fn get_target(&self, short_code: &str) -> AppResult<Option<CachedTarget>> {
        let key = Self::target_key(short_code);
        let mut conn = self.pool.get().await?;

        let value: Option<String> = conn.get(&key).await?;

        match value {
            Some(v) => Ok(Some(serde_json::from_str(&v)?)),
            None => Ok(None),
        }
    }

    /// Cache a target read from the database with the default TTL.
    ///
    /// Skipped while the code was invalidated within the last [`FILL_GUARD`];
    /// returns whether the entry was written.
    pub async fn fill_target(&self, target: &CachedTarget) -> AppResult<bool> {
        let value = serde_json::to_string(target)?;
        let mut conn = self.pool.get().await?;

        let filled: i64 = FILL_SCRIPT
            .key(Self::target_key(&target.short_code))
            .key(Self::guard_key(&target.short_code))
            .arg(value)
            .arg(self.default_ttl.as_secs())
            .invoke_async(&mut conn)
            .await?;

        Ok(filled == 1)
    }

    /// Drop a cached target after its mapping changed and hold off refills
    pub async fn invalidate(&self, short_code: &str) -> AppResult<()> {
        let mut conn = self.pool.get().await?;

        let _: () = pipe()
            .atomic()
            .set_ex(Self::guard_key(short_code), 1, FILL_GUARD.as_secs())
            .ignore()
            .del(Self::target_key(short_code))
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(())
    }

    /// Generate cache key for a short code
    fn target_key(short_code: &str) -> String {
        format!("{}:{}", Self::KEY_PREFIX, short_code)
    }

    /// Short codes never contain ':', so this cannot clash with a target key
    fn guard_key(short_code: &str) -> String {
        format!("{}:guard:{}", Self::KEY_PREFIX, short_code)
    }
}

/// Invalidate without failing the caller; errors are logged
pub async fn invalidate_quietly(cache: Option<&Cache>, short_code: &str) {
    if let Some(cache) = cache {
        if let Err(e) = cache.invalidate(short_code).await {
            tracing::warn!(short_code = %short_code, error = %e, "Failed to invalidate cached target");
        }
    }
}
