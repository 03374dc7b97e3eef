use crate::error::{AppError, AppResult};
use crate::models::{DailyCount, LinkStats, MappingPatch, ShortLinkMapping};
use crate::store::LinkStore;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    ConnectOptions, PgPool,
};
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

/// PostgreSQL repository for links and accounts
#[derive(Clone)]
pub struct Repository {
    pub(crate) pool: PgPool,
}

impl Repository {
    /// Create a new repository with a connection pool
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout_seconds: u64,
    ) -> AppResult<Self> {
        let options = PgConnectOptions::from_str(database_url)
            .map_err(|e| AppError::Configuration(format!("Invalid database URL: {}", e)))?
            .disable_statement_logging();

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(acquire_timeout_seconds))
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> AppResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// Map a unique-constraint violation to `conflict`, pass every other error through
pub(crate) fn unique_violation_as(err: sqlx::Error, conflict: AppError) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => conflict,
        _ => AppError::Database(err),
    }
}

#[async_trait]
impl LinkStore for Repository {
    async fn insert(&self, mapping: &ShortLinkMapping) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO links
                (id, short_code, owner_id, target_url, display_name, click_count, style_options, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(mapping.id)
        .bind(&mapping.short_code)
        .bind(mapping.owner_id)
        .bind(&mapping.target_url)
        .bind(&mapping.display_name)
        .bind(mapping.click_count)
        .bind(&mapping.style_options)
        .bind(mapping.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| unique_violation_as(e, AppError::ShortCodeExists(mapping.short_code.clone())))?;

        Ok(())
    }

    async fn find_by_code(&self, short_code: &str) -> AppResult<Option<ShortLinkMapping>> {
        let result = sqlx::query_as::<_, ShortLinkMapping>(
            r#"
            SELECT * FROM links
            WHERE short_code = $1
            "#,
        )
        .bind(short_code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(result)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<ShortLinkMapping>> {
        let result = sqlx::query_as::<_, ShortLinkMapping>(
            r#"
            SELECT * FROM links
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(result)
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> AppResult<Vec<ShortLinkMapping>> {
        let results = sqlx::query_as::<_, ShortLinkMapping>(
            r#"
            SELECT * FROM links
            WHERE owner_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(results)
    }

    async fn update(&self, id: Uuid, patch: &MappingPatch) -> AppResult<Option<ShortLinkMapping>> {
        let result = sqlx::query_as::<_, ShortLinkMapping>(
            r#"
            UPDATE links
            SET display_name = COALESCE($2, display_name),
                target_url = COALESCE($3, target_url)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch.display_name.as_deref())
        .bind(patch.target_url.as_deref())
        .fetch_optional(&self.pool)
        .await?;

        Ok(result)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM links WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn increment_clicks(&self, short_code: &str) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE links
            SET click_count = click_count + 1
            WHERE short_code = $1
            "#,
        )
        .bind(short_code)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn reset_clicks(&self, id: Uuid) -> AppResult<Option<ShortLinkMapping>> {
        let result = sqlx::query_as::<_, ShortLinkMapping>(
            r#"
            UPDATE links
            SET click_count = 0
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(result)
    }

    async fn link_stats(&self, since: DateTime<Utc>) -> AppResult<LinkStats> {
        let (total_links, total_clicks) = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT
                COUNT(*) AS total_links,
                COALESCE(CAST(SUM(click_count) AS BIGINT), 0) AS total_clicks
            FROM links
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, (NaiveDate, i64)>(
            r#"
            SELECT (created_at AT TIME ZONE 'UTC')::date AS day, COUNT(*) AS created
            FROM links
            WHERE created_at >= $1
            GROUP BY day
            ORDER BY day
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(LinkStats {
            total_links,
            total_clicks,
            created_per_day: rows
                .into_iter()
                .map(|(date, count)| DailyCount { date, count })
                .collect(),
        })
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
