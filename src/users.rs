use crate::db::{unique_violation_as, Repository};
use crate::error::{AppError, AppResult};
use crate::models::{
    Account, AccountChanges, AccountProfile, AccountStats, AccountSummary, NewAccount, Role,
};
use crate::store::AccountStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Admin listing row as read from the database
#[derive(Debug, FromRow)]
struct AccountSummaryRow {
    id: Uuid,
    email: String,
    name: Option<String>,
    role: String,
    is_pro: bool,
    pro_until: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    link_count: i64,
}

impl From<AccountSummaryRow> for AccountSummary {
    fn from(row: AccountSummaryRow) -> Self {
        AccountSummary {
            profile: AccountProfile {
                id: row.id,
                email: row.email,
                name: row.name,
                role: Role::parse(&row.role),
                is_pro: row.is_pro,
                pro_until: row.pro_until,
                created_at: row.created_at,
            },
            link_count: row.link_count,
        }
    }
}

/// Repository extension for account operations
#[async_trait]
impl AccountStore for Repository {
    async fn create_account(&self, account: NewAccount) -> AppResult<Account> {
        let conflict = AppError::Conflict(format!("Account already exists: {}", account.email));

        let result = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO users (id, email, name, password_hash, role, is_pro, pro_until, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&account.email)
        .bind(account.name.as_deref())
        .bind(&account.password_hash)
        .bind(account.role.as_str())
        .bind(account.is_pro)
        .bind(account.pro_until)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_violation_as(e, conflict))?;

        Ok(result)
    }

    async fn find_account_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        let result = sqlx::query_as::<_, Account>(
            r#"
            SELECT * FROM users WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(result)
    }

    async fn find_account_by_id(&self, id: Uuid) -> AppResult<Option<Account>> {
        let result = sqlx::query_as::<_, Account>(
            r#"
            SELECT * FROM users WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(result)
    }

    async fn list_accounts(&self) -> AppResult<Vec<AccountSummary>> {
        let rows = sqlx::query_as::<_, AccountSummaryRow>(
            r#"
            SELECT u.id, u.email, u.name, u.role, u.is_pro, u.pro_until, u.created_at,
                   COUNT(l.id) AS link_count
            FROM users u
            LEFT JOIN links l ON l.owner_id = u.id
            GROUP BY u.id
            ORDER BY u.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update_account(&self, id: Uuid, changes: &AccountChanges) -> AppResult<Option<Account>> {
        let conflict = AppError::Conflict("Email is already in use".to_string());

        let result = sqlx::query_as::<_, Account>(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                email = COALESCE($3, email),
                role = COALESCE($4, role),
                is_pro = COALESCE($5, is_pro),
                pro_until = CASE
                    WHEN $5::BOOLEAN IS NOT NULL THEN $6
                    ELSE COALESCE($6, pro_until)
                END,
                password_hash = COALESCE($7, password_hash)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(changes.name.as_deref())
        .bind(changes.email.as_deref())
        .bind(changes.role.map(|r| r.as_str()))
        .bind(changes.is_pro)
        .bind(changes.pro_until)
        .bind(changes.password_hash.as_deref())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| unique_violation_as(e, conflict))?;

        Ok(result)
    }

    async fn delete_account(&self, id: Uuid) -> AppResult<bool> {
        // links.owner_id cascades
        let result = sqlx::query(
            r#"
            DELETE FROM users WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn revoke_expired_pro(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET is_pro = FALSE
            WHERE id = $1 AND is_pro AND pro_until IS NOT NULL AND pro_until <= $2
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn account_stats(&self, today_start: DateTime<Utc>) -> AppResult<AccountStats> {
        let (total_users, pro_users, new_users_today) = sqlx::query_as::<_, (i64, i64, i64)>(
            r#"
            SELECT
                COUNT(*) AS total_users,
                COUNT(*) FILTER (WHERE is_pro) AS pro_users,
                COUNT(*) FILTER (WHERE created_at >= $1) AS new_users_today
            FROM users
            "#,
        )
        .bind(today_start)
        .fetch_one(&self.pool)
        .await?;

        Ok(AccountStats {
            total_users,
            pro_users,
            new_users_today,
        })
    }
}
