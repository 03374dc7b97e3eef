use crate::auth::{is_effectively_pro, Actor, AuthService};
use crate::cache::{invalidate_quietly, Cache};
use crate::error::{AppError, AppResult};
use crate::jobs::JobSender;
use crate::models::{
    Account, AccountChanges, AccountProfile, AccountSummary, DailyCount, LoginRequest,
    LoginResponse, NewAccount, RegisterRequest, Role, StatsResponse, UpdateAccountRequest,
};
use crate::registry::Registry;
use crate::store::AccountStore;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

/// Days of link-creation history on the admin dashboard, today included
const HISTORY_DAYS: i64 = 7;

/// Account registration, login and administration
#[derive(Clone)]
pub struct AccountService {
    accounts: Arc<dyn AccountStore>,
    registry: Registry,
    cache: Option<Cache>,
    auth: AuthService,
    jobs: JobSender,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn require_admin(actor: Option<&Actor>) -> AppResult<&Actor> {
    let actor = actor.ok_or_else(|| AppError::Unauthenticated("Sign in required".to_string()))?;
    if !actor.is_admin() {
        return Err(AppError::Forbidden("Administrator role required".to_string()));
    }
    Ok(actor)
}

/// Start of the UTC day containing `now`
fn day_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc())
        .unwrap_or(now)
}

/// One entry per day from `first` through `last`, missing days counted as zero
fn fill_history(first: NaiveDate, last: NaiveDate, counts: &[DailyCount]) -> Vec<DailyCount> {
    first
        .iter_days()
        .take_while(|day| *day <= last)
        .map(|date| DailyCount {
            date,
            count: counts
                .iter()
                .find(|c| c.date == date)
                .map_or(0, |c| c.count),
        })
        .collect()
}

impl AccountService {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        registry: Registry,
        cache: Option<Cache>,
        auth: AuthService,
        jobs: JobSender,
    ) -> Self {
        Self {
            accounts,
            registry,
            cache,
            auth,
            jobs,
        }
    }

    pub async fn register(&self, request: RegisterRequest) -> AppResult<AccountProfile> {
        request
            .validate()
            .map_err(|e| AppError::BadRequest(format!("Validation failed: {}", e)))?;

        let account = self
            .accounts
            .create_account(NewAccount {
                email: normalize_email(&request.email),
                name: request.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
                password_hash: self.auth.hash_password(&request.password)?,
                role: Role::User,
                is_pro: false,
                pro_until: None,
            })
            .await?;

        info!(user_id = %account.id, "Account registered");
        Ok(account.into())
    }

    /// Verify credentials and issue a token.
    ///
    /// A stored Pro flag past its expiry is reported as not Pro and queued for
    /// revocation.
    pub async fn login(&self, request: LoginRequest) -> AppResult<LoginResponse> {
        let rejected = || AppError::Unauthenticated("Invalid email or password".to_string());

        let mut account = self
            .accounts
            .find_account_by_email(&normalize_email(&request.email))
            .await?
            .ok_or_else(rejected)?;

        if !self.auth.verify_password(&request.password, &account.password_hash)? {
            warn!(user_id = %account.id, "Failed login attempt");
            return Err(rejected());
        }

        if account.is_pro && !is_effectively_pro(account.is_pro, account.pro_until, Utc::now()) {
            self.jobs.revoke_expired_pro(account.id);
            account.is_pro = false;
        }

        let token = self.auth.generate_token(&account)?;
        info!(user_id = %account.id, "User logged in");

        Ok(LoginResponse {
            token,
            user: account.into(),
        })
    }

    pub async fn list_users(&self, actor: Option<&Actor>) -> AppResult<Vec<AccountSummary>> {
        require_admin(actor)?;
        self.accounts.list_accounts().await
    }

    pub async fn update_user(
        &self,
        actor: Option<&Actor>,
        id: Uuid,
        request: UpdateAccountRequest,
    ) -> AppResult<AccountProfile> {
        let admin = require_admin(actor)?;
        request
            .validate()
            .map_err(|e| AppError::BadRequest(format!("Validation failed: {}", e)))?;

        let password_hash = match &request.password {
            Some(password) => Some(self.auth.hash_password(password)?),
            None => None,
        };

        let changes = AccountChanges {
            name: request.name.map(|n| n.trim().to_string()),
            email: request.email.as_deref().map(normalize_email),
            role: request.role,
            is_pro: request.is_pro,
            pro_until: request.pro_until,
            password_hash,
        };

        let account = self
            .accounts
            .update_account(id, &changes)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {}", id)))?;

        info!(user_id = %id, admin = %admin.user_id, "Account updated");
        Ok(account.into())
    }

    /// Delete an account and every link it owns
    pub async fn delete_user(&self, actor: Option<&Actor>, id: Uuid) -> AppResult<()> {
        let admin = require_admin(actor)?;
        if admin.user_id == id {
            return Err(AppError::BadRequest("Administrators cannot delete themselves".to_string()));
        }

        let owned = self.registry.list_by_owner(id).await?;
        if !self.accounts.delete_account(id).await? {
            return Err(AppError::NotFound(format!("User {}", id)));
        }

        for mapping in &owned {
            invalidate_quietly(self.cache.as_ref(), &mapping.short_code).await;
        }

        info!(user_id = %id, admin = %admin.user_id, links = owned.len(), "Account deleted");
        Ok(())
    }

    /// Dashboard totals plus links created per day over the last week
    pub async fn stats(&self, actor: Option<&Actor>) -> AppResult<StatsResponse> {
        require_admin(actor)?;
        self.stats_unchecked().await
    }

    /// Dashboard statistics without a caller check, for the admin CLI
    pub async fn stats_unchecked(&self) -> AppResult<StatsResponse> {
        let today = day_start(Utc::now());
        let since = today - Duration::days(HISTORY_DAYS - 1);

        let links = self.registry.stats(since).await?;
        let users = self.accounts.account_stats(today).await?;

        Ok(StatsResponse {
            total_users: users.total_users,
            pro_users: users.pro_users,
            total_links: links.total_links,
            total_clicks: links.total_clicks,
            new_users_today: users.new_users_today,
            history: fill_history(since.date_naive(), today.date_naive(), &links.created_per_day),
        })
    }

    /// Create an administrator or promote an existing account
    pub async fn create_admin(
        &self,
        email: &str,
        password: &str,
        name: Option<String>,
    ) -> AppResult<Account> {
        let email = normalize_email(email);
        let password_hash = self.auth.hash_password(password)?;

        if let Some(existing) = self.accounts.find_account_by_email(&email).await? {
            let changes = AccountChanges {
                role: Some(Role::Admin),
                password_hash: Some(password_hash),
                name,
                ..Default::default()
            };
            return self
                .accounts
                .update_account(existing.id, &changes)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("User {}", email)));
        }

        self.accounts
            .create_account(NewAccount {
                email,
                name,
                password_hash,
                role: Role::Admin,
                is_pro: true,
                pro_until: None,
            })
            .await
    }

    /// Grant Pro, for `days` from now or without expiry
    pub async fn grant_pro(&self, email: &str, days: Option<i64>) -> AppResult<Account> {
        let changes = AccountChanges {
            is_pro: Some(true),
            pro_until: days.map(|d| Utc::now() + Duration::days(d)),
            ..Default::default()
        };
        self.change_by_email(email, changes).await
    }

    pub async fn revoke_pro(&self, email: &str) -> AppResult<Account> {
        let changes = AccountChanges {
            is_pro: Some(false),
            ..Default::default()
        };
        self.change_by_email(email, changes).await
    }

    async fn change_by_email(&self, email: &str, changes: AccountChanges) -> AppResult<Account> {
        let email = normalize_email(email);
        let account = self
            .accounts
            .find_account_by_email(&email)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {}", email)))?;

        self.accounts
            .update_account(account.id, &changes)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {}", email)))
    }
}
