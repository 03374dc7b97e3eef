//! Storage seams for links and accounts.
//!
//! Two backends implement both traits: [`crate::db::Repository`] over
//! PostgreSQL and [`crate::memory::MemoryStore`] for tests and local runs.

use crate::error::AppResult;
use crate::models::{
    Account, AccountChanges, AccountStats, AccountSummary, LinkStats, MappingPatch, NewAccount,
    ShortLinkMapping,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Persistence for short link mappings, unique by `id` and by `short_code`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Inserts a mapping.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::AppError::ShortCodeExists`] when the short code
    /// is already taken.
    async fn insert(&self, mapping: &ShortLinkMapping) -> AppResult<()>;

    async fn find_by_code(&self, short_code: &str) -> AppResult<Option<ShortLinkMapping>>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<ShortLinkMapping>>;

    /// All mappings of one owner, newest first.
    async fn list_by_owner(&self, owner_id: Uuid) -> AppResult<Vec<ShortLinkMapping>>;

    /// Applies the patch; `None` if the id does not exist.
    async fn update(&self, id: Uuid, patch: &MappingPatch) -> AppResult<Option<ShortLinkMapping>>;

    /// Returns `true` if the mapping existed and was removed.
    async fn delete(&self, id: Uuid) -> AppResult<bool>;

    /// Atomically adds one to the click counter. Returns `false` if the code is unknown.
    async fn increment_clicks(&self, short_code: &str) -> AppResult<bool>;

    async fn reset_clicks(&self, id: Uuid) -> AppResult<Option<ShortLinkMapping>>;

    /// Totals plus per-day creation counts from `since` onwards.
    async fn link_stats(&self, since: DateTime<Utc>) -> AppResult<LinkStats>;

    /// Cheap connectivity probe used by the health check.
    async fn ping(&self) -> AppResult<()>;
}

/// Persistence for user accounts, unique by `id` and by `email`.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// # Errors
    ///
    /// Returns [`crate::error::AppError::Conflict`] if the email is registered.
    async fn create_account(&self, account: NewAccount) -> AppResult<Account>;

    async fn find_account_by_email(&self, email: &str) -> AppResult<Option<Account>>;

    async fn find_account_by_id(&self, id: Uuid) -> AppResult<Option<Account>>;

    /// Every account with its link count, newest first.
    async fn list_accounts(&self) -> AppResult<Vec<AccountSummary>>;

    async fn update_account(&self, id: Uuid, changes: &AccountChanges) -> AppResult<Option<Account>>;

    /// Removes the account together with the links it owns.
    async fn delete_account(&self, id: Uuid) -> AppResult<bool>;

    /// Clears the Pro flag if it is set and expired at `now`. Returns whether a row changed.
    async fn revoke_expired_pro(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<bool>;

    async fn account_stats(&self, today_start: DateTime<Utc>) -> AppResult<AccountStats>;
}
