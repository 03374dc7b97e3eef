use crate::error::{AppError, AppResult};
use crate::models::{
    Account, AccountChanges, AccountProfile, AccountStats, AccountSummary, DailyCount, LinkStats,
    MappingPatch, NewAccount, ShortLinkMapping,
};
use crate::store::{AccountStore, LinkStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::BTreeMap;
use uuid::Uuid;

/// In-memory implementation of both store traits using DashMap.
///
/// Links are held by id with a second map acting as the unique short code
/// index; accounts likewise with an email index. Counter updates take the
/// shard lock of the entry, so concurrent increments never lose a hit.
#[derive(Debug, Default)]
pub struct MemoryStore {
    links: DashMap<Uuid, ShortLinkMapping>,
    codes: DashMap<String, Uuid>,
    accounts: DashMap<Uuid, Account>,
    emails: DashMap<String, Uuid>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn owner_link_ids(&self, owner_id: Uuid) -> Vec<Uuid> {
        self.links
            .iter()
            .filter(|entry| entry.owner_id == owner_id)
            .map(|entry| entry.id)
            .collect()
    }
}

#[async_trait]
impl LinkStore for MemoryStore {
    async fn insert(&self, mapping: &ShortLinkMapping) -> AppResult<()> {
        match self.codes.entry(mapping.short_code.clone()) {
            Entry::Occupied(_) => Err(AppError::ShortCodeExists(mapping.short_code.clone())),
            Entry::Vacant(slot) => {
                self.links.insert(mapping.id, mapping.clone());
                slot.insert(mapping.id);
                Ok(())
            }
        }
    }

    async fn find_by_code(&self, short_code: &str) -> AppResult<Option<ShortLinkMapping>> {
        let Some(id) = self.codes.get(short_code).map(|id| *id) else {
            return Ok(None);
        };

        Ok(self.links.get(&id).map(|entry| entry.clone()))
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<ShortLinkMapping>> {
        Ok(self.links.get(&id).map(|entry| entry.clone()))
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> AppResult<Vec<ShortLinkMapping>> {
        let mut owned: Vec<ShortLinkMapping> = self
            .links
            .iter()
            .filter(|entry| entry.owner_id == owner_id)
            .map(|entry| entry.clone())
            .collect();

        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    async fn update(&self, id: Uuid, patch: &MappingPatch) -> AppResult<Option<ShortLinkMapping>> {
        let Some(mut entry) = self.links.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(name) = &patch.display_name {
            entry.display_name = name.clone();
        }
        if let Some(target) = &patch.target_url {
            entry.target_url = target.clone();
        }

        Ok(Some(entry.clone()))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let Some((_, removed)) = self.links.remove(&id) else {
            return Ok(false);
        };

        self.codes.remove(&removed.short_code);
        Ok(true)
    }

    async fn increment_clicks(&self, short_code: &str) -> AppResult<bool> {
        let Some(id) = self.codes.get(short_code).map(|id| *id) else {
            return Ok(false);
        };

        match self.links.get_mut(&id) {
            Some(mut entry) => {
                entry.click_count += 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn reset_clicks(&self, id: Uuid) -> AppResult<Option<ShortLinkMapping>> {
        let Some(mut entry) = self.links.get_mut(&id) else {
            return Ok(None);
        };

        entry.click_count = 0;
        Ok(Some(entry.clone()))
    }

    async fn link_stats(&self, since: DateTime<Utc>) -> AppResult<LinkStats> {
        let mut stats = LinkStats::default();
        let mut per_day = BTreeMap::new();

        for entry in self.links.iter() {
            stats.total_links += 1;
            stats.total_clicks += entry.click_count;

            if entry.created_at >= since {
                *per_day.entry(entry.created_at.date_naive()).or_insert(0) += 1;
            }
        }

        stats.created_per_day = per_day
            .into_iter()
            .map(|(date, count)| DailyCount { date, count })
            .collect();

        Ok(stats)
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn create_account(&self, account: NewAccount) -> AppResult<Account> {
        match self.emails.entry(account.email.clone()) {
            Entry::Occupied(_) => Err(AppError::Conflict(format!(
                "Account already exists: {}",
                account.email
            ))),
            Entry::Vacant(slot) => {
                let created = Account {
                    id: Uuid::new_v4(),
                    email: account.email,
                    name: account.name,
                    password_hash: account.password_hash,
                    role: account.role.as_str().to_string(),
                    is_pro: account.is_pro,
                    pro_until: account.pro_until,
                    created_at: Utc::now(),
                };

                self.accounts.insert(created.id, created.clone());
                slot.insert(created.id);
                Ok(created)
            }
        }
    }

    async fn find_account_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        let Some(id) = self.emails.get(email).map(|id| *id) else {
            return Ok(None);
        };

        Ok(self.accounts.get(&id).map(|entry| entry.clone()))
    }

    async fn find_account_by_id(&self, id: Uuid) -> AppResult<Option<Account>> {
        Ok(self.accounts.get(&id).map(|entry| entry.clone()))
    }

    async fn list_accounts(&self) -> AppResult<Vec<AccountSummary>> {
        let accounts: Vec<Account> = self.accounts.iter().map(|entry| entry.clone()).collect();

        let mut summaries: Vec<AccountSummary> = accounts
            .into_iter()
            .map(|account| AccountSummary {
                link_count: self.owner_link_ids(account.id).len() as i64,
                profile: AccountProfile::from(account),
            })
            .collect();

        summaries.sort_by(|a, b| b.profile.created_at.cmp(&a.profile.created_at));
        Ok(summaries)
    }

    async fn update_account(&self, id: Uuid, changes: &AccountChanges) -> AppResult<Option<Account>> {
        let Some(current) = self.accounts.get(&id).map(|entry| entry.clone()) else {
            return Ok(None);
        };

        if let Some(email) = &changes.email {
            if *email != current.email {
                match self.emails.entry(email.clone()) {
                    Entry::Occupied(_) => {
                        return Err(AppError::Conflict("Email is already in use".to_string()))
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(id);
                    }
                }
                self.emails.remove(&current.email);
            }
        }

        let Some(mut entry) = self.accounts.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(name) = &changes.name {
            entry.name = Some(name.clone());
        }
        if let Some(email) = &changes.email {
            entry.email = email.clone();
        }
        if let Some(role) = changes.role {
            entry.role = role.as_str().to_string();
        }
        match changes.is_pro {
            Some(is_pro) => {
                entry.is_pro = is_pro;
                entry.pro_until = changes.pro_until;
            }
            None => {
                if changes.pro_until.is_some() {
                    entry.pro_until = changes.pro_until;
                }
            }
        }
        if let Some(hash) = &changes.password_hash {
            entry.password_hash = hash.clone();
        }

        Ok(Some(entry.clone()))
    }

    async fn delete_account(&self, id: Uuid) -> AppResult<bool> {
        let Some((_, removed)) = self.accounts.remove(&id) else {
            return Ok(false);
        };

        self.emails.remove(&removed.email);
        for link_id in self.owner_link_ids(id) {
            LinkStore::delete(self, link_id).await?;
        }

        Ok(true)
    }

    async fn revoke_expired_pro(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<bool> {
        let Some(mut entry) = self.accounts.get_mut(&id) else {
            return Ok(false);
        };

        let expired = entry.pro_until.is_some_and(|until| until <= now);
        if entry.is_pro && expired {
            entry.is_pro = false;
            return Ok(true);
        }

        Ok(false)
    }

    async fn account_stats(&self, today_start: DateTime<Utc>) -> AppResult<AccountStats> {
        let mut stats = AccountStats::default();

        for entry in self.accounts.iter() {
            stats.total_users += 1;
            if entry.is_pro {
                stats.pro_users += 1;
            }
            if entry.created_at >= today_start {
                stats.new_users_today += 1;
            }
        }

        Ok(stats)
    }
}
