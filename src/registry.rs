use crate::error::{AppError, AppResult};
use crate::models::{LinkStats, MappingPatch, ShortLinkMapping};
use crate::services::short_code;
use crate::store::LinkStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Who is asking to change a mapping
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Access {
    /// Must match the mapping's owner
    Owner(Uuid),
    /// Administrative override
    Admin,
}

impl Access {
    fn permits(&self, mapping: &ShortLinkMapping) -> bool {
        match self {
            Access::Owner(owner_id) => *owner_id == mapping.owner_id,
            Access::Admin => true,
        }
    }
}

/// Durable mapping storage with code generation and ownership rules on top of a [`LinkStore`].
#[derive(Clone)]
pub struct Registry {
    store: Arc<dyn LinkStore>,
    code_length: usize,
    max_attempts: u32,
    generate: fn(usize) -> String,
}

impl Registry {
    pub fn new(store: Arc<dyn LinkStore>, code_length: usize, max_attempts: u32) -> Self {
        Self {
            store,
            code_length,
            max_attempts,
            generate: short_code::generate,
        }
    }

    /// Replace the code generator
    pub fn with_generator(mut self, generate: fn(usize) -> String) -> Self {
        self.generate = generate;
        self
    }

    /// Create a mapping under a freshly generated short code.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ShortCodeExhausted` if every attempt collided with an
    /// existing code.
    pub async fn create(
        &self,
        owner_id: Uuid,
        display_name: &str,
        target_url: &str,
        style_options: serde_json::Value,
    ) -> AppResult<ShortLinkMapping> {
        let mut mapping = ShortLinkMapping {
            id: Uuid::new_v4(),
            short_code: String::new(),
            owner_id,
            target_url: target_url.to_string(),
            display_name: display_name.to_string(),
            click_count: 0,
            style_options,
            created_at: Utc::now(),
        };

        for attempt in 1..=self.max_attempts {
            mapping.short_code = (self.generate)(self.code_length);

            match self.store.insert(&mapping).await {
                Ok(()) => {
                    debug!(short_code = %mapping.short_code, attempt, "Mapping created");
                    return Ok(mapping);
                }
                Err(AppError::ShortCodeExists(code)) => {
                    warn!(short_code = %code, attempt, "Short code collision, regenerating");
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::ShortCodeExhausted(self.max_attempts))
    }

    pub async fn get_by_short_code(&self, code: &str) -> AppResult<ShortLinkMapping> {
        self.store
            .find_by_code(code)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Short code {}", code)))
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<ShortLinkMapping> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Link {}", id)))
    }

    /// Mappings of one owner, newest first
    pub async fn list_by_owner(&self, owner_id: Uuid) -> AppResult<Vec<ShortLinkMapping>> {
        self.store.list_by_owner(owner_id).await
    }

    pub async fn update(
        &self,
        id: Uuid,
        access: Access,
        patch: &MappingPatch,
    ) -> AppResult<ShortLinkMapping> {
        self.authorize(id, access).await?;

        self.store
            .update(id, patch)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Link {}", id)))
    }

    /// Returns the removed mapping
    pub async fn delete(&self, id: Uuid, access: Access) -> AppResult<ShortLinkMapping> {
        let mapping = self.authorize(id, access).await?;

        if !self.store.delete(id).await? {
            return Err(AppError::NotFound(format!("Link {}", id)));
        }

        Ok(mapping)
    }

    /// Record one hit; unknown codes are ignored
    pub async fn increment_clicks(&self, code: &str) -> AppResult<()> {
        if !self.store.increment_clicks(code).await? {
            debug!(short_code = %code, "Click for a code that no longer exists");
        }
        Ok(())
    }

    pub async fn reset_clicks(&self, id: Uuid) -> AppResult<ShortLinkMapping> {
        self.store
            .reset_clicks(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Link {}", id)))
    }

    pub async fn stats(&self, since: DateTime<Utc>) -> AppResult<LinkStats> {
        self.store.link_stats(since).await
    }

    pub async fn ping(&self) -> AppResult<()> {
        self.store.ping().await
    }

    async fn authorize(&self, id: Uuid, access: Access) -> AppResult<ShortLinkMapping> {
        let mapping = self.get_by_id(id).await?;

        if !access.permits(&mapping) {
            return Err(AppError::Forbidden(format!("Link {} belongs to another account", id)));
        }

        Ok(mapping)
    }
}
