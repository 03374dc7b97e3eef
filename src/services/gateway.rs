//! Authenticated create/update/delete surface for dynamic links.

use crate::auth::Actor;
use crate::cache::{invalidate_quietly, Cache};
use crate::error::{AppError, AppResult};
use crate::models::{empty_style_options, CreateLinkRequest, MappingPatch, ShortLinkMapping};
use crate::registry::{Access, Registry};
use crate::services::target;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

#[derive(Clone)]
pub struct LinkGateway {
    registry: Registry,
    cache: Option<Cache>,
}

fn require_actor(actor: Option<&Actor>) -> AppResult<&Actor> {
    actor.ok_or_else(|| AppError::Unauthenticated("Sign in to manage dynamic links".to_string()))
}

fn access_for(actor: &Actor) -> Access {
    if actor.is_admin() {
        Access::Admin
    } else {
        Access::Owner(actor.user_id)
    }
}

fn check_target(raw: &str) -> AppResult<()> {
    if target::resolve(raw).is_none() {
        return Err(AppError::BadRequest(format!(
            "Target must be an absolute http(s) URL, a host name, or a path starting with '/': {}",
            raw
        )));
    }
    Ok(())
}

/// Length rules apply to the trimmed text; a missing or null style is `{}`
fn trim_request(request: CreateLinkRequest) -> CreateLinkRequest {
    let style_options = if request.style_options.is_null() {
        empty_style_options()
    } else {
        request.style_options
    };

    CreateLinkRequest {
        display_name: request.display_name.trim().to_string(),
        target_url: request.target_url.trim().to_string(),
        style_options,
    }
}

impl LinkGateway {
    pub fn new(registry: Registry, cache: Option<Cache>) -> Self {
        Self { registry, cache }
    }

    /// Create a dynamic link. Requires a current Pro entitlement.
    pub async fn create_mapping(
        &self,
        actor: Option<&Actor>,
        request: CreateLinkRequest,
    ) -> AppResult<ShortLinkMapping> {
        let actor = require_actor(actor)?;
        if !actor.pro {
            return Err(AppError::EntitlementRequired);
        }

        let request = trim_request(request);
        request
            .validate()
            .map_err(|e| AppError::BadRequest(format!("Validation failed: {}", e)))?;
        check_target(&request.target_url)?;

        let mapping = self
            .registry
            .create(
                actor.user_id,
                &request.display_name,
                &request.target_url,
                request.style_options,
            )
            .await?;

        info!(
            link_id = %mapping.id,
            short_code = %mapping.short_code,
            owner_id = %actor.user_id,
            "Dynamic link created"
        );
        Ok(mapping)
    }

    /// Change the display name and/or target of a link the actor owns
    pub async fn update_mapping(
        &self,
        actor: Option<&Actor>,
        id: Uuid,
        patch: MappingPatch,
    ) -> AppResult<ShortLinkMapping> {
        let actor = require_actor(actor)?;

        if patch.is_empty() {
            return Err(AppError::BadRequest(
                "Nothing to update: provide displayName and/or targetUrl".to_string(),
            ));
        }

        let patch = MappingPatch {
            display_name: patch.display_name.map(|name| name.trim().to_string()),
            target_url: patch.target_url.map(|url| url.trim().to_string()),
        };
        patch
            .validate()
            .map_err(|e| AppError::BadRequest(format!("Validation failed: {}", e)))?;
        if let Some(target_url) = &patch.target_url {
            check_target(target_url)?;
        }

        let mapping = self.registry.update(id, access_for(actor), &patch).await?;
        invalidate_quietly(self.cache.as_ref(), &mapping.short_code).await;

        info!(link_id = %id, actor = %actor.user_id, "Dynamic link updated");
        Ok(mapping)
    }

    pub async fn delete_mapping(&self, actor: Option<&Actor>, id: Uuid) -> AppResult<()> {
        let actor = require_actor(actor)?;

        let removed = self.registry.delete(id, access_for(actor)).await?;
        invalidate_quietly(self.cache.as_ref(), &removed.short_code).await;

        info!(link_id = %id, actor = %actor.user_id, "Dynamic link deleted");
        Ok(())
    }

    /// The actor's own links, newest first
    pub async fn list_mappings(&self, actor: Option<&Actor>) -> AppResult<Vec<ShortLinkMapping>> {
        let actor = require_actor(actor)?;
        self.registry.list_by_owner(actor.user_id).await
    }

    /// Administrative counter reset
    pub async fn reset_clicks(&self, actor: Option<&Actor>, id: Uuid) -> AppResult<ShortLinkMapping> {
        let actor = require_actor(actor)?;
        if !actor.is_admin() {
            return Err(AppError::Forbidden("Administrator role required".to_string()));
        }

        let mapping = self.registry.reset_clicks(id).await?;
        info!(link_id = %id, admin = %actor.user_id, "Click counter reset");
        Ok(mapping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::models::Role;
    use serde_json::json;
    use std::sync::Arc;

    fn gateway() -> LinkGateway {
        LinkGateway::new(Registry::new(Arc::new(MemoryStore::new()), 6, 5), None)
    }

    fn actor(pro: bool) -> Actor {
        Actor {
            user_id: Uuid::new_v4(),
            role: Role::User,
            pro,
        }
    }

    fn request(target_url: &str) -> CreateLinkRequest {
        CreateLinkRequest {
            display_name: "Flyer".to_string(),
            target_url: target_url.to_string(),
            style_options: json!({ "dotsType": "rounded" }),
        }
    }

    #[tokio::test]
    async fn test_create_requires_actor() {
        let err = gateway()
            .create_mapping(None, request("acme.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn test_create_requires_pro() {
        let err = gateway()
            .create_mapping(Some(&actor(false)), request("acme.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::EntitlementRequired));
    }

    #[tokio::test]
    async fn test_create_rejects_unusable_target() {
        let err = gateway()
            .create_mapping(Some(&actor(true)), request("//evil.example"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_owner_updates_and_lists() {
        let gateway = gateway();
        let owner = actor(true);
        let created = gateway
            .create_mapping(Some(&owner), request("acme.com"))
            .await
            .unwrap();

        let patch = MappingPatch {
            display_name: Some(" Poster ".to_string()),
            target_url: Some("https://acme.com/spring".to_string()),
        };
        let updated = gateway
            .update_mapping(Some(&owner), created.id, patch)
            .await
            .unwrap();

        assert_eq!(updated.display_name, "Poster");
        assert_eq!(updated.target_url, "https://acme.com/spring");
        assert_eq!(updated.short_code, created.short_code);

        let listed = gateway.list_mappings(Some(&owner)).await.unwrap();
        assert_eq!(listed, vec![updated]);
        assert!(gateway.list_mappings(Some(&actor(true))).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_does_not_need_pro() {
        let gateway = gateway();
        let mut owner = actor(true);
        let created = gateway
            .create_mapping(Some(&owner), request("acme.com"))
            .await
            .unwrap();

        owner.pro = false;
        let patch = MappingPatch {
            display_name: Some("Renamed".to_string()),
            target_url: None,
        };
        assert!(gateway.update_mapping(Some(&owner), created.id, patch).await.is_ok());
    }

    #[tokio::test]
    async fn test_empty_patch_is_rejected() {
        let gateway = gateway();
        let owner = actor(true);
        let created = gateway
            .create_mapping(Some(&owner), request("acme.com"))
            .await
            .unwrap();

        let err = gateway
            .update_mapping(Some(&owner), created.id, MappingPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_blank_display_name_is_rejected_on_create() {
        let mut blank = request("acme.com");
        blank.display_name = "   ".to_string();

        let err = gateway()
            .create_mapping(Some(&actor(true)), blank)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_blank_display_name_is_rejected_on_update() {
        let gateway = gateway();
        let owner = actor(true);
        let created = gateway
            .create_mapping(Some(&owner), request("acme.com"))
            .await
            .unwrap();

        let patch = MappingPatch {
            display_name: Some(" \t ".to_string()),
            target_url: None,
        };
        let err = gateway
            .update_mapping(Some(&owner), created.id, patch)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let listed = gateway.list_mappings(Some(&owner)).await.unwrap();
        assert_eq!(listed[0].display_name, "Flyer");
    }

    #[tokio::test]
    async fn test_null_style_options_store_empty_object() {
        let mut plain = request("acme.com");
        plain.style_options = serde_json::Value::Null;

        let created = gateway()
            .create_mapping(Some(&actor(true)), plain)
            .await
            .unwrap();
        assert_eq!(created.style_options, json!({}));
    }

    #[tokio::test]
    async fn test_delete_twice_is_not_found() {
        let gateway = gateway();
        let owner = actor(true);
        let created = gateway
            .create_mapping(Some(&owner), request("acme.com"))
            .await
            .unwrap();

        gateway.delete_mapping(Some(&owner), created.id).await.unwrap();
        let err = gateway
            .delete_mapping(Some(&owner), created.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_reset_clicks_is_admin_only() {
        let gateway = gateway();
        let owner = actor(true);
        let created = gateway
            .create_mapping(Some(&owner), request("acme.com"))
            .await
            .unwrap();

        let err = gateway
            .reset_clicks(Some(&owner), created.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let admin = Actor {
            user_id: Uuid::new_v4(),
            role: Role::Admin,
            pro: false,
        };
        let reset = gateway.reset_clicks(Some(&admin), created.id).await.unwrap();
        assert_eq!(reset.click_count, 0);
    }
}
