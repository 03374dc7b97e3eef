use crate::auth::AuthService;
use crate::cache::Cache;
use crate::config::{Config, LinkConfig};
use crate::jobs::JobSender;
use crate::registry::Registry;
use crate::services::{AccountService, LinkGateway, Resolver};
use crate::store::{AccountStore, LinkStore};
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// Wrapped in `Arc` and handed to every handler through Axum's `State`
/// extractor. The stores behind it are trait objects, so the same state runs
/// over PostgreSQL in production and the in-memory store in tests.
#[derive(Clone)]
pub struct AppState {
    /// Mapping storage with code generation and ownership rules
    pub registry: Registry,

    /// Public redirect path
    pub resolver: Resolver,

    /// Authenticated create/update/delete of links
    pub gateway: LinkGateway,

    /// Registration, login and account administration
    pub accounts: AccountService,

    /// Redis cache of short code lookups, when enabled
    pub cache: Option<Cache>,

    /// JWT authentication service for token generation and validation
    pub auth_service: AuthService,

    /// Background job sender (click increments, Pro revocation)
    pub job_sender: JobSender,

    /// Short code and public URL settings
    pub links: LinkConfig,
}

impl AppState {
    /// Wire the services over the given stores.
    pub fn build(
        link_store: Arc<dyn LinkStore>,
        account_store: Arc<dyn AccountStore>,
        cache: Option<Cache>,
        job_sender: JobSender,
        config: &Config,
    ) -> Self {
        let registry = Registry::new(
            link_store,
            config.links.short_code_length,
            config.links.short_code_max_attempts,
        );
        let auth_service = AuthService::new(
            config.auth.jwt_secret.clone(),
            config.auth.jwt_expiration_hours,
            config.auth.bcrypt_cost,
        );

        let resolver = Resolver::new(
            registry.clone(),
            cache.clone(),
            job_sender.clone(),
            config.links.landing_path.clone(),
        );
        let gateway = LinkGateway::new(registry.clone(), cache.clone());
        let accounts = AccountService::new(
            account_store,
            registry.clone(),
            cache.clone(),
            auth_service.clone(),
            job_sender.clone(),
        );

        Self {
            registry,
            resolver,
            gateway,
            accounts,
            cache,
            auth_service,
            job_sender,
            links: config.links.clone(),
        }
    }
}
