//! Public redirect path for dynamic QR codes.
//!
//! The redirect is decided first; the click is recorded afterwards by the
//! background worker, so scan latency never depends on the counter write.

use crate::cache::{Cache, CachedTarget};
use crate::error::AppError;
use crate::jobs::JobSender;
use crate::registry::Registry;
use crate::services::{short_code, target};
use tracing::{debug, info, warn};

/// Outcome of resolving a short code
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Known code with a usable target
    Target(String),
    /// Unknown code, unusable target, or failed lookup
    Landing(String),
    /// Empty or malformed code
    BadRequest,
}

impl Resolution {
    /// Redirect location, if this outcome redirects
    pub fn location(&self) -> Option<&str> {
        match self {
            Resolution::Target(location) | Resolution::Landing(location) => Some(location),
            Resolution::BadRequest => None,
        }
    }
}

#[derive(Clone)]
pub struct Resolver {
    registry: Registry,
    cache: Option<Cache>,
    clicks: JobSender,
    landing: String,
}

impl Resolver {
    pub fn new(registry: Registry, cache: Option<Cache>, clicks: JobSender, landing: String) -> Self {
        Self {
            registry,
            cache,
            clicks,
            landing,
        }
    }

    pub async fn resolve(&self, code: &str) -> Resolution {
        if !short_code::is_well_formed(code) {
            debug!(short_code = %code, "Rejected malformed short code");
            return Resolution::BadRequest;
        }

        let Some(found) = self.lookup(code).await else {
            return Resolution::Landing(self.landing.clone());
        };

        let Some(location) = target::resolve(&found.target_url) else {
            warn!(short_code = %code, target = %found.target_url, "Stored target is not redirectable");
            return Resolution::Landing(self.landing.clone());
        };

        self.clicks.increment_clicks(found.short_code);
        Resolution::Target(location)
    }

    /// Cache first, then the registry; every failure reads as a miss
    async fn lookup(&self, code: &str) -> Option<CachedTarget> {
        if let Some(cache) = &self.cache {
            match cache.get_target(code).await {
                Ok(Some(hit)) => return Some(hit),
                Ok(None) => {}
                Err(e) => warn!(short_code = %code, error = %e, "Cache lookup failed"),
            }
        }

        match self.registry.get_by_short_code(code).await {
            Ok(mapping) => {
                let found = CachedTarget {
                    short_code: mapping.short_code,
                    target_url: mapping.target_url,
                };

                if let Some(cache) = &self.cache {
                    match cache.fill_target(&found).await {
                        Ok(true) => {}
                        Ok(false) => debug!(short_code = %code, "Recently changed, not cached"),
                        Err(e) => warn!(short_code = %code, error = %e, "Failed to cache target"),
                    }
                }

                Some(found)
            }
            Err(AppError::NotFound(_)) => {
                info!(short_code = %code, "Unknown short code, sending to landing page");
                None
            }
            Err(e) => {
                warn!(short_code = %code, error = %e, "Lookup failed, sending to landing page");
                None
            }
        }
    }
}
