//! Shared fixtures: the full router over the in-memory store.
#![allow(dead_code)]

use axum_test::TestServer;
use qrfast::config::{
    AuthConfig, CacheConfig, Config, CorsConfig, DatabaseConfig, JobsConfig, LinkConfig,
    RateLimitConfig, ServerConfig,
};
use qrfast::jobs::{create_job_channel, Worker, WorkerConfig};
use qrfast::memory::MemoryStore;
use qrfast::models::AccountChanges;
use qrfast::registry::Registry;
use qrfast::routes::create_router;
use qrfast::state::AppState;
use qrfast::store::{AccountStore, LinkStore};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub const PASSWORD: &str = "correct horse battery";

pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
        },
        database: DatabaseConfig {
            url: "postgresql://localhost/qrfast_test".to_string(),
            max_connections: 5,
            min_connections: 1,
            acquire_timeout_seconds: 5,
        },
        cache: CacheConfig {
            enabled: false,
            url: "redis://127.0.0.1:6379".to_string(),
            max_connections: 5,
            default_ttl_seconds: 60,
        },
        links: LinkConfig {
            short_code_length: 6,
            short_code_max_attempts: 5,
            base_url: "https://qr.example.com".to_string(),
            landing_path: "/".to_string(),
        },
        auth: AuthConfig {
            jwt_secret: "integration_secret_that_is_long_enough".to_string(),
            jwt_expiration_hours: 1,
            bcrypt_cost: 4,
        },
        rate_limit: RateLimitConfig {
            requests_per_minute: 30_000,
            burst_size: 10_000,
        },
        cors: CorsConfig {
            allowed_origins: vec!["*".to_string()],
        },
        jobs: JobsConfig {
            max_retries: 1,
            retry_delay_ms: 10,
        },
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub store: Arc<MemoryStore>,
}

pub fn spawn_app() -> TestApp {
    spawn_app_with(test_config())
}

pub fn spawn_app_with(config: Config) -> TestApp {
    let store = Arc::new(MemoryStore::new());

    let (job_sender, job_receiver) = create_job_channel();
    let worker = Worker::new(
        Registry::new(store.clone(), 6, 5),
        store.clone(),
        job_receiver,
    )
    .with_config(WorkerConfig::from(&config.jobs));
    tokio::spawn(worker.run());

    let state = Arc::new(AppState::build(
        store.clone(),
        store.clone(),
        None,
        job_sender,
        &config,
    ));
    let router = create_router(state.clone(), &config.cors, &config.rate_limit)
        .expect("router should build");
    let server = TestServer::new(router).expect("test server should start");

    TestApp {
        server,
        state,
        store,
    }
}

impl TestApp {
    /// Register an account and return its id
    pub async fn register(&self, email: &str) -> Uuid {
        let response = self
            .server
            .post("/api/auth/register")
            .json(&json!({ "email": email, "password": PASSWORD, "name": "Tester" }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);

        let body: Value = response.json();
        body["id"]
            .as_str()
            .and_then(|id| Uuid::parse_str(id).ok())
            .expect("registered profile has an id")
    }

    pub async fn login(&self, email: &str) -> String {
        let response = self
            .server
            .post("/api/auth/login")
            .json(&json!({ "email": email, "password": PASSWORD }))
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        body["token"].as_str().expect("login returns a token").to_string()
    }

    pub async fn set_pro(&self, id: Uuid, pro_until: Option<chrono::DateTime<chrono::Utc>>) {
        let changes = AccountChanges {
            is_pro: Some(true),
            pro_until,
            ..Default::default()
        };
        self.store.update_account(id, &changes).await.unwrap();
    }

    /// Registered Pro user: (id, token)
    pub async fn pro_user(&self, email: &str) -> (Uuid, String) {
        let id = self.register(email).await;
        self.set_pro(id, None).await;
        (id, self.login(email).await)
    }

    /// Registered administrator: (id, token)
    pub async fn admin(&self, email: &str) -> (Uuid, String) {
        let account = self
            .state
            .accounts
            .create_admin(email, PASSWORD, None)
            .await
            .unwrap();
        (account.id, self.login(email).await)
    }

    /// Create a link through the API and return the response body
    pub async fn create_link(&self, token: &str, name: &str, target: &str) -> Value {
        let response = self
            .server
            .post("/api/links")
            .authorization_bearer(token)
            .json(&json!({ "displayName": name, "targetUrl": target }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json()
    }

    /// Wait until the worker has applied `expected` clicks to `short_code`
    pub async fn wait_for_clicks(&self, short_code: &str, expected: i64) -> i64 {
        let mut count = 0;
        for _ in 0..200 {
            count = self
                .store
                .find_by_code(short_code)
                .await
                .unwrap()
                .map_or(0, |m| m.click_count);
            if count >= expected {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        count
    }
}
