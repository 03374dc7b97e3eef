//! Integration tests for the qrfast HTTP API over the in-memory store.

mod common;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use chrono::{Duration, Utc};
use common::{spawn_app, PASSWORD};
use qrfast::auth::AuthService;
use qrfast::store::AccountStore;
use serde_json::{json, Value};

mod auth_tests {
    use super::*;

    #[tokio::test]
    async fn test_register_then_login() {
        let app = spawn_app();
        app.register("Owner@Example.com").await;

        let response = app
            .server
            .post("/api/auth/login")
            .json(&json!({ "email": "owner@example.com", "password": PASSWORD }))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
        assert_eq!(body["user"]["email"], "owner@example.com");
        assert_eq!(body["user"]["role"], "USER");
        assert_eq!(body["user"]["isPro"], false);
    }

    #[tokio::test]
    async fn test_duplicate_registration_conflicts() {
        let app = spawn_app();
        app.register("dup@example.com").await;

        let response = app
            .server
            .post("/api/auth/register")
            .json(&json!({ "email": "DUP@example.com", "password": PASSWORD }))
            .await;

        response.assert_status(StatusCode::CONFLICT);
        let body: Value = response.json();
        assert_eq!(body["error"], "CONFLICT");
    }

    #[tokio::test]
    async fn test_wrong_password_is_unauthenticated() {
        let app = spawn_app();
        app.register("owner@example.com").await;

        let response = app
            .server
            .post("/api/auth/login")
            .json(&json!({ "email": "owner@example.com", "password": "not the password" }))
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: Value = response.json();
        assert_eq!(body["error"], "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn test_garbage_token_is_unauthenticated() {
        let app = spawn_app();

        let response = app
            .server
            .get("/api/links")
            .authorization_bearer("not-a-jwt")
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
    }
}

mod link_tests {
    use super::*;

    #[tokio::test]
    async fn test_acme_scenario() {
        let app = spawn_app();
        let (owner_id, token) = app.pro_user("owner@example.com").await;

        let created = app.create_link(&token, "Acme", "acme.com").await;
        let code = created["shortCode"].as_str().unwrap().to_string();

        assert_eq!(code.len(), 6);
        assert_eq!(created["ownerId"], owner_id.to_string());
        assert_eq!(created["targetUrl"], "acme.com");
        assert_eq!(created["clickCount"], 0);
        assert_eq!(
            created["shortUrl"],
            format!("https://qr.example.com/go/{}", code)
        );

        let response = app.server.get(&format!("/go/{}", code)).await;
        response.assert_status(StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.header("location"), "https://acme.com");

        assert_eq!(app.wait_for_clicks(&code, 1).await, 1);
    }

    #[tokio::test]
    async fn test_unknown_code_redirects_to_landing() {
        let app = spawn_app();

        let response = app.server.get("/go/zzzzzz").await;

        response.assert_status(StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.header("location"), "/");
    }

    #[tokio::test]
    async fn test_malformed_code_is_bad_request() {
        let app = spawn_app();

        let response = app.server.get("/go/has.dot").await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"], "BAD_REQUEST");

        let too_long = "a".repeat(33);
        app.server
            .get(&format!("/go/{}", too_long))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        app.server.get("/go/").await.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_requires_authentication() {
        let app = spawn_app();

        let response = app
            .server
            .post("/api/links")
            .json(&json!({ "displayName": "Menu", "targetUrl": "acme.com" }))
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_create_requires_pro() {
        let app = spawn_app();
        app.register("free@example.com").await;
        let token = app.login("free@example.com").await;

        let response = app
            .server
            .post("/api/links")
            .authorization_bearer(&token)
            .json(&json!({ "displayName": "Menu", "targetUrl": "acme.com" }))
            .await;

        response.assert_status(StatusCode::PAYMENT_REQUIRED);
        let body: Value = response.json();
        assert_eq!(body["error"], "ENTITLEMENT_REQUIRED");
    }

    #[tokio::test]
    async fn test_blank_display_name_is_rejected() {
        let app = spawn_app();
        let (_, token) = app.pro_user("blank@example.com").await;

        let response = app
            .server
            .post("/api/links")
            .authorization_bearer(&token)
            .json(&json!({ "displayName": "   ", "targetUrl": "acme.com" }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let created = app.create_link(&token, "Menu", "acme.com").await;
        assert_eq!(created["styleOptions"], json!({}));

        let id = created["id"].as_str().unwrap();
        app.server
            .patch(&format!("/api/links/{}", id))
            .authorization_bearer(&token)
            .json(&json!({ "displayName": "\t" }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_expired_pro_at_login_cannot_create() {
        let app = spawn_app();
        let id = app.register("lapsed@example.com").await;
        app.set_pro(id, Some(Utc::now() - Duration::hours(1))).await;
        let token = app.login("lapsed@example.com").await;

        let response = app
            .server
            .post("/api/links")
            .authorization_bearer(&token)
            .json(&json!({ "displayName": "Menu", "targetUrl": "acme.com" }))
            .await;

        response.assert_status(StatusCode::PAYMENT_REQUIRED);
    }

    #[tokio::test]
    async fn test_token_outliving_pro_is_downgraded_and_revoked() {
        let app = spawn_app();
        let id = app.register("stale@example.com").await;
        app.set_pro(id, Some(Utc::now() + Duration::milliseconds(1500))).await;

        // Token minted while Pro was still current
        let account = app.store.find_account_by_id(id).await.unwrap().unwrap();
        let auth = AuthService::new(
            common::test_config().auth.jwt_secret,
            1,
            4,
        );
        let token = auth.generate_token(&account).unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2000)).await;

        let response = app
            .server
            .post("/api/links")
            .authorization_bearer(&token)
            .json(&json!({ "displayName": "Menu", "targetUrl": "acme.com" }))
            .await;
        response.assert_status(StatusCode::PAYMENT_REQUIRED);

        let mut revoked = false;
        for _ in 0..200 {
            let stored = app.store.find_account_by_id(id).await.unwrap().unwrap();
            if !stored.is_pro {
                revoked = true;
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(revoked, "lapsed Pro flag should be revoked by the worker");
    }

    #[tokio::test]
    async fn test_invalid_target_is_rejected() {
        let app = spawn_app();
        let (_, token) = app.pro_user("owner@example.com").await;

        let response = app
            .server
            .post("/api/links")
            .authorization_bearer(&token)
            .json(&json!({ "displayName": "Menu", "targetUrl": "//evil.example" }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_is_own_links_newest_first() {
        let app = spawn_app();
        let (_, owner) = app.pro_user("owner@example.com").await;
        let (_, other) = app.pro_user("other@example.com").await;

        app.create_link(&owner, "First", "a.example.com").await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        app.create_link(&owner, "Second", "b.example.com").await;
        app.create_link(&other, "Theirs", "c.example.com").await;

        let response = app.server.get("/api/links").authorization_bearer(&owner).await;
        response.assert_status_ok();

        let links: Vec<Value> = response.json();
        let names: Vec<&str> = links
            .iter()
            .filter_map(|l| l["displayName"].as_str())
            .collect();
        assert_eq!(names, vec!["Second", "First"]);
    }

    #[tokio::test]
    async fn test_owner_updates_target_and_redirect_follows() {
        let app = spawn_app();
        let (_, token) = app.pro_user("owner@example.com").await;
        let created = app.create_link(&token, "Menu", "acme.com").await;
        let id = created["id"].as_str().unwrap();
        let code = created["shortCode"].as_str().unwrap();

        let response = app
            .server
            .patch(&format!("/api/links/{}", id))
            .authorization_bearer(&token)
            .json(&json!({ "targetUrl": "http://acme.com/spring" }))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["displayName"], "Menu");
        assert_eq!(body["shortCode"], code);

        let redirect = app.server.get(&format!("/go/{}", code)).await;
        assert_eq!(redirect.header("location"), "http://acme.com/spring");
    }

    #[tokio::test]
    async fn test_non_owner_cannot_update_or_delete() {
        let app = spawn_app();
        let (_, owner) = app.pro_user("owner@example.com").await;
        let (_, stranger) = app.pro_user("stranger@example.com").await;
        let created = app.create_link(&owner, "Menu", "acme.com").await;
        let id = created["id"].as_str().unwrap();

        app.server
            .patch(&format!("/api/links/{}", id))
            .authorization_bearer(&stranger)
            .json(&json!({ "targetUrl": "evil.example.com" }))
            .await
            .assert_status(StatusCode::FORBIDDEN);
        app.server
            .delete(&format!("/api/links/{}", id))
            .authorization_bearer(&stranger)
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let links: Vec<Value> = app
            .server
            .get("/api/links")
            .authorization_bearer(&owner)
            .await
            .json();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0]["targetUrl"], "acme.com");
    }

    #[tokio::test]
    async fn test_delete_then_code_lands_and_second_delete_is_not_found() {
        let app = spawn_app();
        let (_, token) = app.pro_user("owner@example.com").await;
        let created = app.create_link(&token, "Menu", "acme.com").await;
        let id = created["id"].as_str().unwrap();
        let code = created["shortCode"].as_str().unwrap();

        app.server
            .delete(&format!("/api/links/{}", id))
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::NO_CONTENT);

        let redirect = app.server.get(&format!("/go/{}", code)).await;
        assert_eq!(redirect.header("location"), "/");

        app.server
            .delete(&format!("/api/links/{}", id))
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}

mod admin_tests {
    use super::*;

    #[tokio::test]
    async fn test_admin_endpoints_reject_regular_users() {
        let app = spawn_app();
        let (_, token) = app.pro_user("owner@example.com").await;

        app.server
            .get("/api/admin/stats")
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::FORBIDDEN);
        app.server
            .get("/api/admin/users")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_stats_and_user_listing() {
        let app = spawn_app();
        let (_, admin) = app.admin("admin@example.com").await;
        let (owner_id, owner) = app.pro_user("owner@example.com").await;
        let created = app.create_link(&owner, "Menu", "acme.com").await;
        let code = created["shortCode"].as_str().unwrap();
        app.server.get(&format!("/go/{}", code)).await;
        app.wait_for_clicks(code, 1).await;

        let stats: Value = app
            .server
            .get("/api/admin/stats")
            .authorization_bearer(&admin)
            .await
            .json();
        assert_eq!(stats["totalUsers"], 2);
        assert_eq!(stats["totalLinks"], 1);
        assert_eq!(stats["totalClicks"], 1);
        assert_eq!(stats["history"].as_array().map(Vec::len), Some(7));

        let users: Vec<Value> = app
            .server
            .get("/api/admin/users")
            .authorization_bearer(&admin)
            .await
            .json();
        let owner_row = users
            .iter()
            .find(|u| u["id"] == owner_id.to_string())
            .expect("owner is listed");
        assert_eq!(owner_row["linkCount"], 1);
    }

    #[tokio::test]
    async fn test_admin_can_edit_foreign_link_and_reset_clicks() {
        let app = spawn_app();
        let (_, admin) = app.admin("admin@example.com").await;
        let (_, owner) = app.pro_user("owner@example.com").await;
        let created = app.create_link(&owner, "Menu", "acme.com").await;
        let id = created["id"].as_str().unwrap();
        let code = created["shortCode"].as_str().unwrap();

        app.server.get(&format!("/go/{}", code)).await;
        app.wait_for_clicks(code, 1).await;

        app.server
            .patch(&format!("/api/links/{}", id))
            .authorization_bearer(&admin)
            .json(&json!({ "displayName": "Moderated" }))
            .await
            .assert_status_ok();

        let response = app
            .server
            .post(&format!("/api/admin/links/{}/reset-clicks", id))
            .authorization_bearer(&admin)
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["clickCount"], 0);
        assert_eq!(body["displayName"], "Moderated");
    }

    #[tokio::test]
    async fn test_admin_grants_pro_and_deletes_user() {
        let app = spawn_app();
        let (admin_id, admin) = app.admin("admin@example.com").await;
        let user_id = app.register("user@example.com").await;

        let response = app
            .server
            .patch(&format!("/api/admin/users/{}", user_id))
            .authorization_bearer(&admin)
            .json(&json!({ "isPro": true }))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["isPro"], true);

        app.server
            .delete(&format!("/api/admin/users/{}", admin_id))
            .authorization_bearer(&admin)
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        app.server
            .delete(&format!("/api/admin/users/{}", user_id))
            .authorization_bearer(&admin)
            .await
            .assert_status(StatusCode::NO_CONTENT);
        assert!(app.store.find_account_by_id(user_id).await.unwrap().is_none());
    }
}

mod plumbing_tests {
    use super::*;

    #[tokio::test]
    async fn test_health_reports_database_and_disabled_cache() {
        let app = spawn_app();

        let response = app.server.get("/_health").await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["database"]["status"], "healthy");
        assert_eq!(body["cache"]["status"], "disabled");
    }

    #[tokio::test]
    async fn test_request_id_is_echoed_or_generated() {
        let app = spawn_app();

        let echoed = app
            .server
            .get("/_health")
            .add_header(
                HeaderName::from_static("x-request-id"),
                HeaderValue::from_static("req-123"),
            )
            .await;
        assert_eq!(echoed.header("x-request-id"), "req-123");

        let generated = app.server.get("/_health").await;
        assert_eq!(generated.header("x-request-id").len(), 36);
    }
}
