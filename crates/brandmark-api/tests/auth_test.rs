mod helpers;

use brandmark_core::models::UserRole;
use helpers::auth::{login_as, register_admin};
use helpers::uploads::{finalize, get_settings, request_ticket, sample_png, upload_logo};
use helpers::{api_path, setup_test_app};

#[tokio::test]
async fn test_missing_token_is_unauthenticated() {
    let app = setup_test_app().await;
    let owner = uuid::Uuid::new_v4();

    let response = app
        .client()
        .get(&api_path(&format!("/organizations/{}/settings", owner)))
        .await;

    assert_eq!(response.status_code(), 401);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "UNAUTHENTICATED");
}

#[tokio::test]
async fn test_garbage_token_is_unauthenticated() {
    let app = setup_test_app().await;
    let owner = uuid::Uuid::new_v4();

    for header in ["Bearer not-a-jwt", "Basic dXNlcjpwYXNz"] {
        let response = app
            .client()
            .post(&api_path(&format!("/organizations/{}/uploads/direct", owner)))
            .add_header("Authorization", header)
            .json(&serde_json::json!({}))
            .await;
        assert_eq!(response.status_code(), 401, "header {}", header);
    }
}

#[tokio::test]
async fn test_member_cannot_request_ticket() {
    let app = setup_test_app().await;
    let admin = register_admin(&app);
    let member = login_as(&app, admin.organization_id, UserRole::Member);

    let response = request_ticket(&app, &member, &sample_png(), "image/png").await;
    assert_eq!(response.status_code(), 403);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "UNAUTHORIZED");
}

/// An administrator of one organization cannot touch another organization
#[tokio::test]
async fn test_cross_tenant_requests_are_rejected() {
    let app = setup_test_app().await;
    let tenant_a = register_admin(&app);
    let tenant_b = register_admin(&app);
    let key_a = upload_logo(&app, &tenant_a, &sample_png()).await;

    // B asks for a ticket in A's namespace
    let response = app
        .client()
        .post(&api_path(&format!(
            "/organizations/{}/uploads/direct",
            tenant_a.organization_id
        )))
        .add_header("Authorization", tenant_b.bearer())
        .json(&serde_json::json!({
            "file_name": "logo.png",
            "byte_size": 10,
            "content_type": "image/png",
            "digest": "XUFAKrxLKna5cZ2REBfFkg==",
        }))
        .await;
    assert_eq!(response.status_code(), 403);

    // B tries to adopt A's object as its own logo
    let response = finalize(&app, &tenant_b, &key_a).await;
    assert_eq!(response.status_code(), 403);

    let settings: serde_json::Value = get_settings(&app, &tenant_b).await.json();
    assert!(settings["logo_object_key"].is_null());
}

#[tokio::test]
async fn test_health_is_public() {
    let app = setup_test_app().await;
    let response = app.client().get("/health").await;
    assert_eq!(response.status_code(), 200);
    let body: serde_json::Value = response.json();
    assert_eq!(body["settings_store"], "healthy");
    assert_eq!(body["storage_backend"], "local");
}

#[tokio::test]
async fn test_openapi_is_served() {
    let app = setup_test_app().await;
    let response = app.client().get("/api/openapi.json").await;
    assert_eq!(response.status_code(), 200);
    let body: serde_json::Value = response.json();
    assert!(body["paths"]
        .get("/api/v0/organizations/{owner_id}/settings/logo")
        .is_some());
}
