use super::{api_path, TestApp, TEST_ORIGIN};
use axum_test::TestResponse;
use brandmark_core::models::UploadTicket;
use brandmark_core::ContentDigest;
use bytes::Bytes;
use serde_json::json;

use super::auth::TestUser;

/// A tiny PNG: signature plus IHDR
pub fn sample_png() -> Vec<u8> {
    vec![
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x02, 0x00, 0x00, 0x00, 0x90,
        0x77, 0x53, 0xDE,
    ]
}

pub async fn request_ticket(
    app: &TestApp,
    user: &TestUser,
    payload: &[u8],
    content_type: &str,
) -> TestResponse {
    request_ticket_with(
        app,
        user,
        json!({
            "file_name": "logo.png",
            "byte_size": payload.len(),
            "content_type": content_type,
            "digest": ContentDigest::compute(payload).to_base64(),
        }),
    )
    .await
}

pub async fn request_ticket_with(
    app: &TestApp,
    user: &TestUser,
    body: serde_json::Value,
) -> TestResponse {
    app.client()
        .post(&api_path(&format!(
            "/organizations/{}/uploads/direct",
            user.organization_id
        )))
        .add_header("Authorization", user.bearer())
        .json(&body)
        .await
}

/// Issue a ticket for `payload` as a PNG and return it.
pub async fn issue_png_ticket(app: &TestApp, user: &TestUser, payload: &[u8]) -> UploadTicket {
    let response = request_ticket(app, user, payload, "image/png").await;
    assert_eq!(response.status_code(), 200, "ticket: {}", response.text());
    response.json()
}

/// PUT `body` to the ticket's transfer URL, sending the headers the ticket lists.
pub async fn transfer(app: &TestApp, ticket: &UploadTicket, body: &[u8]) -> TestResponse {
    let relative = ticket
        .transfer_url
        .strip_prefix(TEST_ORIGIN)
        .expect("Transfer URL should point at the local gateway");
    let (path, query) = relative.split_once('?').expect("Transfer URL has a token");
    let token = query
        .strip_prefix("token=")
        .expect("Transfer URL query is the token");

    let mut request = app
        .client()
        .put(path)
        .add_query_param("token", token)
        .bytes(Bytes::copy_from_slice(body));
    for (name, value) in &ticket.headers {
        request = if name.eq_ignore_ascii_case("content-type") {
            request.content_type(value)
        } else {
            request.add_header(name.clone(), value.clone())
        };
    }
    request.await
}

pub async fn finalize(app: &TestApp, user: &TestUser, object_key: &str) -> TestResponse {
    app.client()
        .post(&api_path(&format!(
            "/organizations/{}/settings/logo",
            user.organization_id
        )))
        .add_header("Authorization", user.bearer())
        .json(&json!({ "object_key": object_key }))
        .await
}

pub async fn get_settings(app: &TestApp, user: &TestUser) -> TestResponse {
    app.client()
        .get(&api_path(&format!(
            "/organizations/{}/settings",
            user.organization_id
        )))
        .add_header("Authorization", user.bearer())
        .await
}

/// Issue, transfer and finalize `payload`; returns the committed key.
pub async fn upload_logo(app: &TestApp, user: &TestUser, payload: &[u8]) -> String {
    let ticket = issue_png_ticket(app, user, payload).await;
    let put = transfer(app, &ticket, payload).await;
    assert_eq!(put.status_code(), 200, "transfer: {}", put.text());
    let done = finalize(app, user, &ticket.object_key).await;
    assert_eq!(done.status_code(), 200, "finalize: {}", done.text());
    ticket.object_key
}
