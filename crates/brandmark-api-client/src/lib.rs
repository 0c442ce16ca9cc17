//! HTTP client for the Brandmark API.
//!
//! Wraps the ticket, finalize and settings endpoints, performs the direct PUT to
//! storage with a single retry, and drives a whole logo upload through
//! [`LogoUploader`].

pub mod api;
pub mod transfer;
pub mod upload;

use anyhow::{Context, Result};
use brandmark_core::AppError;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "http://localhost:3000";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Authentication strategy for the API.
#[derive(Clone, Debug)]
pub enum Auth {
    /// `Authorization: Bearer {token}`
    Bearer(String),
    /// No credentials; only public routes will succeed
    Anonymous,
}

/// API version prefix, kept in step with the server.
pub fn api_prefix() -> &'static str {
    "/api/v0"
}

/// HTTP client for the Brandmark API with configurable auth.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    auth: Auth,
}

impl ApiClient {
    pub fn new(base_url: String, auth: Auth) -> Result<Self> {
        Self::with_timeout(base_url, auth, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Every request, including the PUT to storage, is bounded by `timeout`.
    pub fn with_timeout(base_url: String, auth: Auth, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
        })
    }

    /// Create client from environment: BRANDMARK_API_URL, BRANDMARK_API_TOKEN and
    /// BRANDMARK_HTTP_TIMEOUT_SECS. Loads `.env` first when present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let base_url =
            std::env::var("BRANDMARK_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let token = std::env::var("BRANDMARK_API_TOKEN")
            .context("Missing session token. Set BRANDMARK_API_TOKEN")?;
        let timeout_secs = match std::env::var("BRANDMARK_HTTP_TIMEOUT_SECS") {
            Ok(v) => v
                .parse::<u64>()
                .context("BRANDMARK_HTTP_TIMEOUT_SECS must be a number of seconds")?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };

        Self::with_timeout(base_url, Auth::Bearer(token), Duration::from_secs(timeout_secs))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn apply_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            Auth::Bearer(token) => request.header("Authorization", format!("Bearer {}", token)),
            Auth::Anonymous => request,
        }
    }

    /// Send an API request and decode the JSON body, mapping error responses back
    /// to their error kind. `on_transport` builds the error for requests that got
    /// no response at all.
    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        on_transport: fn(String) -> AppError,
    ) -> Result<T, AppError> {
        let response = self
            .apply_auth(request)
            .send()
            .await
            .map_err(|e| on_transport(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        response
            .json::<T>()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to parse response as JSON: {}", e)))
    }

    /// Raw client, shared with the storage transfer. Carries no API credentials.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Error body returned by the API
#[derive(Debug, serde::Deserialize)]
pub(crate) struct ApiErrorBody {
    pub error: String,
    pub code: String,
}

/// Rebuild an [`AppError`] from an API error response.
pub(crate) async fn error_from_response(response: Response) -> AppError {
    let status = response.status();
    let text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    match serde_json::from_str::<ApiErrorBody>(&text) {
        Ok(body) => AppError::from_error_code(&body.code, body.error),
        Err(_) => AppError::Internal(format!(
            "API request failed with status {}: {}",
            status, text
        )),
    }
}

pub use brandmark_core::models::{
    FinalizeLogoResponse, SettingsResponse, SettingsUpdateRequest, UploadRequest, UploadTicket,
};
pub use transfer::{Transfer, TransferOutcome};
pub use upload::{LogoUploader, UploadFailure, UploadReport};
