//! Direct PUT of a payload to the capability URL of an upload ticket.
//!
//! A transfer is retried at most once, and only for failures that say nothing
//! about the payload itself: no response, a timeout, or a 5xx. Digest, size and
//! authorization rejections are final.
//!
//! A retry after a lost response may find the first attempt already stored. Storage
//! answers an identical replay with success; a conflict on the key is reported as
//! `TransferFailed`, since an object may exist under it.

use bytes::Bytes;
use brandmark_core::models::UploadTicket;
use brandmark_core::AppError;
use reqwest::{Client, StatusCode};
use std::time::Duration;

const MAX_ATTEMPTS: u32 = 2;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Result of a successful transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutcome {
    pub attempts: u32,
    /// ETag reported by storage, quotes stripped
    pub etag: Option<String>,
}

#[derive(Debug)]
enum AttemptError {
    Retryable(String),
    Fatal(AppError),
}

/// PUTs payloads to ticket URLs.
#[derive(Clone, Debug)]
pub struct Transfer {
    client: Client,
    retry_delay: Duration,
}

impl Transfer {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Send `payload` to the ticket's transfer URL with the headers the ticket
    /// names.
    ///
    /// The ticket is checked for expiry before each attempt; a retry is never
    /// sent on an expired ticket.
    #[tracing::instrument(skip(self, ticket, payload), fields(object_key = %ticket.object_key, byte_size = payload.len()))]
    pub async fn send(
        &self,
        ticket: &UploadTicket,
        payload: Bytes,
    ) -> Result<TransferOutcome, AppError> {
        if ticket.is_expired() {
            return Err(AppError::TicketExpired(format!(
                "Ticket for {} expired at {}",
                ticket.object_key, ticket.expires_at
            )));
        }

        let mut attempt = 1;
        loop {
            match self.attempt(ticket, payload.clone()).await {
                Ok(etag) => {
                    tracing::info!(attempts = attempt, "Transfer completed");
                    return Ok(TransferOutcome {
                        attempts: attempt,
                        etag,
                    });
                }
                Err(AttemptError::Fatal(e)) => {
                    tracing::warn!(attempt, error = %e, "Transfer rejected");
                    return Err(e);
                }
                Err(AttemptError::Retryable(reason)) => {
                    if attempt >= MAX_ATTEMPTS {
                        tracing::warn!(attempt, reason = %reason, "Transfer failed after retry");
                        return Err(AppError::TransferFailed(reason));
                    }

                    tracing::warn!(attempt, reason = %reason, "Transfer attempt failed, retrying");
                    tokio::time::sleep(self.retry_delay).await;

                    if ticket.is_expired() {
                        return Err(AppError::TransferFailed(format!(
                            "{}; ticket expired before retry",
                            reason
                        )));
                    }
                    attempt += 1;
                }
            }
        }
    }

    async fn attempt(
        &self,
        ticket: &UploadTicket,
        payload: Bytes,
    ) -> Result<Option<String>, AttemptError> {
        let mut request = self.client.put(&ticket.transfer_url);
        for (name, value) in &ticket.headers {
            // Set by the client from the body
            if name.eq_ignore_ascii_case("content-length") || name.eq_ignore_ascii_case("host") {
                continue;
            }
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.body(payload).send().await.map_err(|e| {
            if e.is_timeout() {
                AttemptError::Retryable(format!("Transfer timed out: {}", e))
            } else {
                AttemptError::Retryable(format!("Transfer request failed: {}", e))
            }
        })?;

        let status = response.status();
        if status.is_success() {
            let etag = response
                .headers()
                .get(reqwest::header::ETAG)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.trim_matches('"').to_string());
            return Ok(etag);
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_rejection(status, &body))
    }
}

/// Map a non-success storage response to a retry decision.
///
/// Understands both the API's JSON error body and S3-style XML error codes.
fn classify_rejection(status: StatusCode, body: &str) -> AttemptError {
    let api_code = serde_json::from_str::<crate::ApiErrorBody>(body).ok();
    let detail = match &api_code {
        Some(b) => b.error.clone(),
        None => format!("storage responded with status {}", status),
    };
    let code = api_code.as_ref().map(|b| b.code.as_str());

    if status.is_server_error() {
        return AttemptError::Retryable(detail);
    }

    let fatal = if code == Some("INTEGRITY_MISMATCH")
        || body.contains("BadDigest")
        || body.contains("InvalidDigest")
    {
        AppError::IntegrityMismatch(detail)
    } else if status == StatusCode::GONE
        || code == Some("TICKET_EXPIRED")
        || (status == StatusCode::FORBIDDEN && body.to_lowercase().contains("expired"))
    {
        AppError::TicketExpired(detail)
    } else if status == StatusCode::PAYLOAD_TOO_LARGE || body.contains("EntityTooLarge") {
        AppError::PayloadTooLarge(detail)
    } else if status == StatusCode::CONFLICT || code == Some("OBJECT_EXISTS") {
        AppError::TransferFailed(format!("{}; an object may already be stored", detail))
    } else if status == StatusCode::FORBIDDEN {
        AppError::Unauthorized(detail)
    } else if let Some(code) = code {
        AppError::from_error_code(code, detail)
    } else {
        AppError::TransferFailed(detail)
    };
    AttemptError::Fatal(fatal)
}
