//! End-to-end logo upload: digest, ticket, transfer, finalize.

use bytes::Bytes;
use brandmark_core::checksum::digest_reader;
use brandmark_core::models::{
    FinalizeLogoResponse, UploadRequest, UploadStage, UploadState, UploadTicket,
};
use brandmark_core::{AppError, ContentDigest, ErrorMetadata};
use std::path::Path;
use std::time::Instant;
use uuid::Uuid;

use crate::transfer::Transfer;
use crate::ApiClient;

/// A logo that was stored and committed to the organization's settings.
#[derive(Debug, Clone)]
pub struct UploadReport {
    pub object_key: String,
    pub digest: ContentDigest,
    pub byte_size: u64,
    pub transfer_attempts: u32,
    pub settings: FinalizeLogoResponse,
}

/// An upload attempt that stopped before the logo was committed.
#[derive(Debug, thiserror::Error)]
#[error("logo upload failed during {stage}: {error}")]
pub struct UploadFailure {
    pub stage: UploadStage,
    /// Set once a ticket was issued
    pub object_key: Option<String>,
    #[source]
    pub error: AppError,
    pub state: UploadState,
}

impl UploadFailure {
    /// Whether bytes may exist in storage under `object_key` without being
    /// referenced by the settings record.
    pub fn may_have_orphan(&self) -> bool {
        match self.stage {
            UploadStage::Finalize => true,
            UploadStage::Transfer => matches!(self.error, AppError::TransferFailed(_)),
            UploadStage::Digest | UploadStage::Ticket => false,
        }
    }

    pub fn error_code(&self) -> &'static str {
        self.error.error_code()
    }
}

struct Attempt {
    state: UploadState,
    object_key: Option<String>,
}

impl Attempt {
    fn new() -> Self {
        Self {
            state: UploadState::Idle,
            object_key: None,
        }
    }

    fn advance(&mut self) {
        if let Ok(next) = self.state.advance() {
            self.state = next;
        }
        tracing::debug!(state = self.state.name(), "Upload state changed");
    }

    fn fail(self, error: AppError) -> UploadFailure {
        let stage = self.state.pending_stage().unwrap_or(UploadStage::Finalize);
        let state = self.state.fail(&error).unwrap_or(self.state);
        tracing::warn!(
            stage = %stage,
            object_key = ?self.object_key,
            error_code = error.error_code(),
            error = %error,
            "Logo upload failed"
        );
        UploadFailure {
            stage,
            object_key: self.object_key,
            error,
            state,
        }
    }
}

/// Drives one logo upload per call.
///
/// Each call is an independent attempt starting from `Idle`; retrying a failed
/// upload means calling again, which issues a fresh ticket.
#[derive(Clone, Debug)]
pub struct LogoUploader {
    api: ApiClient,
    transfer: Transfer,
}

impl LogoUploader {
    pub fn new(api: ApiClient) -> Self {
        let transfer = Transfer::new(api.client().clone());
        Self { api, transfer }
    }

    pub fn with_transfer(api: ApiClient, transfer: Transfer) -> Self {
        Self { api, transfer }
    }

    /// Upload a file from disk.
    pub async fn upload_file(
        &self,
        owner_id: Uuid,
        path: &Path,
        content_type: &str,
        is_public: bool,
    ) -> Result<UploadReport, UploadFailure> {
        let payload = match tokio::fs::read(path).await {
            Ok(data) => Bytes::from(data),
            Err(e) => {
                return Err(Attempt::new().fail(AppError::DigestComputationFailed(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                ))))
            }
        };
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "logo".to_string());

        self.upload_bytes(owner_id, &file_name, content_type, payload, is_public)
            .await
    }

    /// Upload an in-memory payload and commit it as the organization logo.
    #[tracing::instrument(skip(self, payload), fields(byte_size = payload.len()))]
    pub async fn upload_bytes(
        &self,
        owner_id: Uuid,
        file_name: &str,
        content_type: &str,
        payload: Bytes,
        is_public: bool,
    ) -> Result<UploadReport, UploadFailure> {
        let started = Instant::now();
        let mut attempt = Attempt::new();

        let (digest, byte_size) = match digest_reader(&payload[..]).await {
            Ok(result) => result,
            Err(e) => return Err(attempt.fail(e.into())),
        };
        attempt.advance();

        let request = UploadRequest::new(
            file_name,
            byte_size,
            content_type,
            digest.to_base64(),
            is_public,
        );
        let ticket: UploadTicket = match self.api.issue_ticket(owner_id, &request).await {
            Ok(ticket) => ticket,
            Err(e) => return Err(attempt.fail(e)),
        };
        attempt.object_key = Some(ticket.object_key.clone());
        attempt.advance();

        attempt.advance();
        let outcome = match self.transfer.send(&ticket, payload).await {
            Ok(outcome) => outcome,
            Err(e) => return Err(attempt.fail(e)),
        };
        attempt.advance();

        let settings = match self.api.finalize_logo(owner_id, &ticket.object_key).await {
            Ok(settings) => settings,
            Err(e) => return Err(attempt.fail(e)),
        };
        attempt.advance();

        tracing::info!(
            object_key = %ticket.object_key,
            transfer_attempts = outcome.attempts,
            duration_ms = started.elapsed().as_millis() as u64,
            "Logo upload finalized"
        );

        Ok(UploadReport {
            object_key: ticket.object_key,
            digest,
            byte_size,
            transfer_attempts: outcome.attempts,
            settings,
        })
    }
}
