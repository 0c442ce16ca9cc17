use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;
use validator::Validate;

use crate::constants::MAX_NAME_LENGTH;
use crate::error::AppError;

/// What an uploaded asset is for. Selects the allow-list, size limit and key prefix.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AssetPurpose {
    #[default]
    Logo,
}

impl AssetPurpose {
    /// First path segment of every object key issued for this purpose.
    pub fn key_prefix(&self) -> &'static str {
        match self {
            AssetPurpose::Logo => "logos",
        }
    }

    pub fn from_key_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "logos" => Some(AssetPurpose::Logo),
            _ => None,
        }
    }
}

impl Display for AssetPurpose {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            AssetPurpose::Logo => write!(f, "logo"),
        }
    }
}

impl FromStr for AssetPurpose {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "logo" => Ok(AssetPurpose::Logo),
            other => Err(AppError::InvalidInput(format!(
                "Unknown asset purpose: {}",
                other
            ))),
        }
    }
}

/// Whether a stored object may be read without credentials.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn from_public_flag(is_public: bool) -> Self {
        if is_public {
            Visibility::Public
        } else {
            Visibility::Private
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }
}

impl FromStr for Visibility {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            other => Err(AppError::InvalidInput(format!(
                "Unknown visibility: {}",
                other
            ))),
        }
    }
}

/// Request for an upload ticket. Built by the client right before contacting the
/// issuer; immutable once sent.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct UploadRequest {
    /// Original filename, informational only. Never used to build the object key.
    #[validate(length(
        min = 1,
        max = 255,
        message = "Filename must be between 1 and 255 characters"
    ))]
    pub file_name: String,
    /// Exact size of the payload in bytes
    pub byte_size: u64,
    /// Declared MIME type
    #[validate(length(
        min = 1,
        max = 255,
        message = "Content type must be between 1 and 255 characters"
    ))]
    pub content_type: String,
    /// Base64-encoded MD5 digest of the payload
    #[validate(length(min = 1, max = 64, message = "Digest must not be empty"))]
    pub digest: String,
    /// Whether the stored object is publicly readable
    #[serde(default = "default_is_public")]
    pub is_public: bool,
    /// Asset purpose, defaults to `logo`
    #[serde(default)]
    pub purpose: AssetPurpose,
}

fn default_is_public() -> bool {
    true
}

impl UploadRequest {
    pub fn new(
        file_name: impl Into<String>,
        byte_size: u64,
        content_type: impl Into<String>,
        digest: impl Into<String>,
        is_public: bool,
    ) -> Self {
        let mut file_name = file_name.into();
        if file_name.len() > MAX_NAME_LENGTH {
            let mut cut = MAX_NAME_LENGTH;
            while !file_name.is_char_boundary(cut) {
                cut -= 1;
            }
            file_name.truncate(cut);
        }
        Self {
            file_name,
            byte_size,
            content_type: content_type.into(),
            digest: digest.into(),
            is_public,
            purpose: AssetPurpose::Logo,
        }
    }
}

/// Single-use, time-limited authorization to PUT exactly one object.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct UploadTicket {
    /// Server-generated key the object will be stored under
    pub object_key: String,
    /// Capability URL accepting a single PUT
    pub transfer_url: String,
    /// After this instant the transfer URL is rejected
    pub expires_at: DateTime<Utc>,
    /// Headers the PUT must carry (content type and digest)
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl UploadTicket {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// The gateway's view of a successfully stored object.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct StoredObject {
    pub object_key: String,
    pub byte_size: u64,
    /// Base64 MD5 digest of the stored bytes when the backend can report it
    pub digest: Option<String>,
    /// Digest the upload ticket bound the object to. Absent when the object was
    /// not written through a ticket.
    #[serde(default)]
    pub declared_digest: Option<String>,
    pub visibility: Visibility,
}

/// Step of the pipeline that was executing when an attempt failed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UploadStage {
    Digest,
    Ticket,
    Transfer,
    Finalize,
}

impl Display for UploadStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            UploadStage::Digest => write!(f, "digest"),
            UploadStage::Ticket => write!(f, "ticket"),
            UploadStage::Transfer => write!(f, "transfer"),
            UploadStage::Finalize => write!(f, "finalize"),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FailureReason {
    pub stage: UploadStage,
    /// Machine-readable error code
    pub code: String,
    pub message: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid upload state transition from {from} to {to}")]
pub struct InvalidTransition {
    pub from: String,
    pub to: String,
}

/// Lifecycle of one upload attempt.
///
/// `Idle → DigestComputed → TicketIssued → Transferring → Transferred → Finalized`,
/// with `Failed` reachable from every non-terminal state. `Finalized` and `Failed`
/// are terminal; a retry starts a fresh attempt from `Idle`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum UploadState {
    Idle,
    DigestComputed,
    TicketIssued,
    Transferring,
    Transferred,
    Finalized,
    Failed(FailureReason),
}

impl UploadState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadState::Finalized | UploadState::Failed(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            UploadState::Idle => "idle",
            UploadState::DigestComputed => "digest_computed",
            UploadState::TicketIssued => "ticket_issued",
            UploadState::Transferring => "transferring",
            UploadState::Transferred => "transferred",
            UploadState::Finalized => "finalized",
            UploadState::Failed(_) => "failed",
        }
    }

    /// The step that runs next from this state, if any.
    pub fn pending_stage(&self) -> Option<UploadStage> {
        match self {
            UploadState::Idle => Some(UploadStage::Digest),
            UploadState::DigestComputed => Some(UploadStage::Ticket),
            UploadState::TicketIssued | UploadState::Transferring => Some(UploadStage::Transfer),
            UploadState::Transferred => Some(UploadStage::Finalize),
            UploadState::Finalized | UploadState::Failed(_) => None,
        }
    }

    fn successor(&self) -> Option<UploadState> {
        match self {
            UploadState::Idle => Some(UploadState::DigestComputed),
            UploadState::DigestComputed => Some(UploadState::TicketIssued),
            UploadState::TicketIssued => Some(UploadState::Transferring),
            UploadState::Transferring => Some(UploadState::Transferred),
            UploadState::Transferred => Some(UploadState::Finalized),
            UploadState::Finalized | UploadState::Failed(_) => None,
        }
    }

    /// Move to the next state on the success path.
    pub fn advance(&self) -> Result<UploadState, InvalidTransition> {
        self.successor().ok_or_else(|| InvalidTransition {
            from: self.name().to_string(),
            to: "next".to_string(),
        })
    }

    /// Fail the attempt, recording the stage that was executing.
    pub fn fail(&self, error: &AppError) -> Result<UploadState, InvalidTransition> {
        use crate::error::ErrorMetadata;

        let stage = self.pending_stage().ok_or_else(|| InvalidTransition {
            from: self.name().to_string(),
            to: "failed".to_string(),
        })?;
        Ok(UploadState::Failed(FailureReason {
            stage,
            code: error.error_code().to_string(),
            message: error.client_message(),
        }))
    }
}
