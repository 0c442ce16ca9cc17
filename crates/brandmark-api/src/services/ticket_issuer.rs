//! Upload ticket issuance.
//!
//! A ticket is a capability URL for exactly one PUT of a payload with a known size,
//! content type and digest. Issuing one persists nothing: an abandoned ticket simply
//! expires.

use brandmark_core::models::{SessionContext, UploadRequest, UploadTicket, Visibility};
use brandmark_core::validation::extension_for_content_type;
use brandmark_core::{AppError, ContentDigest, UploadValidator};
use brandmark_storage::{generate_object_key, PutConstraints, StorageGateway};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;
use validator::Validate;

#[derive(Clone)]
pub struct TicketIssuer {
    storage: Arc<dyn StorageGateway>,
    validator: UploadValidator,
    ttl: Duration,
}

impl TicketIssuer {
    pub fn new(storage: Arc<dyn StorageGateway>, validator: UploadValidator, ttl: Duration) -> Self {
        Self {
            storage,
            validator,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Authorize and validate `request`, then obtain a capability URL bound to the
    /// declared digest, content type and size.
    ///
    /// Validation failures never reach the storage gateway.
    #[tracing::instrument(
        skip(self, session, request),
        fields(
            owner_id = %owner_id,
            user_id = %session.user_id,
            byte_size = request.byte_size,
            content_type = %request.content_type,
            purpose = %request.purpose
        )
    )]
    pub async fn issue_ticket(
        &self,
        session: &SessionContext,
        owner_id: Uuid,
        request: &UploadRequest,
    ) -> Result<UploadTicket, AppError> {
        session.ensure_can_administer(owner_id)?;

        request.validate()?;
        let content_type = self.validator.validate_all(
            &request.file_name,
            &request.content_type,
            request.byte_size,
        )?;
        let digest = ContentDigest::parse(&request.digest)?;

        let object_key = generate_object_key(
            owner_id,
            request.purpose,
            extension_for_content_type(&content_type),
        );
        let constraints = PutConstraints {
            content_type,
            digest,
            max_size: self.validator.max_file_size(),
            byte_size: request.byte_size,
            visibility: Visibility::from_public_flag(request.is_public),
        };

        let presigned = self
            .storage
            .presigned_put_url(&object_key, &constraints, self.ttl)
            .await?;

        tracing::info!(
            object_key = %object_key,
            expires_at = %presigned.expires_at,
            backend = %self.storage.backend_type(),
            "Issued upload ticket"
        );

        Ok(UploadTicket {
            object_key,
            transfer_url: presigned.url,
            expires_at: presigned.expires_at,
            headers: presigned.headers,
        })
    }
}
