//! Domain methods for the Brandmark API client.

use crate::{api_prefix, ApiClient};
use brandmark_core::models::{
    FinalizeLogoRequest, FinalizeLogoResponse, SettingsResponse, SettingsUpdateRequest,
    UploadRequest, UploadTicket,
};
use brandmark_core::AppError;
use uuid::Uuid;

fn organization_path(owner_id: Uuid, rest: &str) -> String {
    format!("{}/organizations/{}{}", api_prefix(), owner_id, rest)
}

impl ApiClient {
    /// Request a capability URL for one direct upload.
    pub async fn issue_ticket(
        &self,
        owner_id: Uuid,
        request: &UploadRequest,
    ) -> Result<UploadTicket, AppError> {
        let url = self.build_url(&organization_path(owner_id, "/uploads/direct"));
        self.send_json(self.client().post(url).json(request), AppError::Internal)
            .await
    }

    /// Commit a transferred object as the organization logo.
    ///
    /// A request that gets no response leaves the outcome unknown and is reported
    /// as a persistence error.
    pub async fn finalize_logo(
        &self,
        owner_id: Uuid,
        object_key: &str,
    ) -> Result<FinalizeLogoResponse, AppError> {
        let url = self.build_url(&organization_path(owner_id, "/settings/logo"));
        let body = FinalizeLogoRequest {
            object_key: object_key.to_string(),
        };
        self.send_json(self.client().post(url).json(&body), AppError::Persistence)
            .await
    }

    pub async fn get_settings(&self, owner_id: Uuid) -> Result<SettingsResponse, AppError> {
        let url = self.build_url(&organization_path(owner_id, "/settings"));
        self.send_json(self.client().get(url), AppError::Internal)
            .await
    }

    /// Save the settings form; `logo_key` in the request is committed in the same write.
    pub async fn update_settings(
        &self,
        owner_id: Uuid,
        request: &SettingsUpdateRequest,
    ) -> Result<FinalizeLogoResponse, AppError> {
        let url = self.build_url(&organization_path(owner_id, "/settings"));
        self.send_json(self.client().patch(url).json(request), AppError::Persistence)
            .await
    }
}
