//! Domain models for the direct upload protocol and the settings it finalizes into.

pub mod session;
pub mod settings;
pub mod upload;

pub use session::{SessionContext, UserRole};
pub use settings::{
    FinalizeLogoRequest, FinalizeLogoResponse, SettingsChanges, SettingsRecord,
    SettingsResponse, SettingsUpdateRequest,
};
pub use upload::{
    AssetPurpose, FailureReason, InvalidTransition, StoredObject, UploadRequest, UploadStage,
    UploadState, UploadTicket, Visibility,
};
