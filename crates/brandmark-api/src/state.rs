//! Application state shared by all handlers.

use crate::auth::middleware::AuthState;
use crate::services::{FinalizationCommitter, TicketIssuer};
use brandmark_core::Config;
use brandmark_db::SettingsRepository;
#[cfg(feature = "storage-local")]
use brandmark_storage::LocalStorage;
use brandmark_storage::StorageGateway;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub storage: Arc<dyn StorageGateway>,
    /// Present when the filesystem backend is active; serves the capability routes.
    #[cfg(feature = "storage-local")]
    pub local_storage: Option<LocalStorage>,
    pub settings_repository: Arc<dyn SettingsRepository>,
    pub ticket_issuer: TicketIssuer,
    pub finalizer: FinalizationCommitter,
    pub auth: Arc<AuthState>,
}
