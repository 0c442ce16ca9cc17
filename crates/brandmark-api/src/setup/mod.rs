//! Application setup and initialization
//!
//! Everything `main` needs to go from a [`Config`] to a served router. Tests use
//! [`build_state`] to assemble the same state over their own storage and
//! settings store.

pub mod database;
pub mod routes;
pub mod server;
pub mod storage;

use crate::auth::middleware::AuthState;
use crate::auth::JwtService;
use crate::services::{FinalizationCommitter, TicketIssuer};
use crate::state::AppState;
use anyhow::Result;
use brandmark_core::Config;
use brandmark_db::SettingsRepository;
use std::sync::Arc;

pub use storage::StorageSetup;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    crate::telemetry::init_telemetry(crate::telemetry::LogFormat::from_env())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(
        environment = %config.environment(),
        "Configuration loaded and validated successfully"
    );

    let settings_repository = database::setup_settings_repository(&config).await?;
    let storage = storage::setup_storage(&config).await?;

    let state = build_state(config.clone(), storage, settings_repository);
    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}

/// Wire the services over the given storage and settings store.
pub fn build_state(
    config: Config,
    storage: StorageSetup,
    settings_repository: Arc<dyn SettingsRepository>,
) -> Arc<AppState> {
    let upload = config.upload();
    let ticket_issuer = TicketIssuer::new(
        storage.gateway.clone(),
        upload.logo_validator(),
        upload.ticket_ttl(),
    );
    let finalizer = FinalizationCommitter::new(
        storage.gateway.clone(),
        settings_repository.clone(),
        upload.logo_max_size_bytes,
    );
    let auth = Arc::new(AuthState {
        jwt: JwtService::new(config.jwt_secret()),
    });

    Arc::new(AppState {
        storage: storage.gateway,
        #[cfg(feature = "storage-local")]
        local_storage: storage.local,
        settings_repository,
        ticket_issuer,
        finalizer,
        auth,
        config,
    })
}
