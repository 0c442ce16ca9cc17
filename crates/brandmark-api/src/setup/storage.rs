//! Storage setup and initialization

use anyhow::Result;
use brandmark_core::Config;
#[cfg(feature = "storage-local")]
use brandmark_core::StorageBackend;
#[cfg(feature = "storage-local")]
use brandmark_storage::{create_local_storage, LocalStorage};
use brandmark_storage::{create_storage, StorageGateway};
use std::sync::Arc;

/// Gateway handed to the services, plus the concrete filesystem backend when it
/// is the active one so its capability routes can be mounted.
pub struct StorageSetup {
    pub gateway: Arc<dyn StorageGateway>,
    #[cfg(feature = "storage-local")]
    pub local: Option<LocalStorage>,
}

pub async fn setup_storage(config: &Config) -> Result<StorageSetup> {
    tracing::info!("Initializing storage gateway...");

    #[cfg(feature = "storage-local")]
    {
        if config.storage().backend == StorageBackend::Local {
            let local = create_local_storage(config).await?;
            tracing::info!(
                backend = %StorageBackend::Local,
                "Storage gateway initialized successfully"
            );
            return Ok(StorageSetup {
                gateway: Arc::new(local.clone()),
                local: Some(local),
            });
        }
    }

    let gateway = create_storage(config).await?;
    tracing::info!(
        backend = %gateway.backend_type(),
        "Storage gateway initialized successfully"
    );

    Ok(StorageSetup {
        gateway,
        #[cfg(feature = "storage-local")]
        local: None,
    })
}
