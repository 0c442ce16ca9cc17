pub mod auth;
pub mod uploads;

/// Returns the versioned API path for the current API version.
/// Usage: `api_path("/organizations")` -> `/api/v0/organizations`.
pub fn api_path(path: &str) -> String {
    format!("{}{}", brandmark_api::constants::API_PREFIX, path)
}

use axum_test::TestServer;
use brandmark_api::auth::JwtService;
use brandmark_api::setup::{build_state, routes::setup_routes, StorageSetup};
use brandmark_core::constants::DEFAULT_TICKET_TTL_SECS;
use brandmark_core::{
    BaseConfig, Config, ServiceConfig, StorageBackend, StorageConfig, UploadConfig,
};
use brandmark_db::InMemorySettingsRepository;
use brandmark_storage::LocalStorage;
use std::sync::Arc;
use tempfile::TempDir;

pub const TEST_JWT_SECRET: &str = "test-jwt-secret-at-least-32-characters-long";
pub const TEST_SIGNING_SECRET: &str = "test-storage-signing-secret-32-characters";
/// Origin the local gateway puts in front of its capability URLs
pub const TEST_ORIGIN: &str = "http://localhost:3000";
/// Logo size limit used by the test app
pub const TEST_MAX_LOGO_BYTES: u64 = 64 * 1024;

/// Test application state
pub struct TestApp {
    pub server: TestServer,
    pub repository: InMemorySettingsRepository,
    pub storage: LocalStorage,
    pub jwt: JwtService,
    pub _temp_dir: TempDir,
}

impl TestApp {
    /// Get the HTTP test client
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

pub fn create_test_config(storage_path: &str, ticket_ttl_secs: u64) -> Config {
    Config::new(ServiceConfig {
        base: BaseConfig {
            server_port: 3000,
            cors_origins: vec!["*".to_string()],
            environment: "test".to_string(),
            jwt_secret: TEST_JWT_SECRET.to_string(),
            database_url: None,
            db_max_connections: 5,
            db_timeout_seconds: 5,
        },
        upload: UploadConfig {
            logo_max_size_bytes: TEST_MAX_LOGO_BYTES,
            ticket_ttl_secs,
            ..UploadConfig::default()
        },
        storage: StorageConfig {
            backend: StorageBackend::Local,
            local_storage_path: Some(storage_path.to_string()),
            local_storage_base_url: Some(format!("{}/storage", TEST_ORIGIN)),
            signing_secret: TEST_SIGNING_SECRET.to_string(),
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
        },
    })
}

/// Setup a test application over an in-memory settings store and a filesystem
/// gateway rooted in a temporary directory.
pub async fn setup_test_app() -> TestApp {
    setup_test_app_with_ticket_ttl(DEFAULT_TICKET_TTL_SECS).await
}

/// Same as [`setup_test_app`], issuing tickets valid for `ticket_ttl_secs`.
pub async fn setup_test_app_with_ticket_ttl(ticket_ttl_secs: u64) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let storage_path = temp_dir
        .path()
        .to_str()
        .expect("Temp path is not UTF-8")
        .to_string();
    let config = create_test_config(&storage_path, ticket_ttl_secs);
    config.validate().expect("Test config should be valid");

    let storage = LocalStorage::new(
        storage_path,
        format!("{}/storage", TEST_ORIGIN),
        TEST_SIGNING_SECRET,
    )
    .await
    .expect("Failed to create local storage");
    let repository = InMemorySettingsRepository::new();

    let state = build_state(
        config.clone(),
        StorageSetup {
            gateway: Arc::new(storage.clone()),
            local: Some(storage.clone()),
        },
        Arc::new(repository.clone()),
    );
    let router = setup_routes(&config, state).expect("Failed to build routes");
    let server = TestServer::new(router).expect("Failed to create test server");

    TestApp {
        server,
        repository,
        storage,
        jwt: JwtService::new(TEST_JWT_SECRET),
        _temp_dir: temp_dir,
    }
}
