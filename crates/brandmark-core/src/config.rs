//! Configuration module
//!
//! Server configuration is read from the environment (after loading `.env`) and
//! grouped into base, upload and storage sections.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;

use crate::constants::{
    DEFAULT_LOGO_CONTENT_TYPES, DEFAULT_LOGO_MAX_SIZE_MB, DEFAULT_TICKET_TTL_SECS,
    MAX_TICKET_TTL_SECS,
};
use crate::storage_types::StorageBackend;
use crate::validation::UploadValidator;

const SERVER_PORT: u16 = 3000;
const MAX_CONNECTIONS: u32 = 10;
const CONNECTION_TIMEOUT_SECS: u64 = 30;

/// Base configuration: server, auth and database
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    pub jwt_secret: String,
    /// When absent the server keeps settings in memory (development only)
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
}

/// Upload protocol configuration
#[derive(Clone, Debug)]
pub struct UploadConfig {
    pub logo_max_size_bytes: u64,
    pub logo_allowed_content_types: Vec<String>,
    pub ticket_ttl_secs: u64,
}

impl UploadConfig {
    pub fn ticket_ttl(&self) -> Duration {
        Duration::from_secs(self.ticket_ttl_secs)
    }

    pub fn logo_validator(&self) -> UploadValidator {
        UploadValidator::new(
            self.logo_max_size_bytes,
            self.logo_allowed_content_types.clone(),
        )
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            logo_max_size_bytes: DEFAULT_LOGO_MAX_SIZE_MB * 1024 * 1024,
            logo_allowed_content_types: split_list(DEFAULT_LOGO_CONTENT_TYPES),
            ticket_ttl_secs: DEFAULT_TICKET_TTL_SECS,
        }
    }
}

/// Storage gateway configuration
#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    /// Secret used by the local gateway to sign capability URLs
    pub signing_secret: String,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub base: BaseConfig,
    pub upload: UploadConfig,
    pub storage: StorageConfig,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<ServiceConfig>);

impl Config {
    pub fn new(service: ServiceConfig) -> Self {
        Config(Box::new(service))
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = ServiceConfig::from_env()?;
        let config = Config(Box::new(config));
        config.validate()?;
        Ok(config)
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        is_production_name(&self.0.base.environment)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.0.validate()
    }

    pub fn environment(&self) -> &str {
        &self.0.base.environment
    }

    pub fn server_port(&self) -> u16 {
        self.0.base.server_port
    }

    pub fn jwt_secret(&self) -> &str {
        &self.0.base.jwt_secret
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.0.base.cors_origins
    }

    pub fn database_url(&self) -> Option<&str> {
        self.0.base.database_url.as_deref()
    }

    pub fn db_max_connections(&self) -> u32 {
        self.0.base.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.0.base.db_timeout_seconds
    }

    pub fn upload(&self) -> &UploadConfig {
        &self.0.upload
    }

    pub fn storage(&self) -> &StorageConfig {
        &self.0.storage
    }
}

fn is_production_name(environment: &str) -> bool {
    let env = environment.to_lowercase();
    env == "production" || env == "prod"
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Read `name` from the environment, falling back to `default` when it is unset or blank.
fn env_or<T>(name: &str, default: T) -> Result<T, anyhow::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    parse_env_value(name, env::var(name).ok().as_deref(), default)
}

fn parse_env_value<T>(name: &str, raw: Option<&str>, default: T) -> Result<T, anyhow::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        Some(value) => value
            .parse::<T>()
            .with_context(|| format!("{} has an invalid value: {:?}", name, value)),
        None => Ok(default),
    }
}

fn megabytes_to_bytes(name: &str, megabytes: u64) -> Result<u64, anyhow::Error> {
    megabytes
        .checked_mul(1024 * 1024)
        .with_context(|| format!("{} is too large: {} MB", name, megabytes))
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        let database_url = env::var("DATABASE_URL").ok().filter(|s| !s.is_empty());

        let base = BaseConfig {
            server_port: env_or("SERVER_PORT", SERVER_PORT)?,
            cors_origins,
            environment,
            jwt_secret,
            database_url,
            db_max_connections: env_or("DB_MAX_CONNECTIONS", MAX_CONNECTIONS)?,
            db_timeout_seconds: env_or("DB_TIMEOUT_SECONDS", CONNECTION_TIMEOUT_SECS)?,
        };

        let logo_max_size_mb: u64 = env_or("LOGO_MAX_SIZE_MB", DEFAULT_LOGO_MAX_SIZE_MB)?;
        let upload = UploadConfig {
            logo_max_size_bytes: megabytes_to_bytes("LOGO_MAX_SIZE_MB", logo_max_size_mb)?,
            logo_allowed_content_types: split_list(
                &env::var("LOGO_ALLOWED_CONTENT_TYPES")
                    .unwrap_or_else(|_| DEFAULT_LOGO_CONTENT_TYPES.to_string()),
            ),
            ticket_ttl_secs: env_or("TICKET_TTL_SECS", DEFAULT_TICKET_TTL_SECS)?,
        };

        let backend = env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "local".to_string())
            .parse::<StorageBackend>()?;

        let storage = StorageConfig {
            backend,
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            local_storage_base_url: env::var("LOCAL_STORAGE_BASE_URL").ok(),
            signing_secret: env::var("STORAGE_SIGNING_SECRET")
                .unwrap_or_else(|_| base.jwt_secret.clone()),
            s3_bucket: env::var("S3_BUCKET").ok(),
            s3_region: env::var("S3_REGION")
                .or_else(|_| env::var("AWS_REGION"))
                .ok(),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
        };

        Ok(ServiceConfig {
            base,
            upload,
            storage,
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.base.jwt_secret.len() < 32 {
            return Err(anyhow::anyhow!(
                "JWT_SECRET must be at least 32 characters long"
            ));
        }

        if self.storage.signing_secret.len() < 32 {
            return Err(anyhow::anyhow!(
                "STORAGE_SIGNING_SECRET must be at least 32 characters long"
            ));
        }

        if is_production_name(&self.base.environment)
            && self.base.cors_origins.iter().any(|o| o == "*")
        {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        if let Some(ref url) = self.base.database_url {
            if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
                return Err(anyhow::anyhow!(
                    "DATABASE_URL must be a valid PostgreSQL connection string"
                ));
            }
        }

        if self.upload.ticket_ttl_secs == 0 || self.upload.ticket_ttl_secs > MAX_TICKET_TTL_SECS {
            return Err(anyhow::anyhow!(
                "TICKET_TTL_SECS must be between 1 and {}",
                MAX_TICKET_TTL_SECS
            ));
        }

        if self.upload.logo_allowed_content_types.is_empty() {
            return Err(anyhow::anyhow!(
                "LOGO_ALLOWED_CONTENT_TYPES must list at least one content type"
            ));
        }

        match self.storage.backend {
            StorageBackend::S3 => {
                if self.storage.s3_bucket.is_none() || self.storage.s3_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "STORAGE_BACKEND=s3 requires S3_BUCKET and S3_REGION to be set"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.storage.local_storage_path.is_none()
                    || self.storage.local_storage_base_url.is_none()
                {
                    return Err(anyhow::anyhow!(
                        "STORAGE_BACKEND=local requires LOCAL_STORAGE_PATH and LOCAL_STORAGE_BASE_URL"
                    ));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ServiceConfig {
        ServiceConfig {
            base: BaseConfig {
                server_port: 3000,
                cors_origins: vec!["*".to_string()],
                environment: "development".to_string(),
                jwt_secret: "x".repeat(32),
                database_url: None,
                db_max_connections: 5,
                db_timeout_seconds: 5,
            },
            upload: UploadConfig::default(),
            storage: StorageConfig {
                backend: StorageBackend::Local,
                local_storage_path: Some("/tmp/brandmark".to_string()),
                local_storage_base_url: Some("http://localhost:3000/storage".to_string()),
                signing_secret: "y".repeat(32),
                s3_bucket: None,
                s3_region: None,
                s3_endpoint: None,
            },
        }
    }

    #[test]
    fn sample_is_valid() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn default_ticket_ttl_is_five_minutes() {
        assert_eq!(UploadConfig::default().ticket_ttl(), Duration::from_secs(300));
    }

    #[test]
    fn rejects_wildcard_cors_in_production() {
        let mut config = sample();
        config.base.environment = "production".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_long_ticket_ttl() {
        let mut config = sample();
        config.upload.ticket_ttl_secs = 6 * 3600;
        assert!(config.validate().is_err());
    }

    #[test]
    fn s3_requires_bucket() {
        let mut config = sample();
        config.storage.backend = StorageBackend::S3;
        assert!(config.validate().is_err());
        config.storage.s3_bucket = Some("logos".to_string());
        config.storage.s3_region = Some("eu-west-1".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn content_type_list_is_normalized() {
        assert_eq!(
            split_list(" image/PNG, ,image/jpeg"),
            vec!["image/png".to_string(), "image/jpeg".to_string()]
        );
    }

    #[test]
    fn unparsable_env_value_is_an_error() {
        let err = parse_env_value::<u16>("SERVER_PORT", Some("eighty"), SERVER_PORT).unwrap_err();
        assert!(err.to_string().contains("SERVER_PORT"));
        assert!(parse_env_value::<u64>("TICKET_TTL_SECS", Some("-5"), 300).is_err());
    }

    #[test]
    fn blank_env_value_uses_default() {
        assert_eq!(parse_env_value::<u16>("SERVER_PORT", None, 3000).unwrap(), 3000);
        assert_eq!(parse_env_value::<u16>("SERVER_PORT", Some("  "), 3000).unwrap(), 3000);
        assert_eq!(parse_env_value::<u16>("SERVER_PORT", Some(" 8080 "), 3000).unwrap(), 8080);
    }

    #[test]
    fn logo_size_overflow_is_an_error() {
        assert_eq!(megabytes_to_bytes("LOGO_MAX_SIZE_MB", 5).unwrap(), 5 * 1024 * 1024);
        assert!(megabytes_to_bytes("LOGO_MAX_SIZE_MB", u64::MAX / 1024).is_err());
    }
}
