use crate::signer::UploadSigner;
use crate::traits::{PresignedPut, PutConstraints, StorageError, StorageGateway, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use brandmark_core::constants::CONTENT_MD5_HEADER;
use brandmark_core::models::{StoredObject, Visibility};
use brandmark_core::validation::normalize_content_type;
use brandmark_core::ContentDigest;
use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use subtle::ConstantTimeEq;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

const META_DIR: &str = ".meta";
const TMP_DIR: &str = ".tmp";

/// Sidecar record written next to every accepted object
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ObjectMeta {
    content_type: String,
    digest: String,
    byte_size: u64,
    visibility: Visibility,
}

/// Local filesystem gateway
///
/// Accepts signed PUTs under the same rules as the S3 backend: the payload must hash
/// to the signed digest and have the signed size. A key is written once; replaying
/// the same payload to it succeeds without rewriting.
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
    signer: UploadSigner,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for stored objects (e.g., "/var/lib/brandmark/storage")
    /// * `base_url` - Base URL the storage routes are mounted on (e.g., "http://localhost:3000/storage")
    /// * `signing_secret` - Secret used to sign capability URLs
    pub async fn new(
        base_path: impl Into<PathBuf>,
        base_url: String,
        signing_secret: &str,
    ) -> StorageResult<Self> {
        let base_path = base_path.into();

        for dir in [base_path.clone(), base_path.join(META_DIR), base_path.join(TMP_DIR)] {
            fs::create_dir_all(&dir).await.map_err(|e| {
                StorageError::ConfigError(format!(
                    "Failed to create storage directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }

        Ok(LocalStorage {
            base_path,
            base_url,
            signer: UploadSigner::new(signing_secret),
        })
    }

    /// Convert an object key to a filesystem path under the storage root.
    fn key_to_path(&self, object_key: &str) -> StorageResult<PathBuf> {
        crate::keys::validate_key(object_key)?;
        if object_key.starts_with(META_DIR) || object_key.starts_with(TMP_DIR) {
            return Err(StorageError::InvalidKey(
                "Storage key uses a reserved prefix".to_string(),
            ));
        }

        let path = self.base_path.join(object_key);
        if path.strip_prefix(&self.base_path).is_err() {
            return Err(StorageError::InvalidKey(
                "Storage key resolves outside storage directory".to_string(),
            ));
        }
        Ok(path)
    }

    fn meta_path(&self, object_key: &str) -> PathBuf {
        self.base_path
            .join(META_DIR)
            .join(format!("{}.json", object_key))
    }

    /// Generate public URL for an object
    fn generate_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    async fn read_meta(&self, object_key: &str) -> StorageResult<Option<ObjectMeta>> {
        match fs::read(self.meta_path(object_key)).await {
            Ok(raw) => serde_json::from_slice(&raw)
                .map(Some)
                .map_err(|e| StorageError::BackendError(format!("Corrupt object metadata: {}", e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Handle a PUT to a capability URL.
    pub async fn accept_put(
        &self,
        object_key: &str,
        token: &str,
        content_type: Option<&str>,
        content_md5: Option<&str>,
        body: Bytes,
    ) -> StorageResult<StoredObject> {
        self.accept_put_at(object_key, token, content_type, content_md5, body, Utc::now())
            .await
    }

    /// [`Self::accept_put`] evaluated at instant `now`.
    ///
    /// Nothing is written unless every check passes.
    pub async fn accept_put_at(
        &self,
        object_key: &str,
        token: &str,
        content_type: Option<&str>,
        content_md5: Option<&str>,
        body: Bytes,
        now: DateTime<Utc>,
    ) -> StorageResult<StoredObject> {
        let path = self.key_to_path(object_key)?;
        let signed = self.signer.verify(token, object_key, now)?;
        let constraints = signed.constraints;

        let declared_type = content_type.map(normalize_content_type).unwrap_or_default();
        if declared_type != constraints.content_type {
            return Err(StorageError::ConstraintViolation(format!(
                "Content-Type must be {}",
                constraints.content_type
            )));
        }

        let declared_digest = content_md5
            .ok_or_else(|| {
                StorageError::ConstraintViolation(format!("{} header is required", CONTENT_MD5_HEADER))
            })
            .and_then(|value| {
                ContentDigest::parse(value)
                    .map_err(|e| StorageError::ConstraintViolation(e.to_string()))
            })?;
        if declared_digest != constraints.digest {
            return Err(StorageError::ConstraintViolation(format!(
                "{} does not match the signed digest",
                CONTENT_MD5_HEADER
            )));
        }

        let size = body.len() as u64;
        if size > constraints.max_size {
            return Err(StorageError::TooLarge {
                size,
                max: constraints.max_size,
            });
        }

        let actual = ContentDigest::compute(&body);
        if !bool::from(actual.as_bytes().ct_eq(constraints.digest.as_bytes())) {
            tracing::warn!(
                object_key = %object_key,
                expected = %constraints.digest,
                actual = %actual,
                "Rejected upload with mismatching digest"
            );
            return Err(StorageError::DigestMismatch {
                expected: constraints.digest.to_base64(),
                actual: actual.to_base64(),
            });
        }

        if size != constraints.byte_size {
            return Err(StorageError::ConstraintViolation(format!(
                "Payload is {} bytes, ticket was issued for {} bytes",
                size, constraints.byte_size
            )));
        }

        let created = self
            .write_once(object_key, &path, &body, &constraints)
            .await?;

        tracing::info!(
            object_key = %object_key,
            size_bytes = size,
            replayed = !created,
            "Local upload accepted"
        );

        Ok(StoredObject {
            object_key: object_key.to_string(),
            byte_size: size,
            digest: Some(actual.to_base64()),
            declared_digest: Some(constraints.digest.to_base64()),
            visibility: constraints.visibility,
        })
    }

    /// Write to a temp file and hard-link it into place; linking fails if the key exists.
    /// Returns `false` when the key already held this exact payload.
    async fn write_once(
        &self,
        object_key: &str,
        path: &Path,
        body: &[u8],
        constraints: &PutConstraints,
    ) -> StorageResult<bool> {
        let tmp = self.base_path.join(TMP_DIR).join(Uuid::new_v4().to_string());

        let mut file = fs::File::create(&tmp).await.map_err(|e| {
            StorageError::BackendError(format!("Failed to create file {}: {}", tmp.display(), e))
        })?;
        file.write_all(body).await?;
        file.sync_all().await?;
        drop(file);

        self.ensure_parent_dir(path).await?;
        let linked = fs::hard_link(&tmp, path).await;
        let _ = fs::remove_file(&tmp).await;
        match linked {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                let digest = constraints.digest.to_base64();
                return match self.read_meta(object_key).await? {
                    Some(meta) if meta.digest == digest && meta.byte_size == body.len() as u64 => {
                        tracing::info!(object_key = %object_key, "Replayed upload matches stored object");
                        Ok(false)
                    }
                    _ => Err(StorageError::AlreadyExists(object_key.to_string())),
                };
            }
            Err(e) => return Err(e.into()),
        }

        let meta = ObjectMeta {
            content_type: constraints.content_type.clone(),
            digest: constraints.digest.to_base64(),
            byte_size: body.len() as u64,
            visibility: constraints.visibility,
        };
        let meta_path = self.meta_path(object_key);
        self.ensure_parent_dir(&meta_path).await?;
        let raw = serde_json::to_vec(&meta)
            .map_err(|e| StorageError::BackendError(format!("Failed to encode metadata: {}", e)))?;
        fs::write(&meta_path, raw).await?;
        Ok(true)
    }

    /// Read a public object, returning its bytes and content type.
    ///
    /// Private objects are reported as missing.
    pub async fn read_public(&self, object_key: &str) -> StorageResult<(Bytes, String)> {
        let path = self.key_to_path(object_key)?;
        let meta = self
            .read_meta(object_key)
            .await?
            .filter(|m| m.visibility == Visibility::Public)
            .ok_or_else(|| StorageError::NotFound(object_key.to_string()))?;

        match fs::read(&path).await {
            Ok(data) => Ok((Bytes::from(data), meta.content_type)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(object_key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl StorageGateway for LocalStorage {
    async fn presigned_put_url(
        &self,
        object_key: &str,
        constraints: &PutConstraints,
        expires_in: Duration,
    ) -> StorageResult<PresignedPut> {
        self.key_to_path(object_key)?;

        let expires_at = Utc
            .timestamp_opt(Utc::now().timestamp() + expires_in.as_secs() as i64, 0)
            .single()
            .ok_or_else(|| StorageError::ConfigError("Invalid ticket expiry".to_string()))?;
        let token = self.signer.sign(object_key, constraints, expires_at)?;

        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), constraints.content_type.clone());
        headers.insert(CONTENT_MD5_HEADER.to_string(), constraints.digest.to_base64());

        Ok(PresignedPut {
            url: format!(
                "{}?token={}",
                self.generate_url(object_key),
                urlencoding::encode(&token)
            ),
            expires_at,
            headers,
        })
    }

    async fn stat(&self, object_key: &str) -> StorageResult<Option<StoredObject>> {
        let path = self.key_to_path(object_key)?;
        let file_meta = match fs::metadata(&path).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let (digest, declared_digest, visibility) = match self.read_meta(object_key).await? {
            Some(meta) => (Some(meta.digest.clone()), Some(meta.digest), meta.visibility),
            None => {
                // No sidecar: the bytes did not arrive through a ticket.
                let data = fs::read(&path).await?;
                (
                    Some(ContentDigest::compute(&data).to_base64()),
                    None,
                    Visibility::Private,
                )
            }
        };

        Ok(Some(StoredObject {
            object_key: object_key.to_string(),
            byte_size: file_meta.len(),
            digest,
            declared_digest,
            visibility,
        }))
    }

    fn public_url(&self, object_key: &str) -> String {
        self.generate_url(object_key)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
