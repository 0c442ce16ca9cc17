use crate::traits::{PresignedPut, PutConstraints, StorageError, StorageGateway, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::retry::{RetryConfig, RetryMode};
use aws_config::BehaviorVersion;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::head_object::HeadObjectError;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client;
use brandmark_core::models::{StoredObject, Visibility};
use brandmark_core::ContentDigest;
use chrono::Utc;
use std::collections::BTreeMap;
use std::time::Duration;

/// User metadata entry recording the digest a ticket was issued for.
/// Sent as `x-amz-meta-declared-digest`.
const DECLARED_DIGEST_METADATA: &str = "declared-digest";

/// S3 gateway
///
/// Presigned PUT URLs are SigV4 query-signed over `Content-Type`, `Content-MD5` and
/// the declared-digest metadata header, so a PUT that omits or changes any of them
/// fails the signature check. S3 verifies the body against `Content-MD5` (`BadDigest`). Read visibility is governed by the bucket
/// policy, so stored objects are reported as public.
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
    region: String,
    endpoint_url: Option<String>, // Custom endpoint for S3-compatible providers
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    pub async fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
    ) -> StorageResult<Self> {
        let region_provider =
            RegionProviderChain::first_try(aws_config::Region::new(region.clone()));
        let retry_config = RetryConfig::standard()
            .with_max_attempts(5)
            .with_retry_mode(RetryMode::Adaptive);

        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .retry_config(retry_config.clone())
            .load()
            .await;

        let client = match endpoint_url {
            Some(ref endpoint) => {
                let mut builder = aws_sdk_s3::config::Builder::from(&config)
                    .endpoint_url(endpoint)
                    .retry_config(retry_config)
                    // MinIO and most S3-compatible providers need path-style addressing
                    .force_path_style(true);
                if let Some(provider) = config.credentials_provider() {
                    builder = builder.credentials_provider(provider);
                }
                Client::from_conf(builder.build())
            }
            None => Client::new(&config),
        };

        Ok(Self::from_client(client, bucket, region, endpoint_url))
    }

    pub fn from_client(
        client: Client,
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
    ) -> Self {
        S3Storage {
            client,
            bucket,
            region,
            endpoint_url,
        }
    }

    /// Generate public URL for S3 object
    ///
    /// For AWS S3, uses the standard format: https://{bucket}.s3.{region}.amazonaws.com/{key}
    /// For S3-compatible providers, uses path-style on the endpoint URL
    fn generate_url(&self, key: &str) -> String {
        if let Some(ref endpoint) = self.endpoint_url {
            let base_url = endpoint.trim_end_matches('/');
            format!("{}/{}/{}", base_url, self.bucket, key)
        } else {
            format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, key
            )
        }
    }
}

#[async_trait]
impl StorageGateway for S3Storage {
    async fn presigned_put_url(
        &self,
        object_key: &str,
        constraints: &PutConstraints,
        expires_in: Duration,
    ) -> StorageResult<PresignedPut> {
        crate::keys::validate_key(object_key)?;

        let content_length = i64::try_from(constraints.byte_size).map_err(|_| {
            StorageError::ConstraintViolation(format!(
                "Declared size {} is out of range",
                constraints.byte_size
            ))
        })?;
        let expires_at = Utc::now()
            + chrono::Duration::from_std(expires_in)
                .map_err(|e| StorageError::ConfigError(e.to_string()))?;
        let presigning = PresigningConfig::builder()
            .expires_in(expires_in)
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        let digest = constraints.digest.to_base64();
        let presigned = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(object_key)
            .content_type(&constraints.content_type)
            .content_md5(&digest)
            .content_length(content_length)
            .metadata(DECLARED_DIGEST_METADATA, &digest)
            .presigned(presigning)
            .await
            .map_err(|e| StorageError::BackendError(e.to_string()))?;

        let headers: BTreeMap<String, String> = presigned
            .headers()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();

        tracing::debug!(
            bucket = %self.bucket,
            object_key = %object_key,
            expires_in_secs = expires_in.as_secs(),
            signed_headers = headers.len(),
            "Issued S3 presigned PUT URL"
        );

        Ok(PresignedPut {
            url: presigned.uri().to_string(),
            expires_at,
            headers,
        })
    }

    async fn stat(&self, object_key: &str) -> StorageResult<Option<StoredObject>> {
        crate::keys::validate_key(object_key)?;
        let head = match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(object_key)
            .send()
            .await
        {
            Ok(head) => head,
            Err(e) => {
                if let SdkError::ServiceError(service_err) = &e {
                    if let HeadObjectError::NotFound(_) = service_err.err() {
                        return Ok(None);
                    }
                }
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    object_key = %object_key,
                    "S3 head failed"
                );
                return Err(StorageError::BackendError(e.to_string()));
            }
        };

        // Multipart ETags are not content digests and fail to parse.
        let digest = head
            .e_tag()
            .and_then(|etag| ContentDigest::from_hex(etag).ok())
            .map(|d| d.to_base64());
        let declared_digest = head
            .metadata()
            .and_then(|meta| meta.get(DECLARED_DIGEST_METADATA))
            .cloned();

        Ok(Some(StoredObject {
            object_key: object_key.to_string(),
            byte_size: head.content_length().unwrap_or(0).max(0) as u64,
            digest,
            declared_digest,
            visibility: Visibility::Public,
        }))
    }

    fn public_url(&self, object_key: &str) -> String {
        self.generate_url(object_key)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
