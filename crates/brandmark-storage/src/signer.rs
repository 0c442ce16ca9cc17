//! Signed capability tokens for direct PUTs to the local gateway.
//!
//! Payload: expiry_ts (i64 BE) || max_size (u64 BE) || byte_size (u64 BE) || digest (16 bytes) ||
//! visibility (1 byte) || content_type (utf-8, remainder).
//! Token = base64url(payload || HMAC-SHA256(secret, "PUT\n" || key || "\n" || payload)).
//!
//! The key is covered by the MAC but not carried in the token, so a token is only
//! valid for the path it was issued for.

use crate::traits::{PutConstraints, StorageError, StorageResult};
use base64::Engine;
use brandmark_core::models::Visibility;
use brandmark_core::ContentDigest;
use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

const FIXED_LEN: usize = 8 + 8 + 8 + 16 + 1; // expiry + max_size + byte_size + digest + visibility
const MAC_LEN: usize = 32; // SHA256

/// Constraints recovered from a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedPut {
    pub constraints: PutConstraints,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct UploadSigner {
    secret: Vec<u8>,
}

impl UploadSigner {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    fn mac(&self, key: &str, payload: &[u8]) -> StorageResult<Hmac<Sha256>> {
        let mut mac = Hmac::<Sha256>::new_from_slice(&self.secret)
            .map_err(|e| StorageError::ConfigError(format!("Invalid signing secret: {}", e)))?;
        mac.update(b"PUT\n");
        mac.update(key.as_bytes());
        mac.update(b"\n");
        mac.update(payload);
        Ok(mac)
    }

    /// Build a token authorizing one PUT of `key` until `expires_at` (second precision).
    pub fn sign(
        &self,
        key: &str,
        constraints: &PutConstraints,
        expires_at: DateTime<Utc>,
    ) -> StorageResult<String> {
        let mut payload = Vec::with_capacity(FIXED_LEN + constraints.content_type.len());
        payload.extend_from_slice(&expires_at.timestamp().to_be_bytes());
        payload.extend_from_slice(&constraints.max_size.to_be_bytes());
        payload.extend_from_slice(&constraints.byte_size.to_be_bytes());
        payload.extend_from_slice(constraints.digest.as_bytes());
        payload.push(match constraints.visibility {
            Visibility::Public => 1,
            Visibility::Private => 0,
        });
        payload.extend_from_slice(constraints.content_type.as_bytes());

        let tag = self.mac(key, &payload)?.finalize().into_bytes();
        payload.extend_from_slice(&tag);

        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(payload))
    }

    /// Verify a token for `key` at instant `now`.
    ///
    /// The signature is checked before the expiry, so a forged token never reports
    /// as merely expired.
    pub fn verify(&self, token: &str, key: &str, now: DateTime<Utc>) -> StorageResult<SignedPut> {
        let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| StorageError::InvalidSignature)?;
        if decoded.len() < FIXED_LEN + MAC_LEN {
            return Err(StorageError::InvalidSignature);
        }

        let (payload, tag) = decoded.split_at(decoded.len() - MAC_LEN);
        self.mac(key, payload)?
            .verify_slice(tag)
            .map_err(|_| StorageError::InvalidSignature)?;

        let mut expiry = [0u8; 8];
        expiry.copy_from_slice(&payload[0..8]);
        let mut max_size = [0u8; 8];
        max_size.copy_from_slice(&payload[8..16]);
        let mut byte_size = [0u8; 8];
        byte_size.copy_from_slice(&payload[16..24]);

        let expires_at = Utc
            .timestamp_opt(i64::from_be_bytes(expiry), 0)
            .single()
            .ok_or(StorageError::InvalidSignature)?;
        if now >= expires_at {
            return Err(StorageError::SignatureExpired);
        }

        let digest = ContentDigest::from_bytes(&payload[24..40])
            .map_err(|_| StorageError::InvalidSignature)?;
        let visibility = if payload[40] == 1 {
            Visibility::Public
        } else {
            Visibility::Private
        };
        let content_type = std::str::from_utf8(&payload[FIXED_LEN..])
            .map_err(|_| StorageError::InvalidSignature)?
            .to_string();

        Ok(SignedPut {
            constraints: PutConstraints {
                content_type,
                digest,
                max_size: u64::from_be_bytes(max_size),
                byte_size: u64::from_be_bytes(byte_size),
                visibility,
            },
            expires_at,
        })
    }
}
