//! Content digests for direct uploads.
//!
//! The digest is MD5 (128 bits) encoded as standard base64, the format carried by the
//! `Content-MD5` header. Client and gateway must encode and compare with the same
//! encoding, so every conversion goes through [`ContentDigest`].
//!
//! Digests are computed before any network call; a read failure aborts the upload
//! attempt with `DigestComputationFailed`.

use crate::error::AppError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::fmt;
use std::path::Path;
use tokio::io::{AsyncRead, AsyncReadExt};

const BUF_SIZE: usize = 64 * 1024;
const DIGEST_LEN: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum ChecksumError {
    #[error("failed to read content: {0}")]
    Read(#[from] std::io::Error),

    #[error("content is empty")]
    Empty,

    #[error("digest is not valid base64 or hex: {0}")]
    InvalidEncoding(String),

    #[error("digest must be {DIGEST_LEN} bytes, got {0}")]
    InvalidLength(usize),
}

impl From<ChecksumError> for AppError {
    fn from(err: ChecksumError) -> Self {
        match err {
            ChecksumError::Read(_) | ChecksumError::Empty => {
                AppError::DigestComputationFailed(err.to_string())
            }
            ChecksumError::InvalidEncoding(_) | ChecksumError::InvalidLength(_) => {
                AppError::InvalidInput(err.to_string())
            }
        }
    }
}

/// A 128-bit content digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentDigest([u8; DIGEST_LEN]);

impl ContentDigest {
    /// Digest of an in-memory buffer. Pure: identical input yields identical output.
    pub fn compute(data: &[u8]) -> Self {
        ContentDigest(md5::compute(data).0)
    }

    /// Parse the base64 form used by `Content-MD5`.
    pub fn parse(encoded: &str) -> Result<Self, ChecksumError> {
        let raw = STANDARD
            .decode(encoded.trim())
            .map_err(|e| ChecksumError::InvalidEncoding(e.to_string()))?;
        Self::from_bytes(&raw)
    }

    /// Parse a lowercase or uppercase hex digest, e.g. a single-part S3 ETag.
    pub fn from_hex(encoded: &str) -> Result<Self, ChecksumError> {
        let raw = hex::decode(encoded.trim().trim_matches('"'))
            .map_err(|e| ChecksumError::InvalidEncoding(e.to_string()))?;
        Self::from_bytes(&raw)
    }

    /// Wrap raw digest bytes, checking the length.
    pub fn from_bytes(raw: &[u8]) -> Result<Self, ChecksumError> {
        let bytes: [u8; DIGEST_LEN] = raw
            .try_into()
            .map_err(|_| ChecksumError::InvalidLength(raw.len()))?;
        Ok(ContentDigest(bytes))
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl fmt::Debug for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentDigest({})", self.to_base64())
    }
}

/// Incremental digest over a byte stream, tracking the number of bytes seen.
pub struct DigestBuilder {
    context: md5::Context,
    len: u64,
}

impl DigestBuilder {
    pub fn new() -> Self {
        Self {
            context: md5::Context::new(),
            len: 0,
        }
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.context.consume(chunk);
        self.len += chunk.len() as u64;
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn finish(self) -> ContentDigest {
        ContentDigest(self.context.compute().0)
    }
}

impl Default for DigestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Digest everything the reader yields, returning the digest and the byte count.
///
/// Fails with [`ChecksumError::Empty`] when the reader yields no bytes.
pub async fn digest_reader<R>(mut reader: R) -> Result<(ContentDigest, u64), ChecksumError>
where
    R: AsyncRead + Unpin,
{
    let mut builder = DigestBuilder::new();
    let mut buf = vec![0u8; BUF_SIZE];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        builder.update(&buf[..n]);
    }
    if builder.is_empty() {
        return Err(ChecksumError::Empty);
    }
    let len = builder.len();
    Ok((builder.finish(), len))
}

/// Digest a file on disk in bounded chunks.
pub async fn digest_file(path: &Path) -> Result<(ContentDigest, u64), ChecksumError> {
    let file = tokio::fs::File::open(path).await?;
    let result = digest_reader(file).await;
    if let Err(ref e) = result {
        tracing::warn!(path = %path.display(), error = %e, "Digest computation failed");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn compute_is_deterministic() {
        let data = vec![7u8; 2048];
        assert_eq!(ContentDigest::compute(&data), ContentDigest::compute(&data));
        assert_eq!(
            ContentDigest::compute(&data).to_base64(),
            ContentDigest::compute(&data.clone()).to_base64()
        );
    }

    #[test]
    fn compute_known_value() {
        // md5("hello\n") = b1946ac92492d2347c6235b4d2611184
        let digest = ContentDigest::compute(b"hello\n");
        assert_eq!(digest.to_hex(), "b1946ac92492d2347c6235b4d2611184");
        assert_eq!(digest.to_base64(), "sZRqySSS0jR8YjW00mERhA==");
    }

    #[test]
    fn parse_accepts_its_own_encoding() {
        let digest = ContentDigest::compute(b"logo bytes");
        let parsed = ContentDigest::parse(&digest.to_base64()).unwrap();
        assert_eq!(parsed, digest);
    }

    #[test]
    fn parse_rejects_wrong_length() {
        // "abc123==" is a placeholder digest, not a 128-bit value.
        assert!(ContentDigest::parse("abc123==").is_err());
        assert!(matches!(
            ContentDigest::parse("AAAA"),
            Err(ChecksumError::InvalidLength(3))
        ));
    }

    #[test]
    fn from_hex_matches_base64_form() {
        let digest = ContentDigest::from_hex("\"b1946ac92492d2347c6235b4d2611184\"").unwrap();
        assert_eq!(digest.to_base64(), "sZRqySSS0jR8YjW00mERhA==");
        assert!(ContentDigest::from_hex("abc").is_err());
    }

    #[test]
    fn multipart_etag_is_not_a_digest() {
        assert!(matches!(
            ContentDigest::from_hex("\"b1946ac92492d2347c6235b4d2611184-2\""),
            Err(ChecksumError::InvalidEncoding(_))
        ));
        assert!(matches!(
            ContentDigest::from_hex("zz946ac92492d2347c6235b4d2611184"),
            Err(ChecksumError::InvalidEncoding(_))
        ));
        assert!(matches!(
            ContentDigest::from_hex("b1946ac92492d2347c6235b4d26111"),
            Err(ChecksumError::InvalidLength(15))
        ));
    }

    #[test]
    fn builder_matches_one_shot() {
        let mut builder = DigestBuilder::new();
        builder.update(b"hel");
        builder.update(b"lo\n");
        assert_eq!(builder.len(), 6);
        assert_eq!(builder.finish(), ContentDigest::compute(b"hello\n"));
    }

    #[tokio::test]
    async fn digest_file_reads_whole_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(&vec![1u8; 200_000]).unwrap();
        f.flush().unwrap();
        let (digest, len) = digest_file(f.path()).await.unwrap();
        assert_eq!(len, 200_000);
        assert_eq!(digest, ContentDigest::compute(&vec![1u8; 200_000]));
    }

    #[tokio::test]
    async fn digest_file_rejects_empty_and_missing() {
        let f = tempfile::NamedTempFile::new().unwrap();
        let err = digest_file(f.path()).await.unwrap_err();
        assert!(matches!(err, ChecksumError::Empty));
        assert!(matches!(
            AppError::from(err),
            AppError::DigestComputationFailed(_)
        ));

        let missing = f.path().with_extension("missing");
        let err = digest_file(&missing).await.unwrap_err();
        assert!(matches!(
            AppError::from(err),
            AppError::DigestComputationFailed(_)
        ));
    }
}
