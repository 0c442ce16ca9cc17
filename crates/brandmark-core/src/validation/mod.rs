//! Upload request validation
//!
//! Size and content-type checks run before any ticket is issued. Failures here are
//! never retried automatically.

use crate::error::AppError;

/// Validation errors for upload requests
#[derive(Debug, thiserror::Error)]
pub enum UploadValidationError {
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: u64, max: u64 },

    #[error("Invalid content type: {content_type} (allowed: {allowed:?})")]
    InvalidContentType {
        content_type: String,
        allowed: Vec<String>,
    },

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("Empty file")]
    EmptyFile,
}

impl From<UploadValidationError> for AppError {
    fn from(err: UploadValidationError) -> Self {
        match err {
            UploadValidationError::FileTooLarge { size, max } => {
                AppError::PayloadTooLarge(format!("{} bytes exceeds max {} bytes", size, max))
            }
            UploadValidationError::InvalidContentType {
                content_type,
                allowed,
            } => AppError::UnsupportedMediaType(format!(
                "Content type '{}' is not allowed, expected one of: {}",
                content_type,
                allowed.join(", ")
            )),
            UploadValidationError::InvalidFilename(msg) => AppError::InvalidInput(msg),
            UploadValidationError::EmptyFile => AppError::InvalidInput("File is empty".to_string()),
        }
    }
}

/// Validator for a single asset purpose
#[derive(Debug, Clone)]
pub struct UploadValidator {
    max_file_size: u64,
    allowed_content_types: Vec<String>,
}

impl UploadValidator {
    pub fn new(max_file_size: u64, allowed_content_types: Vec<String>) -> Self {
        Self {
            max_file_size,
            allowed_content_types: allowed_content_types
                .into_iter()
                .map(|ct| ct.trim().to_lowercase())
                .collect(),
        }
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Validate file size
    pub fn validate_file_size(&self, size: u64) -> Result<(), UploadValidationError> {
        if size == 0 {
            return Err(UploadValidationError::EmptyFile);
        }

        if size > self.max_file_size {
            return Err(UploadValidationError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }

        Ok(())
    }

    /// Validate content type against the allow-list and return its normalized form.
    pub fn validate_content_type(&self, content_type: &str) -> Result<String, UploadValidationError> {
        let normalized = normalize_content_type(content_type);

        if !self.allowed_content_types.iter().any(|ct| ct == &normalized) {
            return Err(UploadValidationError::InvalidContentType {
                content_type: content_type.to_string(),
                allowed: self.allowed_content_types.clone(),
            });
        }

        Ok(normalized)
    }

    /// The filename is informational, but control characters are still refused.
    pub fn validate_file_name(&self, file_name: &str) -> Result<(), UploadValidationError> {
        if file_name.trim().is_empty() {
            return Err(UploadValidationError::InvalidFilename(
                "Filename must not be empty".to_string(),
            ));
        }
        if file_name.chars().any(char::is_control) {
            return Err(UploadValidationError::InvalidFilename(
                "Filename contains control characters".to_string(),
            ));
        }
        Ok(())
    }

    /// Validate all aspects of an upload, returning the normalized content type.
    pub fn validate_all(
        &self,
        file_name: &str,
        content_type: &str,
        file_size: u64,
    ) -> Result<String, UploadValidationError> {
        self.validate_file_size(file_size)?;
        self.validate_file_name(file_name)?;
        self.validate_content_type(content_type)
    }
}

/// Lowercase and drop parameters such as `; charset=utf-8`.
pub fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase()
}

/// File extension for object keys, derived from a validated content type.
pub fn extension_for_content_type(content_type: &str) -> &'static str {
    match content_type {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        "image/avif" => "avif",
        "image/x-icon" | "image/vnd.microsoft.icon" => "ico",
        _ => "bin",
    }
}
