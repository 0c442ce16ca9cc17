//! API constants
//!
//! All application routes are versioned under [`API_PREFIX`]. The local storage
//! gateway is mounted outside the versioned tree, at [`STORAGE_PREFIX`].

/// API base path prefix (version-independent)
pub const API_BASE: &str = "/api";

/// Current API version
pub const API_VERSION: &str = "v0";

/// Versioned API prefix
pub const API_PREFIX: &str = "/api/v0";

/// Mount point of the local storage gateway routes
pub const STORAGE_PREFIX: &str = "/storage";

/// Query parameter carrying the capability token of a local upload URL
pub const UPLOAD_TOKEN_PARAM: &str = "token";

/// Lifetime of session tokens issued by [`crate::auth::jwt::JwtService::issue`]
pub const SESSION_TOKEN_TTL_SECS: i64 = 60 * 60;

/// Maximum number of requests handled concurrently by the server
pub const HTTP_CONCURRENCY_LIMIT: usize = 512;
