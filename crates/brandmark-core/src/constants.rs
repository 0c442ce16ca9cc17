//! Protocol constants shared by the server, the storage gateways and the client.

/// Header carrying the base64-encoded 128-bit content digest.
pub const CONTENT_MD5_HEADER: &str = "Content-MD5";

/// Default lifetime of an upload ticket. Minutes, not hours.
pub const DEFAULT_TICKET_TTL_SECS: u64 = 5 * 60;

/// Upper bound accepted for `TICKET_TTL_SECS`.
pub const MAX_TICKET_TTL_SECS: u64 = 60 * 60;

/// Default logo size limit in megabytes.
pub const DEFAULT_LOGO_MAX_SIZE_MB: u64 = 5;

/// Default allow-list for logo uploads.
pub const DEFAULT_LOGO_CONTENT_TYPES: &str =
    "image/png,image/jpeg,image/gif,image/webp,image/svg+xml";

/// Maximum length of user supplied file names and public names.
pub const MAX_NAME_LENGTH: usize = 255;
