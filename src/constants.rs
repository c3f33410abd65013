/// Maximum decoded media size in bytes (20MB)
/// Larger recordings are rejected before any upstream call
pub const MAX_MEDIA_BYTES: usize = 20 * 1024 * 1024;

/// Warning threshold for large uploads (10MB)
/// Log when media exceeds this size for monitoring
pub const WARN_MEDIA_BYTES: usize = 10 * 1024 * 1024;

/// Minimum password length accepted at registration
pub const MIN_PASSWORD_LEN: usize = 6;

/// Default session lifetime in seconds (7 days)
pub const DEFAULT_SESSION_TTL_SECS: i64 = 7 * 24 * 3600;

/// Maximum age of a Stripe webhook timestamp in seconds (5 minutes)
/// Prevents replay attacks
pub const STRIPE_TIMESTAMP_TOLERANCE_SECS: i64 = 300;

/// PayPal REST endpoint used when `PAYPAL_API_URL` is unset
pub const PAYPAL_SANDBOX_API: &str = "https://api-m.sandbox.paypal.com";

/// Characters of raw upstream text echoed back when parsing fails
pub const RAW_RESPONSE_EXCERPT_CHARS: usize = 500;

/// Default and maximum number of history items returned per request
pub const DEFAULT_HISTORY_LIMIT: usize = 50;
pub const MAX_HISTORY_LIMIT: usize = 100;

/// Sampling temperature sent to the analysis model
pub const ANALYSIS_TEMPERATURE: f32 = 0.4;

// =============================================================================
// Error Messages
// =============================================================================

/// Error message for missing media fields
pub const ERR_MISSING_MEDIA: &str = "Video data and mime type are required";

/// Error message for media that is not valid base64
pub const ERR_INVALID_MEDIA_ENCODING: &str = "Video data must be valid base64";

/// Error message for unsupported media types
pub const ERR_UNSUPPORTED_MIME_TYPE: &str = "Only video/* and audio/* recordings are supported";

/// Error message for a negative or non-numeric duration
pub const ERR_INVALID_DURATION: &str = "Video duration must be a non-negative number of seconds";

/// Error message for malformed email addresses
pub const ERR_INVALID_EMAIL: &str = "A valid email address is required";

/// Error message for missing display names
pub const ERR_MISSING_NAME: &str = "Name is required";
