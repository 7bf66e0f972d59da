//! Centralized default constants.
//!
//! Every crate references these instead of defining its own magic values.
//! Environment variable names live next to the default they override.

// =============================================================================
// REMOTE INFERENCE SERVICE
// =============================================================================

/// Base URL of the remote analysis/generation service.
pub const INFERENCE_URL: &str = "http://localhost:8001";

/// Multipart upload path that runs document analysis.
pub const ANALYZE_PATH: &str = "/analyze";

/// First-turn generation path.
pub const GENERATE_PATH: &str = "/generate";

/// Turn-continuation path. Only used when thread routing is enabled.
pub const CONTINUE_PATH: &str = "/generate/continue";

/// Table-of-contents lookup path (takes a `project_idx` query parameter).
pub const TOC_PATH: &str = "/toc";

/// Law verification path.
pub const VERIFY_PATH: &str = "/verify/law";

/// Draft comparison path.
pub const COMPARE_PATH: &str = "/compare/draft";

/// End-to-end timeout for a single remote call. Analysis of large
/// announcements routinely takes minutes.
pub const INFERENCE_TIMEOUT_SECS: u64 = 300;

pub const ENV_INFERENCE_CONFIG: &str = "ALICE_INFERENCE_CONFIG";
pub const ENV_INFERENCE_URL: &str = "ALICE_INFERENCE_URL";
pub const ENV_ANALYZE_PATH: &str = "ALICE_INFERENCE_ANALYZE_PATH";
pub const ENV_GENERATE_PATH: &str = "ALICE_INFERENCE_GENERATE_PATH";
pub const ENV_CONTINUE_PATH: &str = "ALICE_INFERENCE_CONTINUE_PATH";
pub const ENV_TOC_PATH: &str = "ALICE_INFERENCE_TOC_PATH";
pub const ENV_VERIFY_PATH: &str = "ALICE_INFERENCE_VERIFY_PATH";
pub const ENV_COMPARE_PATH: &str = "ALICE_INFERENCE_COMPARE_PATH";
pub const ENV_INFERENCE_TIMEOUT_SECS: &str = "ALICE_INFERENCE_TIMEOUT_SECS";
pub const ENV_CHAT_ROUTING: &str = "ALICE_INFERENCE_ROUTING";

// =============================================================================
// ANALYSIS
// =============================================================================

/// Folder tag for announcement documents.
pub const FOLDER_ANNOUNCEMENT: i64 = 1;

/// Folder tag for attachment documents.
pub const FOLDER_ATTACHMENT: i64 = 2;

/// Delimiter used to flatten list-valued feature fields for storage.
pub const LIST_DELIMITER: char = '|';

/// Stand-in for a literal delimiter inside a list element (FULLWIDTH VERTICAL LINE).
pub const LIST_DELIMITER_SUBSTITUTE: char = '\u{FF5C}';

/// Content type used when nothing better can be determined.
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 8081;

/// Logical root that stored paths may be prefixed with.
pub const UPLOADS_ROOT: &str = "uploads";

/// Default upload directory on disk.
pub const UPLOAD_DIR: &str = "uploads";

/// Maximum accepted request body for uploads (50 MiB).
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

pub const ENV_UPLOAD_DIR: &str = "UPLOAD_DIR";
pub const ENV_STORAGE: &str = "ALICE_STORAGE";
pub const ENV_MAX_UPLOAD_BYTES: &str = "MAX_UPLOAD_BYTES";
pub const ENV_DATABASE_MAX_CONNECTIONS: &str = "DATABASE_MAX_CONNECTIONS";
