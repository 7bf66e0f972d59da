//! Upload validation, filename sanitizing, and content-type sniffing.
//!
//! Multi-layer protection on upload:
//! 1. Size limit
//! 2. Extension blocklist
//! 3. Magic byte detection for executables

use once_cell::sync::Lazy;
use std::collections::HashSet;

use crate::defaults::FALLBACK_CONTENT_TYPE;

/// Magic byte signatures for executable files
pub const MAGIC_SIGNATURES: &[(&str, &[u8])] = &[
    ("Windows PE/MZ", &[0x4D, 0x5A]),
    ("ELF", &[0x7F, 0x45, 0x4C, 0x46]),
    ("Mach-O 32", &[0xFE, 0xED, 0xFA, 0xCE]),
    ("Mach-O 64", &[0xFE, 0xED, 0xFA, 0xCF]),
    ("Mach-O Fat / Java Class", &[0xCA, 0xFE, 0xBA, 0xBE]),
    ("WebAssembly", &[0x00, 0x61, 0x73, 0x6D]),
];

/// Blocked file extensions (case-insensitive)
static BLOCKED_EXTENSIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // Windows executables
        "exe", "dll", "scr", "pif", "com", "msi", "msp", "mst",
        // Unix binaries
        "so", "dylib", "out", // JVM
        "jar", "war", "ear", "class", // Packages
        "deb", "rpm", "apk", "app", "dmg", "pkg", // Office macros
        "xlsm", "xlsb", "xltm", "docm", "dotm", "pptm", "potm", "ppam",
        // Other
        "reg", "inf", "scf", "lnk", "url", "hta",
    ]
    .into_iter()
    .collect()
});

/// Result of file safety validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub allowed: bool,
    pub block_reason: Option<String>,
}

impl ValidationResult {
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            block_reason: None,
        }
    }

    pub fn blocked(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            block_reason: Some(reason.into()),
        }
    }
}

/// Validate an upload before it is written to disk.
pub fn validate_file(filename: &str, data: &[u8], max_size_bytes: u64) -> ValidationResult {
    if data.is_empty() {
        return ValidationResult::blocked("File is empty");
    }

    if data.len() as u64 > max_size_bytes {
        return ValidationResult::blocked(format!(
            "File exceeds maximum size of {} bytes",
            max_size_bytes
        ));
    }

    if let Some((_, ext)) = filename.rsplit_once('.') {
        if BLOCKED_EXTENSIONS.contains(ext.to_lowercase().as_str()) {
            return ValidationResult::blocked(format!("File extension .{} is not allowed", ext));
        }
    }

    for (name, magic) in MAGIC_SIGNATURES {
        if data.starts_with(magic) {
            return ValidationResult::blocked(format!("Executable file detected: {}", name));
        }
    }

    ValidationResult::allowed()
}

/// Detect a file's content type.
///
/// Magic bytes win; otherwise the extension decides for formats without a
/// signature (HWP, plain text, CSV...). Anything else is
/// `application/octet-stream`.
pub fn detect_content_type(filename: &str, data: &[u8]) -> String {
    if let Some(kind) = infer::get(data) {
        return kind.mime_type().to_string();
    }

    if let Some((_, ext)) = filename.rsplit_once('.') {
        if let Some(mime) = mime_from_extension(ext) {
            return mime.to_string();
        }
    }

    FALLBACK_CONTENT_TYPE.to_string()
}

/// Extensions trusted without magic bytes.
fn mime_from_extension(ext: &str) -> Option<&'static str> {
    match ext.to_lowercase().as_str() {
        "txt" | "log" => Some("text/plain"),
        "csv" => Some("text/csv"),
        "tsv" => Some("text/tab-separated-values"),
        "html" | "htm" => Some("text/html"),
        "xml" => Some("application/xml"),
        "json" => Some("application/json"),
        "md" | "markdown" => Some("text/markdown"),
        // Hangul word processor formats
        "hwp" => Some("application/x-hwp"),
        "hwpx" => Some("application/hwp+zip"),
        _ => None,
    }
}

/// Sanitize a declared filename for storage on disk.
pub fn sanitize_filename(filename: &str) -> String {
    // Remove path components
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);

    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' | '\0' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let sanitized = sanitized.trim();
    if sanitized.is_empty() || sanitized == "." || sanitized == ".." {
        return "unnamed_file".to_string();
    }

    // Truncate to 255 bytes on a char boundary, preserving the extension
    if sanitized.len() > 255 {
        let (stem, ext) = match sanitized.rfind('.') {
            Some(dot) if sanitized.len() - dot < 16 => sanitized.split_at(dot),
            _ => (sanitized, ""),
        };
        let mut cut = 255 - ext.len();
        while !stem.is_char_boundary(cut) {
            cut -= 1;
        }
        return format!("{}{}", &stem[..cut], ext);
    }

    sanitized.to_string()
}
