//! Path grammar, content limits, and extension classification.

use crate::error::{Error, Result};

pub const MAX_PATH_CHARS: usize = 1000;

/// Upper bound on the stored representation, which caps binary files at
/// roughly 7.5 MiB of raw bytes after base64 expansion.
pub const MAX_CONTENT_BYTES: usize = 10 * 1024 * 1024;

/// Extensions classified as binary. Content for these paths is expected to
/// be base64 text; listings exclude them from content searches.
pub const BINARY_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "webp", "ico", "svg", "tiff", "tif", "pdf", "doc", "docx",
    "xls", "xlsx", "ppt", "pptx", "odt", "ods", "odp", "zip", "rar", "7z", "tar", "gz", "bz2",
    "xz", "mp3", "wav", "ogg", "flac", "aac", "wma", "m4a", "mp4", "avi", "mkv", "mov", "wmv",
    "flv", "webm", "exe", "dll", "so", "dylib", "bin", "ttf", "otf", "woff", "woff2", "eot", "db",
    "sqlite", "sqlite3",
];

fn is_forbidden_path_char(c: char) -> bool {
    matches!(c, '<' | '>' | ':' | '"' | '|' | '?' | '*') || (c as u32) < 0x20
}

/// Validates a relative file path: 1..=1000 characters, excluding
/// `< > : " | ? *` and control characters.
pub fn validate_path(path: &str) -> Result<()> {
    let len = path.chars().count();
    if len == 0 {
        return Err(Error::Validation("path cannot be empty".to_string()));
    }
    if len > MAX_PATH_CHARS {
        return Err(Error::Validation(format!(
            "path cannot exceed {MAX_PATH_CHARS} characters"
        )));
    }
    if path.chars().any(is_forbidden_path_char) {
        return Err(Error::Validation(
            "path contains forbidden characters".to_string(),
        ));
    }
    Ok(())
}

/// Validates the stored representation size (byte length, uniformly).
pub fn validate_content(content: &str) -> Result<()> {
    if content.len() > MAX_CONTENT_BYTES {
        return Err(Error::Validation(format!(
            "content cannot exceed {MAX_CONTENT_BYTES} bytes"
        )));
    }
    Ok(())
}

/// Extracts the lowercase extension from the final path segment.
///
/// Dotfiles (`.gitignore`) and trailing dots yield no extension.
#[must_use]
pub fn extension_of(path: &str) -> Option<String> {
    let segment = path.rsplit('/').next().unwrap_or(path);
    let dot = segment.rfind('.')?;
    if dot == 0 {
        return None;
    }
    let ext = &segment[dot + 1..];
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

#[must_use]
pub fn is_binary_extension(extension: &str) -> bool {
    BINARY_EXTENSIONS.contains(&extension)
}

/// Derives `(extension, is_binary)` from a path, the only source of truth
/// for both fields on every create, upsert, and rename.
#[must_use]
pub fn classify_path(path: &str) -> (Option<String>, bool) {
    let extension = extension_of(path);
    let is_binary = extension
        .as_deref()
        .map(is_binary_extension)
        .unwrap_or(false);
    (extension, is_binary)
}
