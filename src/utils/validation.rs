use crate::utils::multipart::UploadedFile;
use chrono::Utc;
use rand::RngCore;
use rand::rngs::OsRng;
use thiserror::Error;

/// Maximum photo size: 10 MiB
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Image extensions accepted for upload, lowercase with the leading dot
pub const ALLOWED_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif"];

/// Prefix of every generated stored filename
pub const STORED_NAME_PREFIX: &str = "lasacam";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Extensión no permitida. Use: {allowed}")]
    ExtensionNotAllowed { extension: String, allowed: String },

    #[error("Archivo muy grande. Máximo: {}MB", .max_size / 1024 / 1024)]
    TooLarge { size: u64, max_size: usize },

    #[error("El archivo está vacío")]
    Empty,
}

/// Upload rules, passed explicitly so tests can vary them.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub allowed_extensions: Vec<String>,
    pub max_file_size: usize,
    pub name_prefix: String,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            allowed_extensions: ALLOWED_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            max_file_size: MAX_FILE_SIZE,
            name_prefix: STORED_NAME_PREFIX.to_string(),
        }
    }
}

impl UploadPolicy {
    pub fn with_max_file_size(max_file_size: usize) -> Self {
        Self {
            max_file_size,
            ..Self::default()
        }
    }

    pub fn is_allowed(&self, filename: &str) -> bool {
        extension_of(filename).is_some_and(|ext| self.allowed_extensions.contains(&ext))
    }
}

/// Lowercased extension including the dot, taken after the last `.`
pub fn extension_of(filename: &str) -> Option<String> {
    filename
        .rfind('.')
        .map(|idx| filename[idx..].to_lowercase())
}

/// Validates file size against the policy ceiling
pub fn validate_file_size(size: u64, policy: &UploadPolicy) -> Result<(), ValidationError> {
    if size > policy.max_file_size as u64 {
        return Err(ValidationError::TooLarge {
            size,
            max_size: policy.max_file_size,
        });
    }
    Ok(())
}

/// Guards on the declared `Content-Length`, before any body byte is read.
/// An absent header is let through; the body read is bounded anyway.
pub fn check_declared_length(
    declared: Option<u64>,
    policy: &UploadPolicy,
) -> Result<(), ValidationError> {
    match declared {
        Some(0) => Err(ValidationError::Empty),
        Some(size) => validate_file_size(size, policy),
        None => Ok(()),
    }
}

/// Validates the extension against the allow-list and returns it
pub fn validate_extension(filename: &str, policy: &UploadPolicy) -> Result<String, ValidationError> {
    match extension_of(filename) {
        Some(ext) if policy.allowed_extensions.contains(&ext) => Ok(ext),
        other => Err(ValidationError::ExtensionNotAllowed {
            extension: other.unwrap_or_default(),
            allowed: policy.allowed_extensions.join(", "),
        }),
    }
}

/// Full validation pipeline for a parsed upload; returns the stored name
pub fn validate_and_name(
    file: &UploadedFile,
    policy: &UploadPolicy,
) -> Result<String, ValidationError> {
    // 1. Extension allow-list
    let extension = validate_extension(&file.original_filename, policy)?;

    // 2. Size: empty, then ceiling
    if file.raw_bytes.is_empty() {
        return Err(ValidationError::Empty);
    }
    validate_file_size(file.raw_bytes.len() as u64, policy)?;

    Ok(generate_stored_name(&policy.name_prefix, &extension))
}

/// `<prefix>-<epoch ms>-<8 hex chars><ext>`, the suffix drawn from the OS CSPRNG
pub fn generate_stored_name(prefix: &str, extension: &str) -> String {
    let mut suffix = [0u8; 4];
    OsRng.fill_bytes(&mut suffix);
    format!(
        "{}-{}-{}{}",
        prefix,
        Utc::now().timestamp_millis(),
        hex::encode(suffix),
        extension
    )
}
