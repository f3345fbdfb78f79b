use crate::utils::validation::{ALLOWED_EXTENSIONS, MAX_FILE_SIZE, UploadPolicy};
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Where photo blobs live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// One directory per namespace on local disk
    Local,
    /// One bucket per namespace on an S3-compatible service
    S3,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" | "disk" => Ok(StorageBackend::Local),
            "s3" | "bucket" => Ok(StorageBackend::S3),
            other => Err(format!("Unknown storage backend '{}'", other)),
        }
    }
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Local => "local",
            StorageBackend::S3 => "s3",
        }
    }
}

/// A logical photo namespace with its own upload/list/download routes
#[derive(Debug, Clone)]
pub struct NamespaceConfig {
    pub name: String,

    /// Prefix of the `/upload`, `/photos` and `/download` routes
    pub api_prefix: String,

    /// Route serving stored files, e.g. `/uploads`
    pub files_route: String,

    /// Directory used by the local backend
    pub upload_dir: PathBuf,

    /// Bucket used by the S3 backend
    pub bucket: String,

    pub upload_message: String,

    /// First part of batch ZIP names: `<prefix>_fotos_<timestamp>.zip`
    pub archive_prefix: String,
}

impl NamespaceConfig {
    pub fn lasacam(upload_dir: impl Into<PathBuf>, bucket: impl Into<String>) -> Self {
        Self {
            name: "lasacam".to_string(),
            api_prefix: "/api".to_string(),
            files_route: "/uploads".to_string(),
            upload_dir: upload_dir.into(),
            bucket: bucket.into(),
            upload_message: "Foto subida con éxito".to_string(),
            archive_prefix: "lasacam".to_string(),
        }
    }

    pub fn procigar(upload_dir: impl Into<PathBuf>, bucket: impl Into<String>) -> Self {
        Self {
            name: "procigar".to_string(),
            api_prefix: "/api/procigar".to_string(),
            files_route: "/procigar/uploads".to_string(),
            upload_dir: upload_dir.into(),
            bucket: bucket.into(),
            upload_message: "Foto subida con éxito a Procigar".to_string(),
            archive_prefix: "procigar".to_string(),
        }
    }
}

/// S3-compatible object storage settings
#[derive(Debug, Clone)]
pub struct S3Config {
    pub endpoint: Option<String>,
    pub region: String,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,

    /// Origin objects are publicly served from (default: the endpoint)
    pub public_base_url: Option<String>,

    /// Apply a public-read ACL to every uploaded object (default: false)
    pub public_acl: bool,

    /// Key prefix of photo objects inside a bucket (default: "uploads/")
    pub key_prefix: String,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            endpoint: None,
            region: "us-east-1".to_string(),
            access_key: None,
            secret_key: None,
            public_base_url: None,
            public_acl: false,
            key_prefix: "uploads/".to_string(),
        }
    }
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP port (default: 5000)
    pub port: u16,

    /// Bind address (default: "0.0.0.0")
    pub bind_addr: String,

    /// Maximum photo size in bytes (default: 10 MiB)
    pub max_file_size: usize,

    /// Accepted extensions, lowercase with leading dot
    pub allowed_extensions: Vec<String>,

    pub storage_backend: StorageBackend,

    /// Base of URLs handed out for locally stored files. When unset the URL
    /// is derived from the request's `Host` and `X-Forwarded-Proto`.
    pub public_base_url: Option<String>,

    pub s3: S3Config,

    pub namespaces: Vec<NamespaceConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            bind_addr: "0.0.0.0".to_string(),
            max_file_size: MAX_FILE_SIZE,
            allowed_extensions: ALLOWED_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            storage_backend: StorageBackend::Local,
            public_base_url: None,
            s3: S3Config::default(),
            namespaces: vec![
                NamespaceConfig::lasacam("uploads", "lasacam"),
                NamespaceConfig::procigar("uploads_procigar", "procigarfotos"),
            ],
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();
        let default_s3 = S3Config::default();

        let mut namespaces = vec![NamespaceConfig::lasacam(
            env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()),
            env::var("LASACAM_BUCKET").unwrap_or_else(|_| "lasacam".to_string()),
        )];

        let enable_procigar = env::var("ENABLE_PROCIGAR")
            .map(|v| v.to_lowercase() != "false" && v != "0")
            .unwrap_or(true);
        if enable_procigar {
            namespaces.push(NamespaceConfig::procigar(
                env::var("PROCIGAR_UPLOAD_DIR").unwrap_or_else(|_| "uploads_procigar".to_string()),
                env::var("PROCIGAR_BUCKET").unwrap_or_else(|_| "procigarfotos".to_string()),
            ));
        }

        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.port),

            bind_addr: env::var("BIND_ADDR").unwrap_or(default.bind_addr),

            max_file_size: env::var("MAX_FILE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_file_size),

            allowed_extensions: env::var("ALLOWED_EXTENSIONS")
                .ok()
                .map(|v| parse_extensions(&v))
                .filter(|exts| !exts.is_empty())
                .unwrap_or(default.allowed_extensions),

            storage_backend: env::var("STORAGE_BACKEND")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.storage_backend),

            public_base_url: env::var("PUBLIC_BASE_URL").ok().filter(|v| !v.is_empty()),

            s3: S3Config {
                endpoint: env::var("S3_ENDPOINT").ok(),
                region: env::var("S3_REGION").unwrap_or(default_s3.region),
                access_key: env::var("S3_ACCESS_KEY").ok(),
                secret_key: env::var("S3_SECRET_KEY").ok(),
                public_base_url: env::var("S3_PUBLIC_BASE_URL").ok(),
                public_acl: env::var("S3_PUBLIC_ACL")
                    .map(|v| v.to_lowercase() == "true" || v == "1")
                    .unwrap_or(default_s3.public_acl),
                key_prefix: env::var("S3_KEY_PREFIX").unwrap_or(default_s3.key_prefix),
            },

            namespaces,
        }
    }

    /// Create config for development: local storage under `base_dir`
    pub fn development(base_dir: &Path) -> Self {
        Self {
            namespaces: vec![
                NamespaceConfig::lasacam(base_dir.join("uploads"), "lasacam"),
                NamespaceConfig::procigar(base_dir.join("uploads_procigar"), "procigarfotos"),
            ],
            ..Self::default()
        }
    }

    pub fn upload_policy(&self) -> UploadPolicy {
        UploadPolicy {
            allowed_extensions: self.allowed_extensions.clone(),
            max_file_size: self.max_file_size,
            ..UploadPolicy::default()
        }
    }

    /// Key prefix of photo blobs for the configured backend
    pub fn key_prefix(&self) -> &str {
        match self.storage_backend {
            StorageBackend::Local => "",
            StorageBackend::S3 => &self.s3.key_prefix,
        }
    }
}

/// Splits a comma separated extension list into `.ext` form
fn parse_extensions(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
        .filter(|ext| !ext.is_empty())
        .map(|ext| format!(".{}", ext))
        .collect()
}
