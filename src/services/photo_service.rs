use crate::api::error::AppError;
use crate::api::origin::PublicOrigin;
use crate::config::NamespaceConfig;
use crate::models::{PhotoRecord, PhotoSummary, UploadResponse};
use crate::services::archive;
use crate::services::storage::{PhotoStorage, StorageError};
use crate::utils::multipart;
use crate::utils::validation::{self, UploadPolicy, extension_of};
use chrono::Local;
use mime::Mime;
use std::cmp::Reverse;
use std::sync::Arc;
use tracing::{info, warn};

/// Form field carrying the uploaded photo
pub const PHOTO_FIELD: &str = "photo";

/// What a download request resolves to
#[derive(Debug)]
pub enum DownloadPayload {
    /// Exactly one name was requested: the image itself
    Single {
        filename: String,
        data: Vec<u8>,
        content_type: Mime,
    },
    /// Two or more names: a ZIP of the ones that exist
    Archive {
        filename: String,
        data: Vec<u8>,
        entries: usize,
    },
}

/// Upload, listing and download pipeline of one photo namespace
pub struct PhotoService {
    storage: Arc<dyn PhotoStorage>,
    policy: UploadPolicy,
    namespace: NamespaceConfig,
    key_prefix: String,
    public_base_url: Option<String>,
}

impl PhotoService {
    pub fn new(
        storage: Arc<dyn PhotoStorage>,
        policy: UploadPolicy,
        namespace: NamespaceConfig,
        key_prefix: impl Into<String>,
        public_base_url: Option<String>,
    ) -> Self {
        Self {
            storage,
            policy,
            namespace,
            key_prefix: key_prefix.into(),
            public_base_url: public_base_url.map(|url| url.trim_end_matches('/').to_string()),
        }
    }

    pub fn namespace(&self) -> &NamespaceConfig {
        &self.namespace
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    pub fn storage(&self) -> &Arc<dyn PhotoStorage> {
        &self.storage
    }

    /// Checks the request headers before any body byte is read and returns
    /// the multipart boundary.
    pub fn accept_upload(
        &self,
        content_type: Option<&str>,
        declared_length: Option<u64>,
    ) -> Result<String, AppError> {
        let boundary = multipart::extract_boundary(content_type.unwrap_or_default())?;
        validation::check_declared_length(declared_length, &self.policy)?;
        Ok(boundary)
    }

    /// Parses, validates and stores one photo
    pub async fn upload(
        &self,
        boundary: &str,
        body: &[u8],
        origin: &PublicOrigin,
    ) -> Result<UploadResponse, AppError> {
        let file = multipart::parse(body, boundary, PHOTO_FIELD)?;
        let stored_name = validation::validate_and_name(&file, &self.policy)?;
        let key = self.key_for(&stored_name);
        let content_type = content_type_for(&stored_name);
        let size = file.raw_bytes.len();

        self.storage
            .put(&key, file.raw_bytes, content_type.as_ref())
            .await?;

        let url = match self.storage.make_public(&key).await? {
            Some(url) => url,
            None => self.local_url(&stored_name, origin),
        };

        info!(
            namespace = %self.namespace.name,
            original = %file.original_filename,
            stored = %stored_name,
            size_bytes = size,
            "📸 Photo stored"
        );

        Ok(UploadResponse {
            message: self.namespace.upload_message.clone(),
            filename: stored_name,
            url,
        })
    }

    /// Stored photos with an allowed extension, newest first
    pub async fn records(&self) -> Result<Vec<PhotoRecord>, AppError> {
        let objects = self.storage.list(&self.key_prefix).await?;

        let mut records: Vec<PhotoRecord> = objects
            .into_iter()
            .filter_map(|object| {
                let name = object.key.strip_prefix(&self.key_prefix)?;
                if name.is_empty() || name.contains('/') || !self.policy.is_allowed(name) {
                    return None;
                }
                Some(PhotoRecord {
                    stored_filename: name.to_string(),
                    content_type: object
                        .content_type
                        .unwrap_or_else(|| content_type_for(name).to_string()),
                    size_bytes: object.size,
                    modified_time: object.modified,
                })
            })
            .collect();

        // Generated names embed the upload millisecond, so they break mtime ties.
        records.sort_by_key(|r| Reverse((r.modified_time, r.stored_filename.clone())));
        Ok(records)
    }

    pub async fn list(&self, origin: &PublicOrigin) -> Result<Vec<PhotoSummary>, AppError> {
        let records = self.records().await?;

        Ok(records
            .into_iter()
            .map(|record| {
                let url = self
                    .storage
                    .public_url(&self.key_for(&record.stored_filename))
                    .unwrap_or_else(|| self.local_url(&record.stored_filename, origin));
                PhotoSummary {
                    filename: record.stored_filename,
                    url,
                }
            })
            .collect())
    }

    /// Reads one stored photo and its inferred content type
    pub async fn fetch(&self, name: &str) -> Result<(Vec<u8>, Mime), AppError> {
        if !is_plain_name(name) {
            return Err(StorageError::NotFound(name.to_string()).into());
        }

        let data = self.storage.get(&self.key_for(name)).await?;
        Ok((data, content_type_for(name)))
    }

    /// One name streams the image, several names build a ZIP. In the ZIP
    /// case names that are absent or unreadable are skipped, so an
    /// all-missing batch yields an empty archive. A name repeated in the
    /// batch is written once.
    pub async fn download(&self, names: &[String]) -> Result<DownloadPayload, AppError> {
        if let [name] = names {
            let key = self.key_for(name);
            if !is_plain_name(name) || !self.storage.exists(&key).await? {
                return Err(AppError::NotFound(format!("La imagen {} no existe", name)));
            }

            let data = self.storage.get(&key).await?;
            return Ok(DownloadPayload::Single {
                filename: name.clone(),
                data,
                content_type: content_type_for(name),
            });
        }

        let mut files = Vec::with_capacity(names.len());
        for name in names {
            if !is_plain_name(name) {
                warn!("Skipping invalid image name in download: {:?}", name);
                continue;
            }
            match self.storage.get(&self.key_for(name)).await {
                Ok(data) => files.push((name.clone(), data)),
                Err(StorageError::NotFound(_)) => {
                    warn!(namespace = %self.namespace.name, "Image {} not found, skipping", name);
                }
                Err(e) => {
                    warn!(namespace = %self.namespace.name, "Image {} unreadable, skipping: {}", name, e);
                }
            }
        }

        let entries = files.len();
        let data = tokio::task::spawn_blocking(move || archive::build_zip(files))
            .await
            .map_err(|e| AppError::Internal(format!("Error al crear el ZIP: {}", e)))?
            .map_err(|e| AppError::Internal(format!("Error al crear el ZIP: {}", e)))?;

        let filename = archive::archive_name(&self.namespace.archive_prefix, &Local::now());
        info!(
            namespace = %self.namespace.name,
            requested = names.len(),
            entries,
            "🗜️  Built {}",
            filename
        );

        Ok(DownloadPayload::Archive {
            filename,
            data,
            entries,
        })
    }

    fn key_for(&self, name: &str) -> String {
        format!("{}{}", self.key_prefix, name)
    }

    fn local_url(&self, name: &str, origin: &PublicOrigin) -> String {
        let base = self
            .public_base_url
            .clone()
            .unwrap_or_else(|| origin.base_url());
        format!("{}{}/{}", base, self.namespace.files_route, name)
    }
}

/// A single path segment: no separators, no parent references
fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

/// Content type served for a stored file, inferred from its extension
pub fn content_type_for(name: &str) -> Mime {
    match extension_of(name).as_deref() {
        Some(".jpg") | Some(".jpeg") => mime::IMAGE_JPEG,
        Some(".png") => mime::IMAGE_PNG,
        Some(".gif") => mime::IMAGE_GIF,
        _ => mime::APPLICATION_OCTET_STREAM,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::storage::LocalStorage;
    use std::io::{Cursor, Read};
    use tempfile::TempDir;

    async fn service(dir: &TempDir) -> PhotoService {
        let storage = LocalStorage::new(dir.path().join("uploads")).await.unwrap();
        PhotoService::new(
            Arc::new(storage),
            UploadPolicy::default(),
            NamespaceConfig::lasacam(dir.path().join("uploads"), "lasacam"),
            "",
            None,
        )
    }

    fn multipart_body(boundary: &str, filename: &str, data: &[u8]) -> Vec<u8> {
        let mut body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"photo\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
        body
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("a.JPG"), mime::IMAGE_JPEG);
        assert_eq!(content_type_for("a.jpeg"), mime::IMAGE_JPEG);
        assert_eq!(content_type_for("a.png"), mime::IMAGE_PNG);
        assert_eq!(content_type_for("a.gif"), mime::IMAGE_GIF);
        assert_eq!(content_type_for("a.webp"), mime::APPLICATION_OCTET_STREAM);
        assert_eq!(content_type_for("noext"), mime::APPLICATION_OCTET_STREAM);
    }

    #[test]
    fn test_is_plain_name() {
        assert!(is_plain_name("lasacam-1-abcdef01.png"));
        assert!(!is_plain_name("../etc/passwd"));
        assert!(!is_plain_name("a/b.png"));
        assert!(!is_plain_name(".."));
        assert!(!is_plain_name(""));
    }

    #[tokio::test]
    async fn test_accept_upload_checks_headers() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir).await;

        assert!(matches!(
            service.accept_upload(Some("application/json"), Some(10)),
            Err(AppError::Parse(multipart::ParseError::NotMultipart))
        ));
        assert!(matches!(
            service.accept_upload(Some("multipart/form-data; boundary=X"), Some(0)),
            Err(AppError::Validation(validation::ValidationError::Empty))
        ));
        assert!(matches!(
            service.accept_upload(
                Some("multipart/form-data; boundary=X"),
                Some(10 * 1024 * 1024 + 1)
            ),
            Err(AppError::Validation(validation::ValidationError::TooLarge { .. }))
        ));
        assert_eq!(
            service
                .accept_upload(Some("multipart/form-data; boundary=X"), None)
                .unwrap(),
            "X"
        );
    }

    #[tokio::test]
    async fn test_upload_then_fetch() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir).await;
        let data = vec![7u8; 100];

        let response = service
            .upload("X", &multipart_body("X", "cat.png", &data), &PublicOrigin::default())
            .await
            .unwrap();

        assert_eq!(response.message, "Foto subida con éxito");
        assert!(response.filename.starts_with("lasacam-"));
        assert!(response.filename.ends_with(".png"));
        assert_eq!(
            response.url,
            format!("http://localhost/uploads/{}", response.filename)
        );

        let (stored, content_type) = service.fetch(&response.filename).await.unwrap();
        assert_eq!(stored, data);
        assert_eq!(content_type, mime::IMAGE_PNG);
    }

    #[tokio::test]
    async fn test_public_base_url_overrides_origin() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path().join("p")).await.unwrap();
        let service = PhotoService::new(
            Arc::new(storage),
            UploadPolicy::default(),
            NamespaceConfig::procigar(dir.path().join("p"), "procigarfotos"),
            "",
            Some("https://cdn.example.com/".to_string()),
        );

        let response = service
            .upload("X", &multipart_body("X", "a.gif", b"GIF89a"), &PublicOrigin::default())
            .await
            .unwrap();

        assert_eq!(
            response.url,
            format!("https://cdn.example.com/procigar/uploads/{}", response.filename)
        );
        assert_eq!(response.message, "Foto subida con éxito a Procigar");
    }

    #[tokio::test]
    async fn test_records_filter_and_order() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir).await;
        let storage = service.storage().clone();

        storage.put("lasacam-1000-aaaaaaaa.jpg", vec![1], "image/jpeg").await.unwrap();
        storage.put("notes.txt", vec![1], "text/plain").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        storage.put("lasacam-2000-bbbbbbbb.png", vec![1, 2], "image/png").await.unwrap();

        let records = service.records().await.unwrap();
        let names: Vec<&str> = records.iter().map(|r| r.stored_filename.as_str()).collect();
        assert_eq!(names, vec!["lasacam-2000-bbbbbbbb.png", "lasacam-1000-aaaaaaaa.jpg"]);
        assert_eq!(records[0].content_type, "image/png");
        assert_eq!(records[0].size_bytes, 2);
    }

    #[tokio::test]
    async fn test_key_prefix_is_hidden_from_names() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path().join("bucket")).await.unwrap();
        let service = PhotoService::new(
            Arc::new(storage),
            UploadPolicy::default(),
            NamespaceConfig::lasacam(dir.path().join("bucket"), "lasacam"),
            "uploads/",
            None,
        );
        service
            .storage()
            .put("outside.png", vec![1], "image/png")
            .await
            .unwrap();

        let first = service
            .upload("X", &multipart_body("X", "a.jpg", b"first"), &PublicOrigin::default())
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let second = service
            .upload("X", &multipart_body("X", "b.png", b"second"), &PublicOrigin::default())
            .await
            .unwrap();

        assert!(!first.filename.contains('/'));
        assert!(dir.path().join("bucket/uploads").join(&first.filename).is_file());
        assert_eq!(
            second.url,
            format!("http://localhost/uploads/{}", second.filename)
        );

        let photos = service.list(&PublicOrigin::default()).await.unwrap();
        let names: Vec<&str> = photos.iter().map(|p| p.filename.as_str()).collect();
        assert_eq!(names, vec![second.filename.as_str(), first.filename.as_str()]);

        let (data, content_type) = service.fetch(&first.filename).await.unwrap();
        assert_eq!(data, b"first");
        assert_eq!(content_type, mime::IMAGE_JPEG);
        assert!(matches!(
            service.fetch("outside.png").await,
            Err(AppError::Storage(StorageError::NotFound(_)))
        ));

        let payload = service
            .download(&[first.filename.clone(), second.filename.clone()])
            .await
            .unwrap();
        let DownloadPayload::Archive { data, entries, .. } = payload else {
            panic!("expected an archive");
        };
        assert_eq!(entries, 2);
        let mut zip = zip::ZipArchive::new(Cursor::new(data)).unwrap();
        let mut contents = Vec::new();
        zip.by_name(&second.filename)
            .unwrap()
            .read_to_end(&mut contents)
            .unwrap();
        assert_eq!(contents, b"second");

        let payload = service.download(&[second.filename.clone()]).await.unwrap();
        assert!(matches!(payload, DownloadPayload::Single { data, .. } if data == b"second"));
    }

    #[tokio::test]
    async fn test_download_single_missing() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir).await;

        let err = service
            .download(&["missing.jpg".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(err.to_string(), "La imagen missing.jpg no existe");
    }

    #[tokio::test]
    async fn test_download_archive_skips_missing() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir).await;
        service.storage().put("a.jpg", b"aaa".to_vec(), "image/jpeg").await.unwrap();

        let payload = service
            .download(&["a.jpg".to_string(), "gone.jpg".to_string()])
            .await
            .unwrap();

        let DownloadPayload::Archive { filename, data, entries } = payload else {
            panic!("expected an archive");
        };
        assert!(filename.starts_with("lasacam_fotos_"));
        assert_eq!(entries, 1);

        let mut zip = zip::ZipArchive::new(Cursor::new(data)).unwrap();
        assert_eq!(zip.len(), 1);
        let mut contents = Vec::new();
        zip.by_name("a.jpg").unwrap().read_to_end(&mut contents).unwrap();
        assert_eq!(contents, b"aaa");
    }
}
