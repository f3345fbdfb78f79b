use super::{ObjectInfo, PhotoStorage, StorageError, StorageResult};
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;

/// S3-compatible bucket storage (AWS, MinIO, GCS interop)
pub struct S3Storage {
    client: Client,
    bucket: String,
    public_base_url: String,
    public_acl: bool,
}

impl S3Storage {
    /// `public_base_url` is the origin objects are served from; the public URL
    /// of a key is `<public_base_url>/<bucket>/<key>`.
    pub fn new(client: Client, bucket: String, public_base_url: String, public_acl: bool) -> Self {
        Self {
            client,
            bucket,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            public_acl,
        }
    }
}

#[async_trait]
impl PhotoStorage for S3Storage {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()> {
        let size = data.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    "S3 put_object failed: bucket={}, key={}, error={:?}",
                    self.bucket,
                    key,
                    e
                );
                StorageError::WriteFailure {
                    key: key.to_string(),
                    reason: e.to_string(),
                }
            })?;

        tracing::info!(bucket = %self.bucket, key = %key, size_bytes = size, "S3 upload successful");
        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        let res = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    StorageError::NotFound(key.to_string())
                } else {
                    StorageError::ReadFailure {
                        key: key.to_string(),
                        reason: service_error.to_string(),
                    }
                }
            })?;

        let data = res
            .body
            .collect()
            .await
            .map_err(|e| StorageError::ReadFailure {
                key: key.to_string(),
                reason: e.to_string(),
            })?
            .to_vec();
        Ok(data)
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let res = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match res {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    Ok(false)
                } else {
                    Err(StorageError::Backend(service_error.to_string()))
                }
            }
        }
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<ObjectInfo>> {
        let mut objects = Vec::new();
        let mut continuation_token = None;

        loop {
            let res = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .set_continuation_token(continuation_token)
                .send()
                .await
                .map_err(|e| StorageError::Backend(e.into_service_error().to_string()))?;

            for object in res.contents.unwrap_or_default() {
                let Some(key) = object.key else {
                    continue;
                };
                let modified = object.last_modified.and_then(|d| {
                    chrono::DateTime::from_timestamp(d.secs(), d.subsec_nanos())
                });
                objects.push(ObjectInfo {
                    key,
                    content_type: None,
                    size: object.size.unwrap_or(0).max(0) as u64,
                    modified,
                });
            }

            if res.is_truncated.unwrap_or(false) {
                continuation_token = res.next_continuation_token;
            } else {
                break;
            }
        }

        Ok(objects)
    }

    async fn make_public(&self, key: &str) -> StorageResult<Option<String>> {
        if self.public_acl {
            self.client
                .put_object_acl()
                .bucket(&self.bucket)
                .key(key)
                .acl(ObjectCannedAcl::PublicRead)
                .send()
                .await
                .map_err(|e| StorageError::Backend(e.into_service_error().to_string()))?;
        }

        Ok(self.public_url(key))
    }

    fn public_url(&self, key: &str) -> Option<String> {
        Some(format!("{}/{}/{}", self.public_base_url, self.bucket, key))
    }

    fn backend_name(&self) -> &'static str {
        "s3"
    }
}
