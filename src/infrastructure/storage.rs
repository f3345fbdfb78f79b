use crate::config::{AppConfig, S3Config, StorageBackend};
use crate::services::photo_service::PhotoService;
use crate::services::storage::{LocalStorage, PhotoStorage, S3Storage};
use anyhow::Context;
use aws_sdk_s3::config::{Credentials, Region};
use std::sync::Arc;
use tracing::info;

/// Builds one photo service per configured namespace on the selected backend
pub async fn setup_namespaces(config: &AppConfig) -> anyhow::Result<Vec<Arc<PhotoService>>> {
    let s3_client = match config.storage_backend {
        StorageBackend::S3 => Some(s3_client(&config.s3).await?),
        StorageBackend::Local => None,
    };

    let mut services = Vec::with_capacity(config.namespaces.len());
    for namespace in &config.namespaces {
        let storage: Arc<dyn PhotoStorage> = match &s3_client {
            Some(client) => {
                ensure_bucket(client, &namespace.bucket).await;
                let public_base_url = config
                    .s3
                    .public_base_url
                    .clone()
                    .or_else(|| config.s3.endpoint.clone())
                    .unwrap_or_else(|| "https://storage.googleapis.com".to_string());
                info!(
                    "☁️  Namespace '{}': bucket {} ({})",
                    namespace.name, namespace.bucket, public_base_url
                );
                Arc::new(S3Storage::new(
                    client.clone(),
                    namespace.bucket.clone(),
                    public_base_url,
                    config.s3.public_acl,
                ))
            }
            None => {
                let storage = LocalStorage::new(&namespace.upload_dir)
                    .await
                    .with_context(|| format!("Failed to prepare {}", namespace.upload_dir.display()))?;
                info!(
                    "📁 Namespace '{}': {}",
                    namespace.name,
                    storage.base_path().display()
                );
                Arc::new(storage)
            }
        };

        services.push(Arc::new(PhotoService::new(
            storage,
            config.upload_policy(),
            namespace.clone(),
            config.key_prefix(),
            config.public_base_url.clone(),
        )));
    }

    Ok(services)
}

async fn s3_client(s3: &S3Config) -> anyhow::Result<aws_sdk_s3::Client> {
    let (Some(access_key), Some(secret_key)) = (&s3.access_key, &s3.secret_key) else {
        anyhow::bail!("S3_ACCESS_KEY and S3_SECRET_KEY must be set for the s3 backend");
    };

    let mut loader = aws_config::from_env()
        .region(Region::new(s3.region.clone()))
        .credentials_provider(Credentials::new(
            access_key.clone(),
            secret_key.clone(),
            None,
            None,
            "static",
        ));
    if let Some(endpoint) = &s3.endpoint {
        info!("☁️  S3 Storage endpoint: {}", endpoint);
        loader = loader.endpoint_url(endpoint);
    }
    let aws_config = loader.load().await;

    let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
        .force_path_style(true)
        .build();

    Ok(aws_sdk_s3::Client::from_conf(s3_config))
}

async fn ensure_bucket(client: &aws_sdk_s3::Client, bucket: &str) {
    match client.head_bucket().bucket(bucket).send().await {
        Ok(_) => info!("✅ Bucket '{}' is ready", bucket),
        Err(_) => {
            info!("🪣 Bucket '{}' not found, creating...", bucket);
            if let Err(e) = client.create_bucket().bucket(bucket).send().await {
                tracing::error!("❌ Failed to create bucket '{}': {}", bucket, e);
            } else {
                info!("✅ Bucket '{}' created successfully", bucket);
            }
        }
    }
}
