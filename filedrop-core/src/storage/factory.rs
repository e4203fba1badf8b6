use super::{
    BlobStore, DynamoConfig, DynamoMetadataStore, MetadataStore, ObjectStoreBlobStore,
    S3BlobConfig, SqliteMetadataStore,
};
use crate::{FileDropError, Result};
use std::path::PathBuf;
use std::sync::Arc;

/// Resolves configured backend names into store handles.
#[derive(Debug, Clone, Default)]
pub struct StoreBuilder {
    blob_backend: Option<String>,
    metadata_backend: Option<String>,
    region: Option<String>,
    bucket: Option<String>,
    table: Option<String>,
    endpoint_url: Option<String>,
    local_root: Option<PathBuf>,
    sqlite_path: Option<PathBuf>,
}

impl StoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blob_backend(mut self, backend: impl Into<String>) -> Self {
        self.blob_backend = Some(backend.into());
        self
    }

    pub fn metadata_backend(mut self, backend: impl Into<String>) -> Self {
        self.metadata_backend = Some(backend.into());
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn endpoint_url(mut self, endpoint_url: Option<String>) -> Self {
        self.endpoint_url = endpoint_url
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        self
    }

    pub fn local_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.local_root = Some(root.into());
        self
    }

    pub fn sqlite_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.sqlite_path = Some(path.into());
        self
    }

    fn resolve_backend(value: Option<&str>, kind: &str) -> Result<String> {
        let backend = value.unwrap_or_default().trim().to_ascii_lowercase();
        if backend.is_empty() {
            return Err(FileDropError::Config(format!(
                "{} backend cannot be empty",
                kind
            )));
        }

        Ok(backend)
    }

    fn require(value: Option<&str>, message: &str) -> Result<String> {
        let value = value.unwrap_or_default().trim();
        if value.is_empty() {
            return Err(FileDropError::Config(message.to_string()));
        }

        Ok(value.to_string())
    }

    pub fn build_blob_store(&self) -> Result<Arc<dyn BlobStore>> {
        let backend = Self::resolve_backend(self.blob_backend.as_deref(), "blob")?;

        match backend.as_str() {
            "s3" => {
                let config = S3BlobConfig {
                    bucket: Self::require(
                        self.bucket.as_deref(),
                        "bucket is required for s3 blob backend",
                    )?,
                    region: Self::require(
                        self.region.as_deref(),
                        "region is required for s3 blob backend",
                    )?,
                    endpoint_url: self.endpoint_url.clone(),
                };
                Ok(Arc::new(ObjectStoreBlobStore::s3(&config)?))
            }
            "local" => {
                let root = self.local_root.as_ref().ok_or_else(|| {
                    FileDropError::Config(
                        "local_root is required for local blob backend".to_string(),
                    )
                })?;
                Ok(Arc::new(ObjectStoreBlobStore::local(root)?))
            }
            "memory" => Ok(Arc::new(ObjectStoreBlobStore::in_memory())),
            other => Err(FileDropError::Config(format!(
                "unsupported blob backend: {}",
                other
            ))),
        }
    }

    pub async fn build_metadata_store(&self) -> Result<Arc<dyn MetadataStore>> {
        let backend = Self::resolve_backend(self.metadata_backend.as_deref(), "metadata")?;

        match backend.as_str() {
            "dynamodb" => {
                let config = DynamoConfig {
                    table_name: Self::require(
                        self.table.as_deref(),
                        "table is required for dynamodb metadata backend",
                    )?,
                    region: Self::require(
                        self.region.as_deref(),
                        "region is required for dynamodb metadata backend",
                    )?,
                    endpoint_url: self.endpoint_url.clone(),
                };
                Ok(Arc::new(DynamoMetadataStore::new(&config).await))
            }
            "sqlite" => {
                let path = self.sqlite_path.clone().ok_or_else(|| {
                    FileDropError::Config(
                        "sqlite_path is required for sqlite metadata backend".to_string(),
                    )
                })?;
                Ok(Arc::new(SqliteMetadataStore::new(path)?))
            }
            other => Err(FileDropError::Config(format!(
                "unsupported metadata backend: {}",
                other
            ))),
        }
    }
}
