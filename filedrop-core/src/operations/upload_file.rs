use crate::{
    BlobStore, FileDropError, FileRecord, MetadataStore, Result, StreamHasher, blob_key,
    effective_content_type, sanitize_filename,
};
use chrono::Utc;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncSeek};
use uuid::Uuid;

#[derive(Clone)]
pub struct UploadFileOperation {
    blob_store: Arc<dyn BlobStore>,
    metadata_store: Arc<dyn MetadataStore>,
    hasher: StreamHasher,
}

pub struct UploadFileOperationRequest<'a, R> {
    /// Seekable source positioned at the start of the content.
    pub reader: &'a mut R,
    pub filename: String,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFileOperationResult {
    pub file_id: String,
    pub filename: String,
    pub size: u64,
    pub sha256: String,
}

impl UploadFileOperation {
    pub fn new(
        blob_store: Arc<dyn BlobStore>,
        metadata_store: Arc<dyn MetadataStore>,
        hasher: StreamHasher,
    ) -> Self {
        Self {
            blob_store,
            metadata_store,
            hasher,
        }
    }

    pub async fn run<R>(
        &self,
        request: UploadFileOperationRequest<'_, R>,
    ) -> Result<UploadFileOperationResult>
    where
        R: AsyncRead + AsyncSeek + Unpin + Send,
    {
        let UploadFileOperationRequest {
            reader,
            filename,
            content_type,
        } = request;

        let filename = sanitize_filename(&filename)?;
        let content_type = effective_content_type(content_type.as_deref());
        let file_id = Uuid::new_v4().to_string();
        let s3_key = blob_key(&file_id);

        tracing::info!("Uploading file_id={} filename={}", file_id, filename);

        let digest = self.hasher.hash_and_rewind(reader).await?;

        let stored = self.blob_store.put_reader(&s3_key, reader).await?;
        if stored != digest.size {
            self.discard_blob(&s3_key).await;
            return Err(FileDropError::SizeMismatch {
                hashed: digest.size,
                stored,
            });
        }

        let record = FileRecord {
            file_id: file_id.clone(),
            filename: filename.clone(),
            size_bytes: digest.size,
            content_type,
            sha256: digest.sha256.clone(),
            s3_key: s3_key.clone(),
            uploaded_at: Utc::now(),
        };

        if let Err(error) = self.metadata_store.put_record(&record).await {
            tracing::warn!(
                "Metadata write failed for file_id={}; removing blob {}: {}",
                file_id,
                s3_key,
                error
            );
            self.discard_blob(&s3_key).await;
            return Err(error);
        }

        tracing::info!(
            "Upload successful. file_id={} filename={} size={}",
            file_id,
            filename,
            digest.size
        );

        Ok(UploadFileOperationResult {
            file_id,
            filename,
            size: digest.size,
            sha256: digest.sha256,
        })
    }

    /// Compensating delete for a blob whose upload did not complete.
    async fn discard_blob(&self, s3_key: &str) {
        if let Err(error) = self.blob_store.delete(s3_key).await {
            tracing::error!(
                "Orphaned blob {} left without metadata; reconcile manually: {}",
                s3_key,
                error
            );
        }
    }
}
