use crate::{BlobStore, BlobStream, FileRecord, MetadataStore, Result};
use std::sync::Arc;

#[derive(Clone)]
pub struct DownloadFileOperation {
    blob_store: Arc<dyn BlobStore>,
    metadata_store: Arc<dyn MetadataStore>,
}

#[derive(Debug, Clone)]
pub struct DownloadFileOperationRequest {
    pub file_id: String,
}

pub struct DownloadFileOperationResult {
    pub record: FileRecord,
    /// Byte count reported by the blob store for the opened object.
    pub size: u64,
    pub body: BlobStream,
}

impl std::fmt::Debug for DownloadFileOperationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadFileOperationResult")
            .field("record", &self.record)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub enum DownloadFileOperationOutcome {
    Found(DownloadFileOperationResult),
    NotFound,
}

impl DownloadFileOperation {
    pub fn new(blob_store: Arc<dyn BlobStore>, metadata_store: Arc<dyn MetadataStore>) -> Self {
        Self {
            blob_store,
            metadata_store,
        }
    }

    pub async fn run(
        &self,
        request: DownloadFileOperationRequest,
    ) -> Result<DownloadFileOperationOutcome> {
        let DownloadFileOperationRequest { file_id } = request;

        let Some(record) = self.metadata_store.get_record(&file_id).await? else {
            tracing::info!("Download requested for unknown file_id={}", file_id);
            return Ok(DownloadFileOperationOutcome::NotFound);
        };

        // A record whose blob is gone is a storage fault, not a missing file.
        let blob = self.blob_store.open(&record.s3_key).await?;
        if blob.size != record.size_bytes {
            tracing::warn!(
                "Blob size differs from metadata. file_id={} recorded={} stored={}",
                file_id,
                record.size_bytes,
                blob.size
            );
        }

        tracing::info!("Serving file_id={} filename={}", file_id, record.filename);

        Ok(DownloadFileOperationOutcome::Found(
            DownloadFileOperationResult {
                record,
                size: blob.size,
                body: blob.stream,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestStores;
    use crate::{FileDropError, blob_key, collect_stream, compute_hash};
    use chrono::Utc;
    use std::io::Cursor;

    async fn seed(stores: &TestStores, file_id: &str, body: &[u8]) -> FileRecord {
        let key = blob_key(file_id);
        let mut reader = Cursor::new(body.to_vec());
        stores.blob_store.put_reader(&key, &mut reader).await.unwrap();

        let record = FileRecord {
            file_id: file_id.to_string(),
            filename: "test.txt".to_string(),
            size_bytes: body.len() as u64,
            content_type: "text/plain".to_string(),
            sha256: compute_hash(body),
            s3_key: key,
            uploaded_at: Utc::now(),
        };
        stores.metadata_store.put_record(&record).await.unwrap();
        record
    }

    fn operation(stores: &TestStores) -> DownloadFileOperation {
        DownloadFileOperation::new(stores.blob_store.clone(), stores.metadata_store.clone())
    }

    fn request(file_id: &str) -> DownloadFileOperationRequest {
        DownloadFileOperationRequest {
            file_id: file_id.to_string(),
        }
    }

    #[tokio::test]
    async fn test_download_streams_stored_bytes() {
        let stores = TestStores::new();
        let record = seed(&stores, "f-1", b"hello").await;

        let outcome = operation(&stores).run(request("f-1")).await.unwrap();
        let DownloadFileOperationOutcome::Found(result) = outcome else {
            panic!("expected file to be found");
        };

        assert_eq!(result.record, record);
        assert_eq!(result.size, 5);
        assert_eq!(collect_stream(result.body).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_download_unknown_id() {
        let stores = TestStores::new();
        let outcome = operation(&stores).run(request("missing")).await.unwrap();
        assert!(matches!(outcome, DownloadFileOperationOutcome::NotFound));
    }

    #[tokio::test]
    async fn test_download_missing_blob_is_storage_error() {
        let stores = TestStores::new();
        let record = seed(&stores, "f-2", b"gone").await;
        stores.blob_store.delete(&record.s3_key).await.unwrap();

        let result = operation(&stores).run(request("f-2")).await;
        assert!(matches!(result, Err(FileDropError::StorageUnavailable(_))));
    }
}
