use crate::operations::{
    DownloadFileOperation, DownloadFileOperationOutcome, DownloadFileOperationRequest,
    ListFilesOperation, UploadFileOperation, UploadFileOperationRequest,
    UploadFileOperationResult,
};
use crate::{BlobStore, BlobStream, FileDropError, FileSummary, MetadataStore, Result, StreamHasher};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncSeek};

/// A stored file opened for download, with the metadata needed to present it.
pub struct DownloadedFile {
    pub file_id: String,
    pub filename: String,
    pub content_type: String,
    pub size: u64,
    pub body: BlobStream,
}

impl std::fmt::Debug for DownloadedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadedFile")
            .field("file_id", &self.file_id)
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// Upload, list and download over one pair of injected stores.
#[derive(Clone)]
pub struct FileService {
    upload: UploadFileOperation,
    list: ListFilesOperation,
    download: DownloadFileOperation,
    max_upload_bytes: u64,
}

impl FileService {
    pub fn new(
        blob_store: Arc<dyn BlobStore>,
        metadata_store: Arc<dyn MetadataStore>,
        max_upload_bytes: u64,
    ) -> Self {
        Self {
            upload: UploadFileOperation::new(
                blob_store.clone(),
                metadata_store.clone(),
                StreamHasher::new(max_upload_bytes),
            ),
            list: ListFilesOperation::new(metadata_store.clone()),
            download: DownloadFileOperation::new(blob_store, metadata_store),
            max_upload_bytes,
        }
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    pub async fn upload<R>(
        &self,
        reader: &mut R,
        filename: &str,
        content_type: Option<&str>,
    ) -> Result<UploadFileOperationResult>
    where
        R: AsyncRead + AsyncSeek + Unpin + Send,
    {
        self.upload
            .run(UploadFileOperationRequest {
                reader,
                filename: filename.to_string(),
                content_type: content_type.map(str::to_string),
            })
            .await
    }

    pub async fn list(&self) -> Result<Vec<FileSummary>> {
        Ok(self.list.run().await?.items)
    }

    pub async fn download(&self, file_id: &str) -> Result<DownloadedFile> {
        let outcome = self
            .download
            .run(DownloadFileOperationRequest {
                file_id: file_id.to_string(),
            })
            .await?;

        match outcome {
            DownloadFileOperationOutcome::Found(result) => Ok(DownloadedFile {
                file_id: result.record.file_id,
                filename: result.record.filename,
                content_type: result.record.content_type,
                size: result.size,
                body: result.body,
            }),
            DownloadFileOperationOutcome::NotFound => {
                Err(FileDropError::NotFound(file_id.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestStores;
    use crate::{MAX_UPLOAD_BYTES, collect_stream};
    use std::io::Cursor;

    fn service(stores: &TestStores) -> FileService {
        FileService::new(
            stores.blob_store.clone(),
            stores.metadata_store.clone(),
            MAX_UPLOAD_BYTES,
        )
    }

    #[tokio::test]
    async fn test_hello_round_trip() {
        let stores = TestStores::new();
        let service = service(&stores);

        let mut reader = Cursor::new(b"hello".to_vec());
        let uploaded = service
            .upload(&mut reader, "test.txt", Some("text/plain"))
            .await
            .unwrap();
        assert_eq!(uploaded.filename, "test.txt");
        assert_eq!(uploaded.size, 5);

        let listed = service.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].file_id, uploaded.file_id);
        assert_eq!(listed[0].size_bytes, 5);

        let file = service.download(&uploaded.file_id).await.unwrap();
        assert_eq!(file.filename, "test.txt");
        assert_eq!(file.content_type, "text/plain");
        assert_eq!(file.size, 5);
        assert_eq!(collect_stream(file.body).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_identical_content_gets_distinct_records() {
        let stores = TestStores::new();
        let service = service(&stores);

        let mut first = Cursor::new(b"same".to_vec());
        let mut second = Cursor::new(b"same".to_vec());
        let a = service.upload(&mut first, "a.txt", None).await.unwrap();
        let b = service.upload(&mut second, "a.txt", None).await.unwrap();

        assert_ne!(a.file_id, b.file_id);
        assert_eq!(a.sha256, b.sha256);
        assert_eq!(service.list().await.unwrap().len(), 2);
        assert_eq!(stores.stored_keys().await.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_content_type_defaults() {
        let stores = TestStores::new();
        let service = service(&stores);

        let mut reader = Cursor::new(vec![0u8, 1, 2]);
        let uploaded = service.upload(&mut reader, "raw.bin", None).await.unwrap();
        let file = service.download(&uploaded.file_id).await.unwrap();
        assert_eq!(file.content_type, crate::DEFAULT_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn test_download_unknown_id_is_not_found() {
        let stores = TestStores::new();
        let result = service(&stores).download("does-not-exist").await;
        assert!(matches!(result, Err(FileDropError::NotFound(id)) if id == "does-not-exist"));
    }

    #[tokio::test]
    async fn test_upload_over_limit() {
        let stores = TestStores::new();
        let service = FileService::new(stores.blob_store.clone(), stores.metadata_store.clone(), 8);
        assert_eq!(service.max_upload_bytes(), 8);

        let mut reader = Cursor::new(vec![7u8; 9]);
        let result = service.upload(&mut reader, "big.bin", None).await;
        assert!(matches!(result, Err(FileDropError::PayloadTooLarge { limit: 8 })));
        assert!(service.list().await.unwrap().is_empty());
        assert!(stores.stored_keys().await.is_empty());
    }
}
