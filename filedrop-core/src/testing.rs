//! Store doubles shared by the operation tests.

use crate::{
    BlobObject, BlobStore, FileDropError, FileRecord, FileSummary, MetadataStore,
    ObjectStoreBlobStore, Result, SqliteMetadataStore,
};
use async_trait::async_trait;
use futures_util::TryStreamExt;
use futures_util::stream::BoxStream;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{
    GetOptions, GetResult, ListResult, MultipartUpload, ObjectMeta, ObjectStore,
    PutMultipartOpts, PutOptions, PutPayload, PutResult, UploadPart,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::io::{AsyncRead, AsyncReadExt};

/// In-memory blobs plus a throwaway SQLite metadata database.
pub struct TestStores {
    pub objects: Arc<InMemory>,
    pub blob_store: Arc<ObjectStoreBlobStore>,
    pub metadata_store: Arc<SqliteMetadataStore>,
    _dir: TempDir,
}

impl TestStores {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let objects = Arc::new(InMemory::new());
        Self {
            blob_store: Arc::new(ObjectStoreBlobStore::new(objects.clone())),
            metadata_store: Arc::new(SqliteMetadataStore::new(dir.path().join("meta.db")).unwrap()),
            objects,
            _dir: dir,
        }
    }

    pub async fn stored_keys(&self) -> Vec<String> {
        self.objects
            .list(None)
            .map_ok(|meta| meta.location.to_string())
            .try_collect()
            .await
            .unwrap()
    }
}

/// Metadata store whose every call fails.
pub struct FailingMetadataStore;

#[async_trait]
impl MetadataStore for FailingMetadataStore {
    async fn ensure_schema(&self) -> Result<()> {
        Err(FileDropError::StorageUnavailable("metadata offline".into()))
    }

    async fn put_record(&self, _record: &FileRecord) -> Result<()> {
        Err(FileDropError::StorageUnavailable("metadata offline".into()))
    }

    async fn get_record(&self, _file_id: &str) -> Result<Option<FileRecord>> {
        Err(FileDropError::StorageUnavailable("metadata offline".into()))
    }

    async fn list_summaries(&self) -> Result<Vec<FileSummary>> {
        Err(FileDropError::StorageUnavailable("metadata offline".into()))
    }
}

/// Blob store that drops the last byte of every upload and records deletes.
#[derive(Default)]
pub struct ShortWriteBlobStore {
    deleted: Mutex<Vec<String>>,
}

impl ShortWriteBlobStore {
    pub fn deleted_keys(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl BlobStore for ShortWriteBlobStore {
    async fn put_reader(
        &self,
        _key: &str,
        reader: &mut (dyn AsyncRead + Unpin + Send),
    ) -> Result<u64> {
        let mut body = Vec::new();
        reader.read_to_end(&mut body).await?;
        Ok(body.len().saturating_sub(1) as u64)
    }

    async fn open(&self, key: &str) -> Result<BlobObject> {
        Err(FileDropError::StorageUnavailable(format!("no blob {}", key)))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.deleted.lock().unwrap().push(key.to_string());
        Ok(())
    }
}

/// Blob store whose writes fail as if the bucket were unreachable.
#[derive(Default)]
pub struct FailingPutBlobStore {
    deleted: Mutex<Vec<String>>,
}

impl FailingPutBlobStore {
    pub fn deleted_keys(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl BlobStore for FailingPutBlobStore {
    async fn put_reader(
        &self,
        key: &str,
        _reader: &mut (dyn AsyncRead + Unpin + Send),
    ) -> Result<u64> {
        Err(FileDropError::StorageUnavailable(format!(
            "s3 put {}: connection refused",
            key
        )))
    }

    async fn open(&self, key: &str) -> Result<BlobObject> {
        Err(FileDropError::StorageUnavailable(format!("no blob {}", key)))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.deleted.lock().unwrap().push(key.to_string());
        Ok(())
    }
}

fn part_rejected() -> object_store::Error {
    object_store::Error::Generic {
        store: "RejectingParts",
        source: "part upload rejected".into(),
    }
}

/// Object store over [`InMemory`] whose multipart part uploads always fail.
/// Records whether any multipart upload was aborted.
#[derive(Debug, Default)]
pub struct RejectingPartsStore {
    inner: InMemory,
    aborted: Arc<AtomicBool>,
}

impl RejectingPartsStore {
    pub fn aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }
}

impl std::fmt::Display for RejectingPartsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RejectingPartsStore")
    }
}

#[derive(Debug)]
struct RejectingUpload {
    aborted: Arc<AtomicBool>,
}

#[async_trait]
impl MultipartUpload for RejectingUpload {
    fn put_part(&mut self, _data: PutPayload) -> UploadPart {
        Box::pin(async { Err(part_rejected()) })
    }

    async fn complete(&mut self) -> object_store::Result<PutResult> {
        Err(part_rejected())
    }

    async fn abort(&mut self) -> object_store::Result<()> {
        self.aborted.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for RejectingPartsStore {
    async fn put_opts(
        &self,
        location: &Path,
        payload: PutPayload,
        opts: PutOptions,
    ) -> object_store::Result<PutResult> {
        self.inner.put_opts(location, payload, opts).await
    }

    async fn put_multipart_opts(
        &self,
        _location: &Path,
        _opts: PutMultipartOpts,
    ) -> object_store::Result<Box<dyn MultipartUpload>> {
        Ok(Box::new(RejectingUpload {
            aborted: self.aborted.clone(),
        }))
    }

    async fn get_opts(
        &self,
        location: &Path,
        options: GetOptions,
    ) -> object_store::Result<GetResult> {
        self.inner.get_opts(location, options).await
    }

    async fn delete(&self, location: &Path) -> object_store::Result<()> {
        self.inner.delete(location).await
    }

    fn list(&self, prefix: Option<&Path>) -> BoxStream<'_, object_store::Result<ObjectMeta>> {
        self.inner.list(prefix)
    }

    async fn list_with_delimiter(&self, prefix: Option<&Path>) -> object_store::Result<ListResult> {
        self.inner.list_with_delimiter(prefix).await
    }

    async fn copy(&self, from: &Path, to: &Path) -> object_store::Result<()> {
        self.inner.copy(from, to).await
    }

    async fn copy_if_not_exists(&self, from: &Path, to: &Path) -> object_store::Result<()> {
        self.inner.copy_if_not_exists(from, to).await
    }
}
