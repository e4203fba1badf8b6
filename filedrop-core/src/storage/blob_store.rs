use crate::{FileDropError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::{StreamExt, TryStreamExt};
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload, WriteMultipart};
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Read size used when streaming into the object store.
const PUT_READ_SIZE: usize = 1024 * 1024;

/// Parts allowed in flight before the writer waits.
const MAX_INFLIGHT_PARTS: usize = 4;

pub type BlobStream = BoxStream<'static, Result<Bytes>>;

/// An opened blob ready to be streamed to a client.
pub struct BlobObject {
    pub size: u64,
    pub stream: BlobStream,
}

impl std::fmt::Debug for BlobObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobObject")
            .field("size", &self.size)
            .field("stream", &"<BlobStream>")
            .finish()
    }
}

/// Blob storage contract used by the file operations.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stream `reader` to `key` until EOF. Returns the number of bytes stored.
    async fn put_reader(
        &self,
        key: &str,
        reader: &mut (dyn AsyncRead + Unpin + Send),
    ) -> Result<u64>;

    async fn open(&self, key: &str) -> Result<BlobObject>;

    async fn delete(&self, key: &str) -> Result<()>;
}

/// S3 connection settings for the blob backend.
#[derive(Debug, Clone)]
pub struct S3BlobConfig {
    pub bucket: String,
    pub region: String,
    pub endpoint_url: Option<String>,
}

/// [`BlobStore`] backed by any `object_store` implementation.
#[derive(Clone)]
pub struct ObjectStoreBlobStore {
    inner: Arc<dyn ObjectStore>,
}

impl ObjectStoreBlobStore {
    pub fn new(inner: Arc<dyn ObjectStore>) -> Self {
        Self { inner }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemory::new()))
    }

    pub fn local(root: &Path) -> Result<Self> {
        std::fs::create_dir_all(root)?;
        let store = LocalFileSystem::new_with_prefix(root)?;
        Ok(Self::new(Arc::new(store)))
    }

    /// Build an S3 store. Credentials come from the standard AWS environment.
    pub fn s3(config: &S3BlobConfig) -> Result<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_bucket_name(&config.bucket)
            .with_region(&config.region);

        if let Some(endpoint) = config.endpoint_url.as_deref() {
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(true)
                .with_virtual_hosted_style_request(false);
        }

        let store = builder
            .build()
            .map_err(|error| FileDropError::Config(format!("invalid s3 config: {}", error)))?;

        Ok(Self::new(Arc::new(store)))
    }
}

#[async_trait]
impl BlobStore for ObjectStoreBlobStore {
    async fn put_reader(
        &self,
        key: &str,
        reader: &mut (dyn AsyncRead + Unpin + Send),
    ) -> Result<u64> {
        let location = ObjectPath::from(key);
        let mut buf = vec![0u8; PUT_READ_SIZE];

        let first = reader.read(&mut buf).await?;
        if first == 0 {
            // Multipart uploads need at least one part; store empty blobs directly.
            self.inner.put(&location, PutPayload::from(Bytes::new())).await?;
            return Ok(0);
        }

        let upload = self.inner.put_multipart(&location).await?;
        let mut writer = WriteMultipart::new(upload);
        writer.write(&buf[..first]);
        let mut written = first as u64;

        loop {
            let n = match reader.read(&mut buf).await {
                Ok(n) => n,
                Err(error) => return Err(abort_upload(writer, key, error.into()).await),
            };
            if n == 0 {
                break;
            }

            if let Err(error) = writer.wait_for_capacity(MAX_INFLIGHT_PARTS).await {
                return Err(abort_upload(writer, key, error.into()).await);
            }
            writer.write(&buf[..n]);
            written += n as u64;
        }

        // Drain in-flight parts while the writer can still be aborted;
        // `finish` consumes it.
        if let Err(error) = writer.wait_for_capacity(0).await {
            return Err(abort_upload(writer, key, error.into()).await);
        }
        writer.finish().await?;
        tracing::debug!("Stored blob {} ({} bytes)", key, written);
        Ok(written)
    }

    async fn open(&self, key: &str) -> Result<BlobObject> {
        let location = ObjectPath::from(key);
        let result = self.inner.get(&location).await?;
        let size = result.meta.size as u64;
        let stream = result.into_stream().map_err(FileDropError::from).boxed();

        Ok(BlobObject { size, stream })
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.inner.delete(&ObjectPath::from(key)).await?;
        Ok(())
    }
}

/// Abort a partially written multipart upload and hand back the original error.
async fn abort_upload(writer: WriteMultipart, key: &str, error: FileDropError) -> FileDropError {
    if let Err(abort_error) = writer.abort().await {
        tracing::warn!("Failed to abort upload of {}: {}", key, abort_error);
    }
    error
}

/// Drain a blob stream into memory.
pub async fn collect_stream(mut stream: BlobStream) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    while let Some(chunk) = stream.next().await {
        body.extend_from_slice(&chunk?);
    }
    Ok(body)
}
