//! Filedrop Core - hashed file uploads over pluggable blob and metadata stores
//!
//! Uploads are hashed in bounded chunks (SHA-256) with a hard size limit,
//! written to a blob store under `uploads/{file_id}`, and indexed by a
//! metadata record. Listing and streaming download read the same stores.

pub mod error;
pub mod hasher;
pub mod model;
pub mod operations;
pub mod service;
pub mod storage;

#[cfg(test)]
mod testing;

pub use error::{FileDropError, Result};
pub use hasher::{HASH_CHUNK_SIZE, StreamDigest, StreamHasher, compute_hash};
pub use model::{
    DEFAULT_CONTENT_TYPE, FileRecord, FileSummary, MAX_UPLOAD_BYTES, blob_key,
    effective_content_type, sanitize_filename,
};
pub use operations::{
    DownloadFileOperation, DownloadFileOperationOutcome, DownloadFileOperationRequest,
    DownloadFileOperationResult, ListFilesOperation, ListFilesOperationResult,
    UploadFileOperation, UploadFileOperationRequest, UploadFileOperationResult,
};
pub use service::{DownloadedFile, FileService};
pub use storage::{
    BlobObject, BlobStore, BlobStream, DynamoConfig, DynamoMetadataStore, MetadataStore,
    ObjectStoreBlobStore, S3BlobConfig, SqliteMetadataStore, StoreBuilder, build_client,
    collect_stream,
};
