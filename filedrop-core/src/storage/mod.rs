//! Storage modules for Filedrop
//!
//! Provides blob storage over `object_store` and file metadata persistence
//! (DynamoDB or SQLite).

pub mod blob_store;
pub mod dynamo_store;
pub mod factory;
pub mod metadata_store;

pub use blob_store::{
    BlobObject, BlobStore, BlobStream, ObjectStoreBlobStore, S3BlobConfig, collect_stream,
};
pub use dynamo_store::{DynamoConfig, DynamoMetadataStore, build_client};
pub use factory::StoreBuilder;
pub use metadata_store::{MetadataStore, SqliteMetadataStore};
