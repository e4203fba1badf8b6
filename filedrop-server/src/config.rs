use filedrop_core::{FileDropError, Result, StoreBuilder};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub request_timeout_secs: u64,
}

/// Blob and metadata backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub region: String,
    pub bucket: String,
    pub table: String,
    /// Endpoint override for LocalStack, MinIO or DynamoDB Local.
    #[serde(default)]
    pub endpoint_url: Option<String>,
    pub blob_backend: String,
    pub metadata_backend: String,
    pub local_root: PathBuf,
    pub sqlite_path: PathBuf,
}

impl StorageConfig {
    pub fn store_builder(&self) -> StoreBuilder {
        StoreBuilder::new()
            .blob_backend(&self.blob_backend)
            .metadata_backend(&self.metadata_backend)
            .region(&self.region)
            .bucket(&self.bucket)
            .table(&self.table)
            .endpoint_url(self.endpoint_url.clone())
            .local_root(&self.local_root)
            .sqlite_path(&self.sqlite_path)
    }
}

/// Unprefixed environment variables still honored on top of everything else.
#[derive(Debug, Clone, Default)]
pub struct LegacyEnv {
    pub aws_region: Option<String>,
    pub bucket_name: Option<String>,
    pub table_name: Option<String>,
    pub aws_endpoint_url: Option<String>,
}

impl LegacyEnv {
    pub fn from_env() -> Self {
        fn read(name: &str) -> Option<String> {
            std::env::var(name)
                .ok()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        }

        Self {
            aws_region: read("AWS_REGION"),
            bucket_name: read("BUCKET_NAME"),
            table_name: read("TABLE_NAME"),
            aws_endpoint_url: read("AWS_ENDPOINT_URL"),
        }
    }
}

impl Config {
    /// Defaults, then the optional file, then `FILEDROP_*` variables, then
    /// the legacy AWS-style variables.
    pub fn load(path: Option<&str>) -> Result<Self> {
        Self::load_with(path, LegacyEnv::from_env())
    }

    pub fn load_with(path: Option<&str>, legacy: LegacyEnv) -> Result<Self> {
        let mut builder = ::config::Config::builder()
            .set_default("server.bind_addr", "0.0.0.0:8080")
            .and_then(|b| b.set_default("server.request_timeout_secs", 60i64))
            .and_then(|b| b.set_default("storage.region", "us-east-1"))
            .and_then(|b| b.set_default("storage.bucket", "file-share-bucket"))
            .and_then(|b| b.set_default("storage.table", "FileMetadata"))
            .and_then(|b| b.set_default("storage.blob_backend", "s3"))
            .and_then(|b| b.set_default("storage.metadata_backend", "dynamodb"))
            .and_then(|b| b.set_default("storage.local_root", "./data/blobs"))
            .and_then(|b| b.set_default("storage.sqlite_path", "./data/metadata.db"))
            .map_err(|e| FileDropError::Config(e.to_string()))?;

        if let Some(path) = path {
            builder = builder.add_source(::config::File::with_name(path));
        }

        let settings = builder
            .add_source(
                ::config::Environment::with_prefix("FILEDROP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("storage.region", legacy.aws_region)
            .and_then(|b| b.set_override_option("storage.bucket", legacy.bucket_name))
            .and_then(|b| b.set_override_option("storage.table", legacy.table_name))
            .and_then(|b| b.set_override_option("storage.endpoint_url", legacy.aws_endpoint_url))
            .and_then(|b| b.build())
            .map_err(|e| FileDropError::Config(e.to_string()))?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| FileDropError::Config(e.to_string()))?;

        if config.server.request_timeout_secs == 0 {
            return Err(FileDropError::Config(
                "server.request_timeout_secs must be greater than zero".to_string(),
            ));
        }

        Ok(config)
    }
}
