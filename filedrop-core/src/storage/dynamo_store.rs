use crate::{FileDropError, FileRecord, FileSummary, MetadataStore, Result};
use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::types::{
    AttributeDefinition, AttributeValue, BillingMode, KeySchemaElement, KeyType,
    ScalarAttributeType,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

const FILE_ID: &str = "fileId";
const FILENAME: &str = "filename";
const SIZE_BYTES: &str = "sizeBytes";
const CONTENT_TYPE: &str = "contentType";
const SHA256: &str = "sha256";
const S3_KEY: &str = "s3Key";
const UPLOADED_AT: &str = "uploadedAt";

type Item = HashMap<String, AttributeValue>;

/// Configuration for the `DynamoDB` metadata store.
#[derive(Debug, Clone)]
pub struct DynamoConfig {
    /// Table name; partition key is the string attribute `fileId`.
    pub table_name: String,

    /// AWS region (e.g. `"us-east-1"`).
    pub region: String,

    /// Optional endpoint URL for local development (e.g. `DynamoDB` Local).
    pub endpoint_url: Option<String>,
}

impl Default for DynamoConfig {
    fn default() -> Self {
        Self {
            table_name: String::from("FileMetadata"),
            region: String::from("us-east-1"),
            endpoint_url: None,
        }
    }
}

/// Build a `DynamoDB` client from the environment plus region/endpoint overrides.
pub async fn build_client(config: &DynamoConfig) -> Client {
    let mut aws_config =
        aws_config::from_env().region(aws_config::Region::new(config.region.clone()));

    if let Some(endpoint) = &config.endpoint_url {
        aws_config = aws_config.endpoint_url(endpoint);
    }

    let sdk_config = aws_config.load().await;
    Client::new(&sdk_config)
}

/// DynamoDB-backed [`MetadataStore`].
///
/// One item per file keyed by `fileId`; attribute names match the JSON field
/// names of [`FileRecord`].
pub struct DynamoMetadataStore {
    client: Client,
    table_name: String,
}

impl DynamoMetadataStore {
    pub async fn new(config: &DynamoConfig) -> Self {
        let client = build_client(config).await;
        Self::from_client(client, config)
    }

    pub fn from_client(client: Client, config: &DynamoConfig) -> Self {
        Self {
            client,
            table_name: config.table_name.clone(),
        }
    }
}

fn backend_error(operation: &str, error: impl std::fmt::Display) -> FileDropError {
    FileDropError::StorageUnavailable(format!("dynamodb {}: {}", operation, error))
}

fn string_attr(item: &Item, name: &str) -> Result<String> {
    match item.get(name) {
        Some(AttributeValue::S(value)) => Ok(value.clone()),
        _ => Err(FileDropError::Internal(format!(
            "metadata item missing string attribute '{}'",
            name
        ))),
    }
}

fn size_attr(item: &Item) -> Result<u64> {
    match item.get(SIZE_BYTES) {
        Some(AttributeValue::N(value)) => value.parse::<u64>().map_err(|error| {
            FileDropError::Internal(format!("invalid {} '{}': {}", SIZE_BYTES, value, error))
        }),
        _ => Err(FileDropError::Internal(format!(
            "metadata item missing number attribute '{}'",
            SIZE_BYTES
        ))),
    }
}

fn timestamp_attr(item: &Item) -> Result<DateTime<Utc>> {
    let value = string_attr(item, UPLOADED_AT)?;
    DateTime::parse_from_rfc3339(&value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|error| {
            FileDropError::Internal(format!("invalid {} '{}': {}", UPLOADED_AT, value, error))
        })
}

pub(crate) fn item_from_record(record: &FileRecord) -> Item {
    HashMap::from([
        (FILE_ID.to_string(), AttributeValue::S(record.file_id.clone())),
        (FILENAME.to_string(), AttributeValue::S(record.filename.clone())),
        (
            SIZE_BYTES.to_string(),
            AttributeValue::N(record.size_bytes.to_string()),
        ),
        (
            CONTENT_TYPE.to_string(),
            AttributeValue::S(record.content_type.clone()),
        ),
        (SHA256.to_string(), AttributeValue::S(record.sha256.clone())),
        (S3_KEY.to_string(), AttributeValue::S(record.s3_key.clone())),
        (
            UPLOADED_AT.to_string(),
            AttributeValue::S(record.uploaded_at.to_rfc3339()),
        ),
    ])
}

pub(crate) fn record_from_item(item: &Item) -> Result<FileRecord> {
    Ok(FileRecord {
        file_id: string_attr(item, FILE_ID)?,
        filename: string_attr(item, FILENAME)?,
        size_bytes: size_attr(item)?,
        content_type: string_attr(item, CONTENT_TYPE)
            .unwrap_or_else(|_| crate::DEFAULT_CONTENT_TYPE.to_string()),
        sha256: string_attr(item, SHA256)?,
        s3_key: string_attr(item, S3_KEY)?,
        uploaded_at: timestamp_attr(item)?,
    })
}

pub(crate) fn summary_from_item(item: &Item) -> Result<FileSummary> {
    Ok(FileSummary {
        file_id: string_attr(item, FILE_ID)?,
        filename: string_attr(item, FILENAME)?,
        size_bytes: size_attr(item)?,
        uploaded_at: timestamp_attr(item)?,
    })
}

#[async_trait]
impl MetadataStore for DynamoMetadataStore {
    async fn ensure_schema(&self) -> Result<()> {
        let key_schema = KeySchemaElement::builder()
            .attribute_name(FILE_ID)
            .key_type(KeyType::Hash)
            .build()
            .map_err(|error| backend_error("key schema", error))?;

        let attribute = AttributeDefinition::builder()
            .attribute_name(FILE_ID)
            .attribute_type(ScalarAttributeType::S)
            .build()
            .map_err(|error| backend_error("attribute definition", error))?;

        let result = self
            .client
            .create_table()
            .table_name(&self.table_name)
            .key_schema(key_schema)
            .attribute_definitions(attribute)
            .billing_mode(BillingMode::PayPerRequest)
            .send()
            .await;

        match result {
            Ok(_) => {
                tracing::info!("Created metadata table {}", self.table_name);
                Ok(())
            }
            Err(error) => {
                let service_error = error.into_service_error();
                if service_error.is_resource_in_use_exception() {
                    tracing::info!("Metadata table {} already exists", self.table_name);
                    Ok(())
                } else {
                    Err(backend_error("create_table", service_error))
                }
            }
        }
    }

    async fn put_record(&self, record: &FileRecord) -> Result<()> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item_from_record(record)))
            .condition_expression("attribute_not_exists(#id)")
            .expression_attribute_names("#id", FILE_ID)
            .send()
            .await
            .map_err(|error| backend_error("put_item", error.into_service_error()))?;

        Ok(())
    }

    async fn get_record(&self, file_id: &str) -> Result<Option<FileRecord>> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(FILE_ID, AttributeValue::S(file_id.to_owned()))
            .send()
            .await
            .map_err(|error| backend_error("get_item", error.into_service_error()))?;

        output.item().map(record_from_item).transpose()
    }

    async fn list_summaries(&self) -> Result<Vec<FileSummary>> {
        let mut summaries = Vec::new();
        let mut start_key: Option<Item> = None;

        // Drain every scan page; listings are not paginated for callers.
        loop {
            let output = self
                .client
                .scan()
                .table_name(&self.table_name)
                .projection_expression("#id, #name, #size, #at")
                .expression_attribute_names("#id", FILE_ID)
                .expression_attribute_names("#name", FILENAME)
                .expression_attribute_names("#size", SIZE_BYTES)
                .expression_attribute_names("#at", UPLOADED_AT)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|error| backend_error("scan", error.into_service_error()))?;

            for item in output.items() {
                summaries.push(summary_from_item(item)?);
            }

            match output.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }

        Ok(summaries)
    }
}
