use crate::{FileSummary, MetadataStore, Result};
use std::sync::Arc;

#[derive(Clone)]
pub struct ListFilesOperation {
    metadata_store: Arc<dyn MetadataStore>,
}

#[derive(Debug, Clone, Default)]
pub struct ListFilesOperationResult {
    pub items: Vec<FileSummary>,
}

impl ListFilesOperation {
    pub fn new(metadata_store: Arc<dyn MetadataStore>) -> Self {
        Self { metadata_store }
    }

    /// Every stored file, in whatever order the metadata backend returns them.
    pub async fn run(&self) -> Result<ListFilesOperationResult> {
        let items = self.metadata_store.list_summaries().await?;
        tracing::debug!("Listed {} files", items.len());
        Ok(ListFilesOperationResult { items })
    }
}
