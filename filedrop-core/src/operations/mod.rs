pub mod download_file;
pub mod list_files;
pub mod upload_file;

pub use download_file::{
    DownloadFileOperation, DownloadFileOperationOutcome, DownloadFileOperationRequest,
    DownloadFileOperationResult,
};
pub use list_files::{ListFilesOperation, ListFilesOperationResult};
pub use upload_file::{
    UploadFileOperation, UploadFileOperationRequest, UploadFileOperationResult,
};
