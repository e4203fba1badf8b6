//! Filedrop Server - axum HTTP surface over `filedrop-core`

pub mod config;
pub mod server;

pub use config::{Config, LegacyEnv, ServerConfig, StorageConfig};
pub use server::{AppState, build_router, init_storage, run_server};
