//! Error types for the baking pipeline

use thiserror::Error;

/// Main error type for the baker and the transcoder
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("RenderWare error: {0}")]
    RenderWare(String),

    #[error("Mesh error: {0}")]
    Mesh(String),

    #[error("Texture error: {0}")]
    Texture(String),

    #[error("Sort key field `{field}` value {value} exceeds {bits} bits")]
    SortKeyOverflow {
        field: &'static str,
        value: u64,
        bits: u32,
    },

    #[error("Blob error: {0}")]
    Blob(String),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
}
