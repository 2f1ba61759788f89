use thiserror::Error;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("No records available in the data source")]
    EmptyDataSource,

    #[error("Question cannot be empty")]
    EmptyQuestion,

    #[error("Invalid top_k: {0} (must be between 1 and {max})", max = crate::query::MAX_TOP_K)]
    InvalidTopK(usize),

    #[error("The vector index is empty")]
    EmptyIndex,

    #[error("No relevant match found for the question")]
    NoRelevantMatch,

    #[error("Embedding dimension mismatch: collection stores {expected}, model produced {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding model mismatch: collection was indexed with {indexed}, queries use {query}")]
    ModelMismatch { indexed: String, query: String },

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Vector store error: {0}")]
    Store(String),

    #[error("Data source error: {0}")]
    DataSource(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

/// Coarse classification of a [`RagError`], used by callers to branch on
/// failure kind without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    EmptyDataSource,
    EmptyQuestion,
    InvalidRequest,
    EmptyIndex,
    NoRelevantMatch,
    DimensionMismatch,
    ProviderFailure,
    StoreFailure,
    SourceFailure,
    Configuration,
}

impl ErrorKind {
    /// Conditions the caller can fix by asking something else, as opposed to
    /// faults that need configuration or infrastructure attention.
    #[inline]
    pub fn is_user_facing(self) -> bool {
        matches!(
            self,
            Self::EmptyQuestion
                | Self::InvalidRequest
                | Self::EmptyIndex
                | Self::NoRelevantMatch
                | Self::EmptyDataSource
        )
    }
}

impl RagError {
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyDataSource => ErrorKind::EmptyDataSource,
            Self::EmptyQuestion => ErrorKind::EmptyQuestion,
            Self::InvalidTopK(_) => ErrorKind::InvalidRequest,
            Self::EmptyIndex => ErrorKind::EmptyIndex,
            Self::NoRelevantMatch => ErrorKind::NoRelevantMatch,
            Self::DimensionMismatch { .. } | Self::ModelMismatch { .. } => {
                ErrorKind::DimensionMismatch
            }
            Self::Embedding(_) | Self::GenerationFailed(_) => ErrorKind::ProviderFailure,
            Self::Store(_) => ErrorKind::StoreFailure,
            Self::DataSource(_) => ErrorKind::SourceFailure,
            Self::Config(_) | Self::Io(_) | Self::Other(_) => ErrorKind::Configuration,
        }
    }
}

pub mod commands;
pub mod config;
pub mod document;
pub mod embeddings;
pub mod generation;
pub mod http;
pub mod indexer;
pub mod query;
pub mod response;
pub mod serve;
pub mod source;
pub mod store;

#[cfg(test)]
mod test_support;
