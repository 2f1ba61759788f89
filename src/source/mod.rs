// Data source module
// Bulk readers that hand relational rows to the indexing pipeline

pub mod sqlite;

use std::fmt;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use sqlite::SqliteSource;

/// A single cell value as stored by the source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl ScalarValue {
    /// Null values and empty strings or blobs carry no content for the
    /// document text
    #[inline]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(text) => text.is_empty(),
            Self::Blob(bytes) => bytes.is_empty(),
            Self::Integer(_) | Self::Real(_) => false,
        }
    }
}

impl fmt::Display for ScalarValue {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Integer(value) => write!(f, "{value}"),
            // Whole reals keep a trailing ".0" so 9.0 does not read as 9
            Self::Real(value) if value.is_finite() && value.fract() == 0.0 => {
                write!(f, "{value:.1}")
            }
            Self::Real(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
            Self::Blob(bytes) => f.write_str(&String::from_utf8_lossy(bytes)),
        }
    }
}

impl From<&str> for ScalarValue {
    #[inline]
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ScalarValue {
    #[inline]
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for ScalarValue {
    #[inline]
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for ScalarValue {
    #[inline]
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

/// Every row of one table, with column names in declaration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSet {
    pub table: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<ScalarValue>>,
}

impl RecordSet {
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDescription {
    pub name: String,
    pub declared_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableDescription {
    pub name: String,
    pub columns: Vec<ColumnDescription>,
    pub row_count: i64,
}

/// Structure overview of a data source
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceDescription {
    pub location: String,
    pub size_bytes: Option<u64>,
    pub tables: Vec<TableDescription>,
}

/// Supplier of records for an indexing run
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Read every record in a single bulk pass.
    async fn fetch_records(&self) -> Result<RecordSet>;
}
