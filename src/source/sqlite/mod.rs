
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite, TypeInfo, ValueRef};
use tracing::{debug, info};

use super::{ColumnDescription, DataSource, RecordSet, ScalarValue, SourceDescription, TableDescription};

/// Reads records from one table of a SQLite database file
#[derive(Debug, Clone)]
pub struct SqliteSource {
    path: PathBuf,
    table: Option<String>,
}

impl SqliteSource {
    /// Create a source for `path`. Without an explicit `table`, the first
    /// user table of the database is read.
    #[inline]
    pub fn new<P: AsRef<Path>>(path: P, table: Option<String>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            table,
        }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn connect(&self) -> Result<Pool<Sqlite>> {
        if !self.path.exists() {
            return Err(anyhow!(
                "Database file not found: {}",
                self.path.display()
            ));
        }

        let options = SqliteConnectOptions::new()
            .filename(&self.path)
            .read_only(true);

        SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open database: {}", self.path.display()))
    }

    /// Structure overview: file size, tables, declared column types and row
    /// counts
    #[inline]
    pub async fn describe(&self) -> Result<SourceDescription> {
        let pool = self.connect().await?;

        let size_bytes = std::fs::metadata(&self.path).map(|m| m.len()).ok();
        let mut tables = Vec::new();

        for name in list_tables(&pool).await? {
            let columns = table_columns(&pool, &name).await?;
            let row_count: i64 =
                sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", quote_identifier(&name)))
                    .fetch_one(&pool)
                    .await
                    .with_context(|| format!("Failed to count rows of table {name}"))?;

            tables.push(TableDescription {
                name,
                columns,
                row_count,
            });
        }

        pool.close().await;

        Ok(SourceDescription {
            location: self.path.display().to_string(),
            size_bytes,
            tables,
        })
    }

    async fn resolve_table(&self, pool: &Pool<Sqlite>) -> Result<String> {
        let tables = list_tables(pool).await?;

        match &self.table {
            Some(wanted) => tables
                .into_iter()
                .find(|name| name == wanted)
                .ok_or_else(|| anyhow!("Table '{}' not found in database", wanted)),
            None => tables
                .into_iter()
                .next()
                .ok_or_else(|| anyhow!("No tables found in database")),
        }
    }
}

#[async_trait]
impl DataSource for SqliteSource {
    #[inline]
    async fn fetch_records(&self) -> Result<RecordSet> {
        let pool = self.connect().await?;

        let table = self.resolve_table(&pool).await?;
        info!("Reading records from table {}", table);

        let columns: Vec<String> = table_columns(&pool, &table)
            .await?
            .into_iter()
            .map(|column| column.name)
            .collect();

        if columns.is_empty() {
            return Err(anyhow!("Table '{}' has no columns", table));
        }

        let select_list = columns
            .iter()
            .map(|column| quote_identifier(column))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("SELECT {} FROM {}", select_list, quote_identifier(&table));

        let rows = sqlx::query(&sql)
            .fetch_all(&pool)
            .await
            .with_context(|| format!("Failed to read table {table}"))?;

        let rows = rows
            .iter()
            .map(|row| decode_row(row, columns.len()))
            .collect::<Result<Vec<_>>>()?;

        pool.close().await;

        debug!("Read {} rows with columns {:?}", rows.len(), columns);

        Ok(RecordSet {
            table,
            columns,
            rows,
        })
    }
}

async fn list_tables(pool: &Pool<Sqlite>) -> Result<Vec<String>> {
    sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY rowid",
    )
    .fetch_all(pool)
    .await
    .context("Failed to list tables")
}

async fn table_columns(pool: &Pool<Sqlite>, table: &str) -> Result<Vec<ColumnDescription>> {
    let rows = sqlx::query("SELECT name, type FROM pragma_table_info(?) ORDER BY cid")
        .bind(table)
        .fetch_all(pool)
        .await
        .with_context(|| format!("Failed to read columns of table {table}"))?;

    rows.iter()
        .map(|row| {
            Ok(ColumnDescription {
                name: row.try_get("name")?,
                declared_type: row.try_get("type")?,
            })
        })
        .collect()
}

fn decode_row(row: &SqliteRow, width: usize) -> Result<Vec<ScalarValue>> {
    (0..width).map(|index| decode_value(row, index)).collect()
}

/// Decode a cell by its runtime storage class rather than the declared
/// column type
fn decode_value(row: &SqliteRow, index: usize) -> Result<ScalarValue> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(ScalarValue::Null);
    }

    let storage_class = raw.type_info().name().to_string();
    let value = match storage_class.as_str() {
        "INTEGER" => ScalarValue::Integer(row.try_get(index)?),
        "REAL" => ScalarValue::Real(row.try_get(index)?),
        "BLOB" => ScalarValue::Blob(row.try_get(index)?),
        _ => ScalarValue::Text(row.try_get(index)?),
    };

    Ok(value)
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
