
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use arrow::array::{Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::Connection;
use lancedb::arrow::SendableRecordBatchStream;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::table::Table;
use tracing::{debug, info};

use super::{CollectionInfo, EmbeddedDocument, ScoredDocument, VectorStore, admissible};
use crate::config::Config;
use crate::document::{Document, Metadata};

/// Vector store persisted with LanceDB, one table per collection
pub struct LanceStore {
    connection: Connection,
    path: PathBuf,
    max_distance: Option<f32>,
}

impl LanceStore {
    /// Open (or create) the store directory at `path`
    #[inline]
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        debug!("Initializing LanceDB at path: {:?}", path);

        std::fs::create_dir_all(&path).with_context(|| {
            format!(
                "Failed to create vector database directory: {}",
                path.display()
            )
        })?;

        let uri = path.to_string_lossy().to_string();
        let connection = lancedb::connect(&uri)
            .execute()
            .await
            .context("Failed to connect to LanceDB")?;

        info!("Vector store opened at {}", path.display());
        Ok(Self {
            connection,
            path,
            max_distance: None,
        })
    }

    /// Open the store under the configured base directory with the
    /// configured admissibility bound
    #[inline]
    pub async fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::open(config.vector_database_path())
            .await?
            .with_max_distance(config.retrieval.max_distance))
    }

    #[inline]
    #[must_use]
    pub fn with_max_distance(mut self, max_distance: Option<f32>) -> Self {
        self.max_distance = max_distance;
        self
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn table_exists(&self, collection: &str) -> Result<bool> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .context("Failed to list tables")?;
        Ok(table_names.iter().any(|name| name == collection))
    }

    async fn open_table(&self, collection: &str) -> Result<Table> {
        self.connection
            .open_table(collection)
            .execute()
            .await
            .with_context(|| format!("Failed to open table {collection}"))
    }

    /// Read the vector dimension from the table schema
    async fn detect_vector_dimension(table: &Table) -> Result<usize> {
        let schema = table.schema().await.context("Failed to get table schema")?;

        for field in schema.fields() {
            if field.name() == "vector" {
                if let DataType::FixedSizeList(_, size) = field.data_type() {
                    return usize::try_from(*size).context("Negative vector dimension in schema");
                }
            }
        }

        Err(anyhow!("Could not find vector column or determine dimension"))
    }

    async fn recorded_model(table: &Table) -> Result<Option<String>> {
        let mut stream = table
            .query()
            .limit(1)
            .execute()
            .await
            .context("Failed to read recorded model")?;

        while let Some(batch) = stream
            .try_next()
            .await
            .context("Failed to read result stream")?
        {
            if batch.num_rows() > 0 {
                let models = string_column(&batch, "model")?;
                return Ok(Some(models.value(0).to_string()));
            }
        }

        Ok(None)
    }
}

fn create_schema(vector_dim: usize) -> Result<Arc<Schema>> {
    let size = i32::try_from(vector_dim).context("Vector dimension too large")?;
    Ok(Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, false)), size),
            false,
        ),
        Field::new("text", DataType::Utf8, false),
        Field::new("metadata", DataType::Utf8, false),
        Field::new("model", DataType::Utf8, false),
    ])))
}

fn create_record_batch(
    vector_dim: usize,
    model: &str,
    documents: &[EmbeddedDocument],
) -> Result<RecordBatch> {
    let len = documents.len();

    let mut ids = Vec::with_capacity(len);
    let mut texts = Vec::with_capacity(len);
    let mut metadata = Vec::with_capacity(len);
    let mut flat_values = Vec::with_capacity(len * vector_dim);

    for entry in documents {
        if entry.vector.len() != vector_dim {
            return Err(anyhow!(
                "Vector for {} has dimension {}, collection expects {}",
                entry.document.id,
                entry.vector.len(),
                vector_dim
            ));
        }
        ids.push(entry.document.id.as_str());
        texts.push(entry.document.text.as_str());
        metadata.push(
            serde_json::to_string(&entry.document.metadata)
                .context("Failed to serialize metadata")?,
        );
        flat_values.extend_from_slice(&entry.vector);
    }

    let schema = create_schema(vector_dim)?;
    let field = Arc::new(Field::new("item", DataType::Float32, false));
    let vector_array = FixedSizeListArray::try_new(
        field,
        i32::try_from(vector_dim).context("Vector dimension too large")?,
        Arc::new(Float32Array::from(flat_values)),
        None,
    )
    .context("Failed to create vector array")?;

    let arrays: Vec<Arc<dyn Array>> = vec![
        Arc::new(StringArray::from(ids)),
        Arc::new(vector_array),
        Arc::new(StringArray::from(texts)),
        Arc::new(StringArray::from(metadata)),
        Arc::new(StringArray::from(vec![model; len])),
    ];

    RecordBatch::try_new(schema, arrays).context("Failed to create record batch")
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .ok_or_else(|| anyhow!("Missing {} column", name))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| anyhow!("Invalid {} column type", name))
}

/// Documents and, for search results, distances from one record batch
fn parse_batch(batch: &RecordBatch) -> Result<Vec<(Document, Option<f32>)>> {
    let ids = string_column(batch, "id")?;
    let texts = string_column(batch, "text")?;
    let metadata = string_column(batch, "metadata")?;
    let distances = batch
        .column_by_name("_distance")
        .and_then(|col| col.as_any().downcast_ref::<Float32Array>());

    (0..batch.num_rows())
        .map(|row| {
            let document = Document {
                id: ids.value(row).to_string(),
                text: texts.value(row).to_string(),
                metadata: serde_json::from_str::<Metadata>(metadata.value(row))
                    .context("Failed to parse stored metadata")?,
            };
            let distance = distances.and_then(|d| (!d.is_null(row)).then(|| d.value(row)));
            Ok((document, distance))
        })
        .collect()
}

async fn collect_stream(
    mut stream: SendableRecordBatchStream,
) -> Result<Vec<(Document, Option<f32>)>> {
    let mut documents = Vec::new();

    while let Some(batch) = stream
        .try_next()
        .await
        .context("Failed to read result stream")?
    {
        documents.extend(parse_batch(&batch)?);
    }

    Ok(documents)
}

#[async_trait]
impl VectorStore for LanceStore {
    #[inline]
    async fn collection_info(&self, collection: &str) -> Result<Option<CollectionInfo>> {
        if !self.table_exists(collection).await? {
            return Ok(None);
        }

        let table = self.open_table(collection).await?;
        let count = table
            .count_rows(None)
            .await
            .context("Failed to count rows")?;
        let dimension = Self::detect_vector_dimension(&table).await?;
        let model = if count > 0 {
            Self::recorded_model(&table).await?
        } else {
            None
        };

        Ok(Some(CollectionInfo {
            name: collection.to_string(),
            count,
            dimension,
            model,
        }))
    }

    #[inline]
    async fn delete_collection(&self, collection: &str) -> Result<()> {
        if self.table_exists(collection).await? {
            info!("Dropping collection {}", collection);
            self.connection
                .drop_table(collection)
                .await
                .with_context(|| format!("Failed to drop table {collection}"))?;
        }
        Ok(())
    }

    #[inline]
    async fn create_collection(&self, collection: &str, dimension: usize) -> Result<()> {
        let schema = create_schema(dimension)?;
        self.connection
            .create_empty_table(collection, schema)
            .execute()
            .await
            .with_context(|| format!("Failed to create table {collection}"))?;

        info!(
            "Created collection {} with {} dimensions",
            collection, dimension
        );
        Ok(())
    }

    #[inline]
    async fn upsert(
        &self,
        collection: &str,
        model: &str,
        documents: Vec<EmbeddedDocument>,
    ) -> Result<()> {
        if documents.is_empty() {
            debug!("No documents to store");
            return Ok(());
        }

        let table = self.open_table(collection).await?;
        let vector_dim = Self::detect_vector_dimension(&table).await?;

        let existing = table
            .count_rows(None)
            .await
            .context("Failed to count rows")?;
        if existing > 0 {
            let ids: Vec<String> = documents
                .iter()
                .map(|entry| format!("'{}'", entry.document.id.replace('\'', "''")))
                .collect();
            table
                .delete(&format!("id IN ({})", ids.join(", ")))
                .await
                .context("Failed to replace existing documents")?;
        }

        let record_batch = create_record_batch(vector_dim, model, &documents)?;
        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .context("Failed to insert documents")?;

        info!(
            "Stored {} documents in collection {}",
            documents.len(),
            collection
        );
        Ok(())
    }

    #[inline]
    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredDocument>> {
        debug!(
            "Searching collection {} for {} nearest neighbours",
            collection, top_k
        );

        let table = self.open_table(collection).await?;
        let results = table
            .vector_search(vector)
            .context("Failed to create vector search")?
            .column("vector")
            .limit(top_k)
            .execute()
            .await
            .context("Failed to execute search")?;

        let scored = collect_stream(results)
            .await?
            .into_iter()
            .map(|(document, distance)| ScoredDocument {
                document,
                distance: distance.unwrap_or(0.0),
            })
            .collect();

        Ok(admissible(scored, self.max_distance))
    }

    #[inline]
    async fn sample(&self, collection: &str, limit: usize) -> Result<Vec<Document>> {
        if !self.table_exists(collection).await? {
            return Ok(Vec::new());
        }

        let table = self.open_table(collection).await?;
        let results = table
            .query()
            .limit(limit)
            .execute()
            .await
            .context("Failed to read documents")?;

        Ok(collect_stream(results)
            .await?
            .into_iter()
            .map(|(document, _)| document)
            .collect())
    }
}
