use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use itertools::Itertools;
use tracing::info;

use crate::config::Config;
use crate::embeddings::{EmbeddingProvider, OllamaEmbedder};
use crate::generation::{self, GenerationProvider};
use crate::indexer::Indexer;
use crate::query::QueryPipeline;
use crate::response::{QueryRequest, QueryResponse};
use crate::serve::RagService;
use crate::source::SqliteSource;
use crate::store::{LanceStore, VectorStore};

const SAMPLE_TEXT_CHARS: usize = 200;
const SAMPLE_VALUE_CHARS: usize = 50;
const SAMPLE_METADATA_ENTRIES: usize = 5;

/// Collaborators assembled from configuration
struct Components {
    config: Config,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    source: Arc<SqliteSource>,
}

impl Components {
    async fn load(config_dir: &Path) -> Result<Self> {
        let config = Config::load(config_dir).context("Failed to load configuration")?;

        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(
            OllamaEmbedder::new(&config.ollama).context("Failed to initialize Ollama client")?,
        );
        let store: Arc<dyn VectorStore> = Arc::new(
            LanceStore::from_config(&config)
                .await
                .context("Failed to initialize LanceDB vector store")?,
        );
        let source = Arc::new(SqliteSource::new(
            &config.source.database_path,
            config.source.table.clone(),
        ));

        Ok(Self {
            config,
            embedder,
            store,
            source,
        })
    }

    fn indexer(&self) -> Indexer {
        Indexer::new(Arc::clone(&self.embedder), Arc::clone(&self.store))
            .with_id_prefix(self.config.index.id_prefix.clone())
    }

    fn pipeline(&self) -> Result<QueryPipeline> {
        let generator = generation::from_config(&self.config.generation, &self.config.ollama)
            .context("Failed to initialize generation provider")?;

        Ok(QueryPipeline::new(
            Arc::clone(&self.embedder),
            Arc::clone(&self.store),
            generator,
        )
        .with_context_schema(self.config.context.clone())
        .with_prompt_template(self.config.prompt.clone()))
    }
}

fn spinner(message: &str) -> ProgressBar {
    let bar = if console::user_attended_stderr() {
        ProgressBar::new_spinner().with_style(
            ProgressStyle::with_template("{spinner} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        )
    } else {
        ProgressBar::hidden()
    };
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

/// Rebuild the configured collection from the configured data source
#[inline]
pub async fn index_records(config_dir: &Path) -> Result<()> {
    let components = Components::load(config_dir).await?;
    let collection = &components.config.index.collection;

    info!(
        "Indexing {} into collection {}",
        components.source.path().display(),
        collection
    );

    let bar = spinner("Indexing records");
    let result = components
        .indexer()
        .build_index(components.source.as_ref(), collection)
        .await;
    bar.finish_and_clear();

    let summary = result?;

    println!("{}", style("✓ Vetorização concluída com sucesso!").green());
    println!("  Collection: {}", summary.collection);
    println!("  Source table: {}", summary.table);
    println!("  Documents: {}", summary.total_documents);
    println!("  Columns: {}", summary.columns.iter().join(", "));
    println!("  Embedding model: {}", summary.model);
    println!(
        "  Indexed at: {}",
        summary.indexed_at.format("%Y-%m-%d %H:%M:%S UTC")
    );

    Ok(())
}

/// Answer a question against the configured collection
#[inline]
pub async fn ask_question(
    config_dir: &Path,
    question: String,
    extra_context: Option<String>,
    top_k: Option<usize>,
    json: bool,
) -> Result<()> {
    let components = Components::load(config_dir).await?;
    let pipeline = components.pipeline()?;

    let request = QueryRequest {
        pergunta: question,
        contexto_adicional: extra_context.unwrap_or_default(),
        top_k: top_k.unwrap_or(components.config.retrieval.top_k),
    };

    let bar = spinner("Searching and generating");
    let result = pipeline
        .answer(
            &request.pergunta,
            &request.contexto_adicional,
            request.top_k,
            &components.config.index.collection,
        )
        .await;
    bar.finish_and_clear();

    if json {
        let response = QueryResponse::from(result);
        println!(
            "{}",
            serde_json::to_string_pretty(&response).context("Failed to encode response")?
        );
        return Ok(());
    }

    let answer = match result {
        Ok(answer) => answer,
        Err(e) if e.kind().is_user_facing() => {
            if let QueryResponse::Failure { mensagem, detalhes } = QueryResponse::from(Err(e)) {
                println!("{}", style(mensagem).yellow());
                if let Some(detalhes) = detalhes {
                    println!("{}", style(detalhes).dim());
                }
            }
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    println!("{}", answer.answer);
    println!();
    println!(
        "{}",
        style(format!("Based on {} records:", answer.documents.len())).dim()
    );
    for (position, result) in answer.documents.iter().enumerate() {
        let label = result
            .document
            .metadata
            .iter()
            .next()
            .map_or(result.document.id.as_str(), |(_, value)| value);
        println!(
            "  {}. {} {}",
            position + 1,
            label,
            style(format!("(distance {:.4})", result.distance)).dim()
        );
    }

    Ok(())
}

/// Print the structure of the configured SQLite data source
#[inline]
pub async fn describe_source(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;
    let source = SqliteSource::new(&config.source.database_path, config.source.table.clone());

    let description = source.describe().await?;

    println!("{}", style("🗄️  Data Source").bold().cyan());
    println!("  File: {}", description.location);
    if let Some(size) = description.size_bytes {
        println!("  Size: {}", format_size(size));
    }
    println!("  Tables: {}", description.tables.len());

    for table in &description.tables {
        println!();
        println!(
            "{} ({} rows)",
            style(&table.name).bold().yellow(),
            table.row_count
        );
        for column in &table.columns {
            let declared = if column.declared_type.is_empty() {
                "(untyped)"
            } else {
                column.declared_type.as_str()
            };
            println!("  - {}: {}", column.name, style(declared).dim());
        }
    }

    Ok(())
}

/// Print the state of the configured collection and a few stored documents
#[inline]
pub async fn inspect_collection(config_dir: &Path, limit: usize) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;
    let store = LanceStore::from_config(&config)
        .await
        .context("Failed to initialize LanceDB vector store")?;
    let collection = &config.index.collection;

    println!("{}", style("🔍 Stored Vectors").bold().cyan());
    println!("  Location: {}", store.path().display());

    let Some(info) = store.collection_info(collection).await? else {
        println!(
            "  {}",
            style(format!("Collection {collection} does not exist")).yellow()
        );
        println!("  Run 'records-rag index' to build it.");
        return Ok(());
    };

    println!("  Collection: {}", info.name);
    println!("  Documents: {}", info.count);
    println!("  Dimension: {}", info.dimension);
    println!(
        "  Embedding model: {}",
        info.model.as_deref().unwrap_or("(unknown)")
    );

    for document in store.sample(collection, limit).await? {
        println!();
        println!("{}", style(&document.id).bold().yellow());
        println!("  {}", truncate_chars(&document.text, SAMPLE_TEXT_CHARS));
        for (key, value) in document.metadata.iter().take(SAMPLE_METADATA_ENTRIES) {
            println!("    - {}: {}", key, truncate_chars(value, SAMPLE_VALUE_CHARS));
        }
    }

    Ok(())
}

/// Report configuration, provider health and collection state
#[inline]
pub async fn show_status(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir).unwrap_or_else(|_| Config::with_base_dir(config_dir));

    println!("📊 Records RAG Status Report");
    println!("{}", "=".repeat(50));
    println!();

    println!("🤖 Embedding Provider:");
    match OllamaEmbedder::new(&config.ollama) {
        Ok(embedder) => match embedder.health_check().await {
            Ok(()) => {
                println!(
                    "   ✅ Ollama: Connected ({}:{})",
                    config.ollama.host, config.ollama.port
                );
                println!("   📋 Model: {}", config.ollama.model);
                println!("   🔢 Batch Size: {}", config.ollama.batch_size);
            }
            Err(e) => println!("   ⚠️  Ollama: Unhealthy - {:#}", e),
        },
        Err(e) => println!("   ❌ Ollama: Failed to initialize - {:#}", e),
    }

    println!("✍️  Generation Provider:");
    match generation::from_config(&config.generation, &config.ollama) {
        Ok(generator) => match generator.health_check().await {
            Ok(()) => println!(
                "   ✅ {}: Reachable ({})",
                config.generation.provider,
                generator.model_id()
            ),
            Err(e) => println!(
                "   ⚠️  {}: Unhealthy - {:#}",
                config.generation.provider, e
            ),
        },
        Err(e) => println!("   ❌ Failed to initialize - {:#}", e),
    }

    println!("🗄️  Data Source:");
    if config.source.database_path.exists() {
        println!(
            "   ✅ SQLite: {}",
            config.source.database_path.display()
        );
    } else {
        println!(
            "   ❌ SQLite: {} not found",
            config.source.database_path.display()
        );
    }

    println!("🔍 Vector Database:");
    match LanceStore::from_config(&config).await {
        Ok(store) => match store.collection_info(&config.index.collection).await {
            Ok(Some(info)) => {
                println!("   ✅ LanceDB: Connected");
                println!("   📚 Collection: {}", info.name);
                println!("   📄 Documents: {}", info.count);
                println!("   🔢 Dimension: {}", info.dimension);
            }
            Ok(None) => {
                println!("   ✅ LanceDB: Connected");
                println!(
                    "   📭 Collection {} not built yet",
                    config.index.collection
                );
            }
            Err(e) => println!("   ⚠️  LanceDB: {:#}", e),
        },
        Err(e) => println!("   ❌ LanceDB: Failed to connect - {:#}", e),
    }

    println!();
    println!("💡 Next Steps:");
    println!("   • Use 'records-rag index' to (re)build the collection");
    println!("   • Use 'records-rag ask \"<pergunta>\"' to ask a question");
    println!("   • Use 'records-rag serve' to answer JSON requests on stdio");

    Ok(())
}

/// Serve indexing and query requests over stdio
#[inline]
pub async fn serve_stdio(config_dir: &Path) -> Result<()> {
    let components = Components::load(config_dir).await?;
    let pipeline = components.pipeline()?;
    let indexer = components.indexer();

    let service = RagService::new(
        indexer,
        pipeline,
        components.source,
        components.config.index.collection,
    );

    service.serve_stdio().await
}

fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(limit).collect();
    truncated.push_str("...");
    truncated
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.2} {}", UNITS[unit])
    }
}

/// Resolve an explicit configuration directory or fall back to the default
#[inline]
pub fn resolve_config_dir(explicit: Option<&Path>) -> Result<std::path::PathBuf> {
    match explicit {
        Some(dir) => Ok(dir.to_path_buf()),
        None => Ok(crate::config::get_config_dir()?),
    }
}
