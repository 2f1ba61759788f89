// Deterministic collaborators for pipeline tests

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Result, anyhow};
use async_trait::async_trait;

use crate::document::Document;
use crate::embeddings::EmbeddingProvider;
use crate::generation::GenerationProvider;
use crate::source::{DataSource, RecordSet, ScalarValue};
use crate::store::{CollectionInfo, EmbeddedDocument, ScoredDocument, VectorStore};

pub const STUB_DIMENSION: usize = 32;

/// Byte histogram embedding: identical texts map to identical vectors
pub struct StubEmbedder {
    model: String,
    dimension: usize,
    fail: bool,
    pub calls: AtomicUsize,
}

impl StubEmbedder {
    pub fn new() -> Self {
        Self::with_model("stub-embedder", STUB_DIMENSION)
    }

    pub fn with_model(model: &str, dimension: usize) -> Self {
        Self {
            model: model.to_string(),
            dimension,
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; self.dimension];
        for byte in text.bytes() {
            vector[usize::from(byte) % self.dimension] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for StubEmbedder {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(anyhow!("embedding service unavailable"));
        }
        Ok(texts.iter().map(|text| self.vector_for(text)).collect())
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

/// Records every prompt and answers with a fixed reply
pub struct StubGenerator {
    reply: Option<String>,
    pub prompts: Mutex<Vec<String>>,
}

impl StubGenerator {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().expect("prompt log poisoned").len()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().expect("prompt log poisoned").last().cloned()
    }
}

#[async_trait]
impl GenerationProvider for StubGenerator {
    fn model_id(&self) -> &str {
        "stub-generator"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts
            .lock()
            .expect("prompt log poisoned")
            .push(prompt.to_string());
        self.reply
            .clone()
            .ok_or_else(|| anyhow!("quota exceeded"))
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

/// Fixed in-memory records
pub struct StaticSource(pub RecordSet);

impl StaticSource {
    /// One text column per record
    pub fn titles(titles: &[&str]) -> Self {
        Self(RecordSet {
            table: "movies".to_string(),
            columns: vec!["title".to_string()],
            rows: titles
                .iter()
                .map(|title| vec![ScalarValue::from(*title)])
                .collect(),
        })
    }
}

#[async_trait]
impl DataSource for StaticSource {
    async fn fetch_records(&self) -> Result<RecordSet> {
        Ok(self.0.clone())
    }
}

pub struct FailingSource;

#[async_trait]
impl DataSource for FailingSource {
    async fn fetch_records(&self) -> Result<RecordSet> {
        Err(anyhow!("database is locked"))
    }
}

/// Store whose every operation fails
pub struct FailingStore;

#[async_trait]
impl VectorStore for FailingStore {
    async fn collection_info(&self, _collection: &str) -> Result<Option<CollectionInfo>> {
        Err(anyhow!("store offline"))
    }

    async fn delete_collection(&self, _collection: &str) -> Result<()> {
        Err(anyhow!("store offline"))
    }

    async fn create_collection(&self, _collection: &str, _dimension: usize) -> Result<()> {
        Err(anyhow!("store offline"))
    }

    async fn upsert(
        &self,
        _collection: &str,
        _model: &str,
        _documents: Vec<EmbeddedDocument>,
    ) -> Result<()> {
        Err(anyhow!("store offline"))
    }

    async fn query(
        &self,
        _collection: &str,
        _vector: &[f32],
        _top_k: usize,
    ) -> Result<Vec<ScoredDocument>> {
        Err(anyhow!("store offline"))
    }

    async fn sample(&self, _collection: &str, _limit: usize) -> Result<Vec<Document>> {
        Err(anyhow!("store offline"))
    }
}
