// Shared fixtures for the integration tests
#![allow(dead_code, reason = "each test binary uses a different subset")]

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use records_rag::embeddings::EmbeddingProvider;
use records_rag::generation::GenerationProvider;

pub const DIMENSION: usize = 16;

pub fn init_test_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init()
        .ok();
}

/// Letter-frequency embedding: shared vocabulary means nearby vectors
pub struct LetterEmbedder {
    model: String,
    dimension: usize,
}

impl LetterEmbedder {
    pub fn new() -> Self {
        Self::with_model("letters", DIMENSION)
    }

    pub fn with_model(model: &str, dimension: usize) -> Self {
        Self {
            model: model.to_string(),
            dimension,
        }
    }

    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; self.dimension];
        for c in text.chars().filter(char::is_ascii_alphabetic) {
            let slot = usize::from(c.to_ascii_lowercase() as u8 - b'a') % self.dimension;
            vector[slot] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for LetterEmbedder {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.vector_for(text)).collect())
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

/// Keeps every prompt it receives
pub struct RecordingGenerator {
    reply: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl RecordingGenerator {
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

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompt log poisoned").clone()
    }
}

#[async_trait]
impl GenerationProvider for RecordingGenerator {
    fn model_id(&self) -> &str {
        "recording"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts
            .lock()
            .expect("prompt log poisoned")
            .push(prompt.to_string());
        self.reply
            .clone()
            .ok_or_else(|| anyhow!("generation quota exceeded"))
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

const MOVIES_TABLE: &str = "CREATE TABLE movies (
    Series_Title TEXT,
    Released_Year INTEGER,
    Genre TEXT,
    IMDB_Rating REAL,
    Director TEXT,
    Star1 TEXT,
    Star2 TEXT,
    Overview TEXT
)";

const MOVIES: &[&str] = &[
    "INSERT INTO movies VALUES ('Heat', 1995, 'Crime, Drama', 8.3, 'Michael Mann', 'Al Pacino', 'Robert De Niro', 'A group of professional bank robbers start to feel the heat from police.')",
    "INSERT INTO movies VALUES ('Up', 2009, 'Animation, Adventure', 8.2, 'Pete Docter', 'Ed Asner', 'Jordan Nagai', 'An old widower ties thousands of balloons to his house.')",
    "INSERT INTO movies VALUES ('Alien', 1979, 'Horror, Sci-Fi', 8.4, 'Ridley Scott', 'Sigourney Weaver', NULL, 'The crew of a commercial spacecraft encounter a deadly lifeform.')",
];

/// Create a SQLite file at `path` and run `statements` against it
pub async fn create_database(path: &Path, statements: &[&str]) {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("should create database");

    for statement in statements {
        sqlx::query(statement)
            .execute(&pool)
            .await
            .expect("statement should run");
    }
    pool.close().await;
}

/// A three-row movie catalogue in `dir`
pub async fn create_movie_database(dir: &Path) -> PathBuf {
    let path = dir.join("movies.db");
    let mut statements = vec![MOVIES_TABLE];
    statements.extend_from_slice(MOVIES);
    create_database(&path, &statements).await;
    path
}
