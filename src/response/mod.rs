// Response module
// JSON payloads exchanged with callers of the indexing and query operations


use serde::{Deserialize, Serialize};

use crate::document::Metadata;
use crate::indexer::IndexSummary;
use crate::query::{DEFAULT_TOP_K, MAX_TOP_K, RagAnswer};
use crate::{RagError, Result};

const NOTHING_FOUND: &str = "Nada encontrado no banco de dados. Tente outra pesquisa.";

/// Input of a query request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub pergunta: String,
    #[serde(default)]
    pub contexto_adicional: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

impl QueryRequest {
    #[inline]
    pub fn new(pergunta: impl Into<String>) -> Self {
        Self {
            pergunta: pergunta.into(),
            contexto_adicional: String::new(),
            top_k: DEFAULT_TOP_K,
        }
    }
}

/// Result of an indexing request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum IndexResponse {
    #[serde(rename = "sucesso")]
    Success {
        mensagem: String,
        tabela_vetorizada: String,
        total_documentos: usize,
        colunas: Vec<String>,
        modelo_usado: String,
    },
    #[serde(rename = "erro")]
    Failure {
        mensagem: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detalhes: Option<String>,
    },
}

impl IndexResponse {
    #[inline]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

impl From<Result<IndexSummary>> for IndexResponse {
    #[inline]
    fn from(result: Result<IndexSummary>) -> Self {
        match result {
            Ok(summary) => Self::Success {
                mensagem: "Vetorização concluída com sucesso!".to_string(),
                tabela_vetorizada: summary.table,
                total_documentos: summary.total_documents,
                colunas: summary.columns,
                modelo_usado: summary.model,
            },
            Err(RagError::EmptyDataSource) => Self::Failure {
                mensagem: "Nenhum registro encontrado para vetorizar.".to_string(),
                detalhes: Some("A tabela de origem está vazia.".to_string()),
            },
            Err(e) => Self::Failure {
                mensagem: format!("Erro durante a vetorização: {e}"),
                detalhes: None,
            },
        }
    }
}

/// Result of a query request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum QueryResponse {
    #[serde(rename = "sucesso")]
    Success {
        pergunta_original: String,
        contexto_adicional: String,
        total_filmes_encontrados: usize,
        resposta: String,
        metadados_filmes: Vec<Metadata>,
    },
    #[serde(rename = "erro")]
    Failure {
        mensagem: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detalhes: Option<String>,
    },
}

impl QueryResponse {
    #[inline]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Failure payload for a request that could not be parsed
    #[inline]
    pub fn invalid_request(reason: &str) -> Self {
        Self::Failure {
            mensagem: "Requisição inválida".to_string(),
            detalhes: Some(reason.to_string()),
        }
    }

    fn failure(error: &RagError) -> Self {
        let (mensagem, detalhes) = match error {
            RagError::EmptyQuestion => (
                "Por favor, envie uma pergunta no campo 'pergunta'".to_string(),
                Some("A pergunta não pode estar vazia"),
            ),
            RagError::InvalidTopK(_) => (
                format!("O campo 'top_k' deve ser um número inteiro entre 1 e {MAX_TOP_K}"),
                None,
            ),
            RagError::EmptyIndex => (
                NOTHING_FOUND.to_string(),
                Some("O banco vetorial está vazio. Execute a indexação primeiro."),
            ),
            RagError::NoRelevantMatch => (
                NOTHING_FOUND.to_string(),
                Some("Nenhum resultado relevante foi encontrado para sua pergunta."),
            ),
            other => (format!("Erro durante o processamento: {other}"), None),
        };

        Self::Failure {
            mensagem,
            detalhes: detalhes.map(str::to_string),
        }
    }
}

impl From<Result<RagAnswer>> for QueryResponse {
    #[inline]
    fn from(result: Result<RagAnswer>) -> Self {
        match result {
            Ok(answer) => Self::Success {
                total_filmes_encontrados: answer.documents.len(),
                metadados_filmes: answer
                    .documents
                    .into_iter()
                    .map(|result| result.document.metadata)
                    .collect(),
                pergunta_original: answer.question,
                contexto_adicional: answer.extra_context,
                resposta: answer.answer,
            },
            Err(e) => Self::failure(&e),
        }
    }
}
