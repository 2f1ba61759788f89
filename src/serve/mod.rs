// Serve module
// Newline-delimited JSON requests over stdio, one response line per request

#[cfg(test)]
mod tests;

use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

use crate::indexer::Indexer;
use crate::query::QueryPipeline;
use crate::response::{IndexResponse, QueryRequest, QueryResponse};
use crate::source::DataSource;

/// Both pipelines bound to one data source and collection
pub struct RagService {
    indexer: Indexer,
    pipeline: QueryPipeline,
    source: Arc<dyn DataSource>,
    collection: String,
}

/// One request line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operacao")]
pub enum ServeRequest {
    #[serde(rename = "indexar")]
    Index,
    #[serde(rename = "perguntar")]
    Ask(QueryRequest),
}

impl RagService {
    #[inline]
    pub fn new(
        indexer: Indexer,
        pipeline: QueryPipeline,
        source: Arc<dyn DataSource>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            indexer,
            pipeline,
            source,
            collection: collection.into(),
        }
    }

    #[inline]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Rebuild the collection from the data source
    #[inline]
    pub async fn index(&self) -> IndexResponse {
        self.indexer
            .build_index(self.source.as_ref(), &self.collection)
            .await
            .into()
    }

    #[inline]
    pub async fn ask(&self, request: &QueryRequest) -> QueryResponse {
        self.pipeline
            .answer(
                &request.pergunta,
                &request.contexto_adicional,
                request.top_k,
                &self.collection,
            )
            .await
            .into()
    }

    /// Handle one raw request line and return the JSON response line
    #[inline]
    pub async fn handle_line(&self, line: &str) -> Result<String> {
        let response = match serde_json::from_str::<ServeRequest>(line) {
            Ok(ServeRequest::Index) => serde_json::to_string(&self.index().await)?,
            Ok(ServeRequest::Ask(request)) => serde_json::to_string(&self.ask(&request).await)?,
            Err(e) => {
                warn!("Rejected request line: {}", e);
                serde_json::to_string(&QueryResponse::invalid_request(&e.to_string()))?
            }
        };
        Ok(response)
    }

    /// Serve requests from `reader` until end of input
    #[inline]
    pub async fn serve<R, W>(&self, reader: R, writer: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();

        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }

                    debug!("Received request: {}", line);
                    let response = self.handle_line(line).await?;
                    writer.write_all(response.as_bytes()).await?;
                    writer.write_all(b"\n").await?;
                    writer.flush().await?;
                }
                Ok(None) => {
                    info!("EOF reached, stopping");
                    break;
                }
                Err(e) => {
                    error!("Error reading request: {}", e);
                    break;
                }
            }
        }

        Ok(())
    }

    /// Serve requests on stdin, writing responses to stdout
    #[inline]
    pub async fn serve_stdio(&self) -> Result<()> {
        info!(
            "Serving collection {} over stdio (one JSON request per line)",
            self.collection
        );

        let reader = BufReader::new(io::stdin());
        let mut stdout = io::stdout();
        self.serve(reader, &mut stdout).await
    }
}
