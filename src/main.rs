use std::path::PathBuf;

use clap::{Parser, Subcommand};
use records_rag::Result;
use records_rag::commands::{
    ask_question, describe_source, index_records, inspect_collection, resolve_config_dir,
    serve_stdio, show_status,
};
use records_rag::config::{run_interactive_config, show_config};

#[derive(Parser)]
#[command(name = "records-rag")]
#[command(about = "Index relational records as vectors and answer questions about them")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml and the vector database
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the embedding and generation providers
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Rebuild the vector collection from the data source
    Index,
    /// Ask a question about the indexed records
    Ask {
        /// The question to answer
        pergunta: String,
        /// Extra context to pass along with the question
        #[arg(long)]
        context: Option<String>,
        /// Number of records to retrieve (defaults to the configured value)
        #[arg(long)]
        top_k: Option<usize>,
        /// Print the JSON response payload
        #[arg(long)]
        json: bool,
    },
    /// Show the tables and columns of the data source
    Describe,
    /// Show the stored collection and a sample of its documents
    Inspect {
        /// Number of documents to show
        #[arg(long, default_value_t = 1)]
        limit: usize,
    },
    /// Show provider health and collection state
    Status,
    /// Answer newline-delimited JSON requests on stdio
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_dir = resolve_config_dir(cli.config_dir.as_deref())?;

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config(&config_dir)?;
            } else {
                run_interactive_config(&config_dir)?;
            }
        }
        Commands::Index => {
            index_records(&config_dir).await?;
        }
        Commands::Ask {
            pergunta,
            context,
            top_k,
            json,
        } => {
            ask_question(&config_dir, pergunta, context, top_k, json).await?;
        }
        Commands::Describe => {
            describe_source(&config_dir).await?;
        }
        Commands::Inspect { limit } => {
            inspect_collection(&config_dir, limit).await?;
        }
        Commands::Status => {
            show_status(&config_dir).await?;
        }
        Commands::Serve => {
            serve_stdio(&config_dir).await?;
        }
    }

    Ok(())
}
