use clap::{Parser, Subcommand};
use pdfqa::Result;
use pdfqa::commands::{ask, init_config, run_ingest, show_config, show_status};
use pdfqa::config::Config;

#[derive(Parser)]
#[command(name = "pdfqa")]
#[command(about = "Question answering over a local PDF corpus using retrieval-augmented generation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show or initialize the configuration
    Config {
        /// Write a default configuration file if none exists
        #[arg(long)]
        init: bool,
    },
    /// Build the vector index from the configured PDF directory
    Ingest,
    /// Ask a question against the indexed corpus
    Ask {
        /// The question to answer
        question: String,
    },
    /// Show the status of the index and the Ollama connection
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { init } => {
            if init {
                init_config()?;
            } else {
                show_config()?;
            }
        }
        Commands::Ingest => {
            run_ingest(&Config::load()?).await?;
        }
        Commands::Ask { question } => {
            ask(&Config::load()?, &question).await?;
        }
        Commands::Status => {
            show_status(&Config::load()?).await?;
        }
    }

    Ok(())
}
