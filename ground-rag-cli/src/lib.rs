//! # ground-rag-cli
//!
//! Command-line front end for [`ground_rag`]: indexes a folder of text files
//! with a local Ollama server, then answers questions read from stdin.

pub mod cli;
pub mod repl;

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use ground_rag::ollama::{OllamaChatModel, OllamaEmbeddingProvider};
use ground_rag::{EmbeddingProvider, FileVectorStore, LanguageModel, RagPipeline, load_corpus};
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::EnvFilter;

pub use cli::Cli;
pub use repl::{Input, PROMPT, ReplOptions, parse_input, run_repl, write_error};

/// Install the stderr log subscriber.
///
/// `RUST_LOG` wins when set; otherwise only warnings are shown, or pipeline
/// activity with `verbose`.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Build phase: load the corpus, open the index and bring a pipeline to
/// `Ready`, writing progress lines to `out`.
pub async fn build_pipeline<W: Write>(
    cli: &Cli,
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LanguageModel>,
    out: &mut W,
) -> Result<RagPipeline> {
    let config = cli.rag_config()?;

    writeln!(out, "Loading & chunking documents...")?;
    let documents = load_corpus(&cli.data_dir, &cli.extension)?;
    let location = cli.data_dir.display().to_string();

    writeln!(out, "Creating / loading vector store...")?;
    let store = FileVectorStore::open(&cli.index_dir)?;

    let pipeline = RagPipeline::builder()
        .config(config)
        .embedding_provider(embedder)
        .vector_store(Arc::new(store))
        .language_model(llm)
        .build()?;

    let report = if cli.rebuild {
        pipeline.rebuild_from(&location, &documents).await
    } else {
        pipeline.ingest_from(&location, &documents).await
    }
    .context("failed to build the index")?;
    writeln!(out, "  -> {} chunks from {} files", report.total_chunks, report.documents)?;
    if report.documents_skipped > 0 {
        writeln!(out, "     ({} unchanged files reused from the index)", report.documents_skipped)?;
    }
    Ok(pipeline)
}

/// Build phase followed by the interactive query loop.
///
/// Any build-phase error is returned and ends the process; the query loop
/// only returns on `exit`/`quit`, end of input or an I/O error.
pub async fn run(cli: Cli) -> Result<()> {
    let ollama = cli.ollama_config();
    info!(
        data_dir = %cli.data_dir.display(),
        index_dir = %cli.index_dir.display(),
        embed_model = %ollama.embedding_model,
        llm_model = %ollama.generation_model,
        "starting"
    );

    let mut stdout = std::io::stdout();
    let pipeline = build_pipeline(
        &cli,
        Arc::new(OllamaEmbeddingProvider::new(ollama.clone())),
        Arc::new(OllamaChatModel::new(ollama)),
        &mut stdout,
    )
    .await?;

    writeln!(stdout, "\nRAG CLI ready (local). Type 'exit' to quit.\n")?;
    let stdin = BufReader::new(tokio::io::stdin());
    run_repl(&pipeline, stdin, &mut stdout, ReplOptions { show_sources: cli.show_sources }).await
}
