use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use lectern_core::{Config, Engine, EngineError, JsonlAuditSink, ProviderEmbedder};
use lectern_index::StoreError;
use lectern_llm::ollama::OllamaProvider;

#[derive(Parser)]
#[command(
    name = "lectern",
    version,
    about = "Ask questions over a private document corpus, with citations"
)]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, default_value = "lectern.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ask a question over the indexed corpus.
    Ask {
        #[arg(required = true)]
        query: Vec<String>,
    },
    /// Rebuild the index from the corpus directory.
    Rebuild,
    /// Show index status.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = Config::load(&cli.config).context("failed to load configuration")?;

    let provider = Arc::new(
        OllamaProvider::new(
            &config.llm.base_url,
            config.llm.model.clone(),
            config.llm.embedding_model.clone(),
        )
        .with_timeout(Duration::from_secs(config.llm.timeout_secs)),
    );
    provider
        .health_check()
        .await
        .context("Ollama is not reachable")?;

    let embedder = Arc::new(
        ProviderEmbedder::probe(Arc::clone(&provider))
            .await
            .context("embedding model probe failed")?,
    );
    let audit = Box::new(JsonlAuditSink::new(&config.audit.path));
    let engine = Engine::new(&config, provider, embedder, audit)?;

    match cli.command {
        Command::Rebuild => {
            let report = engine.rebuild_index().await?;
            println!(
                "indexed {} document(s) into {} chunk(s) in {:.1}s",
                report.document_count,
                report.chunk_count,
                report.duration.as_secs_f64()
            );
        }
        Command::Ask { query } => {
            let query = query.join(" ");
            load_or_hint(&engine)?;
            let answer = engine.ask(&query).await?;

            if let Some(clarification) = &answer.clarification {
                println!("{}", answer.text);
                println!("\n{clarification}");
            } else {
                println!("{}", answer.text);
                if answer.verdict != lectern_core::SupportVerdict::Supported {
                    println!("\nwarning: answer is {}", answer.verdict.as_str());
                }
            }
            if !answer.citations.is_empty() {
                println!("\nSources:");
                for (n, citation) in answer.citations.iter().enumerate() {
                    println!(
                        "  [{}] {} (score {:.3}): {}",
                        n + 1,
                        citation.source,
                        citation.fused_score,
                        citation.snippet
                    );
                }
            }
        }
        Command::Status => {
            load_or_hint(&engine)?;
            println!("{} chunk(s) indexed", engine.store().len()?);
        }
    }

    Ok(())
}

fn load_or_hint<P, E>(engine: &Engine<P, E>) -> anyhow::Result<()>
where
    P: lectern_llm::CompletionProvider,
    E: lectern_index::TextEmbedder,
{
    match engine.load_index() {
        Ok(()) => Ok(()),
        Err(EngineError::Store(StoreError::NotBuilt(_))) => {
            anyhow::bail!("index not built yet — run `lectern rebuild` first")
        }
        Err(EngineError::Store(StoreError::CorruptIndex(reason))) => {
            anyhow::bail!("index is corrupt ({reason}) — run `lectern rebuild` to recover")
        }
        Err(e) => Err(e.into()),
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
