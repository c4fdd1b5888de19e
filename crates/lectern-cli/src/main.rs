//! Lectern — research-topic → cited-report pipeline.
//! Entry point for the command-line binary: runs one research session end to
//! end and prints the summary report and table.

use std::sync::Arc;

use lectern_common::Config;
use lectern_db::{Database, SessionRepository};
use lectern_ingestion::ArxivClient;
use lectern_llm::{GeminiBackend, Generator, LlmBackend, OpenAiCompatibleBackend};
use lectern_synthesis::{DailySessionQuota, PipelineOptions, ResearchPipeline, SessionGate};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn build_backend(config: &Config) -> anyhow::Result<Arc<dyn LlmBackend>> {
    match config.llm.provider.as_str() {
        "openai_compatible" => {
            let base_url = config
                .llm
                .base_url
                .clone()
                .unwrap_or_else(|| "http://localhost:11434".to_string());
            let backend =
                OpenAiCompatibleBackend::new(base_url, config.llm.model.clone(), config.api_key())?
                    .with_embedding_model(config.embedding.model.clone());
            Ok(Arc::new(backend))
        }
        "gemini" => {
            let key = config.api_key().ok_or_else(|| {
                anyhow::anyhow!("no API key found (set {} in the environment)", config.llm.api_key_env)
            })?;
            let backend = GeminiBackend::new(key, config.llm.model.clone())?
                .with_embedding_model(config.embedding.model.clone());
            Ok(Arc::new(backend))
        }
        other => anyhow::bail!("unknown llm.provider {other:?} (expected gemini or openai_compatible)"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lectern=info,warn")),
        )
        .init();

    let query = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if query.trim().is_empty() {
        eprintln!("usage: lectern <research topic>");
        std::process::exit(2);
    }

    let config = Config::load()?;
    let backend = build_backend(&config)?;
    let generator = Generator::new(
        backend,
        config.llm.model.clone(),
        config.llm.light_model.clone(),
    );

    let db = Arc::new(Database::new());
    let gate: Arc<dyn SessionGate> = Arc::new(DailySessionQuota::new(
        config.quota.max_sessions_per_day,
        SessionRepository::new(db.clone()),
    ));
    let source = Arc::new(ArxivClient::new(config.discovery.max_results)?);

    let pipeline = ResearchPipeline::new(db, source, generator, gate, PipelineOptions::from(&config));

    info!(query = %query, "Starting research session");
    let session = pipeline.create_session(&query, "local").await?;

    let summary = pipeline.summary(session.id).await?;
    println!("\n{summary}\n");

    let table = pipeline.table(session.id).await?;
    println!("{table}\n");

    let critique = pipeline.critique(session.id).await?;
    println!("Gaps and limitations:\n{critique}");

    Ok(())
}
