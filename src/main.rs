use std::sync::Arc;
use std::time::Duration;

use agent::{Agent, Toolbox, standard_registry, system_prompt};
use anyhow::Context;
use chart::ChartRenderer;
use config::{Credentials, GleanConfig};
use db::{Database, SqliteDatabase, proper_nouns};
use nouns::{FlatIndex, ProperNounResolver, build_embedder};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "GLEAN_LOG";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the transcript.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    if let Err(e) = dotenvy::dotenv()
        && !e.not_found()
    {
        tracing::warn!(error = %e, "could not load .env");
    }

    let config = GleanConfig::get_or_default();
    let credentials =
        Credentials::resolve(&config, |name| std::env::var(name).ok(), ui::ask_secret)?;

    let database: Arc<dyn Database> = Arc::new(
        SqliteDatabase::connect(&config.database.url)
            .await
            .with_context(|| format!("could not open {}", config.database.url))?,
    );

    let mut corpus = Vec::new();
    for query in &config.database.noun_queries {
        let nouns = proper_nouns(database.as_ref(), query)
            .await
            .with_context(|| format!("could not collect proper nouns with `{query}`"))?;
        corpus.extend(nouns);
    }

    let embedder = build_embedder(&config.embedding, &credentials)?;
    let resolver = ProperNounResolver::build(Box::new(FlatIndex::new(embedder)), corpus)
        .await
        .context("could not build the proper noun index")?;

    std::fs::create_dir_all(&config.chart.output_dir).with_context(|| {
        format!(
            "could not create chart directory {}",
            config.chart.output_dir.display()
        )
    })?;
    let charts = Arc::new(ChartRenderer::new(&config.chart.output_dir));

    let model = ai::connect(&config.ai, &credentials)
        .await
        .context("could not set up the language model")?;

    let tables = database.list_tables().await?;
    let registry = standard_registry(Toolbox::new(
        Arc::clone(&database),
        Arc::new(resolver),
        charts,
        Arc::clone(&model),
        &config.agent,
    ))?;

    let agent = Agent::new(model, registry, system_prompt(&config.agent.dialect, &tables))
        .with_max_turns(config.agent.max_turns)
        .with_turn_timeout(Duration::from_secs(config.ai.timeout_secs));

    let question = ui::ask_question()?;
    let outcome = agent
        .run(&question, |step| {
            ui::print_step(&step);
            async {}
        })
        .await?;

    tracing::info!(turns = outcome.turns, "answered");
    Ok(())
}
