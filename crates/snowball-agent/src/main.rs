//! Snowball — citation-graph snowballing for systematic literature reviews.

mod command;
mod config;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use snowball_common::{ReviewProject, SnowballError};
use snowball_db::PaperStore;
use snowball_engine::{ExtractedSeed, ReviewDecision, SnowballEngine, SourceAggregator};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::command::{Cli, Command};
use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("snowball=debug,info")),
        )
        .init();

    let cli = Cli::parse();

    info!("Snowball {}", env!("CARGO_PKG_VERSION"));
    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    };
    info!(direction = %config.direction(), "Configuration loaded");

    let store = Arc::new(PaperStore::open(&config.project.dir)?);
    info!(dir = %store.dir().display(), "Paper store opened");
    let mut project = load_or_create_project(&store, &config)?;

    // Concrete providers register here; without one, expansion finds nothing.
    let sources = SourceAggregator::new();
    if sources.is_empty() {
        warn!("No literature sources registered; expansion will find no papers");
    } else {
        info!(n = sources.len(), "Literature sources registered");
    }
    let engine = SnowballEngine::new(store.clone(), Arc::new(sources))
        .with_config(config.engine_config());

    let command = cli.command.unwrap_or(Command::Status);
    let result = execute(&engine, &mut project, &config, command).await;

    // Drain the write-behind queue even when the command failed.
    store.shutdown().await?;
    result
}

fn load_or_create_project(store: &PaperStore, config: &Config) -> Result<ReviewProject, SnowballError> {
    if let Some(project) = store.load_project()? {
        info!(project = %project.name, iteration = project.current_iteration, "Project loaded");
        return Ok(project);
    }

    let mut project = ReviewProject::new(config.project.name.clone());
    project.description = config.project.description.clone();
    project.filter_criteria = config.filters.clone();
    store.save_project(&mut project)?;
    info!(project = %project.name, "Created new project");
    Ok(project)
}

async fn execute(
    engine: &SnowballEngine,
    project: &mut ReviewProject,
    config: &Config,
    command: Command,
) -> anyhow::Result<()> {
    match command {
        Command::Status => {
            let stats = engine.store().get_statistics().await?;
            info!(
                total = stats.total,
                by_status = ?stats.by_status,
                by_iteration = ?stats.by_iteration,
                "Store statistics"
            );
            let gate = engine.can_start_iteration(project).await?;
            match gate.reason {
                None => info!(next = project.current_iteration + 1, "Ready to start the next iteration"),
                Some(reason) => info!("Cannot start next iteration: {reason}"),
            }
            if !engine.should_continue_snowballing(project).await? {
                info!("Snowballing has converged: the last generation included no papers");
            }
        }

        Command::Run { direction } => {
            let gate = engine.can_start_iteration(project).await?;
            if !gate.can_start {
                warn!("Cannot start next iteration: {}", gate.reason.unwrap_or_default());
                return Ok(());
            }
            let direction = direction.unwrap_or(config.direction());
            let limits = engine.config();
            info!(
                %direction,
                reference_limit = limits.reference_limit,
                citation_limit = limits.citation_limit,
                "Starting iteration {}",
                project.current_iteration + 1
            );
            let outcome = engine.run_snowball_iteration(project, direction).await?;
            info!(
                iteration = outcome.iteration,
                added = outcome.added,
                backward = outcome.backward,
                forward = outcome.forward,
                auto_excluded = outcome.auto_excluded,
                for_review = outcome.for_review,
                merged = outcome.merged.len(),
                "Iteration complete"
            );
            for error in &outcome.errors {
                warn!("{error}");
            }
        }

        Command::Pending { iteration } => {
            let papers = engine.get_papers_for_review(iteration).await?;
            info!(n = papers.len(), "Papers awaiting review");
            for paper in papers {
                println!("{}\t{}\t{}", paper.id, paper.snowball_iteration, paper.title);
            }
        }

        Command::Review { paper_id, status, notes } => {
            let mut decision = ReviewDecision::new(status);
            if !notes.is_empty() {
                decision = decision.with_notes(notes.join(" "));
            }
            if engine.update_paper_review(&paper_id, decision, Some(project)).await?.is_none() {
                anyhow::bail!("No paper with id {paper_id}");
            }
        }

        Command::Seed { doi } => match engine.add_seed_from_doi(&doi, project).await? {
            Some(paper) => info!(paper_id = %paper.id, title = %paper.title, "Seed registered"),
            None => warn!(%doi, "No paper found for DOI"),
        },

        Command::SeedFromExtraction { path } => {
            let bytes = std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
            let extracted: ExtractedSeed = serde_json::from_slice(&bytes)
                .with_context(|| format!("parsing extractor output {}", path.display()))?;
            let references = extracted.references.len();
            match engine.add_seed_from_extraction(extracted, project).await? {
                Some(paper) => info!(paper_id = %paper.id, title = %paper.title, references, "Seed registered"),
                None => warn!(path = %path.display(), "Extractor output has no usable title"),
            }
        }

        Command::Refresh => {
            let refresh = engine.update_citation_counts(None).await?;
            info!(
                total = refresh.total,
                updated = refresh.updated,
                failed = refresh.failed,
                skipped = refresh.skipped,
                "Citation counts refreshed"
            );
        }
    }
    Ok(())
}
