mod config;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use notegraph_embed::EmbedProvider;
use notegraph_embed::ollama::OllamaEmbedder;
use notegraph_index::pipeline::{PipelineConfig, run_pipeline};
use notegraph_index::watcher::{NoteWatcher, WatcherConfig};
use notegraph_index::{NoteIndex, NoteStore, build_graph, find_similar, keyword_fallback, nearest};

use crate::config::Config;

#[derive(Parser)]
#[command(name = "notegraph", version, about = "Semantic index over a Markdown note tree")]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, default_value = "notegraph.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan the vault and index new, modified, and deleted notes.
    Index,
    /// Index once, then keep the store current as files change.
    Watch,
    /// Rank notes by semantic similarity to a free-text query.
    Search {
        query: String,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        threshold: Option<f32>,
    },
    /// Notes most similar to an already-indexed note.
    Similar {
        path: String,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        threshold: Option<f32>,
    },
    /// Multi-level connection graph rooted at a note.
    Graph {
        path: String,
        #[arg(long)]
        depth: Option<usize>,
        #[arg(long)]
        max_per_level: Option<usize>,
        #[arg(long)]
        threshold: Option<f32>,
    },
    /// Index counts and model identity.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    let store = NoteStore::new(&config.vault.db_path).await?;
    let embedder = OllamaEmbedder::new(&config.embedding.base_url, config.embedding.model.clone());
    let root = PathBuf::from(&config.vault.root);

    match cli.command {
        Command::Index => {
            let stats = index_vault(&root, &store, &embedder, &config).await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Watch => {
            index_vault(&root, &store, &embedder, &config).await?;

            let watcher = NoteWatcher::start(
                &root,
                store.clone(),
                embedder,
                &WatcherConfig {
                    debounce_ms: config.watcher.debounce_ms,
                },
                Some(Box::new(|update| tracing::info!(?update, "note updated"))),
            )?;
            tracing::info!(root = %root.display(), "watching for changes, ctrl-c to stop");

            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for ctrl-c")?;
            watcher.stop();
        }
        Command::Search {
            query,
            limit,
            threshold,
        } => {
            let index = NoteIndex::load(&store).await?;
            let limit = limit.unwrap_or(config.search.limit);
            let threshold = threshold.unwrap_or(config.search.threshold);

            let matches = match embedder.embed(&query).await {
                Ok(vector) => nearest(&index, &vector, None, limit, threshold),
                Err(e) => {
                    tracing::warn!("embedding unavailable, keyword fallback: {e}");
                    keyword_fallback(&index, &query, limit)
                }
            };
            println!("{}", serde_json::to_string_pretty(&matches)?);
        }
        Command::Similar {
            path,
            limit,
            threshold,
        } => {
            let index = NoteIndex::load(&store).await?;
            let matches = find_similar(
                &index,
                &path,
                limit.unwrap_or(config.search.limit),
                threshold.unwrap_or(config.search.threshold),
            )?;
            println!("{}", serde_json::to_string_pretty(&matches)?);
        }
        Command::Graph {
            path,
            depth,
            max_per_level,
            threshold,
        } => {
            let index = NoteIndex::load(&store).await?;
            let graph = build_graph(
                &index,
                &path,
                depth.unwrap_or(config.search.graph_depth),
                max_per_level.unwrap_or(config.search.graph_max_per_level),
                threshold.unwrap_or(config.search.threshold),
            )
            .with_context(|| format!("no indexed vector for {path}"))?;
            println!("{}", serde_json::to_string_pretty(&graph)?);
        }
        Command::Stats => {
            let notes = store.count_notes().await?;
            let index = NoteIndex::load(&store).await?;
            let stats = serde_json::json!({
                "notes": notes,
                "blocks": index.blocks().count(),
                "model": config.embedding.model,
                "db_path": config.vault.db_path,
            });
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}

async fn index_vault(
    root: &Path,
    store: &NoteStore,
    embedder: &OllamaEmbedder,
    config: &Config,
) -> anyhow::Result<notegraph_index::PipelineStats> {
    let pipeline_config = PipelineConfig {
        batch_size: config.embedding.batch_size,
    };
    let stats = run_pipeline(
        root,
        store,
        embedder,
        &pipeline_config,
        Some(&|path: &str| tracing::debug!(path = %path, "processed")),
    )
    .await?;
    tracing::info!(
        processed = stats.processed,
        failed = stats.failed,
        deleted = stats.deleted,
        skipped = stats.skipped,
        duration_ms = stats.duration_ms,
        "index pass complete"
    );
    Ok(stats)
}
