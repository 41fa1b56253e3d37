//! extent-pipeline - run a pipeline description
//!
//! Usage: `extent-pipeline <pipeline.toml|pipeline.json>`
//!
//! Builds the described pipeline, runs every request in order and prints one
//! summary line per request.

use anyhow::{bail, Context};
use extent_pipeline::{config::PipelineFile, pipeline::UpdateStats};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> anyhow::Result<()> {
    let Some(path) = std::env::args().nth(1) else {
        bail!("usage: extent-pipeline <pipeline.toml|pipeline.json>");
    };

    let file = PipelineFile::load(&path)?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&file.settings.log_filter)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Loaded pipeline {:?}: {} nodes", path, file.nodes.len());

    let (mut pipeline, ids) = file.build()?;

    let mut total = UpdateStats::default();
    for (n, request) in file.requests.iter().enumerate() {
        let id = *ids
            .get(&request.node)
            .with_context(|| format!("request {} names unknown node '{}'", n, request.node))?;

        let stats = pipeline
            .update(id, request.port, request.request)
            .with_context(|| format!("request {} on '{}'", n, request.node))?;

        let extent = pipeline
            .output_data(id, request.port)
            .map(|data| data.extent().to_string())
            .unwrap_or_default();
        println!(
            "{:>3} {:<16} {:?} -> {} | executed {} cached {} reused {}",
            n,
            request.node,
            request.request,
            extent,
            stats.nodes_executed,
            stats.cache_hits,
            stats.nodes_reused
        );

        total.nodes_executed += stats.nodes_executed;
        total.cache_hits += stats.cache_hits;
        total.nodes_reused += stats.nodes_reused;
    }

    println!(
        "{} requests: {} executions, {} cache hits, {} reused",
        file.requests.len(),
        total.nodes_executed,
        total.cache_hits,
        total.nodes_reused
    );
    Ok(())
}
