use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::time::Instant;

use model_store::{ArtifactPaths, AudioId, LoadedArtifacts};
use server::{ModelRegistry, RegistrySlot, SimilarityResolver};
use similarity::AlsModel;

/// EchoRecs - Audio Similarity Engine
#[derive(Parser)]
#[command(name = "echo-recs")]
#[command(about = "Audio similarity recommendations from precomputed ALS and KNN models", long_about = None)]
struct Cli {
    /// Root directory holding models/, map_data/ and matrix_data/
    #[arg(short, long, default_value = ".")]
    artifact_root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Get similar audios for a catalog id
    Recommend {
        /// Catalog id to find neighbors for
        #[arg(long)]
        audio_id: AudioId,

        /// Number of recommendations to return
        #[arg(long, default_value = "10")]
        top_n: usize,
    },

    /// Show model-internal details for a catalog id
    Inspect {
        /// Catalog id to display
        #[arg(long)]
        audio_id: AudioId,
    },

    /// Load the newest artifact set and report what it contains
    Validate,

    /// Run benchmark to test resolution performance
    Benchmark {
        /// Number of requests to make
        #[arg(long, default_value = "100")]
        requests: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    // Load the newest artifact set (this may take a moment)
    println!("Loading artifacts from {}...", cli.artifact_root.display());
    let start = Instant::now();
    let paths = ArtifactPaths::rooted_at(&cli.artifact_root);
    let artifacts = LoadedArtifacts::load(&paths).context("Failed to load model artifacts")?;
    println!("{} Loaded artifacts in {:?}", "✓".green(), start.elapsed());

    // Dispatch to appropriate command handler
    match cli.command {
        Commands::Recommend { audio_id, top_n } => handle_recommend(artifacts, audio_id, top_n)?,
        Commands::Inspect { audio_id } => handle_inspect(artifacts, audio_id)?,
        Commands::Validate => handle_validate(artifacts)?,
        Commands::Benchmark { requests } => handle_benchmark(artifacts, requests).await?,
    }

    Ok(())
}

/// Build a ready resolver over the loaded artifact set
fn build_resolver(artifacts: LoadedArtifacts) -> Result<SimilarityResolver> {
    let slot = RegistrySlot::new();
    let registry =
        ModelRegistry::from_artifacts(artifacts).context("Failed to build model registry")?;
    slot.install(registry);
    Ok(SimilarityResolver::new(slot))
}

/// Handle the 'recommend' command
fn handle_recommend(artifacts: LoadedArtifacts, audio_id: AudioId, top_n: usize) -> Result<()> {
    if !artifacts.item_map.contains(audio_id) {
        return Err(anyhow!("Audio {} not found in training data", audio_id));
    }

    let resolver = build_resolver(artifacts)?;

    let start = Instant::now();
    let recs = resolver.resolve(audio_id, top_n);
    let elapsed = start.elapsed();

    if recs.is_empty() {
        println!("{}", "No recommendations found".yellow());
        return Ok(());
    }

    println!(
        "{}",
        format!("Similar audios for {} (resolved in {:?}):", audio_id, elapsed)
            .bold()
            .blue()
    );
    for (rank, id) in recs.iter().enumerate() {
        println!("{}. {}", (rank + 1).to_string().green(), id);
    }
    Ok(())
}

/// Handle the 'inspect' command
fn handle_inspect(artifacts: LoadedArtifacts, audio_id: AudioId) -> Result<()> {
    let index = artifacts
        .item_map
        .index_of(audio_id)
        .ok_or_else(|| anyhow!("Audio {} not found in training data", audio_id))?;

    let row_nnz = artifacts.matrix.row(index).map(|r| r.nnz()).unwrap_or(0);
    let mapped_back = artifacts.inv_item_map.id_of(index);
    let als = AlsModel::from_artifact(artifacts.factors)?;

    print!("{}", format!("Audio ID: {}\n", audio_id).bold().blue());
    print!("{}Internal index: {}\n", "• ".green(), index);
    print!("{}Inverse map entry: {:?}\n", "• ".green(), mapped_back);
    print!(
        "{}Factor vector: {} dims, norm {:.4}\n",
        "• ".cyan(),
        als.factors(),
        als.factor_norm(index).unwrap_or(0.0)
    );
    print!("{}Interaction row entries: {}\n", "• ".cyan(), row_nnz);
    Ok(())
}

/// Handle the 'validate' command
///
/// Loading already cross-validated the artifact set, so this just reports
/// what a ready registry would serve.
fn handle_validate(artifacts: LoadedArtifacts) -> Result<()> {
    println!("{}", "Artifact set is consistent".bold().green());
    println!("  Items:            {}", artifacts.item_map.len());
    println!("  Latent factors:   {}", artifacts.factors.factors);
    println!("  Fallback metric:  {:?}", artifacts.knn.metric);
    println!(
        "  Matrix:           {} x {}, {} stored entries",
        artifacts.matrix.n_rows(),
        artifacts.matrix.n_cols(),
        artifacts.matrix.nnz()
    );
    Ok(())
}

/// Handle the 'benchmark' command
async fn handle_benchmark(artifacts: LoadedArtifacts, requests: usize) -> Result<()> {
    // Sample from known catalog ids so every request exercises a real
    // resolution rather than the unknown-id early return.
    let known_ids: Vec<AudioId> = artifacts.item_map.iter().map(|(id, _)| id).collect();
    if known_ids.is_empty() {
        return Err(anyhow!("Artifact set contains no items to benchmark"));
    }

    let resolver = build_resolver(artifacts)?;

    let sampled: Vec<AudioId> = (0..requests)
        .map(|_| known_ids[rand::random::<u32>() as usize % known_ids.len()])
        .collect();

    // Make concurrent requests with tokio::spawn
    let mut handles = vec![];
    for audio_id in sampled {
        let resolver = resolver.clone();
        let handle = tokio::spawn(async move {
            let start = Instant::now();
            let recs = resolver.resolve(audio_id, 10);
            (start.elapsed(), recs.len())
        });
        handles.push(handle);
    }

    // Wait for all tasks to complete and collect timings
    let mut timings = vec![];
    let mut total_recs = 0usize;
    for handle in handles {
        let (elapsed, count) = handle.await?;
        timings.push(elapsed);
        total_recs += count;
    }

    let total_time: std::time::Duration = timings.iter().sum();
    let avg_latency = total_time / (timings.len() as u32);
    timings.sort();
    let p50 = timings[timings.len() / 2];
    let p95 = timings[(timings.len() as f32 * 0.95) as usize];
    let p99 = timings[(timings.len() as f32 * 0.99) as usize];
    let throughput = requests as f32 / total_time.as_secs_f32();

    println!("Benchmark results:");
    println!("Total time: {:?}", total_time);
    println!("Average latency: {:?}", avg_latency);
    println!("P50 latency: {:?}", p50);
    println!("P95 latency: {:?}", p95);
    println!("P99 latency: {:?}", p99);
    println!("Throughput: {:.2} requests/second", throughput);
    println!("Recommendations returned: {}", total_recs);

    Ok(())
}
