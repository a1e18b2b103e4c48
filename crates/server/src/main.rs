//! EchoRecs serving binary.
//!
//! Binds the gRPC endpoint immediately and loads the model artifacts in a
//! blocking task. Requests that arrive while the load is still running
//! observe "not ready"; if the load fails the service stays not ready
//! rather than serving partial state.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tonic::transport::Server;
use tracing::{error, info};

use model_store::{ArtifactPaths, LoadedArtifacts};
use server::recommender::recommender_server::RecommenderServer;
use server::{ModelRegistry, RecommenderService, RegistrySlot, SimilarityResolver};

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn artifact_paths_from_env() -> ArtifactPaths {
    let defaults = ArtifactPaths::default();
    ArtifactPaths {
        models_dir: PathBuf::from(env_or(
            "ECHORECS_MODEL_DIR",
            defaults.models_dir.to_str().unwrap_or("./models"),
        )),
        map_dir: PathBuf::from(env_or(
            "ECHORECS_MAP_DIR",
            defaults.map_dir.to_str().unwrap_or("./map_data"),
        )),
        matrix_dir: PathBuf::from(env_or(
            "ECHORECS_MATRIX_DIR",
            defaults.matrix_dir.to_str().unwrap_or("./matrix_data"),
        )),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let addr: SocketAddr = env_or("ECHORECS_ADDR", "127.0.0.1:50051")
        .parse()
        .context("Invalid ECHORECS_ADDR")?;
    let paths = artifact_paths_from_env();

    let slot = RegistrySlot::new();
    let resolver = SimilarityResolver::new(slot.clone());

    // Load artifacts off the accept path. The slot stays empty until the
    // whole set has loaded and validated.
    {
        let slot = slot.clone();
        tokio::task::spawn_blocking(move || {
            info!(
                models = %paths.models_dir.display(),
                maps = %paths.map_dir.display(),
                matrix = %paths.matrix_dir.display(),
                "Loading model artifacts"
            );
            let registry = LoadedArtifacts::load(&paths)
                .map_err(anyhow::Error::from)
                .and_then(|artifacts| {
                    ModelRegistry::from_artifacts(artifacts).map_err(anyhow::Error::from)
                });
            match registry {
                Ok(registry) => {
                    if slot.install(registry) {
                        info!("Models loaded, serving ready");
                    }
                }
                Err(e) => {
                    error!(error = %e, "Failed to load models; service stays not ready");
                }
            }
        });
    }

    let service = RecommenderService::new(resolver, slot);

    info!(%addr, "Starting recommender server");
    Server::builder()
        .add_service(RecommenderServer::new(service))
        .serve(addr)
        .await
        .context("gRPC server terminated")?;

    Ok(())
}
