//! gRPC surface for the recommendation resolver.
//!
//! The transport owns the two policies the resolver deliberately does not:
//! what an empty result means on the wire (NOT_FOUND, matching the
//! original HTTP surface's 404) and what the default request size is.

use tonic::{Request, Response, Status};
use tracing::{info, warn};

use crate::recommender::recommender_server::Recommender;
use crate::recommender::{
    HealthRequest, HealthResponse, SimilarAudiosRequest, SimilarAudiosResponse,
};
use crate::registry::RegistrySlot;
use crate::resolver::SimilarityResolver;

/// Default recommendation count when the request leaves `top_n` unset
pub const DEFAULT_TOP_N: usize = 10;

/// Recommender service implementation
pub struct RecommenderService {
    resolver: SimilarityResolver,
    registry: RegistrySlot,
}

impl RecommenderService {
    pub fn new(resolver: SimilarityResolver, registry: RegistrySlot) -> Self {
        Self { resolver, registry }
    }
}

#[tonic::async_trait]
impl Recommender for RecommenderService {
    async fn similar_audios(
        &self,
        request: Request<SimilarAudiosRequest>,
    ) -> Result<Response<SimilarAudiosResponse>, Status> {
        let req = request.into_inner();
        let top_n = if req.top_n == 0 {
            DEFAULT_TOP_N
        } else {
            req.top_n as usize
        };

        info!(audio_id = req.audio_id, top_n, "Fetching recommendations");

        // The resolve scan is CPU-bound; keep it off the async executor.
        let resolver = self.resolver.clone();
        let audio_id = req.audio_id;
        let audio_ids = tokio::task::spawn_blocking(move || resolver.resolve(audio_id, top_n))
            .await
            .map_err(|e| Status::internal(format!("recommendation task failed: {e}")))?;

        if audio_ids.is_empty() {
            warn!(audio_id, "No recommendations found");
            return Err(Status::not_found("No recommendations found"));
        }

        Ok(Response::new(SimilarAudiosResponse { audio_ids }))
    }

    async fn health(
        &self,
        _request: Request<HealthRequest>,
    ) -> Result<Response<HealthResponse>, Status> {
        let status = if self.registry.is_ready() {
            "ok"
        } else {
            "loading"
        };
        Ok(Response::new(HealthResponse {
            status: status.to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::net::TcpListener;
    use tokio_stream::wrappers::TcpListenerStream;
    use tonic::transport::Server;

    use model_store::{CsrMatrix, FactorsArtifact, KnnParams, LoadedArtifacts};

    use crate::recommender::recommender_client::RecommenderClient;
    use crate::recommender::recommender_server::RecommenderServer;
    use crate::registry::ModelRegistry;

    // ============================================================================
    // Test Fixtures
    // ============================================================================

    /// Three-item artifact set: 101 and 102 close in factor space
    fn test_artifacts() -> LoadedArtifacts {
        LoadedArtifacts {
            factors: FactorsArtifact {
                factors: 2,
                items: 3,
                values: vec![1.0, 0.0, 0.9, 0.1, 0.0, 1.0],
            },
            knn: KnnParams::default(),
            item_map: [(101, 0), (102, 1), (103, 2)].into_iter().collect(),
            inv_item_map: [(0, 101), (1, 102), (2, 103)].into_iter().collect(),
            matrix: CsrMatrix::from_parts(
                3,
                2,
                vec![0, 2, 3, 4],
                vec![0, 1, 0, 1],
                vec![1.0, 1.0, 1.0, 2.0],
            )
            .unwrap(),
        }
    }

    /// Start the service on a random port, optionally with models loaded
    async fn start_service(
        slot: RegistrySlot,
    ) -> (
        RecommenderClient<tonic::transport::Channel>,
        tokio::task::JoinHandle<()>,
    ) {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test service");
        let addr = listener.local_addr().expect("Failed to get local address");

        let service = RecommenderService::new(SimilarityResolver::new(slot.clone()), slot);

        let handle = tokio::spawn(async move {
            Server::builder()
                .add_service(RecommenderServer::new(service))
                .serve_with_incoming(TcpListenerStream::new(listener))
                .await
                .expect("Test service failed");
        });

        let client = RecommenderClient::connect(format!("http://{addr}"))
            .await
            .expect("Failed to connect test client");
        (client, handle)
    }

    fn loaded_slot() -> RegistrySlot {
        let slot = RegistrySlot::new();
        slot.install(ModelRegistry::from_artifacts(test_artifacts()).unwrap());
        slot
    }

    // ============================================================================
    // SimilarAudios
    // ============================================================================

    #[tokio::test]
    async fn test_similar_audios_returns_ranked_ids() {
        let (mut client, handle) = start_service(loaded_slot()).await;

        let response = client
            .similar_audios(SimilarAudiosRequest {
                audio_id: 101,
                top_n: 2,
            })
            .await
            .expect("Request should succeed");

        assert_eq!(response.into_inner().audio_ids, vec![102, 103]);

        handle.abort();
    }

    #[tokio::test]
    async fn test_unknown_id_maps_to_not_found() {
        let (mut client, handle) = start_service(loaded_slot()).await;

        let status = client
            .similar_audios(SimilarAudiosRequest {
                audio_id: 999,
                top_n: 5,
            })
            .await
            .expect_err("Unknown id should be NOT_FOUND");

        assert_eq!(status.code(), tonic::Code::NotFound);

        handle.abort();
    }

    #[tokio::test]
    async fn test_unset_top_n_defaults_to_ten() {
        let (mut client, handle) = start_service(loaded_slot()).await;

        let response = client
            .similar_audios(SimilarAudiosRequest {
                audio_id: 101,
                top_n: 0,
            })
            .await
            .expect("Request should succeed");

        // Only two other items exist, so the default of 10 shows up as
        // "everything except the item itself".
        let ids = response.into_inner().audio_ids;
        assert_eq!(ids.len(), 2);
        assert!(!ids.contains(&101));

        handle.abort();
    }

    #[tokio::test]
    async fn test_request_before_load_is_not_found() {
        // Empty slot: the startup load has not completed
        let (mut client, handle) = start_service(RegistrySlot::new()).await;

        let status = client
            .similar_audios(SimilarAudiosRequest {
                audio_id: 101,
                top_n: 5,
            })
            .await
            .expect_err("Not-ready service should be NOT_FOUND, not INTERNAL");

        assert_eq!(status.code(), tonic::Code::NotFound);

        handle.abort();
    }

    // ============================================================================
    // Health
    // ============================================================================

    #[tokio::test]
    async fn test_health_reports_loading_then_ok() {
        let slot = RegistrySlot::new();
        let (mut client, handle) = start_service(slot.clone()).await;

        let response = client.health(HealthRequest {}).await.unwrap();
        assert_eq!(response.into_inner().status, "loading");

        slot.install(ModelRegistry::from_artifacts(test_artifacts()).unwrap());

        let response = client.health(HealthRequest {}).await.unwrap();
        assert_eq!(response.into_inner().status, "ok");

        handle.abort();
    }
}
