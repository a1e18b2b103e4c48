//! Server crate for the EchoRecs recommendation service.
//!
//! This crate contains the serving core: the model registry, the
//! recommendation resolver, and the gRPC surface in front of them.

pub mod registry;
pub mod resolver;
pub mod service;

// Include the generated protobuf code
pub mod recommender {
    tonic::include_proto!("recommender");
}

pub use registry::{ModelRegistry, RegistrySlot};
pub use resolver::SimilarityResolver;
pub use service::{RecommenderService, DEFAULT_TOP_N};
