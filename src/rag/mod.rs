//! Retrieval-and-ingestion orchestration over the estimate corpus.

pub mod answer;
pub mod filter;
pub mod import;
pub mod qdrant;
pub mod search;
pub mod store;

#[cfg(test)]
pub mod testing;

pub use answer::AnswerGenerator;
pub use filter::{FilterExtractor, RangeCondition, SearchFilter};
pub use import::ImportPipeline;
pub use qdrant::QdrantStore;
pub use search::{SearchOrchestrator, SearchOutcome};
pub use store::{SearchHit, VectorStore};
