//! The two pipeline stages that run before answer generation.

pub mod consolidation;
pub mod query;

pub use consolidation::MemoryConsolidator;
pub use query::QueryResolver;
