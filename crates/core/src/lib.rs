//! # chatmem Core
//!
//! Domain types, traits, and error definitions for chatmem.
//! This crate has **no runtime dependencies** beyond serde and the trait
//! machinery — it defines the domain model that all other crates implement
//! against.
//!
//! ## Design Philosophy
//!
//! The two external collaborators of the pipeline (the completion service
//! and the session store) are defined as traits here. Implementations live
//! in their respective crates, which keeps the pipeline testable with
//! scripted providers and in-memory stores.

pub mod error;
pub mod message;
pub mod provider;
pub mod memory;
pub mod analysis;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ExtractError, ProviderError, Result, StorageError};
pub use message::{Role, SessionId, Turn};
pub use provider::{CompletionMode, Provider, ProviderRequest, ProviderResponse, SamplingProfile, Usage};
pub use memory::{MessageRange, SessionMemory, SessionStore, SessionSummary, SummaryMetadata, UserProfile};
pub use analysis::{QueryAnalysis, CLARIFICATION_THRESHOLD};
