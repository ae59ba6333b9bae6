//! The chat pipeline of chatmem.
//!
//! Every user turn goes through the same steps:
//!
//! 1. **Consolidate** the transcript into session memory once it crosses the
//!    token threshold
//! 2. **Resolve** the query against recent history and that memory
//! 3. **Clarify** when the verdict is not confident enough, otherwise
//! 4. **Answer** from an augmented prompt built around the rewritten query
//!
//! Model output is never trusted: structured answers pass through
//! [`extract`], which degrades to low-confidence defaults instead of failing.

pub mod extract;
pub mod pipeline;
pub mod stages;
pub mod token;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use extract::{StructuredOutput, extract};
pub use pipeline::{PipelineLogEntry, PipelineSettings, TurnOutcome, TurnPipeline, apply_clarification_override};
pub use stages::{MemoryConsolidator, QueryResolver};
pub use token::{estimate_tokens, estimate_turns_tokens};
