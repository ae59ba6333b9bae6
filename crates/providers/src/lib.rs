//! Completion service implementations for chatmem.
//!
//! All providers implement the `chatmem_core::Provider` trait.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;
