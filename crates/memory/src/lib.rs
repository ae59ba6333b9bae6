//! Session store implementations and fixture loading for chatmem.

pub mod file_backend;
pub mod fixtures;
pub mod in_memory;

pub use file_backend::FileSessionStore;
pub use fixtures::{load_turn_fixture, parse_turn_fixture};
pub use in_memory::InMemorySessionStore;
