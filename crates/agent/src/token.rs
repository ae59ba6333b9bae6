//! Token estimation utilities.
//!
//! Uses a character-based heuristic: ~4 bytes of UTF-8 per token, rounded
//! up. This is an approximation, not a tokenizer count. It is deterministic
//! and never decreases as text grows.

use chatmem_core::message::Turn;

/// Framing cost charged once per turn (role name, delimiters).
pub const MESSAGE_OVERHEAD: usize = 4;

/// Estimate the token count for a string.
///
/// Heuristic: 1 token ≈ 4 bytes. Rounds up.
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    text.len().div_ceil(4)
}

/// Estimate tokens for a single turn including per-message overhead.
pub fn estimate_turn_tokens(turn: &Turn) -> usize {
    MESSAGE_OVERHEAD + estimate_tokens(&turn.content)
}

/// Estimate tokens for a slice of turns.
pub fn estimate_turns_tokens(turns: &[Turn]) -> usize {
    turns.iter().map(estimate_turn_tokens).sum()
}
