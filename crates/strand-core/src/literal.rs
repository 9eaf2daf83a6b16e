//! # Literal Buffers
//!
//! Per-chain ordered buffers of captured field literals.
//!
//! Accessor interception (owned by the entity registry) appends tokens here;
//! the next appended step drains them through the argument fill. Both buffers
//! are cleared after every fill, so capture state never leaks across steps.

use crate::primitives::LITERAL_CAPACITY;
use crate::status::Status;

/// Pending literal and ternary-literal tokens of one chain.
#[derive(Debug, Clone)]
pub struct LiteralBuffer {
    literals: Vec<String>,
    ternary: Vec<String>,
    capacity: usize,
}

impl Default for LiteralBuffer {
    fn default() -> Self {
        Self::with_capacity(LITERAL_CAPACITY)
    }
}

impl LiteralBuffer {
    /// Create an empty buffer with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty buffer holding at most `capacity` tokens per list.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            literals: Vec::new(),
            ternary: Vec::new(),
            capacity,
        }
    }

    /// Append a field literal. Returns `false` if the buffer is full.
    pub fn push_literal(&mut self, token: impl Into<String>) -> bool {
        push_bounded(&mut self.literals, token.into(), self.capacity, "literal")
    }

    /// Append a ternary literal. Returns `false` if the buffer is full.
    pub fn push_ternary(&mut self, token: impl Into<String>) -> bool {
        push_bounded(&mut self.ternary, token.into(), self.capacity, "ternary")
    }

    /// Pending field literals in capture order.
    #[must_use]
    pub fn literals(&self) -> &[String] {
        &self.literals
    }

    /// Pending ternary literals in capture order.
    #[must_use]
    pub fn ternary(&self) -> &[String] {
        &self.ternary
    }

    /// Drop pending field literals only.
    pub fn clear_literals(&mut self) {
        self.literals.clear();
    }

    /// Drop both buffers.
    pub fn clear(&mut self) {
        self.literals.clear();
        self.ternary.clear();
    }

    /// Check if both buffers are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.literals.is_empty() && self.ternary.is_empty()
    }

    /// Move the last field literal into the ternary buffer and drop the one
    /// before it, which the ternary condition produced as a duplicate.
    ///
    /// Returns `false` if there was nothing to move.
    pub fn promote_ternary(&mut self) -> bool {
        let Some(last) = self.literals.pop() else {
            return false;
        };
        self.literals.pop();
        self.push_ternary(last)
    }
}

fn push_bounded(list: &mut Vec<String>, token: String, capacity: usize, which: &str) -> bool {
    if list.len() >= capacity {
        tracing::warn!(
            buffer = which,
            capacity,
            token = %token,
            "literal buffer full, capture dropped"
        );
        return false;
    }
    list.push(token);
    true
}

// =============================================================================
// CAPTURE
// =============================================================================

/// Sink handed to a capture callback.
///
/// The recorder knows which capture mode is active, so tokens recorded during
/// a ternary bracket are attributed to the ternary buffer.
pub struct Recorder<'a> {
    buffer: &'a mut LiteralBuffer,
    mode: Status,
}

impl<'a> Recorder<'a> {
    pub(crate) fn new(buffer: &'a mut LiteralBuffer, mode: Status) -> Self {
        Self { buffer, mode }
    }

    /// Record an accessor token such as `app.domain.User.getName`.
    pub fn record(&mut self, token: impl Into<String>) {
        self.buffer.push_literal(token);
    }

    /// Record a token directly into the ternary buffer.
    pub fn record_ternary(&mut self, token: impl Into<String>) {
        self.buffer.push_ternary(token);
    }

    /// The capture mode bracketing this call.
    #[must_use]
    pub fn mode(&self) -> Status {
        self.mode
    }
}

/// A capture callback, typically an accessor of a domain entity.
pub trait Capture {
    /// Record the tokens produced by this capture.
    fn capture(&self, recorder: &mut Recorder<'_>);
}

impl<F> Capture for F
where
    F: Fn(&mut Recorder<'_>),
{
    fn capture(&self, recorder: &mut Recorder<'_>) {
        self(recorder);
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_clear() {
        let mut buffer = LiteralBuffer::new();
        assert!(buffer.push_literal("a.User.getName"));
        assert!(buffer.push_ternary("a.User.getAge"));
        assert_eq!(buffer.literals(), ["a.User.getName"]);
        assert_eq!(buffer.ternary(), ["a.User.getAge"]);

        buffer.clear_literals();
        assert!(buffer.literals().is_empty());
        assert!(!buffer.is_empty());

        buffer.clear();
        assert!(buffer.is_empty());
    }

    #[test]
    fn capacity_is_enforced() {
        let mut buffer = LiteralBuffer::with_capacity(2);
        assert!(buffer.push_literal("a"));
        assert!(buffer.push_literal("b"));
        assert!(!buffer.push_literal("c"));
        assert_eq!(buffer.literals(), ["a", "b"]);
    }

    #[test]
    fn promote_ternary_drops_duplicate() {
        let mut buffer = LiteralBuffer::new();
        buffer.push_literal("a.User.getId");
        buffer.push_literal("a.User.getActive");
        buffer.push_literal("a.User.getName");

        assert!(buffer.promote_ternary());
        assert_eq!(buffer.literals(), ["a.User.getId"]);
        assert_eq!(buffer.ternary(), ["a.User.getName"]);

        let mut empty = LiteralBuffer::new();
        assert!(!empty.promote_ternary());
    }

    #[test]
    fn closures_are_captures() {
        let mut buffer = LiteralBuffer::new();
        let name = |r: &mut Recorder<'_>| r.record("a.User.getName");
        {
            let mut recorder = Recorder::new(&mut buffer, Status::Lambda);
            assert_eq!(recorder.mode(), Status::Lambda);
            name.capture(&mut recorder);
        }
        assert_eq!(buffer.literals(), ["a.User.getName"]);
    }
}
