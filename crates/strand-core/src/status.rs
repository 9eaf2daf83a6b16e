//! # Node Status
//!
//! The lifecycle state of a node.
//!
//! States carry their numeric tags so they stay comparable:
//! `ERROR(-4) < LOCKED(-3) < END(-2) < FILL(-1) < WAIT(0) < LAMBDA(1)
//! < METHOD(2) < LAMBDA_TE(3) < TE(4)`.
//!
//! Ordering is only used by the two gates that depend on it
//! ([`Status::accepts_steps`] and [`Status::can_advance`]); everything else
//! matches on the variant.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(i8)]
pub enum Status {
    /// The chain failed and cannot be used.
    Error = -4,
    /// The chain was locked by its owner.
    Locked = -3,
    /// The chain was closed.
    End = -2,
    /// The node is running its argument fill.
    Fill = -1,
    /// Ready for the next step.
    Wait = 0,
    /// A method-reference capture is in progress.
    Lambda = 1,
    /// A capture finished; buffered literals come from method references.
    Method = 2,
    /// A ternary capture is in progress.
    LambdaTe = 3,
    /// A ternary capture finished.
    Te = 4,
}

impl Status {
    /// Numeric tag of the state.
    #[must_use]
    pub const fn tag(self) -> i8 {
        self as i8
    }

    /// Closed, locked and failed nodes are terminal.
    #[must_use]
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Error | Self::Locked | Self::End)
    }

    /// A step may only be appended after a node at `WAIT` or above.
    #[must_use]
    pub fn accepts_steps(self) -> bool {
        self >= Self::Wait
    }

    /// `setStatus` is only honoured while the node is above `END`.
    #[must_use]
    pub fn can_advance(self) -> bool {
        self > Self::End
    }

    /// Transient markers set around a literal capture.
    #[must_use]
    pub const fn is_capture_marker(self) -> bool {
        matches!(self, Self::Lambda | Self::Method | Self::LambdaTe | Self::Te)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Error => "ERROR",
            Self::Locked => "LOCKED",
            Self::End => "END",
            Self::Fill => "FILL",
            Self::Wait => "WAIT",
            Self::Lambda => "LAMBDA",
            Self::Method => "METHOD",
            Self::LambdaTe => "LAMBDA_TE",
            Self::Te => "TE",
        };
        f.write_str(name)
    }
}
