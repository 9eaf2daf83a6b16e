//! # Merge Operators
//!
//! Pairwise combination rules used when a forked chain is merged with its
//! origin. Each operator takes the origin step's elements `o` and the new
//! step's elements `c` and produces one ordered list. Equality is by value.
//!
//! | Tag | Operator | Result |
//! |-----|----------|--------|
//! | `U`  | [`Union`](MergeOperator::Union) | `o ++ c` without duplicates, first occurrence kept |
//! | `I`  | [`Intersection`](MergeOperator::Intersection) | distinct `o` also in `c`, in `o` order |
//! | `C`  | [`Complement`](MergeOperator::Complement) | distinct `o` not in `c`, then distinct `c` not in `o` |
//! | `UB` | [`UnionOriginFirst`](MergeOperator::UnionOriginFirst) | `o ++ c` verbatim |
//! | `UA` | [`UnionOriginSecond`](MergeOperator::UnionOriginSecond) | `c ++ o` verbatim |
//! | `MB` | [`MixedOriginFirst`](MergeOperator::MixedOriginFirst) | `o0, c0, o1, c1, ...` then the longer tail |
//! | `MA` | [`MixedOriginSecond`](MergeOperator::MixedOriginSecond) | `c0, o0, c1, o1, ...` then the longer tail |
//! | `M`  | [`CrossMatch`](MergeOperator::CrossMatch) | `c[i]` where `o[i] == c[i]` |
//! | `RM` | [`ReverseCrossMatch`](MergeOperator::ReverseCrossMatch) | `c[i]` where `o[i]` differs or is absent |
//! | `CB` | [`LeftComplement`](MergeOperator::LeftComplement) | distinct `o` not in `c` |
//! | `CA` | [`RightComplement`](MergeOperator::RightComplement) | distinct `c` not in `o` |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the eleven fork-merge rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MergeOperator {
    Union,
    Intersection,
    Complement,
    UnionOriginFirst,
    UnionOriginSecond,
    MixedOriginFirst,
    MixedOriginSecond,
    CrossMatch,
    ReverseCrossMatch,
    LeftComplement,
    RightComplement,
}

impl MergeOperator {
    /// Every operator, in tag order.
    pub const ALL: [Self; 11] = [
        Self::Union,
        Self::Intersection,
        Self::Complement,
        Self::UnionOriginFirst,
        Self::UnionOriginSecond,
        Self::MixedOriginFirst,
        Self::MixedOriginSecond,
        Self::CrossMatch,
        Self::ReverseCrossMatch,
        Self::LeftComplement,
        Self::RightComplement,
    ];

    /// Short selection label of the operator.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Union => "U",
            Self::Intersection => "I",
            Self::Complement => "C",
            Self::UnionOriginFirst => "UB",
            Self::UnionOriginSecond => "UA",
            Self::MixedOriginFirst => "MB",
            Self::MixedOriginSecond => "MA",
            Self::CrossMatch => "M",
            Self::ReverseCrossMatch => "RM",
            Self::LeftComplement => "CB",
            Self::RightComplement => "CA",
        }
    }

    /// Look an operator up by its tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.tag() == tag)
    }

    /// Combine `origin` with `current`.
    #[must_use]
    pub fn apply<T: Clone + PartialEq>(self, origin: &[T], current: &[T]) -> Vec<T> {
        match self {
            Self::Union => distinct(origin.iter().chain(current)),
            Self::Intersection => distinct(origin.iter().filter(|x| current.contains(x))),
            Self::Complement => {
                let mut out = distinct(origin.iter().filter(|x| !current.contains(x)));
                out.extend(distinct(current.iter().filter(|x| !origin.contains(x))));
                out
            }
            Self::UnionOriginFirst => origin.iter().chain(current).cloned().collect(),
            Self::UnionOriginSecond => current.iter().chain(origin).cloned().collect(),
            Self::MixedOriginFirst => interleave(origin, current),
            Self::MixedOriginSecond => interleave(current, origin),
            Self::CrossMatch => current
                .iter()
                .zip(origin)
                .filter(|(c, o)| c == o)
                .map(|(c, _)| c.clone())
                .collect(),
            Self::ReverseCrossMatch => current
                .iter()
                .enumerate()
                .filter(|(i, c)| origin.get(*i) != Some(*c))
                .map(|(_, c)| c.clone())
                .collect(),
            Self::LeftComplement => distinct(origin.iter().filter(|x| !current.contains(x))),
            Self::RightComplement => distinct(current.iter().filter(|x| !origin.contains(x))),
        }
    }
}

impl fmt::Display for MergeOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for MergeOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s).ok_or_else(|| format!("unknown merge operator: {s}"))
    }
}

fn distinct<'a, T, I>(items: I) -> Vec<T>
where
    T: Clone + PartialEq + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut out: Vec<T> = Vec::new();
    for item in items {
        if !out.contains(item) {
            out.push(item.clone());
        }
    }
    out
}

fn interleave<T: Clone>(first: &[T], second: &[T]) -> Vec<T> {
    let mut out = Vec::with_capacity(first.len() + second.len());
    let longest = first.len().max(second.len());
    for i in 0..longest {
        if let Some(x) = first.get(i) {
            out.push(x.clone());
        }
        if let Some(y) = second.get(i) {
            out.push(y.clone());
        }
    }
    out
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const O: [&str; 3] = ["a", "b", "c"];
    const C: [&str; 4] = ["b", "x", "c", "b"];

    fn run(op: MergeOperator) -> Vec<&'static str> {
        op.apply(&O, &C)
    }

    #[test]
    fn set_operators() {
        assert_eq!(run(MergeOperator::Union), ["a", "b", "c", "x"]);
        assert_eq!(run(MergeOperator::Intersection), ["b", "c"]);
        assert_eq!(run(MergeOperator::Complement), ["a", "x"]);
        assert_eq!(run(MergeOperator::LeftComplement), ["a"]);
        assert_eq!(run(MergeOperator::RightComplement), ["x"]);
    }

    #[test]
    fn concatenating_operators() {
        assert_eq!(
            run(MergeOperator::UnionOriginFirst),
            ["a", "b", "c", "b", "x", "c", "b"]
        );
        assert_eq!(
            run(MergeOperator::UnionOriginSecond),
            ["b", "x", "c", "b", "a", "b", "c"]
        );
    }

    #[test]
    fn mixing_operators() {
        assert_eq!(
            run(MergeOperator::MixedOriginFirst),
            ["a", "b", "b", "x", "c", "c", "b"]
        );
        assert_eq!(
            run(MergeOperator::MixedOriginSecond),
            ["b", "a", "x", "b", "c", "c", "b"]
        );
    }

    #[test]
    fn positional_operators() {
        // positions: 0 a/b, 1 b/x, 2 c/c, 3 -/b
        assert_eq!(run(MergeOperator::CrossMatch), ["c"]);
        assert_eq!(run(MergeOperator::ReverseCrossMatch), ["b", "x", "b"]);
    }

    #[test]
    fn tags_round_trip() {
        for op in MergeOperator::ALL {
            assert_eq!(MergeOperator::from_tag(op.tag()), Some(op));
            assert_eq!(op.to_string().parse::<MergeOperator>(), Ok(op));
        }
        assert_eq!(MergeOperator::from_tag("X"), None);
        assert!("Z".parse::<MergeOperator>().is_err());
    }

    #[test]
    fn empty_inputs() {
        let empty: [&str; 0] = [];
        for op in MergeOperator::ALL {
            assert!(op.apply(&empty, &empty).is_empty());
        }
        assert_eq!(MergeOperator::Union.apply(&empty, &O), O);
        assert!(MergeOperator::Intersection.apply(&O, &empty).is_empty());
    }
}
