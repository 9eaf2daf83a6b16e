//! # Argument Fill
//!
//! Builds a node's element array from the raw arguments of an append and the
//! chain's pending literal buffers.
//!
//! Scanning left to right:
//! 1. `Placeholder` takes the next unconsumed literal.
//! 2. `Node` is collected as a child, never copied into the output. A
//!    condition child empties the output and stops the scan.
//! 3. `Ternary` takes the next unconsumed ternary literal.
//! 4. `Value` goes through the [`ArgFilter`]; an unrecognised value takes
//!    the next unconsumed literal instead.
//!
//! Unconsumed literals are appended in order. Slots that found nothing to
//! consume are dropped, so the output is always compact.

use crate::filter::ArgFilter;
use crate::literal::LiteralBuffer;
use crate::types::{Arg, Element, NodeId};

/// Outcome of one fill pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filled {
    /// Compacted element array.
    pub elements: Vec<Element>,
    /// Node arguments to attach as children, in argument order.
    pub children: Vec<NodeId>,
}

/// Run the fill over `args`.
///
/// `is_condition` reports whether a node argument is a condition sub-node.
/// The buffer is only read; clearing it is the caller's job.
pub fn fill(
    args: &[Arg],
    buffer: &LiteralBuffer,
    filter: &dyn ArgFilter,
    is_condition: impl Fn(NodeId) -> bool,
) -> Filled {
    let mut literals = buffer.literals().iter();
    let mut ternary = buffer.ternary().iter();
    let mut out = Filled {
        elements: Vec::with_capacity(args.len() + buffer.literals().len() + buffer.ternary().len()),
        children: Vec::new(),
    };

    for arg in args {
        match arg {
            Arg::Placeholder => {
                if let Some(token) = literals.next() {
                    out.elements.push(Element::literal(token.as_str()));
                }
            }
            Arg::Node(child) => {
                out.children.push(*child);
                if is_condition(*child) {
                    out.elements.clear();
                    return out;
                }
            }
            Arg::Ternary => {
                if let Some(token) = ternary.next() {
                    out.elements.push(Element::literal(token.as_str()));
                }
            }
            Arg::Value(value) => match filter.filter(value) {
                Some(element) => out.elements.push(element),
                None => {
                    if let Some(token) = literals.next() {
                        out.elements.push(Element::literal(token.as_str()));
                    }
                }
            },
        }
    }

    out.elements
        .extend(literals.map(|token| Element::literal(token.as_str())));
    out.elements.shrink_to_fit();
    out
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{DomainFilter, DomainService};
    use crate::types::{ArgValue, CallToken, DictRef};

    fn buffer(literals: &[&str], ternary: &[&str]) -> LiteralBuffer {
        let mut b = LiteralBuffer::new();
        for l in literals {
            b.push_literal(*l);
        }
        for t in ternary {
            b.push_ternary(*t);
        }
        b
    }

    fn domain() -> DomainFilter {
        DomainFilter::new(DomainService::new().with_entity("User").with_dictionary("Gender"))
    }

    fn lit(s: &str) -> Element {
        Element::literal(s)
    }

    #[test]
    fn placeholders_take_literals_in_order() {
        let b = buffer(&["a.User.getName", "a.User.getAge", "a.User.getCity"], &[]);
        let out = fill(&[Arg::Placeholder, Arg::Placeholder], &b, &domain(), |_| false);
        assert_eq!(
            out.elements,
            [lit("a.User.getName"), lit("a.User.getAge"), lit("a.User.getCity")]
        );
        assert!(out.children.is_empty());
    }

    #[test]
    fn recognised_values_pass_through() {
        let b = buffer(&["a.User.getName"], &[]);
        let args = [
            Arg::from(DictRef::new("Gender", "MALE")),
            Arg::Value(ArgValue::Integer(0)),
        ];
        let out = fill(&args, &b, &domain(), |_| false);
        assert_eq!(
            out.elements,
            [
                Element::Dictionary(DictRef::new("Gender", "MALE")),
                lit("a.User.getName")
            ]
        );
    }

    #[test]
    fn ternary_slots_use_ternary_buffer() {
        let b = buffer(&["a.User.getId"], &["a.User.getName"]);
        let out = fill(&[Arg::Ternary, Arg::Placeholder], &b, &domain(), |_| false);
        assert_eq!(out.elements, [lit("a.User.getName"), lit("a.User.getId")]);
    }

    #[test]
    fn exhausted_slots_are_dropped() {
        let b = buffer(&[], &[]);
        let out = fill(&[Arg::Placeholder, Arg::Ternary], &b, &domain(), |_| false);
        assert!(out.elements.is_empty());
    }

    #[test]
    fn zero_args_append_leftovers() {
        let b = buffer(&["a.User.getName"], &[]);
        let out = fill(&[], &b, &domain(), |_| false);
        assert_eq!(out.elements, [lit("a.User.getName")]);
    }

    #[test]
    fn children_are_collected() {
        let child = NodeId::new(CallToken(1), 3);
        let b = buffer(&["a.User.getName"], &[]);
        let out = fill(&[Arg::Placeholder, Arg::Node(child)], &b, &domain(), |_| false);
        assert_eq!(out.children, [child]);
        assert_eq!(out.elements, [lit("a.User.getName")]);
    }

    #[test]
    fn condition_child_empties_output() {
        let child = NodeId::new(CallToken(1), 3);
        let b = buffer(&["a.User.getName", "a.User.getAge"], &[]);
        let out = fill(&[Arg::Placeholder, Arg::Node(child)], &b, &domain(), |id| id == child);
        assert_eq!(out.children, [child]);
        assert!(out.elements.is_empty());
    }
}
