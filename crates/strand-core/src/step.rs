//! # Step Builder
//!
//! Describes one append: what kind of statement, which operator, how to
//! merge with a fork origin, and the raw positional arguments.

use crate::merge::MergeOperator;
use crate::types::{Arg, StepKind};

/// A step to append to a chain.
///
/// ```
/// use strand_core::{Arg, MergeOperator, Step, StepKind};
///
/// let step = Step::new(StepKind::GET)
///     .operator("distinct")
///     .merge(MergeOperator::Union)
///     .arg(Arg::Placeholder);
/// assert_eq!(step.arguments().len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub(crate) kind: StepKind,
    pub(crate) operator: Option<String>,
    pub(crate) merge: Option<MergeOperator>,
    pub(crate) args: Vec<Arg>,
}

impl Step {
    /// Start describing a step of `kind`.
    #[must_use]
    pub fn new(kind: StepKind) -> Self {
        Self {
            kind,
            operator: None,
            merge: None,
            args: Vec::new(),
        }
    }

    /// Set the operator sub-kind.
    #[must_use]
    pub fn operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = Some(operator.into());
        self
    }

    /// Merge this step with its fork origin using `op`.
    #[must_use]
    pub fn merge(mut self, op: MergeOperator) -> Self {
        self.merge = Some(op);
        self
    }

    /// Add one positional argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<Arg>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add several positional arguments.
    #[must_use]
    pub fn args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// The statement kind of the step.
    #[must_use]
    pub fn kind(&self) -> StepKind {
        self.kind
    }

    /// Positional arguments in the order they were added.
    #[must_use]
    pub fn arguments(&self) -> &[Arg] {
        &self.args
    }
}
