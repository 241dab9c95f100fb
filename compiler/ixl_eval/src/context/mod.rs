//! Per-call state threaded through verification and execution.
//!
//! Expression trees are immutable and shared. Everything that changes while
//! a tree is checked or evaluated lives in one of these contexts, which the
//! evaluator passes down by exclusive reference.

mod execution;
mod verification;

pub use execution::{ExecutionContext, ExecutionContextBuilder};
pub use verification::VerificationContext;
