//! Implementations of physical operators in an execution pipeline.

pub mod sort;
pub mod source;

#[cfg(test)]
pub(crate) mod test_util;

use crate::rows::batch::RowBatch;

/// Result of a pull from an operator.
#[derive(Debug)]
pub enum PollPull {
    /// A batch of rows in output order.
    Batch(RowBatch),

    /// Rows were consumed without being materialized (skip-only pull).
    Skipped(usize),

    /// No output could be produced right now because upstream is waiting on
    /// I/O. The same pull should be repeated later.
    Pending,

    /// The operator has no more output.
    Exhausted,
}
