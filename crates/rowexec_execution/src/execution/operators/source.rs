use std::collections::VecDeque;
use std::fmt::Debug;

use rowexec_error::{Result, RowexecError};

use crate::rows::batch::RowBatch;

/// Result of a pull from an upstream batch source.
#[derive(Debug)]
pub enum SourcePull {
    Batch(RowBatch),

    /// The source is waiting on I/O; pull again later.
    Pending,

    /// End of stream.
    Exhausted,
}

/// Upstream producer of row batches.
///
/// Sources are pulled repeatedly until they report `Exhausted`. A `Pending`
/// result is purely a signal to retry the same pull later; nothing in this
/// crate blocks on it.
pub trait BatchSource: Debug {
    /// Pull the next batch, containing at most `max_rows` rows.
    fn poll_pull(&mut self, max_rows: usize) -> Result<SourcePull>;

    /// Whether this source can be reset back to its start.
    fn supports_reset(&self) -> bool {
        false
    }

    /// Reset the source to its start.
    fn reset(&mut self) -> Result<()> {
        Err(RowexecError::new("Source does not support reset"))
    }
}

/// Source that drains a fixed queue of batches.
#[derive(Debug)]
pub struct BatchQueueSource {
    batches: VecDeque<RowBatch>,
}

impl BatchQueueSource {
    pub fn new(batches: impl IntoIterator<Item = RowBatch>) -> Self {
        BatchQueueSource {
            batches: batches.into_iter().collect(),
        }
    }
}

impl BatchSource for BatchQueueSource {
    fn poll_pull(&mut self, _max_rows: usize) -> Result<SourcePull> {
        match self.batches.pop_front() {
            Some(batch) => Ok(SourcePull::Batch(batch)),
            None => Ok(SourcePull::Exhausted),
        }
    }
}
