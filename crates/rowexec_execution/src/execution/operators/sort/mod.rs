//! Blocking sort operator.
//!
//! The operator buffers every batch its source produces, sorts all buffered
//! rows in one pass once the source is exhausted, and then drains the sorted
//! output in batches. Sorting moves values instead of copying them: storage
//! of heap-backed values is stolen into the output wherever the source batch
//! still owns it, and deep-copied only for references whose storage already
//! moved into an earlier output batch.

mod rebuild;
pub mod sort_keys;

pub use sort_keys::{KeyComparator, ScoreComparator, SortElement, SortKey, resolve_sort_keys};

use std::collections::{HashMap, VecDeque};

use ahash::RandomState;
use rowexec_error::{Result, RowexecError};
use tracing::debug;

use super::PollPull;
use super::source::{BatchSource, SourcePull};
use crate::rows::batch::RowBatch;
use crate::util::hash::HASH_RANDOM_STATE;

pub const DEFAULT_BATCH_SIZE: usize = 1024;

#[derive(Debug, Clone, Copy)]
pub struct SortOptions {
    /// Preserve the input order of rows that compare equal.
    pub stable: bool,
    /// Row capacity of rebuilt output batches.
    pub batch_size: usize,
}

impl Default for SortOptions {
    fn default() -> Self {
        SortOptions {
            stable: true,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

#[derive(Debug)]
enum SortState {
    /// Accumulating input batches until the source is exhausted.
    Buffering { buffer: Vec<RowBatch> },
    /// Handing out sorted batches. `offset` is the number of rows of the
    /// front batch already consumed by partial pulls.
    Draining {
        output: VecDeque<RowBatch>,
        offset: usize,
    },
    Exhausted,
}

#[derive(Debug)]
pub struct PhysicalSort {
    source: Box<dyn BatchSource>,
    keys: Vec<SortKey>,
    stable: bool,
    batch_size: usize,
    state: SortState,
}

impl PhysicalSort {
    pub fn try_new(
        source: Box<dyn BatchSource>,
        elements: &[SortElement],
        columns: &HashMap<String, usize, RandomState>,
        options: SortOptions,
    ) -> Result<Self> {
        if elements.is_empty() {
            return Err(RowexecError::new("Sort requires at least one sort key"));
        }
        if options.batch_size == 0 {
            return Err(RowexecError::new("Sort batch size must be at least one row"));
        }
        let keys = resolve_sort_keys(elements, columns)?;

        Ok(PhysicalSort {
            source,
            keys,
            stable: options.stable,
            batch_size: options.batch_size,
            state: SortState::Buffering { buffer: Vec::new() },
        })
    }

    /// Pull the next piece of sorted output.
    ///
    /// Buffers the source to exhaustion first; a `Pending` from the source
    /// surfaces as `Pending` here and the same pull is expected to be
    /// repeated. With `skip_only` rows are consumed and counted instead of
    /// materialized. Any error leaves the operator exhausted.
    pub fn poll_next(&mut self, max_rows: usize, skip_only: bool) -> Result<PollPull> {
        if max_rows == 0 {
            return Err(RowexecError::new("Pull must request at least one row"));
        }
        match self.poll_next_inner(max_rows, skip_only) {
            Ok(pull) => Ok(pull),
            Err(err) => {
                self.state = SortState::Exhausted;
                Err(err)
            }
        }
    }

    fn poll_next_inner(&mut self, max_rows: usize, skip_only: bool) -> Result<PollPull> {
        let PhysicalSort {
            source,
            keys,
            stable,
            batch_size,
            state,
        } = self;

        loop {
            match state {
                SortState::Buffering { buffer } => match source.poll_pull(*batch_size)? {
                    SourcePull::Batch(batch) => {
                        match buffer.first() {
                            Some(first) => {
                                if batch.num_columns() != first.num_columns() {
                                    return Err(RowexecError::new(
                                        "Upstream batch has a different column count",
                                    )
                                    .with_field("expected", first.num_columns())
                                    .with_field("got", batch.num_columns()));
                                }
                            }
                            None => {
                                for key in keys.iter() {
                                    if key.column >= batch.num_columns() {
                                        return Err(RowexecError::new(
                                            "Sort key column is out of range",
                                        )
                                        .with_field("column", key.column)
                                        .with_field("columns", batch.num_columns()));
                                    }
                                }
                            }
                        }
                        buffer.push(batch);
                    }
                    SourcePull::Pending => return Ok(PollPull::Pending),
                    SourcePull::Exhausted => {
                        if buffer.is_empty() {
                            *state = SortState::Exhausted;
                            return Ok(PollPull::Exhausted);
                        }
                        let mut batches = std::mem::take(buffer);
                        debug!(batches = batches.len(), "source exhausted, sorting");
                        rebuild::sort_buffered(&mut batches, keys, *stable, *batch_size)?;
                        *state = SortState::Draining {
                            output: batches.into(),
                            offset: 0,
                        };
                    }
                },
                SortState::Draining { output, offset } => {
                    if skip_only {
                        // Skips accumulate across output batches up to the
                        // requested row count.
                        let mut skipped = 0;
                        while skipped < max_rows {
                            let Some(front) = output.front() else {
                                break;
                            };
                            let remaining = front.num_rows() - *offset;
                            let take = remaining.min(max_rows - skipped);
                            skipped += take;
                            *offset += take;
                            if *offset == front.num_rows() {
                                output.pop_front();
                                *offset = 0;
                            }
                        }
                        if skipped == 0 {
                            *state = SortState::Exhausted;
                            return Ok(PollPull::Exhausted);
                        }
                        return Ok(PollPull::Skipped(skipped));
                    }

                    let Some(mut front) = output.pop_front() else {
                        *state = SortState::Exhausted;
                        return Ok(PollPull::Exhausted);
                    };
                    let remaining = front.num_rows() - *offset;
                    let take = remaining.min(max_rows);

                    if *offset == 0 && take == front.num_rows() {
                        return Ok(PollPull::Batch(front));
                    }

                    // Partial pull: carve the requested rows out of the front
                    // batch, migrating value ownership the same way the sort
                    // rebuild does.
                    let mut slice = RowBatch::try_new(take, front.num_columns())?;
                    let mut cache = rebuild::TransferCache::with_hasher(HASH_RANDOM_STATE);
                    for i in 0..take {
                        for col in 0..front.num_columns() {
                            rebuild::transfer_cell(
                                &mut front,
                                *offset + i,
                                col,
                                &mut slice,
                                i,
                                &mut cache,
                            )?;
                        }
                    }
                    *offset += take;
                    if *offset < front.num_rows() {
                        output.push_front(front);
                    } else {
                        *offset = 0;
                    }
                    return Ok(PollPull::Batch(slice));
                }
                SortState::Exhausted => return Ok(PollPull::Exhausted),
            }
        }
    }

    /// Rewind the operator for another full pass over the source.
    pub fn reset(&mut self) -> Result<()> {
        if !self.source.supports_reset() {
            return Err(RowexecError::new("Sort source does not support reset"));
        }
        self.source.reset()?;
        self.state = SortState::Buffering { buffer: Vec::new() };
        Ok(())
    }
}
