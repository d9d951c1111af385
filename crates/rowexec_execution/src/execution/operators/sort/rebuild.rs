use std::collections::HashMap;

use ahash::RandomState;
use rowexec_error::Result;
use tracing::debug;

use super::sort_keys::{RowComparator, SortKey};
use crate::rows::batch::RowBatch;
use crate::rows::value::{ComplexValue, StorageId, Value};
use crate::util::failpoint;
use crate::util::hash::HASH_RANDOM_STATE;

/// Checkpoint at the start of a sort pass, before anything is touched.
pub const FAILPOINT_PASS: &str = "physical_sort::pass";
/// Checkpoint before allocating an output batch.
pub const FAILPOINT_ALLOC_OUTPUT: &str = "physical_sort::alloc_output";
/// Checkpoint at the start of every cell transfer, before any mutation.
pub const FAILPOINT_TRANSFER: &str = "physical_sort::transfer";
/// Checkpoint on the clone path, before the copy is made.
pub const FAILPOINT_TRANSFER_CLONE: &str = "physical_sort::transfer_clone";
/// Checkpoint on the steal path, before the destination commit.
pub const FAILPOINT_TRANSFER_STEAL: &str = "physical_sort::transfer_steal";

/// Identifies one logical row inside the buffered set without copying it.
///
/// 32-bit components keep the coordinate array compact and cache friendly
/// during the sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RowCoord {
    pub batch: u32,
    pub row: u32,
}

/// Dedup cache mapping original storage identity to the value already
/// transferred into the output batch being built. Scoped to one output batch;
/// cleared at batch boundaries.
pub(crate) type TransferCache = HashMap<StorageId, ComplexValue, RandomState>;

/// Sort all buffered batches and replace them with rebuilt output batches in
/// sorted order.
///
/// The replacement is all-or-nothing: on any error the partially built output
/// is dropped and `buffer` still holds the original batches. Ownership of
/// complex values migrates into the output cell by cell, with the destination
/// committed before the source reference is erased.
pub(crate) fn sort_buffered(
    buffer: &mut Vec<RowBatch>,
    keys: &[SortKey],
    stable: bool,
    batch_size: usize,
) -> Result<()> {
    debug_assert!(!buffer.is_empty());
    failpoint::check(FAILPOINT_PASS)?;

    let total_rows: usize = buffer.iter().map(|b| b.num_rows()).sum();
    debug!(total_rows, batches = buffer.len(), stable, "sorting buffered batches");

    let mut coords = Vec::with_capacity(total_rows);
    for (batch_idx, batch) in buffer.iter().enumerate() {
        for row in 0..batch.num_rows() {
            coords.push(RowCoord {
                batch: batch_idx as u32,
                row: row as u32,
            });
        }
    }

    let cmp = RowComparator::new(buffer, keys);
    if stable {
        coords.sort_by(|a, b| cmp.compare(*a, *b));
    } else {
        coords.sort_unstable_by(|a, b| cmp.compare(*a, *b));
    }
    if let Some(fault) = cmp.take_fault() {
        return Err(fault);
    }

    // Guard against comparator bugs breaking the order.
    #[cfg(debug_assertions)]
    for pair in coords.windows(2) {
        debug_assert_ne!(std::cmp::Ordering::Less, cmp.compare(pair[1], pair[0]));
    }

    let output = rebuild(buffer, &coords, total_rows, batch_size)?;
    *buffer = output;
    Ok(())
}

/// Build the sorted output batches from the sorted coordinate array.
fn rebuild(
    buffer: &mut [RowBatch],
    coords: &[RowCoord],
    total_rows: usize,
    batch_size: usize,
) -> Result<Vec<RowBatch>> {
    let num_columns = buffer[0].num_columns();
    let mut output = Vec::new();
    let mut cache = TransferCache::with_hasher(HASH_RANDOM_STATE);

    let mut count = 0;
    while count < total_rows {
        let chunk = (total_rows - count).min(batch_size);
        failpoint::check(FAILPOINT_ALLOC_OUTPUT)?;
        let mut next = RowBatch::try_new(chunk, num_columns)?;

        for i in 0..chunk {
            let coord = coords[count + i];
            let src = &mut buffer[coord.batch as usize];
            for col in 0..num_columns {
                transfer_cell(src, coord.row as usize, col, &mut next, i, &mut cache)?;
            }
        }

        cache.clear();
        output.push(next);
        count += chunk;
    }

    Ok(output)
}

/// Move the value at `(src_row, col)` of `src` into `(dst_row, col)` of `dst`.
///
/// Complex values go through the steal/clone/cache triage; trivial values are
/// copied. In every path the destination is committed before the source
/// reference is erased, so an abort leaves no cell half transferred: either
/// the source still owns the value, or the destination already does.
pub(crate) fn transfer_cell(
    src: &mut RowBatch,
    src_row: usize,
    col: usize,
    dst: &mut RowBatch,
    dst_row: usize,
    cache: &mut TransferCache,
) -> Result<()> {
    let value = src.value(src_row, col).clone();
    match value {
        Value::Empty => Ok(()),
        Value::Complex(complex) => {
            failpoint::check(FAILPOINT_TRANSFER)?;
            let id = complex.storage_id();

            if let Some(cached) = cache.get(&id) {
                // The storage already moved into `dst` for an earlier row of
                // this output batch; the destination just takes another
                // reference to it. Responsibility already lies with `dst`, so
                // erasing the source first is safe.
                let cached = cached.clone();
                src.erase_value(src_row, col);
                dst.set_value(dst_row, col, Value::Complex(cached))?;
                Ok(())
            } else if src.value_count(&complex) == 0 {
                // Already stolen into an earlier output batch; this reference
                // needs its own copy.
                failpoint::check(FAILPOINT_TRANSFER_CLONE)?;
                let copy = complex.deep_clone();
                cache.insert(id, copy.clone());
                dst.set_value(dst_row, col, Value::Complex(copy))?;
                // The source keeps its (untracked) reference until here; the
                // erase cannot invalidate anything the destination holds.
                src.erase_value(src_row, col);
                Ok(())
            } else {
                // First reference to reach the output: steal the storage,
                // zero copies.
                failpoint::check(FAILPOINT_TRANSFER_STEAL)?;
                dst.set_value(dst_row, col, Value::Complex(complex.clone()))?;
                src.steal(&complex);
                src.erase_value(src_row, col);
                cache.insert(id, complex);
                Ok(())
            }
        }
        value => {
            // Trivial value, no ownership transfer needed.
            failpoint::check(FAILPOINT_TRANSFER)?;
            dst.set_value(dst_row, col, value)?;
            src.erase_value(src_row, col);
            Ok(())
        }
    }
}
