use std::collections::HashMap;

use ahash::RandomState;
use rowexec_error::{Result, RowexecError};

use crate::rows::value::{ComplexValue, StorageId, Value};
use crate::util::hash::HASH_RANDOM_STATE;

/// A fixed-shape table of values, rows by columns.
///
/// The batch owns the values stored in its cells. For complex values it keeps
/// an exact count of how many of its cells reference each distinct storage,
/// which is what lets the sort rebuild decide between stealing storage and
/// cloning it. The count must never undercount (premature free) or overcount
/// (leak) the actual cell references.
#[derive(Debug)]
pub struct RowBatch {
    num_rows: usize,
    num_columns: usize,
    /// Cell values in row-major order, `num_rows * num_columns` entries.
    values: Vec<Value>,
    /// Live references per complex storage held by this batch's cells.
    value_counts: HashMap<StorageId, usize, RandomState>,
}

impl RowBatch {
    pub fn try_new(num_rows: usize, num_columns: usize) -> Result<Self> {
        if num_rows == 0 {
            return Err(RowexecError::new("Row batch must have at least one row"));
        }
        let mut values = Vec::new();
        values.try_reserve_exact(num_rows * num_columns).map_err(|_| {
            RowexecError::new("Failed to allocate row batch")
                .with_field("rows", num_rows)
                .with_field("columns", num_columns)
        })?;
        values.resize(num_rows * num_columns, Value::Empty);

        Ok(RowBatch {
            num_rows,
            num_columns,
            values,
            value_counts: HashMap::with_hasher(HASH_RANDOM_STATE),
        })
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.num_columns
    }

    #[inline]
    fn cell_idx(&self, row: usize, col: usize) -> usize {
        debug_assert!(row < self.num_rows);
        debug_assert!(col < self.num_columns);
        row * self.num_columns + col
    }

    pub fn value(&self, row: usize, col: usize) -> &Value {
        &self.values[self.cell_idx(row, col)]
    }

    /// Store a value into an empty cell.
    ///
    /// Storing a complex value registers one more reference to its storage in
    /// this batch's count table.
    pub fn set_value(&mut self, row: usize, col: usize, value: Value) -> Result<()> {
        let idx = self.cell_idx(row, col);
        if !self.values[idx].is_empty() {
            return Err(RowexecError::new("Cell already holds a value")
                .with_field("row", row)
                .with_field("column", col));
        }
        if let Value::Complex(complex) = &value {
            *self.value_counts.entry(complex.storage_id()).or_insert(0) += 1;
        }
        self.values[idx] = value;
        Ok(())
    }

    /// Clear a cell, releasing this batch's reference to the value.
    ///
    /// The storage count is only decremented while the identity is still
    /// tracked; after a steal the cell reference is dropped without touching
    /// the table.
    pub fn erase_value(&mut self, row: usize, col: usize) {
        let idx = self.cell_idx(row, col);
        let value = std::mem::replace(&mut self.values[idx], Value::Empty);
        if let Value::Complex(complex) = value {
            if let Some(count) = self.value_counts.get_mut(&complex.storage_id()) {
                *count -= 1;
                if *count == 0 {
                    self.value_counts.remove(&complex.storage_id());
                }
            }
        }
    }

    /// Number of live references this batch tracks for the value's storage.
    ///
    /// Zero means the storage was already stolen out of this batch.
    pub fn value_count(&self, value: &ComplexValue) -> usize {
        self.value_counts
            .get(&value.storage_id())
            .copied()
            .unwrap_or(0)
    }

    /// Transfer responsibility for the value's storage out of this batch.
    ///
    /// The cells referencing the storage are left in place; erasing them
    /// afterwards no longer touches the count table.
    pub fn steal(&mut self, value: &ComplexValue) {
        self.value_counts.remove(&value.storage_id());
    }

    /// Check that the count table exactly matches the cell contents.
    ///
    /// Cells referencing stolen storage are allowed to remain; tracked
    /// identities must match their actual cell reference counts.
    pub fn verify_value_counts(&self) -> Result<()> {
        let mut actual: HashMap<StorageId, usize, RandomState> =
            HashMap::with_hasher(HASH_RANDOM_STATE);
        for value in &self.values {
            if let Value::Complex(complex) = value {
                *actual.entry(complex.storage_id()).or_insert(0) += 1;
            }
        }
        for (id, count) in &self.value_counts {
            let cells = actual.get(id).copied().unwrap_or(0);
            if cells != *count {
                return Err(RowexecError::new("Reference count does not match cells")
                    .with_field("storage", *id)
                    .with_field("tracked", *count)
                    .with_field("cells", cells));
            }
        }
        Ok(())
    }
}
