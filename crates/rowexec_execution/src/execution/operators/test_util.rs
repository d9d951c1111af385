//! Helpers shared by operator tests.

use std::collections::HashMap;

use ahash::RandomState;
use rowexec_error::{Result, RowexecError};

use super::PollPull;
use super::source::{BatchSource, SourcePull};
use crate::rows::batch::RowBatch;
use crate::rows::value::Value;
use crate::util::hash::HASH_RANDOM_STATE;

/// Build a batch from row-major values. Empty values stay empty cells.
pub(crate) fn make_batch(rows: Vec<Vec<Value>>) -> RowBatch {
    let num_columns = rows.first().map(|r| r.len()).unwrap_or(0);
    let mut batch = RowBatch::try_new(rows.len(), num_columns).unwrap();
    for (row_idx, row) in rows.into_iter().enumerate() {
        assert_eq!(num_columns, row.len());
        for (col, value) in row.into_iter().enumerate() {
            if !value.is_empty() {
                batch.set_value(row_idx, col, value).unwrap();
            }
        }
    }
    batch
}

pub(crate) fn columns_by_name(names: &[&str]) -> HashMap<String, usize, RandomState> {
    let mut columns = HashMap::with_hasher(HASH_RANDOM_STATE);
    for (idx, name) in names.iter().enumerate() {
        columns.insert(name.to_string(), idx);
    }
    columns
}

pub(crate) fn i64_column(batch: &RowBatch, col: usize) -> Vec<Option<i64>> {
    (0..batch.num_rows())
        .map(|row| match batch.value(row, col) {
            Value::Int64(v) => Some(*v),
            Value::Empty => None,
            other => panic!("not an int64: {other:?}"),
        })
        .collect()
}

pub(crate) fn utf8_column(batch: &RowBatch, col: usize) -> Vec<Option<String>> {
    (0..batch.num_rows())
        .map(|row| match batch.value(row, col) {
            Value::Complex(c) => Some(
                String::from_utf8(c.payload().as_bytes().to_vec()).unwrap(),
            ),
            Value::Empty => None,
            other => panic!("not a utf8 value: {other:?}"),
        })
        .collect()
}

pub(crate) fn unwrap_batch(pull: PollPull) -> RowBatch {
    match pull {
        PollPull::Batch(batch) => batch,
        other => panic!("expected a batch, got {other:?}"),
    }
}

/// One scripted response from a [`TestSource`].
#[derive(Debug)]
pub(crate) enum ScriptedPull {
    Rows(Vec<Vec<Value>>),
    Pending,
    Error(&'static str),
}

/// Source that replays a fixed script of pulls.
///
/// Row scripts are materialized into fresh batches on each pull, so a
/// resettable source can replay them after [`BatchSource::reset`].
#[derive(Debug)]
pub(crate) struct TestSource {
    script: Vec<ScriptedPull>,
    pos: usize,
    resettable: bool,
}

impl TestSource {
    pub fn new(script: Vec<ScriptedPull>) -> Self {
        TestSource {
            script,
            pos: 0,
            resettable: false,
        }
    }

    pub fn resettable(mut self) -> Self {
        self.resettable = true;
        self
    }
}

impl BatchSource for TestSource {
    fn poll_pull(&mut self, _max_rows: usize) -> Result<SourcePull> {
        let Some(entry) = self.script.get(self.pos) else {
            return Ok(SourcePull::Exhausted);
        };
        self.pos += 1;
        match entry {
            ScriptedPull::Rows(rows) => Ok(SourcePull::Batch(make_batch(rows.clone()))),
            ScriptedPull::Pending => Ok(SourcePull::Pending),
            ScriptedPull::Error(msg) => Err(RowexecError::new(*msg)),
        }
    }

    fn supports_reset(&self) -> bool {
        self.resettable
    }

    fn reset(&mut self) -> Result<()> {
        if !self.resettable {
            return Err(RowexecError::new("Source does not support reset"));
        }
        self.pos = 0;
        Ok(())
    }
}
