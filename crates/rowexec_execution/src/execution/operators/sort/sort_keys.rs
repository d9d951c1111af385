use std::cell::Cell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use ahash::RandomState;
use rowexec_error::{Result, RowexecError};

use super::rebuild::RowCoord;
use crate::rows::batch::RowBatch;
use crate::rows::value::Value;

/// Prepared comparator for an externally scored sort key.
///
/// Cells for such keys hold the producer's raw score encoding; this
/// comparator is the only component that understands those bytes. The
/// prepared state lives inside the implementation, the sort never interprets
/// it.
pub trait ScoreComparator: Debug + Send + Sync {
    fn compare(&self, lhs: &[u8], rhs: &[u8]) -> Result<Ordering>;
}

/// How cells of a sort key are compared.
#[derive(Debug, Clone)]
pub enum KeyComparator {
    /// Generic three-way value comparison.
    Value,
    /// Prepared comparator over raw score bytes.
    Score(Arc<dyn ScoreComparator>),
}

/// A resolved sort key: which column to read and how to order it.
#[derive(Debug, Clone)]
pub struct SortKey {
    pub column: usize,
    /// Sort descending instead of ascending.
    pub desc: bool,
    pub comparator: KeyComparator,
}

impl SortKey {
    pub fn asc(column: usize) -> Self {
        SortKey {
            column,
            desc: false,
            comparator: KeyComparator::Value,
        }
    }

    pub fn desc(column: usize) -> Self {
        SortKey {
            column,
            desc: true,
            comparator: KeyComparator::Value,
        }
    }
}

/// An unresolved sort element as it comes out of the plan: the key variable's
/// name, the direction, and an optional score comparator when an upstream
/// relevance producer already materialized this key's ordering.
#[derive(Debug, Clone)]
pub struct SortElement {
    pub variable: String,
    pub desc: bool,
    pub score_comparator: Option<Arc<dyn ScoreComparator>>,
}

impl SortElement {
    pub fn asc(variable: impl Into<String>) -> Self {
        SortElement {
            variable: variable.into(),
            desc: false,
            score_comparator: None,
        }
    }

    pub fn desc(variable: impl Into<String>) -> Self {
        SortElement {
            variable: variable.into(),
            desc: true,
            score_comparator: None,
        }
    }

    pub fn with_score_comparator(mut self, comparator: Arc<dyn ScoreComparator>) -> Self {
        self.score_comparator = Some(comparator);
        self
    }
}

/// Resolve sort elements against the operator's column layout.
///
/// Failing to resolve a variable is a configuration error; it can never occur
/// mid-sort.
pub fn resolve_sort_keys(
    elements: &[SortElement],
    columns: &HashMap<String, usize, RandomState>,
) -> Result<Vec<SortKey>> {
    let mut keys = Vec::with_capacity(elements.len());
    for element in elements {
        let column = *columns.get(&element.variable).ok_or_else(|| {
            RowexecError::new("Sort key variable does not resolve to a column")
                .with_field("variable", &element.variable)
        })?;
        let comparator = match &element.score_comparator {
            Some(cmp) => KeyComparator::Score(cmp.clone()),
            None => KeyComparator::Value,
        };
        keys.push(SortKey {
            column,
            desc: element.desc,
            comparator,
        });
    }
    Ok(keys)
}

/// Total-order comparison of two row coordinates over the key chain.
///
/// A strict difference on a key decides the order (honoring the key's
/// direction); ties fall through to the next key. A score comparator that
/// fails records the fault once and the comparison degrades to equality so
/// the order stays well formed; the fault is surfaced after the sort
/// finishes.
pub(crate) struct RowComparator<'a> {
    buffer: &'a [RowBatch],
    keys: &'a [SortKey],
    fault: Cell<Option<RowexecError>>,
}

impl<'a> RowComparator<'a> {
    pub fn new(buffer: &'a [RowBatch], keys: &'a [SortKey]) -> Self {
        RowComparator {
            buffer,
            keys,
            fault: Cell::new(None),
        }
    }

    pub fn compare(&self, a: RowCoord, b: RowCoord) -> Ordering {
        for key in self.keys {
            let lhs = self.buffer[a.batch as usize].value(a.row as usize, key.column);
            let rhs = self.buffer[b.batch as usize].value(b.row as usize, key.column);

            let ord = match &key.comparator {
                KeyComparator::Value => lhs.total_cmp(rhs),
                KeyComparator::Score(cmp) => self.compare_scores(cmp.as_ref(), lhs, rhs),
            };
            let ord = if key.desc { ord.reverse() } else { ord };

            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    fn compare_scores(&self, cmp: &dyn ScoreComparator, lhs: &Value, rhs: &Value) -> Ordering {
        // A cell without score bytes is malformed; treat it as a tie rather
        // than breaking the total order.
        let (Some(lhs), Some(rhs)) = (lhs.complex_bytes(), rhs.complex_bytes()) else {
            return Ordering::Equal;
        };
        match cmp.compare(lhs, rhs) {
            Ok(ord) => ord,
            Err(err) => {
                // Keep the first fault.
                if let Some(prev) = self.fault.take() {
                    self.fault.set(Some(prev));
                } else {
                    self.fault.set(Some(err));
                }
                Ordering::Equal
            }
        }
    }

    /// Take the first comparator fault recorded during the sort, if any.
    pub fn take_fault(&self) -> Option<RowexecError> {
        self.fault.take()
    }
}
