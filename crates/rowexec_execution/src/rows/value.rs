use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

/// Identity of the backing storage of a complex value.
///
/// Two complex values with the same storage id share the same underlying
/// allocation. Equality and hashing go by identity, not by payload contents,
/// which is what the per-output-batch dedup cache keys on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageId(u64);

impl StorageId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        StorageId(NEXT.fetch_add(1, AtomicOrdering::Relaxed))
    }
}

impl fmt::Display for StorageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Heap-backed payload of a complex value.
///
/// Binary payloads double as the raw score encoding produced by an external
/// relevance scorer; only a prepared score comparator knows how to interpret
/// those bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComplexPayload {
    Utf8(String),
    Binary(Vec<u8>),
}

impl ComplexPayload {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Utf8(s) => s.as_bytes(),
            Self::Binary(b) => b,
        }
    }
}

/// Handle to heap-backed value storage.
///
/// `Clone` copies the handle only: the result references the same storage
/// under the same id. [`ComplexValue::deep_clone`] copies the payload into a
/// fresh allocation with a new id.
#[derive(Debug, Clone)]
pub struct ComplexValue {
    id: StorageId,
    payload: Arc<ComplexPayload>,
}

impl ComplexValue {
    pub fn new(payload: ComplexPayload) -> Self {
        ComplexValue {
            id: StorageId::next(),
            payload: Arc::new(payload),
        }
    }

    pub fn storage_id(&self) -> StorageId {
        self.id
    }

    pub fn payload(&self) -> &ComplexPayload {
        &self.payload
    }

    /// Deep-copy the underlying storage, producing an independent value.
    pub fn deep_clone(&self) -> ComplexValue {
        ComplexValue::new(self.payload.as_ref().clone())
    }
}

/// A single cell value in a row batch.
///
/// Scalar variants are trivially copyable and carry no ownership
/// implications. The `Complex` variant references heap storage tracked by the
/// owning batch's reference-count table.
#[derive(Debug, Clone)]
pub enum Value {
    /// Unset cell.
    Empty,
    Boolean(bool),
    Int64(i64),
    Float64(f64),
    Complex(ComplexValue),
}

impl Value {
    pub fn utf8(s: impl Into<String>) -> Self {
        Value::Complex(ComplexValue::new(ComplexPayload::Utf8(s.into())))
    }

    pub fn binary(b: impl Into<Vec<u8>>) -> Self {
        Value::Complex(ComplexValue::new(ComplexPayload::Binary(b.into())))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    pub fn is_complex(&self) -> bool {
        matches!(self, Value::Complex(_))
    }

    pub fn storage_id(&self) -> Option<StorageId> {
        match self {
            Value::Complex(c) => Some(c.storage_id()),
            _ => None,
        }
    }

    /// Raw payload bytes if this is a complex value.
    pub fn complex_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Complex(c) => Some(c.payload().as_bytes()),
            _ => None,
        }
    }

    /// Generic three-way comparison defining a total order over all values.
    ///
    /// Values of different kinds order as: empty, boolean, numeric, utf8,
    /// binary. Integers and floats compare numerically; floats use
    /// `f64::total_cmp` so NaN does not break the total order. Cross-type
    /// numeric comparison goes through `f64`, so integers beyond 2^53
    /// compare at double precision and distinct values can tie.
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        use Value::*;
        match (self, other) {
            (Empty, Empty) => Ordering::Equal,
            (Boolean(a), Boolean(b)) => a.cmp(b),
            (Int64(a), Int64(b)) => a.cmp(b),
            (Float64(a), Float64(b)) => a.total_cmp(b),
            (Int64(a), Float64(b)) => (*a as f64).total_cmp(b),
            (Float64(a), Int64(b)) => a.total_cmp(&(*b as f64)),
            (Complex(a), Complex(b)) => match (a.payload(), b.payload()) {
                (ComplexPayload::Utf8(l), ComplexPayload::Utf8(r)) => l.cmp(r),
                (ComplexPayload::Binary(l), ComplexPayload::Binary(r)) => l.as_slice().cmp(r),
                _ => self.kind_rank().cmp(&other.kind_rank()),
            },
            _ => self.kind_rank().cmp(&other.kind_rank()),
        }
    }

    fn kind_rank(&self) -> u8 {
        match self {
            Value::Empty => 0,
            Value::Boolean(_) => 1,
            Value::Int64(_) | Value::Float64(_) => 2,
            Value::Complex(c) => match c.payload() {
                ComplexPayload::Utf8(_) => 3,
                ComplexPayload::Binary(_) => 4,
            },
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::utf8(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => write!(f, "EMPTY"),
            Value::Boolean(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::Float64(v) => write!(f, "{v}"),
            Value::Complex(c) => match c.payload() {
                ComplexPayload::Utf8(s) => write!(f, "{s}"),
                ComplexPayload::Binary(b) => write!(f, "<binary[{}]>", b.len()),
            },
        }
    }
}
