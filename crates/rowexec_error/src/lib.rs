//! Error type shared across the rowexec crates.

use std::error::Error;
use std::fmt;

pub type Result<T, E = RowexecError> = std::result::Result<T, E>;

/// Generic error for anything that can go wrong during execution.
///
/// Carries a message, optional structured fields for context, and an optional
/// source error.
pub struct RowexecError {
    inner: Box<RowexecErrorInner>,
}

struct RowexecErrorInner {
    msg: String,
    fields: Vec<(&'static str, String)>,
    source: Option<Box<dyn Error + Send + Sync>>,
}

impl RowexecError {
    pub fn new(msg: impl Into<String>) -> Self {
        RowexecError {
            inner: Box::new(RowexecErrorInner {
                msg: msg.into(),
                fields: Vec::new(),
                source: None,
            }),
        }
    }

    pub fn with_source(msg: impl Into<String>, source: Box<dyn Error + Send + Sync>) -> Self {
        RowexecError {
            inner: Box::new(RowexecErrorInner {
                msg: msg.into(),
                fields: Vec::new(),
                source: Some(source),
            }),
        }
    }

    /// Attach a key/value pair to the error for additional context.
    pub fn with_field(mut self, key: &'static str, value: impl fmt::Display) -> Self {
        self.inner.fields.push((key, value.to_string()));
        self
    }

    pub fn with_fields<V: fmt::Display>(
        mut self,
        fields: impl IntoIterator<Item = (&'static str, V)>,
    ) -> Self {
        for (key, value) in fields {
            self.inner.fields.push((key, value.to_string()));
        }
        self
    }

    pub fn message(&self) -> &str {
        &self.inner.msg
    }
}

impl fmt::Display for RowexecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner.msg)?;
        if !self.inner.fields.is_empty() {
            write!(f, " (")?;
            for (idx, (key, value)) in self.inner.fields.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}: {value}")?;
            }
            write!(f, ")")?;
        }
        if let Some(source) = &self.inner.source {
            write!(f, ": {source}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for RowexecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl Error for RowexecError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.inner.source.as_ref().map(|e| e.as_ref() as _)
    }
}

/// Return early with a "not implemented" error.
#[macro_export]
macro_rules! not_implemented {
    ($($arg:tt)*) => {{
        let msg = format!($($arg)*);
        return Err($crate::RowexecError::new(format!("Not implemented: {msg}")));
    }};
}

pub trait OptionExt<T> {
    /// Convert an Option into a Result with an error indicating a missing
    /// required field.
    fn required(self, field: &'static str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn required(self, field: &'static str) -> Result<T> {
        match self {
            Some(v) => Ok(v),
            None => Err(RowexecError::new(format!("Missing required field: {field}"))),
        }
    }
}

pub trait ResultExt<T> {
    /// Wrap an error with additional context.
    fn context(self, msg: &'static str) -> Result<T>;
}

impl<T, E: Error + Send + Sync + 'static> ResultExt<T> for Result<T, E> {
    fn context(self, msg: &'static str) -> Result<T> {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(RowexecError::with_source(msg, Box::new(e))),
        }
    }
}
