//! Error type shared by every crate in the workspace.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error;
use std::fmt;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

/// Return a "not implemented" error from the current function.
#[macro_export]
macro_rules! not_implemented {
    ($($arg:tt)+) => {{
        let msg = format!($($arg)+);
        return Err($crate::DbError::new(format!("Not yet implemented: {msg}")));
    }};
}

#[derive(Debug)]
pub struct DbError {
    inner: Box<DbErrorInner>,
}

#[derive(Debug)]
struct DbErrorInner {
    /// Message for the error.
    msg: String,
    /// Source of the error.
    source: Option<Box<dyn Error + Send + Sync>>,
    /// Extra key/value context for the error.
    fields: Vec<ErrorField>,
    /// Captured backtrace, only populated when `RUST_BACKTRACE` is set.
    backtrace: Backtrace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ErrorField {
    key: String,
    value: String,
}

impl DbError {
    pub fn new(msg: impl Into<String>) -> Self {
        DbError {
            inner: Box::new(DbErrorInner {
                msg: msg.into(),
                source: None,
                fields: Vec::new(),
                backtrace: Backtrace::capture(),
            }),
        }
    }

    pub fn with_source(msg: impl Into<String>, source: Box<dyn Error + Send + Sync>) -> Self {
        let mut err = Self::new(msg);
        err.inner.source = Some(source);
        err
    }

    /// Attach a key/value pair to the error.
    pub fn with_field(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.inner.fields.push(ErrorField {
            key: key.into(),
            value: value.to_string(),
        });
        self
    }

    pub fn get_msg(&self) -> &str {
        &self.inner.msg
    }

    /// Get the value of a field previously attached with `with_field`.
    ///
    /// If the key was attached more than once, the first value is returned.
    pub fn get_field(&self, key: &str) -> Option<&str> {
        self.inner
            .fields
            .iter()
            .find(|field| field.key == key)
            .map(|field| field.value.as_str())
    }

    pub fn backtrace(&self) -> Option<&Backtrace> {
        match self.inner.backtrace.status() {
            BacktraceStatus::Captured => Some(&self.inner.backtrace),
            _ => None,
        }
    }
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner.msg)?;

        for field in &self.inner.fields {
            write!(f, "\n  {}: {}", field.key, field.value)?;
        }

        if let Some(source) = &self.inner.source {
            write!(f, "\nError source: {source}")?;
        }

        Ok(())
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.inner.source.as_ref().map(|e| e.as_ref() as _)
    }
}

impl From<fmt::Error> for DbError {
    fn from(value: fmt::Error) -> Self {
        DbError::with_source("Format error", Box::new(value))
    }
}

impl From<std::num::ParseIntError> for DbError {
    fn from(value: std::num::ParseIntError) -> Self {
        DbError::with_source("Failed to parse integer", Box::new(value))
    }
}

impl From<std::num::ParseFloatError> for DbError {
    fn from(value: std::num::ParseFloatError) -> Self {
        DbError::with_source("Failed to parse float", Box::new(value))
    }
}

impl From<std::str::ParseBoolError> for DbError {
    fn from(value: std::str::ParseBoolError) -> Self {
        DbError::with_source("Failed to parse bool", Box::new(value))
    }
}

/// Add context to foreign errors.
pub trait ResultExt<T, E> {
    /// Wrap an error with a static context string.
    fn context(self, msg: &'static str) -> Result<T>;

    /// Wrap an error with a context string generated from a function.
    fn context_fn<F>(self, f: F) -> Result<T>
    where
        F: Fn() -> String;
}

impl<T, E: Error + Send + Sync + 'static> ResultExt<T, E> for std::result::Result<T, E> {
    fn context(self, msg: &'static str) -> Result<T> {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(DbError::with_source(msg, Box::new(e))),
        }
    }

    fn context_fn<F>(self, f: F) -> Result<T>
    where
        F: Fn() -> String,
    {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(DbError::with_source(f(), Box::new(e))),
        }
    }
}

impl<T> ResultExt<T, DbError> for Option<T> {
    fn context(self, msg: &'static str) -> Result<T> {
        self.ok_or_else(|| DbError::new(msg))
    }

    fn context_fn<F>(self, f: F) -> Result<T>
    where
        F: Fn() -> String,
    {
        self.ok_or_else(|| DbError::new(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_are_displayed_in_order() {
        let err = DbError::new("Bad input")
            .with_field("left", 3)
            .with_field("right", "Int64");

        assert_eq!("Bad input\n  left: 3\n  right: Int64", err.to_string());
        assert_eq!(Some("3"), err.get_field("left"));
        assert_eq!(None, err.get_field("missing"));
    }

    #[test]
    fn context_wraps_source() {
        let res: std::result::Result<i64, _> = "abc".parse::<i64>();
        let err = res.context("Failed to read option").unwrap_err();

        assert_eq!("Failed to read option", err.get_msg());
        assert!(err.source().is_some());
    }

    #[test]
    fn option_context() {
        let v: Option<u8> = None;
        let err = v.context_fn(|| format!("missing {}", "thing")).unwrap_err();
        assert_eq!("missing thing", err.get_msg());
    }

    #[test]
    fn not_implemented_returns_err() {
        fn unsupported() -> Result<()> {
            not_implemented!("feature {}", 4)
        }

        let err = unsupported().unwrap_err();
        assert_eq!("Not yet implemented: feature 4", err.get_msg());
    }
}
