//! Typed parameter and column values.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};

use crate::error::InvalidBoolean;

/// Storage class of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// 64-bit signed integer.
    Integer,
    /// 64-bit float.
    Real,
    /// UTF-8 text.
    Text,
}

/// A value that can be bound to a statement parameter or read from a
/// result column.
///
/// Booleans have no storage class of their own; [`Value::boolean`] stores
/// them as the integers `0` and `1`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// 64-bit signed integer.
    Integer(i64),
    /// 64-bit float.
    Real(f64),
    /// UTF-8 text.
    Text(String),
}

impl Value {
    /// Creates an integer value.
    #[must_use]
    pub const fn integer(value: i64) -> Self {
        Self::Integer(value)
    }

    /// Creates a real value.
    #[must_use]
    pub const fn real(value: f64) -> Self {
        Self::Real(value)
    }

    /// Creates a text value.
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Creates an integer value of `1` or `0`.
    #[must_use]
    pub const fn boolean(value: bool) -> Self {
        Self::Integer(bool_to_integer(value))
    }

    /// Storage class of this value.
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Integer(_) => ValueKind::Integer,
            Self::Real(_) => ValueKind::Real,
            Self::Text(_) => ValueKind::Text,
        }
    }

    /// Returns the payload if this is an integer.
    #[must_use]
    pub const fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the payload if this is a real.
    #[must_use]
    pub const fn as_real(&self) -> Option<f64> {
        match self {
            Self::Real(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the payload if this is text.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v.as_str()),
            _ => None,
        }
    }

    /// Reads an integer value as a boolean. Reals and text yield `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidBoolean`] for an integer other than `0` or `1`.
    pub fn as_boolean(&self) -> Result<Option<bool>, InvalidBoolean> {
        self.as_integer().map(integer_to_boolean).transpose()
    }
}

/// Maps `true` to `1` and `false` to `0`.
#[must_use]
pub const fn bool_to_integer(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

/// Maps `1` to `true` and `0` to `false`.
///
/// # Errors
///
/// Returns [`InvalidBoolean`] for any other integer.
pub const fn integer_to_boolean(value: i64) -> Result<bool, InvalidBoolean> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(InvalidBoolean(other)),
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Self::Integer(v) => ToSqlOutput::from(*v),
            Self::Real(v) => ToSqlOutput::from(*v),
            Self::Text(v) => ToSqlOutput::from(v.as_str()),
        })
    }
}

impl FromSql for Value {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Integer(v) => Ok(Self::Integer(v)),
            ValueRef::Real(v) => Ok(Self::Real(v)),
            ValueRef::Text(_) => value.as_str().map(Self::text),
            ValueRef::Null | ValueRef::Blob(_) => Err(FromSqlError::InvalidType),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::boolean(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

/// Builds a parameter slice for the typed execute and query calls.
///
/// Usage: `params![1_i64, 2.5, "text", true]`
#[macro_export]
macro_rules! params {
    ($($val:expr),* $(,)?) => {
        &[$($crate::Value::from($val)),*][..]
    };
}
