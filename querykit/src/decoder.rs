//! Row decoders: turning one result row into a typed value.

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use rusqlite::Row;

use crate::error::{DbError, DbResult};
use crate::value::Value;

/// Decodes a single result row into a `T`.
///
/// Implemented for every `Fn(&Row<'_>) -> rusqlite::Result<T>` closure, so
/// most decoders are written inline:
///
/// ```
/// use querykit::RowDecoder;
///
/// let name_and_age = |row: &rusqlite::Row<'_>| -> rusqlite::Result<(String, i64)> {
///     Ok((row.get(0)?, row.get(1)?))
/// };
/// # fn takes(_: &dyn RowDecoder<(String, i64)>) {}
/// # takes(&name_and_age);
/// ```
pub trait RowDecoder<T>: Send + Sync {
    /// Decodes the row the cursor is positioned on.
    ///
    /// # Errors
    ///
    /// Returns the driver error when a column is missing or has the wrong
    /// type.
    fn decode(&self, row: &Row<'_>) -> rusqlite::Result<T>;
}

impl<T, F> RowDecoder<T> for F
where
    F: Fn(&Row<'_>) -> rusqlite::Result<T> + Send + Sync,
{
    fn decode(&self, row: &Row<'_>) -> rusqlite::Result<T> {
        self(row)
    }
}

/// Reads the first column as an integer.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleInteger;

impl RowDecoder<i64> for SingleInteger {
    fn decode(&self, row: &Row<'_>) -> rusqlite::Result<i64> {
        row.get(0)
    }
}

/// Reads the first column as a double.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleDouble;

impl RowDecoder<f64> for SingleDouble {
    fn decode(&self, row: &Row<'_>) -> rusqlite::Result<f64> {
        row.get(0)
    }
}

/// Reads the first column as a string.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleString;

impl RowDecoder<String> for SingleString {
    fn decode(&self, row: &Row<'_>) -> rusqlite::Result<String> {
        row.get(0)
    }
}

/// Reads the first column as whichever [`Value`] its storage class maps to.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleValue;

impl RowDecoder<Value> for SingleValue {
    fn decode(&self, row: &Row<'_>) -> rusqlite::Result<Value> {
        row.get(0)
    }
}

/// Decoders declared by name, shared read-only by every connection opened
/// from the same registry.
///
/// Each entry is an `Arc<dyn RowDecoder<T>>` erased to `dyn Any`, so the
/// output type is checked when the decoder is looked up.
#[derive(Clone, Default)]
pub struct DecoderSet {
    decoders: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl DecoderSet {
    /// Registers `decoder` under `name`, returning `true` if an earlier
    /// decoder of that name was replaced.
    pub(crate) fn insert<T, D>(&mut self, name: String, decoder: D) -> bool
    where
        T: 'static,
        D: RowDecoder<T> + 'static,
    {
        let decoder: Arc<dyn RowDecoder<T>> = Arc::new(decoder);
        self.decoders.insert(name, Arc::new(decoder)).is_some()
    }

    /// Looks up the decoder registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::UnknownDecoder`] if nothing is registered under
    /// `name`, or [`DbError::DecoderTypeMismatch`] if the decoder produces a
    /// type other than `T`.
    pub fn get<T: 'static>(&self, name: &str) -> DbResult<Arc<dyn RowDecoder<T>>> {
        let entry = self
            .decoders
            .get(name)
            .ok_or_else(|| DbError::UnknownDecoder(name.to_string()))?;
        entry
            .downcast_ref::<Arc<dyn RowDecoder<T>>>()
            .cloned()
            .ok_or_else(|| DbError::DecoderTypeMismatch {
                name: name.to_string(),
                expected: type_name::<T>(),
            })
    }

    /// Returns `true` if a decoder is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.decoders.contains_key(name)
    }

    /// Number of registered decoders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    /// Returns `true` if no decoders are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }
}

impl fmt::Debug for DecoderSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.decoders.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("DecoderSet").field("names", &names).finish()
    }
}
