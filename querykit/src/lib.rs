//! Named prepared statements over `SQLite`.
//!
//! Tables, parameterized statements and row decoders are declared once on a
//! [`RegistryBuilder`]. Building it creates the tables and freezes the
//! declarations into a [`Registry`]; every [`Connection`] opened from the
//! registry compiles the statements it asks for and runs them by name with
//! typed [`Value`] parameters.
//!
//! ```
//! use querykit::{params, Registry, SingleInteger};
//!
//! # fn main() -> querykit::DbResult<()> {
//! let registry = Registry::builder()
//!     .table("t", ["id integer primary key", "name text"])
//!     .prepared_statement("insert", "insert into t(name) values(?)", true)
//!     .statement("count", "select count(*) from t")
//!     .build()?;
//!
//! let mut conn = registry.connect()?;
//! let key = conn.execute("insert", params!["a"])?;
//! assert_eq!(key.as_deref(), Some("1"));
//! let count: Option<i64> = conn.query_one("count", &SingleInteger, params![])?;
//! assert_eq!(count, Some(1));
//! conn.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! Every operation returns a [`DbResult`]. Errors from the engine or from
//! unknown statement and decoder names end the operation; nothing is retried
//! or rolled back automatically. [`integer_to_boolean`] is the one
//! validation step whose error is meant to be handled and moved past.

mod blueprint;
mod config;
mod connection;
mod decoder;
pub mod error;
mod registry;
mod transaction;
pub mod value;

pub use blueprint::{StatementBlueprint, TableBlueprint};
pub use config::{DbConfig, Manifest, Target, MEMORY_ADDRESS};
pub use connection::Connection;
pub use decoder::{DecoderSet, RowDecoder, SingleDouble, SingleInteger, SingleString, SingleValue};
pub use error::{DbError, DbResult, InvalidBoolean};
pub use registry::{Registry, RegistryBuilder};
pub use transaction::Transaction;
pub use value::{bool_to_integer, integer_to_boolean, Value, ValueKind};

#[cfg(test)]
mod tests;
