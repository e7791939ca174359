mod error;
pub use error::Error;

pub mod expr;

pub mod path;

pub mod query;

pub mod schema;

mod value;
pub use value::Value;

/// A Result type alias that uses trellis's [`Error`] type.
pub type Result<T> = core::result::Result<T, Error>;
