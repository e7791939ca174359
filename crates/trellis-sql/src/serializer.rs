#[macro_use]
mod fmt;
use fmt::ToSql;

mod delim;
use delim::Comma;

// Fragment serializers
mod expr;
mod select;
mod value;

use crate::stmt;

/// Serialize a statement to a SQL string.
#[derive(Debug, Default)]
pub struct Serializer {
    _private: (),
}

struct Formatter<'a> {
    /// Where to write the serialized SQL
    dst: &'a mut String,
}

impl Serializer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serialize(&self, stmt: &stmt::Select) -> String {
        let mut ret = String::new();

        let mut fmt = Formatter { dst: &mut ret };
        stmt.to_sql(&mut fmt);

        ret
    }
}
