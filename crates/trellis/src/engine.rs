pub(crate) mod context;
pub(crate) use context::Context;

pub(crate) mod lower;
pub(crate) mod parse;
pub(crate) mod reconstruct;

use crate::builder::TableMap;

use trellis_core::{schema::Table, Error, Result};

/// Resolves the table backing a dotted prefix by walking relation targets
/// segment by segment. The first segment names a schema; each further
/// segment must be a Model/Collection property of the schema reached so far.
pub(crate) fn resolve_prefix_table<'a>(tables: &'a TableMap, prefix: &str) -> Result<&'a Table> {
    let mut segments = prefix.split('.');
    let root = match segments.next() {
        Some(root) if !root.is_empty() => root,
        _ => {
            return Err(Error::configuration(
                "reference path must start with a schema name",
            ))
        }
    };

    let mut table = tables.table(root)?;
    for segment in segments {
        let target = table.schema.relation_target(segment).ok_or_else(|| {
            Error::configuration(format!(
                "no relation `{segment}` on schema `{}`",
                table.schema.name
            ))
        })?;
        table = tables.table(target)?;
    }

    Ok(table)
}
