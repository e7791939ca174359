use crate::builder::TableMap;
use crate::engine::parse::ParsedQuery;

use indexmap::{IndexMap, IndexSet};
use rand::{distributions::Alphanumeric, Rng};
use std::collections::HashSet;
use trellis_core::{
    path::{self, ParsedExpr},
    Error, Result,
};

/// Per-build resolved state: the parsed expression, the normalized reference
/// paths, and the schema → table/alias mapping.
#[derive(Debug, Clone)]
pub struct Context {
    pub parsed_expr: ParsedExpr,

    /// Normalized reference paths from filters, group-by, and order-by.
    /// Relations reachable only through these still join.
    pub parsed_filters: Vec<String>,

    /// Schema name → table name and per-build alias, root schema first.
    /// Aliases are unique within this context only.
    pub mapping: IndexMap<String, TableAlias>,
}

#[derive(Debug, Clone)]
pub struct TableAlias {
    pub table_name: String,
    pub alias: String,
}

impl Context {
    pub fn alias_of(&self, schema: &str) -> Result<&str> {
        self.mapping
            .get(schema)
            .map(|entry| entry.alias.as_str())
            .ok_or_else(|| {
                Error::configuration(format!("schema `{schema}` is not part of this build"))
            })
    }

    pub(crate) fn root_schema(&self) -> &str {
        self.parsed_expr
            .root()
            .map(|path| path.path.as_str())
            .unwrap_or_default()
    }
}

/// An adjacency pair on a join path: relation property `prop` links schema
/// `source` to schema `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct JoinPair {
    pub source: String,
    pub prop: String,
    pub target: String,
}

pub(crate) fn create_context(tables: &TableMap, parsed: ParsedQuery) -> Result<Context> {
    let ParsedQuery { expr, refs } = parsed;

    let root = expr
        .root()
        .ok_or_else(|| Error::malformed_expression("expression must name a root schema"))?
        .path
        .clone();

    // The root schema is always mapped, even when never joined.
    let mut wanted = IndexSet::new();
    wanted.insert(root);
    for join_path in join_paths(&expr, &refs) {
        for pair in join_pairs(tables, &join_path)? {
            wanted.insert(pair.source);
            wanted.insert(pair.target);
        }
    }

    let mut mapping = IndexMap::with_capacity(wanted.len());
    let mut used = HashSet::new();
    for schema in wanted {
        let table = tables.table(&schema)?;
        let alias = gen_alias(&table.name, &mut used);
        mapping.insert(
            schema,
            TableAlias {
                table_name: table.name.clone(),
                alias,
            },
        );
    }

    log::trace!(
        "build context maps {} schema(s): {:?}",
        mapping.len(),
        mapping.keys().collect::<Vec<_>>()
    );

    Ok(Context {
        parsed_expr: expr,
        parsed_filters: refs,
        mapping,
    })
}

/// Join-requiring paths in first-seen order: relation paths from the
/// expression, then reference prefixes spanning more than one segment.
pub(crate) fn join_paths(expr: &ParsedExpr, refs: &[String]) -> Vec<String> {
    let mut paths: Vec<String> = expr
        .paths
        .iter()
        .filter(|p| p.is_relation() && path::depth(&p.path) > 1)
        .map(|p| p.path.clone())
        .collect();

    for reference in refs {
        let prefix = path::prefix(reference);
        if path::depth(prefix) > 1 && !paths.iter().any(|p| p == prefix) {
            paths.push(prefix.to_string());
        }
    }

    paths
}

/// Splits a join path into ordered adjacency pairs, resolving each pair's
/// target schema through the source schema's relation property. A segment
/// with no matching relation is a configuration error, raised before any
/// SQL is produced.
pub(crate) fn join_pairs(tables: &TableMap, join_path: &str) -> Result<Vec<JoinPair>> {
    let mut segments = join_path.split('.');
    let Some(first) = segments.next() else {
        return Ok(vec![]);
    };

    let mut pairs = Vec::new();
    let mut source = first.to_string();
    for prop in segments {
        let table = tables.table(&source)?;
        let target = table
            .schema
            .relation_target(prop)
            .ok_or_else(|| {
                Error::configuration(format!("no relation `{prop}` on schema `{source}`"))
            })?
            .to_string();
        pairs.push(JoinPair {
            source: std::mem::replace(&mut source, target.clone()),
            prop: prop.to_string(),
            target,
        });
    }

    Ok(pairs)
}

fn gen_alias(table: &str, used: &mut HashSet<String>) -> String {
    loop {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(6)
            .map(|b| (b as char).to_ascii_lowercase())
            .collect();
        let alias = format!("{table}_{suffix}");
        if used.insert(alias.clone()) {
            return alias;
        }
    }
}
