use crate::builder::TableMap;
use crate::engine::{self, Context};

use indexmap::IndexMap;
use std::sync::Arc;
use trellis_core::{
    path::{self, PathKind},
    schema::{PropTy, ScalarTy, Schema},
    Error, Result, Value,
};

/// A flat result row keyed by dotted output path, as emitted in the SELECT
/// column aliases.
pub type Row = IndexMap<String, Value>;

/// Folds flat rows of one compiled query back into nested objects. Built
/// once per query and reusable across all of its rows.
pub struct RowParser {
    tables: Arc<TableMap>,
    context: Context,
}

impl RowParser {
    pub(crate) fn new(tables: Arc<TableMap>, context: Context) -> Self {
        Self { tables, context }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Reconstructs one row into a nested record. The root segment is
    /// consumed: the result is the root entity's record itself. Computed
    /// properties resolve afterwards, against the value at their parent
    /// path; resolver errors propagate untouched.
    pub fn parse_row(&self, row: &Row) -> Result<Value> {
        let root = self
            .context
            .parsed_expr
            .root()
            .ok_or_else(|| Error::malformed_expression("expression must name a root schema"))?
            .path
            .clone();
        let root_table = self.tables.table(&root)?;

        let mut record = self.construct(&root, &root_table.schema, row)?;

        for p in &self.context.parsed_expr.paths {
            if !p.computed {
                continue;
            }

            let prefix = path::prefix(&p.path);
            let table = engine::resolve_prefix_table(&self.tables, prefix)?;
            let resolver = table
                .schema
                .prop_by_name(path::last_segment(&p.path))
                .and_then(|prop| prop.ty.resolver())
                .ok_or_else(|| {
                    Error::configuration(format!("`{}` is not a computed property", p.path))
                })?;

            // Relative segments, with the root segment stripped.
            let segments: Vec<&str> = p.path.split('.').skip(1).collect();
            let (parent_segments, _) = segments.split_at(segments.len() - 1);

            let holder = Value::Record(record);
            let parent = value_at(&holder, parent_segments).unwrap_or(&Value::Null);
            let resolved = resolver.as_ref()(parent)?;

            let Value::Record(inner) = holder.merge(Value::Record(self.nest_along(
                &root_table.schema,
                &segments,
                resolved,
            )?)) else {
                unreachable!("merging records yields a record");
            };
            record = inner;
        }

        Ok(Value::Record(record))
    }

    /// Structural fold over the parsed path tree: scalar leaves assign (with
    /// numeric coercion for Number props and aggregation selectors), Model
    /// relations nest records, and Collection relations wrap each row's
    /// contribution in a single-element list for later merging.
    fn construct(
        &self,
        prefix: &str,
        schema: &Schema,
        row: &Row,
    ) -> Result<IndexMap<String, Value>> {
        let mut record = IndexMap::new();

        for p in &self.context.parsed_expr.paths {
            if path::prefix(&p.path) != prefix {
                continue;
            }
            let name = path::last_segment(&p.path);

            match &p.kind {
                PathKind::Field if !p.computed => {
                    if let Some(value) = row.get(&p.path) {
                        let numeric = matches!(
                            schema.prop_by_name(name).map(|prop| &prop.ty),
                            Some(PropTy::Scalar(ScalarTy::Number))
                        );
                        let value = if numeric {
                            value.clone().coerce_numeric()
                        } else {
                            value.clone()
                        };
                        record.insert(name.to_string(), value);
                    }
                }
                PathKind::Aggregate(_) => {
                    if let Some(value) = row.get(&p.path) {
                        record.insert(name.to_string(), value.clone().coerce_numeric());
                    }
                }
                PathKind::Relation => {
                    let Some(target) = schema.relation_target(name) else {
                        continue;
                    };
                    let target_table = self.tables.table(target)?;
                    let child = self.construct(&p.path, &target_table.schema, row)?;
                    if child.is_empty() {
                        continue;
                    }

                    let is_collection = schema
                        .prop_by_name(name)
                        .map(|prop| prop.ty.is_collection())
                        .unwrap_or_default();
                    let value = if is_collection {
                        Value::List(vec![Value::Record(child)])
                    } else {
                        Value::Record(child)
                    };
                    record.insert(name.to_string(), value);
                }
                PathKind::Field => {}
            }
        }

        Ok(record)
    }

    /// Builds a nested record along `segments`, wrapping per the relation
    /// types on the way down, with `value` at the leaf.
    fn nest_along(
        &self,
        schema: &Schema,
        segments: &[&str],
        value: Value,
    ) -> Result<IndexMap<String, Value>> {
        let (head, rest) = segments
            .split_first()
            .expect("computed paths have at least one relative segment");

        let mut record = IndexMap::new();
        if rest.is_empty() {
            record.insert(head.to_string(), value);
            return Ok(record);
        }

        let target = schema.relation_target(head).ok_or_else(|| {
            Error::configuration(format!("no relation `{head}` on schema `{}`", schema.name))
        })?;
        let target_table = self.tables.table(target)?;
        let child = Value::Record(self.nest_along(&target_table.schema, rest, value)?);

        let is_collection = schema
            .prop_by_name(head)
            .map(|prop| prop.ty.is_collection())
            .unwrap_or_default();
        record.insert(
            head.to_string(),
            if is_collection {
                Value::List(vec![child])
            } else {
                child
            },
        );

        Ok(record)
    }
}

fn value_at<'a>(value: &'a Value, segments: &[&str]) -> Option<&'a Value> {
    let mut current = value;
    for segment in segments {
        match current {
            Value::Record(map) => current = map.get(*segment)?,
            _ => return None,
        }
    }
    Some(current)
}

/// Groups parsed objects by structural equality of their non-list fields;
/// within a group, list fields concatenate, and the merge recurses into each
/// list field's elements. This reassembles a denormalized join result set
/// into its original tree shape, for arbitrarily deep nested collections.
pub fn merge_parsed_objs(objs: Vec<Value>) -> Vec<Value> {
    let mut grouped: Vec<Value> = Vec::new();

    for obj in objs {
        let Value::Record(src) = obj else {
            grouped.push(obj);
            continue;
        };

        let pos = grouped
            .iter()
            .position(|g| matches!(g, Value::Record(a) if scalar_parts_eq(a, &src)));

        match pos {
            Some(i) => {
                let Value::Record(target) = &mut grouped[i] else {
                    unreachable!("groups are records");
                };
                for (key, value) in src {
                    if let Value::List(items) = value {
                        match target.get_mut(&key) {
                            Some(Value::List(existing)) => existing.extend(items),
                            _ => {
                                target.insert(key, Value::List(items));
                            }
                        }
                    }
                }
            }
            None => grouped.push(Value::Record(src)),
        }
    }

    for obj in &mut grouped {
        if let Value::Record(map) = obj {
            for value in map.values_mut() {
                if let Value::List(items) = value {
                    *items = merge_parsed_objs(std::mem::take(items));
                }
            }
        }
    }

    grouped
}

fn scalar_parts_eq(a: &IndexMap<String, Value>, b: &IndexMap<String, Value>) -> bool {
    let scalars = |map: &IndexMap<String, Value>| -> Vec<(String, Value)> {
        map.iter()
            .filter(|(_, v)| !v.is_list())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    };

    let a_scalars = scalars(a);
    a_scalars.len() == scalars(b).len()
        && a_scalars
            .iter()
            .all(|(k, v)| b.get(k).is_some_and(|bv| !bv.is_list() && bv == v))
}
