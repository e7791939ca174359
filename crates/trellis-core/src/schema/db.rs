use super::app::Schema;
use crate::{Error, Result};

use indexmap::IndexMap;

/// Binding from a logical schema to a physical table: the table name plus a
/// field spec per property.
#[derive(Debug, Clone)]
pub struct Table {
    /// Name of the table in the database.
    pub name: String,

    /// The schema this table stores.
    pub schema: Schema,

    /// Per-property storage specs. Scalar properties without an explicit
    /// entry default to a column named after the property once the binding
    /// is verified.
    pub columns: IndexMap<String, FieldSpec>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldSpec {
    /// Storage column backing a scalar property.
    Column(String),

    /// Join predicate backing a relation property, as table-qualified keys,
    /// e.g. `("authors.id", "articles.author_id")`.
    Join { source: String, target: String },
}

impl Table {
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
            columns: IndexMap::new(),
        }
    }

    /// Maps a scalar property to a column name.
    pub fn column(mut self, prop: impl Into<String>, column: impl Into<String>) -> Self {
        self.columns
            .insert(prop.into(), FieldSpec::Column(column.into()));
        self
    }

    /// Maps a relation property to its join key pair.
    pub fn join(
        mut self,
        prop: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        self.columns.insert(
            prop.into(),
            FieldSpec::Join {
                source: source.into(),
                target: target.into(),
            },
        );
        self
    }

    /// Checks every field spec against the declared property types and fills
    /// in default columns for unmapped scalar properties. A spec whose shape
    /// does not match its property type is a configuration error.
    pub fn verify(mut self) -> Result<Self> {
        for prop in self.columns.keys() {
            if !self.schema.props.contains_key(prop) {
                return Err(Error::configuration(format!(
                    "table `{}` maps unknown property `{}.{}`",
                    self.name, self.schema.name, prop
                )));
            }
        }

        for (name, prop) in &self.schema.props {
            let spec = self.columns.get(name);

            if prop.ty.is_relation() {
                match spec {
                    Some(FieldSpec::Join { .. }) => {}
                    Some(FieldSpec::Column(_)) => {
                        return Err(Error::configuration(format!(
                            "relation property `{}.{}` must be mapped to a join key pair",
                            self.schema.name, name
                        )))
                    }
                    None => {
                        return Err(Error::configuration(format!(
                            "relation property `{}.{}` has no join mapping on table `{}`",
                            self.schema.name, name, self.name
                        )))
                    }
                }
            } else if prop.ty.is_computed() {
                if spec.is_some() {
                    return Err(Error::configuration(format!(
                        "computed property `{}.{}` cannot be bound to storage",
                        self.schema.name, name
                    )));
                }
            } else {
                match spec {
                    Some(FieldSpec::Column(_)) => {}
                    Some(FieldSpec::Join { .. }) => {
                        return Err(Error::configuration(format!(
                            "scalar property `{}.{}` must be mapped to a single column",
                            self.schema.name, name
                        )))
                    }
                    None => {
                        // Default: column named after the property.
                        self.columns
                            .insert(name.clone(), FieldSpec::Column(name.clone()));
                    }
                }
            }
        }

        Ok(self)
    }

    /// Returns the storage column for a scalar property, if mapped.
    pub fn scalar_column(&self, prop: &str) -> Option<&str> {
        match self.columns.get(prop) {
            Some(FieldSpec::Column(column)) => Some(column),
            _ => None,
        }
    }

    /// Returns the join key pair for a relation property, if mapped.
    pub fn join_keys(&self, prop: &str) -> Option<(&str, &str)> {
        match self.columns.get(prop) {
            Some(FieldSpec::Join { source, target }) => Some((source, target)),
            _ => None,
        }
    }
}
