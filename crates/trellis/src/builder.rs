use crate::engine::{context, lower, parse, reconstruct::RowParser, Context};

use indexmap::IndexMap;
use std::sync::Arc;
use trellis_core::{
    query::{Operator, Query},
    schema::{ScalarTy, Table},
    Error, Result, Value,
};

/// Compiles queries against a fixed set of table bindings.
///
/// Construction verifies every binding. A Builder is immutable afterwards
/// and can be shared by concurrent callers; [`Builder::with_filter_hook`]
/// returns a new Builder and leaves the original untouched.
#[derive(Clone)]
pub struct Builder {
    tables: Arc<TableMap>,
    filter_hook: Option<FilterHook>,
}

/// Late-binding transform of the fully resolved filter list, applied
/// immediately before WHERE concatenation.
pub type FilterHook =
    Arc<dyn Fn(Vec<ResolvedFilter>, &Context) -> Vec<ResolvedFilter> + Send + Sync>;

/// A filter whose reference has been resolved against the build context.
#[derive(Debug, Clone)]
pub struct ResolvedFilter {
    /// Alias-qualified column, e.g. `authors_x1.status`.
    pub column: String,
    pub operator: Operator,
    pub value: Value,
    pub scalar_ty: Option<ScalarTy>,
    pub or: bool,
}

/// The output of a build: the resolved context plus the SQL text.
#[derive(Debug)]
pub struct Built {
    pub context: Context,
    pub sql: String,
}

/// Table bindings indexed by schema name.
pub(crate) struct TableMap {
    tables: IndexMap<String, Table>,
}

impl TableMap {
    pub(crate) fn new(tables: Vec<Table>) -> Result<Self> {
        let mut map = IndexMap::with_capacity(tables.len());
        for table in tables {
            let table = table.verify()?;
            map.insert(table.schema.name.clone(), table);
        }
        Ok(Self { tables: map })
    }

    pub(crate) fn table(&self, schema: &str) -> Result<&Table> {
        self.tables
            .get(schema)
            .ok_or_else(|| Error::configuration(format!("unknown schema `{schema}`")))
    }
}

impl Builder {
    pub fn new(tables: Vec<Table>) -> Result<Self> {
        Ok(Self {
            tables: Arc::new(TableMap::new(tables)?),
            filter_hook: None,
        })
    }

    /// Returns a new Builder that runs `hook` over every resolved filter
    /// list before WHERE emission.
    pub fn with_filter_hook<F>(&self, hook: F) -> Self
    where
        F: Fn(Vec<ResolvedFilter>, &Context) -> Vec<ResolvedFilter> + Send + Sync + 'static,
    {
        Self {
            tables: self.tables.clone(),
            filter_hook: Some(Arc::new(hook)),
        }
    }

    /// Compiles `query` into a SELECT statement plus the per-build context.
    pub fn build(&self, query: &Query) -> Result<Built> {
        let parsed = parse::parse_query(&self.tables, query)?;
        let context = context::create_context(&self.tables, parsed)?;
        let stmt = lower::lower(&self.tables, &context, query, self.filter_hook.as_deref())?;
        let sql = trellis_sql::Serializer::new().serialize(&stmt);

        log::debug!("built sql: {sql}");

        Ok(Built { context, sql })
    }

    /// Builds a reusable parser that folds flat rows of `query` back into
    /// nested objects.
    pub fn row_parser(&self, query: &Query) -> Result<RowParser> {
        let parsed = parse::parse_query(&self.tables, query)?;
        let context = context::create_context(&self.tables, parsed)?;
        Ok(RowParser::new(self.tables.clone(), context))
    }
}
