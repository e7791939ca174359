//! Compiles declarative, nested query expressions over a relational schema
//! graph into SQL, and folds flat, dot-path-keyed result rows back into
//! nested objects.
//!
//! A [`Builder`] holds an immutable set of [`Table`] bindings. Each call to
//! [`Builder::build`] parses the expression into an ordered path sequence,
//! resolves the joins implied by the schema graph, assigns per-build table
//! aliases, and emits a single SELECT statement. [`Builder::row_parser`]
//! performs the inverse transform: rows keyed by the emitted column aliases
//! reconstruct into nested records, with to-many relations folded into lists
//! by [`merge_parsed_objs`].
//!
//! The core is a pure synchronous transform: no I/O, no caching, no state
//! between calls. Executing the generated SQL is the caller's concern.

mod builder;
pub use builder::{Builder, Built, FilterHook, ResolvedFilter};

mod engine;
pub use engine::context::{Context, TableAlias};
pub use engine::reconstruct::{merge_parsed_objs, Row, RowParser};

pub use trellis_core::{
    expr::{Aggregate, AggregateMethod, ExprValue, Expression},
    path::{ParsedExpr, Path, PathKind},
    query::{Filter, Operator, OrderBy, Pager, Query},
    schema::{collection, computed, model, FieldSpec, Prop, PropTy, ScalarTy, Schema, Table},
    Error, Result, Value,
};
