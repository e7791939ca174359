mod select;
pub use select::{
    AggregateTarget, Condition, Join, OrderByExpr, Select, SelectExpr, TableRef,
};
