pub mod app;
pub use app::{collection, computed, model, Prop, PropTy, Resolver, ScalarTy, Schema};

pub mod db;
pub use db::{FieldSpec, Table};
