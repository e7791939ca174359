use crate::{Result, Value};

use indexmap::IndexMap;
use std::{fmt, sync::Arc};

/// Logical entity descriptor: a name plus typed properties, independent of
/// physical storage.
#[derive(Debug, Clone)]
pub struct Schema {
    /// Name of the schema; relation properties refer to other schemas by this
    /// name.
    pub name: String,

    /// Properties contained by the schema, in declaration order.
    pub props: IndexMap<String, Prop>,
}

#[derive(Debug, Clone)]
pub struct Prop {
    pub ty: PropTy,
}

#[derive(Clone)]
pub enum PropTy {
    /// Value stored in a column of the bound table.
    Scalar(ScalarTy),

    /// To-one relation to another schema.
    Model(String),

    /// To-many relation to another schema.
    Collection(String),

    /// Derived after reconstruction from an already-reconstructed value;
    /// never selected from storage.
    Computed(Resolver),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarTy {
    String,
    Number,
    Date,
}

/// Resolver for a computed property. Receives the reconstructed value at the
/// property's parent path.
pub type Resolver = Arc<dyn Fn(&Value) -> Result<Value> + Send + Sync>;

/// Creates a to-many relation property type.
pub fn collection(target: impl Into<String>) -> PropTy {
    PropTy::Collection(target.into())
}

/// Creates a to-one relation property type.
pub fn model(target: impl Into<String>) -> PropTy {
    PropTy::Model(target.into())
}

/// Creates a computed property type from a resolver.
pub fn computed<F>(resolver: F) -> PropTy
where
    F: Fn(&Value) -> Result<Value> + Send + Sync + 'static,
{
    PropTy::Computed(Arc::new(resolver))
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            props: IndexMap::new(),
        }
    }

    /// Adds a property. Scalar types convert implicitly; relation and
    /// computed types come from [`collection`], [`model`], and [`computed`].
    pub fn prop(mut self, name: impl Into<String>, ty: impl Into<PropTy>) -> Self {
        self.props.insert(name.into(), Prop { ty: ty.into() });
        self
    }

    pub fn prop_by_name(&self, name: &str) -> Option<&Prop> {
        self.props.get(name)
    }

    /// If `name` is a relation property, returns the target schema name.
    pub fn relation_target(&self, name: &str) -> Option<&str> {
        match self.props.get(name).map(|prop| &prop.ty) {
            Some(PropTy::Model(target)) | Some(PropTy::Collection(target)) => Some(target),
            _ => None,
        }
    }
}

impl PropTy {
    pub fn is_relation(&self) -> bool {
        matches!(self, Self::Model(_) | Self::Collection(_))
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, Self::Collection(_))
    }

    pub fn is_computed(&self) -> bool {
        matches!(self, Self::Computed(_))
    }

    pub fn scalar_ty(&self) -> Option<ScalarTy> {
        match self {
            Self::Scalar(ty) => Some(*ty),
            _ => None,
        }
    }

    pub fn resolver(&self) -> Option<&Resolver> {
        match self {
            Self::Computed(resolver) => Some(resolver),
            _ => None,
        }
    }
}

impl From<ScalarTy> for PropTy {
    fn from(ty: ScalarTy) -> Self {
        Self::Scalar(ty)
    }
}

impl fmt::Debug for PropTy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(ty) => f.debug_tuple("Scalar").field(ty).finish(),
            Self::Model(target) => f.debug_tuple("Model").field(target).finish(),
            Self::Collection(target) => f.debug_tuple("Collection").field(target).finish(),
            Self::Computed(_) => f.write_str("Computed"),
        }
    }
}
