use chrono::{DateTime, Utc};
use indexmap::IndexMap;

/// A dynamically typed value: filter inputs, result-row cells, and
/// reconstructed nested objects are all represented with this tree.
#[derive(Debug, Default, Clone, PartialEq)]
pub enum Value {
    /// Null value
    #[default]
    Null,

    /// Boolean value
    Bool(bool),

    /// Signed 64-bit integer
    I64(i64),

    /// 64-bit float
    F64(f64),

    /// String value
    String(String),

    /// UTC timestamp
    Timestamp(DateTime<Utc>),

    /// A list of values; reconstruction uses lists for to-many relations
    List(Vec<Value>),

    /// An ordered record keyed by field name
    Record(IndexMap<String, Value>),
}

impl Value {
    pub const fn null() -> Self {
        Self::Null
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub const fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }

    pub const fn is_record(&self) -> bool {
        matches!(self, Self::Record(_))
    }

    pub fn record_from_iter<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self::Record(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v))
                .collect(),
        )
    }

    pub fn as_record(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Self::Record(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Coerces the value to a numeric representation. Row sources frequently
    /// return aggregates and numeric columns as text; native numerics must
    /// pass through untouched.
    ///
    /// Unparseable or empty strings coerce to `Null`.
    pub fn coerce_numeric(self) -> Self {
        match self {
            Self::Null => Self::Null,
            Self::Bool(b) => Self::I64(b as i64),
            Self::I64(_) | Self::F64(_) => self,
            Self::String(s) => {
                let s = s.trim();
                if s.is_empty() {
                    Self::Null
                } else if let Ok(n) = s.parse::<i64>() {
                    Self::I64(n)
                } else if let Ok(n) = s.parse::<f64>() {
                    Self::F64(n)
                } else {
                    Self::Null
                }
            }
            Self::Timestamp(ts) => Self::I64(ts.timestamp_millis()),
            Self::List(_) | Self::Record(_) => self,
        }
    }

    /// Deep-merges `other` into `self`: record keys merge recursively, lists
    /// merge element-wise (extra elements append), and any other pairing is
    /// replaced by `other`.
    pub fn merge(self, other: Value) -> Value {
        match (self, other) {
            (Value::Record(mut a), Value::Record(b)) => {
                for (key, vb) in b {
                    match a.entry(key) {
                        indexmap::map::Entry::Occupied(mut entry) => {
                            let va = std::mem::take(entry.get_mut());
                            *entry.get_mut() = va.merge(vb);
                        }
                        indexmap::map::Entry::Vacant(entry) => {
                            entry.insert(vb);
                        }
                    }
                }
                Value::Record(a)
            }
            (Value::List(a), Value::List(b)) => {
                let mut a = a.into_iter();
                let mut b = b.into_iter();
                let mut merged = Vec::new();
                loop {
                    match (a.next(), b.next()) {
                        (Some(va), Some(vb)) => merged.push(va.merge(vb)),
                        (Some(va), None) => merged.push(va),
                        (None, Some(vb)) => merged.push(vb),
                        (None, None) => break,
                    }
                }
                Value::List(merged)
            }
            (_, other) => other,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::I64(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::F64(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::I64(i),
                None => Self::F64(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Self::Record(
                map.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
            ),
        }
    }
}

impl<'de> serde::Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn coerce_numeric_parses_text() {
        assert_eq!(Value::from("1").coerce_numeric(), Value::I64(1));
        assert_eq!(Value::from("2.5").coerce_numeric(), Value::F64(2.5));
        assert_eq!(Value::from("").coerce_numeric(), Value::Null);
        assert_eq!(Value::from("abc").coerce_numeric(), Value::Null);
    }

    #[test]
    fn coerce_numeric_passes_native_numbers_through() {
        assert_eq!(Value::I64(7).coerce_numeric(), Value::I64(7));
        assert_eq!(Value::F64(0.5).coerce_numeric(), Value::F64(0.5));
        assert_eq!(Value::Null.coerce_numeric(), Value::Null);
    }

    #[test]
    fn merge_records_recursively() {
        let a = Value::record_from_iter([
            ("name", Value::from("ada")),
            (
                "articles",
                Value::List(vec![Value::record_from_iter([("title", Value::from("t"))])]),
            ),
        ]);
        let b = Value::record_from_iter([(
            "articles",
            Value::List(vec![Value::record_from_iter([(
                "status",
                Value::from("PUBLISHED"),
            )])]),
        )]);

        let merged = a.merge(b);
        assert_eq!(
            merged,
            Value::record_from_iter([
                ("name", Value::from("ada")),
                (
                    "articles",
                    Value::List(vec![Value::record_from_iter([
                        ("title", Value::from("t")),
                        ("status", Value::from("PUBLISHED")),
                    ])]),
                ),
            ])
        );
    }

    #[test]
    fn merge_lists_appends_extra_elements() {
        let a = Value::List(vec![Value::I64(1)]);
        let b = Value::List(vec![Value::I64(2), Value::I64(3)]);
        assert_eq!(a.merge(b), Value::List(vec![Value::I64(2), Value::I64(3)]));
    }

    #[test]
    fn from_json_number() {
        let v: Value = serde_json::json!(10).into();
        assert_eq!(v, Value::I64(10));
        let v: Value = serde_json::json!(10.5).into();
        assert_eq!(v, Value::F64(10.5));
    }
}
