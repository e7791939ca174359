use super::Formatter;

use chrono::{DateTime, Utc};
use trellis_core::Value;

/// Writes a SQL literal. Strings are single-quoted and escaped, numbers and
/// booleans render bare, timestamps format as `YYYY-MM-DD HH:mm:ss.mmm` UTC,
/// and lists join with ` AND ` (BETWEEN bounds).
pub(super) fn literal(value: &Value, f: &mut Formatter<'_>) {
    use std::fmt::Write;

    match value {
        Value::Null => f.dst.push_str("NULL"),
        Value::Bool(b) => f.dst.push_str(if *b { "true" } else { "false" }),
        Value::I64(n) => {
            let _ = write!(f.dst, "{n}");
        }
        Value::F64(n) => {
            let _ = write!(f.dst, "{n}");
        }
        Value::String(s) => quote(s, f.dst),
        Value::Timestamp(ts) => quote(&format_timestamp(ts), f.dst),
        Value::List(items) => {
            let mut s = "";
            for item in items {
                f.dst.push_str(s);
                literal(item, f);
                s = " AND ";
            }
        }
        // Records never survive lowering; render as NULL rather than panic.
        Value::Record(_) => f.dst.push_str("NULL"),
    }
}

pub(super) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

fn quote(s: &str, dst: &mut String) {
    dst.push('\'');
    for c in s.chars() {
        match c {
            '\0' => dst.push_str("\\0"),
            '\n' => dst.push_str("\\n"),
            '\r' => dst.push_str("\\r"),
            '\u{0008}' => dst.push_str("\\b"),
            '\t' => dst.push_str("\\t"),
            '\u{001a}' => dst.push_str("\\Z"),
            '\'' => dst.push_str("''"),
            '\\' => dst.push_str("\\\\"),
            '"' => dst.push_str("\\\""),
            _ => dst.push(c),
        }
    }
    dst.push('\'');
}
