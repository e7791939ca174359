use std::fmt;

/// An error that can occur while declaring schemas or compiling a query.
pub struct Error {
    kind: ErrorKind,
}

#[derive(Debug)]
enum ErrorKind {
    /// Schema or table metadata does not support the requested operation:
    /// unknown schema/prop/relation, a field spec whose shape does not match
    /// the declared property type, or a reference to a schema that is not
    /// part of the current build context.
    Configuration(String),

    /// An expression value was neither boolean `true`, an aggregation
    /// object, nor a nested mapping.
    MalformedExpression(String),

    /// The query shape itself is invalid, e.g. a zero pager limit.
    Validation(String),

    /// Bridged error, e.g. a computed-property resolver failure.
    Anyhow(anyhow::Error),
}

impl Error {
    /// Creates a configuration error.
    pub fn configuration(msg: impl fmt::Display) -> Self {
        ErrorKind::Configuration(msg.to_string()).into()
    }

    /// Creates a malformed-expression error.
    pub fn malformed_expression(msg: impl fmt::Display) -> Self {
        ErrorKind::MalformedExpression(msg.to_string()).into()
    }

    /// Creates a validation error.
    pub fn validation(msg: impl fmt::Display) -> Self {
        ErrorKind::Validation(msg.to_string()).into()
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self.kind, ErrorKind::Configuration(_))
    }

    pub fn is_malformed_expression(&self) -> bool {
        matches!(self.kind, ErrorKind::MalformedExpression(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self.kind, ErrorKind::Validation(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::Configuration(msg) => write!(f, "invalid configuration: {msg}"),
            ErrorKind::MalformedExpression(msg) => write!(f, "malformed expression: {msg}"),
            ErrorKind::Validation(msg) => write!(f, "invalid query: {msg}"),
            ErrorKind::Anyhow(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            f.debug_struct("Error").field("kind", &self.kind).finish()
        } else {
            fmt::Display::fmt(self, f)
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ErrorKind::Anyhow(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self { kind }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        ErrorKind::Anyhow(err).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_display() {
        let err = Error::configuration("unknown schema `customer`");
        assert!(err.is_configuration());
        assert_eq!(
            err.to_string(),
            "invalid configuration: unknown schema `customer`"
        );
    }

    #[test]
    fn malformed_expression_display() {
        let err = Error::malformed_expression("value for `name` is neither true nor a mapping");
        assert!(err.is_malformed_expression());
        assert!(!err.is_configuration());
        assert_eq!(
            err.to_string(),
            "malformed expression: value for `name` is neither true nor a mapping"
        );
    }

    #[test]
    fn anyhow_bridge() {
        let err: Error = anyhow::anyhow!("resolver blew up").into();
        assert_eq!(err.to_string(), "resolver blew up");
        assert!(!err.is_configuration());
    }
}
