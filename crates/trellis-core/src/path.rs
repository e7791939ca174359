use crate::expr::Aggregate;

/// One parsed-expression tree node: a canonical dotted address plus its
/// classification.
#[derive(Debug, Clone)]
pub struct Path {
    /// Canonical dotted path, e.g. `author.articles.title`.
    pub path: String,

    /// User-declared alias, usable in filters/group-by/order-by.
    pub alias: Option<String>,

    pub kind: PathKind,

    /// True when the underlying property is computed; such paths are
    /// deferred from SQL projection to post-reconstruction resolution.
    pub computed: bool,
}

#[derive(Debug, Clone)]
pub enum PathKind {
    Field,
    Aggregate(Aggregate),
    Relation,
}

/// The ordered result of parsing an expression. Paths are in pre-order:
/// every path is string-prefixed by its parent's path.
#[derive(Debug, Clone, Default)]
pub struct ParsedExpr {
    pub paths: Vec<Path>,
}

impl Path {
    pub fn is_field(&self) -> bool {
        matches!(self.kind, PathKind::Field)
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self.kind, PathKind::Aggregate(_))
    }

    pub fn is_relation(&self) -> bool {
        matches!(self.kind, PathKind::Relation)
    }
}

impl ParsedExpr {
    /// The root path: the expression's first top-level key.
    pub fn root(&self) -> Option<&Path> {
        self.paths.first()
    }

    /// Resolves a dotted reference segment by segment: a segment equal to a
    /// known path alias is replaced by that path's full canonical path,
    /// otherwise the segment is appended verbatim. Idempotent on canonical
    /// input; aliases and canonical segments mix freely.
    pub fn normalize_fetch_path(&self, raw: &str) -> String {
        let mut resolved = String::new();
        for segment in raw.split('.') {
            let aliased = self
                .paths
                .iter()
                .find(|p| p.alias.as_deref() == Some(segment));
            match aliased {
                Some(path) => {
                    resolved.clear();
                    resolved.push_str(&path.path);
                }
                None => {
                    if !resolved.is_empty() {
                        resolved.push('.');
                    }
                    resolved.push_str(segment);
                }
            }
        }
        resolved
    }
}

/// The path minus its last segment; empty for single-segment paths.
pub fn prefix(path: &str) -> &str {
    match path.rfind('.') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// The last segment of a dotted path.
pub fn last_segment(path: &str) -> &str {
    match path.rfind('.') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Number of segments in a dotted path.
pub fn depth(path: &str) -> usize {
    path.split('.').count()
}
