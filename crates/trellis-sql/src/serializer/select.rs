use super::{Comma, Formatter, ToSql};
use crate::stmt::{Join, Select, TableRef};

impl ToSql for &Select {
    fn to_sql(self, f: &mut Formatter<'_>) {
        fmt!(f, "SELECT ");
        if self.distinct {
            fmt!(f, "DISTINCT ");
        }
        fmt!(f, Comma(&self.columns), " ", &self.from);

        for join in &self.joins {
            fmt!(f, " ", join);
        }

        for (i, condition) in self.filters.iter().enumerate() {
            let prefix = if i == 0 {
                " WHERE "
            } else if condition.or {
                " OR "
            } else {
                " AND "
            };
            fmt!(f, prefix, condition);
        }

        if !self.group_by.is_empty() {
            fmt!(f, " GROUP BY ", Comma(&self.group_by));
        }

        if !self.order_by.is_empty() {
            fmt!(f, " ORDER BY ", Comma(&self.order_by));
        }

        if let Some(limit) = self.limit {
            fmt!(f, " LIMIT ", limit);
        }

        if let Some(offset) = self.offset {
            fmt!(f, " OFFSET ", offset);
        }
    }
}

impl ToSql for &TableRef {
    fn to_sql(self, f: &mut Formatter<'_>) {
        match self {
            TableRef::Table { name, alias } => fmt!(f, "FROM ", name, " ", alias),
            TableRef::Subquery { select, alias } => {
                fmt!(f, "FROM (", &**select, ") ", alias);
            }
        }
    }
}

impl ToSql for &Join {
    fn to_sql(self, f: &mut Formatter<'_>) {
        fmt!(
            f,
            "LEFT JOIN ",
            &self.table,
            " ",
            &self.alias,
            " ON ",
            &self.on.0,
            " = ",
            &self.on.1,
        );
    }
}
