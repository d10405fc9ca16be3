//! SQL text assembly.
//!
//! Renders built statements and criteria. Placeholders are emitted through
//! a [`SqlWriter`] so the same tree yields both the `:name` form and the
//! dialect form, together with the ordered parameter names.

mod dialect;
mod raw;

pub use self::dialect::Dialect;
pub use self::raw::RawSql;

use crate::ast::{Criteria, JoinHop, JoinKind, LogicalOp, Operator, SelectStatement};

/// Accumulates SQL text and the placeholder names in order.
#[derive(Debug)]
pub struct SqlWriter {
    dialect: Dialect,
    sql: String,
    names: Vec<String>,
}

impl SqlWriter {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            sql: String::new(),
            names: Vec::new(),
        }
    }

    pub fn push(&mut self, s: &str) {
        self.sql.push_str(s);
    }

    pub fn param(&mut self, name: &str) {
        self.names.push(name.to_string());
        let placeholder = self.dialect.placeholder(name, self.names.len());
        self.sql.push_str(&placeholder);
    }

    fn finish(self) -> (String, Vec<String>) {
        (self.sql, self.names)
    }
}

/// Trait for converting AST nodes to SQL.
pub trait ToSql {
    /// Write this node into `w`.
    fn write_sql(&self, w: &mut SqlWriter);

    /// Render this node for `dialect`.
    fn to_sql(&self, dialect: Dialect) -> RawSql {
        let mut named = SqlWriter::new(Dialect::Named);
        self.write_sql(&mut named);
        let (original, _) = named.finish();

        let mut w = SqlWriter::new(dialect);
        self.write_sql(&mut w);
        let (sql, names) = w.finish();
        RawSql { original, sql, names }
    }
}

impl ToSql for SelectStatement {
    fn write_sql(&self, w: &mut SqlWriter) {
        w.push("SELECT ");
        let cols: Vec<String> = self.columns.iter().map(|c| c.to_string()).collect();
        if cols.is_empty() {
            w.push(&format!("{}.*", self.alias));
        } else {
            w.push(&cols.join(", "));
        }

        w.push(&format!(" FROM {} {}", self.table, self.alias));

        for hop in &self.joins {
            hop.write_sql(w);
        }

        if let Some(filter) = &self.filter {
            w.push(" WHERE ");
            filter.write_sql(w);
        }
    }
}

impl ToSql for JoinHop {
    fn write_sql(&self, w: &mut SqlWriter) {
        let kind = match self.kind {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT OUTER JOIN",
        };
        w.push(&format!(" {} {} {} ON ", kind, self.table, self.alias));
        let pairs: Vec<String> = self
            .conditions
            .iter()
            .map(|c| format!("{} = {}", c.from, c.to))
            .collect();
        w.push(&pairs.join(" AND "));
        if let Some(on) = &self.on {
            w.push(" AND ");
            write_member(on, LogicalOp::And, w);
        }
    }
}

impl ToSql for Criteria {
    fn write_sql(&self, w: &mut SqlWriter) {
        match self {
            Criteria::Column(col) => w.push(&col.to_string()),
            Criteria::Raw(value) => w.push(&value.to_string()),
            Criteria::Param(name) => w.param(name),
            Criteria::Subquery(select) => {
                w.push("(");
                select.write_sql(w);
                w.push(")");
            }
            Criteria::Comparison { op, operands } => write_comparison(*op, operands, w),
            Criteria::Boolean { op: LogicalOp::Not, members } => {
                w.push("NOT (");
                write_joined(members, " AND ", LogicalOp::And, w);
                w.push(")");
            }
            Criteria::Boolean { op, members } => {
                let sep = if *op == LogicalOp::And { " AND " } else { " OR " };
                write_joined(members, sep, *op, w);
            }
        }
    }
}

fn write_comparison(op: Operator, operands: &[Criteria], w: &mut SqlWriter) {
    match (op, operands) {
        (Operator::IsNull | Operator::IsNotNull, [lhs, ..]) => {
            lhs.write_sql(w);
            w.push(&format!(" {}", op.as_sql()));
        }
        (Operator::Exists, [sub, ..]) => {
            w.push("EXISTS ");
            sub.write_sql(w);
        }
        (Operator::In | Operator::NotIn, [lhs, values @ ..]) => {
            lhs.write_sql(w);
            w.push(&format!(" {} ", op.as_sql()));
            if let [sub @ Criteria::Subquery(_)] = values {
                sub.write_sql(w);
            } else {
                w.push("(");
                write_joined(values, ", ", LogicalOp::And, w);
                w.push(")");
            }
        }
        (_, [lhs, rhs, ..]) => {
            lhs.write_sql(w);
            w.push(&format!(" {} ", op.as_sql()));
            rhs.write_sql(w);
        }
        (_, [single]) => single.write_sql(w),
        (_, []) => {}
    }
}

fn write_joined(members: &[Criteria], sep: &str, parent: LogicalOp, w: &mut SqlWriter) {
    for (i, member) in members.iter().enumerate() {
        if i > 0 {
            w.push(sep);
        }
        write_member(member, parent, w);
    }
}

/// Parenthesize nested AND/OR groups whose operator differs from the parent.
fn write_member(member: &Criteria, parent: LogicalOp, w: &mut SqlWriter) {
    match member {
        Criteria::Boolean { op, .. } if *op != LogicalOp::Not && *op != parent => {
            w.push("(");
            member.write_sql(w);
            w.push(")");
        }
        _ => member.write_sql(w),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::builders::*;
    use crate::ast::{ColumnRef, JoinCondition, Parameters};
    use pretty_assertions::assert_eq;

    fn c(alias: &str, name: &str) -> Criteria {
        Criteria::Column(ColumnRef::qualified(alias, name))
    }

    #[test]
    fn test_precedence() {
        let crit = and(vec![
            eq(c("t0", "a"), param("p1")),
            or(vec![eq(c("t0", "b"), param("p2")), is_null(c("t0", "c"))]),
        ]);
        assert_eq!(
            crit.to_sql(Dialect::Named).sql,
            "t0.a = :p1 AND (t0.b = :p2 OR t0.c IS NULL)"
        );
    }

    #[test]
    fn test_not_and_in() {
        let crit = not(is_in(c("t0", "id"), vec![param("a"), param("b")]));
        let raw = crit.to_sql(Dialect::Postgres);
        assert_eq!(raw.sql, "NOT (t0.id IN ($1, $2))");
        assert_eq!(raw.original, "NOT (t0.id IN (:a, :b))");
        assert_eq!(raw.names, vec!["a", "b"]);
    }

    #[test]
    fn test_select_with_hops() {
        let select = SelectStatement {
            columns: vec![ColumnRef::qualified("t0", "*")],
            table: "orders".into(),
            alias: "t0".into(),
            joins: vec![JoinHop {
                kind: JoinKind::Left,
                table: "customers".into(),
                alias: "t0_j1".into(),
                conditions: vec![JoinCondition {
                    from: ColumnRef::qualified("t0", "customer_id"),
                    to: ColumnRef::qualified("t0_j1", "id"),
                }],
                on: Some(or(vec![
                    eq(c("t0_j1", "active"), param("x")),
                    is_null(c("t0_j1", "active")),
                ])),
                fetch: false,
            }],
            filter: Some(eq(c("t0", "id"), param("id"))),
            parameters: Parameters::new(),
        };
        let raw = select.to_sql(Dialect::MySQL);
        assert_eq!(
            raw.sql,
            "SELECT t0.* FROM orders t0 \
             LEFT OUTER JOIN customers t0_j1 ON t0.customer_id = t0_j1.id \
             AND (t0_j1.active = ? OR t0_j1.active IS NULL) WHERE t0.id = ?"
        );
        assert_eq!(raw.names, vec!["x", "id"]);
    }
}
