use serde::{Deserialize, Serialize};

use crate::ast::{SelectStatement, Value};

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    /// Equal (=)
    Eq,
    /// Not equal (<>)
    Ne,
    /// Greater than (>)
    Gt,
    /// Greater than or equal (>=)
    Gte,
    /// Less than (<)
    Lt,
    /// Less than or equal (<=)
    Lte,
    /// LIKE
    Like,
    /// Case-insensitive LIKE
    ILike,
    /// IN (...)
    In,
    /// NOT IN (...)
    NotIn,
    /// IS NULL
    IsNull,
    /// IS NOT NULL
    IsNotNull,
    /// EXISTS (subquery)
    Exists,
}

impl Operator {
    /// The SQL keyword or symbol for this operator.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "<>",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Like => "LIKE",
            Operator::ILike => "ILIKE",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
            Operator::Exists => "EXISTS",
        }
    }
}

/// Boolean combinators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalOp {
    And,
    Or,
    Not,
}

/// A column reference, optionally qualified by a table alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    pub table_alias: Option<String>,
    pub name: String,
}

impl ColumnRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            table_alias: None,
            name: name.into(),
        }
    }

    pub fn qualified(alias: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            table_alias: Some(alias.into()),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.table_alias {
            Some(alias) => write!(f, "{}.{}", alias, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A filtering expression node.
///
/// Trees are owned values: cloning is a deep copy, and every rewrite
/// (alias stamping, raw-to-parameter conversion) happens in place on the
/// copy the caller holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Criteria {
    /// `lhs OP rhs...`, unary for IS NULL / EXISTS, n-ary for IN
    Comparison {
        op: Operator,
        operands: Vec<Criteria>,
    },
    /// AND / OR over members, NOT over a single member
    Boolean {
        op: LogicalOp,
        members: Vec<Criteria>,
    },
    /// A literal value not yet turned into a parameter
    Raw(Value),
    /// A named bound parameter
    Param(String),
    /// A nested SELECT carrying its own parameter map
    Subquery(Box<SelectStatement>),
    /// A column reference
    Column(ColumnRef),
}

impl Criteria {
    /// Child nodes of composite variants.
    pub fn members(&self) -> &[Criteria] {
        match self {
            Criteria::Comparison { operands, .. } => operands,
            Criteria::Boolean { members, .. } => members,
            _ => &[],
        }
    }

    pub fn members_mut(&mut self) -> &mut [Criteria] {
        match self {
            Criteria::Comparison { operands, .. } => operands,
            Criteria::Boolean { members, .. } => members,
            _ => &mut [],
        }
    }

    /// Overwrite the table alias of every column reference in this tree.
    ///
    /// Subqueries are left alone; their columns belong to their own scope.
    pub fn set_table_alias(&mut self, alias: &str) {
        match self {
            Criteria::Column(col) => col.table_alias = Some(alias.to_string()),
            Criteria::Subquery(_) => {}
            _ => {
                for member in self.members_mut() {
                    member.set_table_alias(alias);
                }
            }
        }
    }

    /// Qualify the column references that have no table alias yet.
    pub fn default_table_alias(&mut self, alias: &str) {
        match self {
            Criteria::Column(col) => {
                if col.table_alias.is_none() {
                    col.table_alias = Some(alias.to_string());
                }
            }
            Criteria::Subquery(_) => {}
            _ => {
                for member in self.members_mut() {
                    member.default_table_alias(alias);
                }
            }
        }
    }

    /// Number of raw literal nodes in the tree.
    pub fn raw_count(&self) -> usize {
        match self {
            Criteria::Raw(_) => 1,
            _ => self.members().iter().map(Criteria::raw_count).sum(),
        }
    }

    /// Names of the bound parameters referenced by this tree, in visiting order.
    ///
    /// Subquery parameters are included since they are bound by the
    /// enclosing statement.
    pub fn param_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_params(&mut names);
        names
    }

    fn collect_params<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Criteria::Param(name) => names.push(name),
            Criteria::Subquery(sub) => {
                if let Some(filter) = &sub.filter {
                    filter.collect_params(names);
                }
                for hop in &sub.joins {
                    if let Some(on) = &hop.on {
                        on.collect_params(names);
                    }
                }
            }
            _ => {
                for member in self.members() {
                    member.collect_params(names);
                }
            }
        }
    }
}

impl std::fmt::Display for Criteria {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use crate::transpiler::{Dialect, ToSql};
        write!(f, "{}", self.to_sql(Dialect::Named).sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::builders::*;

    #[test]
    fn test_set_table_alias_overwrites() {
        let mut crit = and(vec![
            eq(col("a"), raw(1)),
            eq(Criteria::Column(ColumnRef::qualified("x", "b")), raw(2)),
        ]);
        crit.set_table_alias("t0");
        assert_eq!(crit.to_string(), "t0.a = 1 AND t0.b = 2");
    }

    #[test]
    fn test_default_table_alias_keeps_qualified() {
        let mut crit = and(vec![
            is_null(col("a")),
            is_null(Criteria::Column(ColumnRef::qualified("x", "b"))),
        ]);
        crit.default_table_alias("t0");
        assert_eq!(crit.to_string(), "t0.a IS NULL AND x.b IS NULL");
    }

    #[test]
    fn test_raw_count_and_params() {
        let crit = or(vec![
            eq(col("a"), raw("x")),
            and(vec![eq(col("b"), param("p1")), gt(col("c"), raw(3))]),
        ]);
        assert_eq!(crit.raw_count(), 2);
        assert_eq!(crit.param_names(), vec!["p1"]);
    }
}
