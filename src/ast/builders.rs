//! Criteria builders.
//!
//! ```
//! use sqlpath::ast::builders::*;
//!
//! let crit = and(vec![eq(col("status"), raw("open")), is_not_null(col("paid_at"))]);
//! assert_eq!(crit.to_string(), "status = 'open' AND paid_at IS NOT NULL");
//! ```

use crate::ast::{ColumnRef, Criteria, LogicalOp, Operator, SelectStatement, Value};

/// Helper to create a comparison
fn compare(op: Operator, operands: Vec<Criteria>) -> Criteria {
    Criteria::Comparison { op, operands }
}

/// Unqualified column reference
pub fn col(name: &str) -> Criteria {
    Criteria::Column(ColumnRef::new(name))
}

/// Literal value, converted to a named parameter when the criteria is applied
pub fn raw(value: impl Into<Value>) -> Criteria {
    Criteria::Raw(value.into())
}

/// Named parameter reference
pub fn param(name: &str) -> Criteria {
    Criteria::Param(name.to_string())
}

/// Nested SELECT
pub fn subquery(select: SelectStatement) -> Criteria {
    Criteria::Subquery(Box::new(select))
}

/// `left = right`
pub fn eq(left: Criteria, right: Criteria) -> Criteria {
    compare(Operator::Eq, vec![left, right])
}

/// `left <> right`
pub fn ne(left: Criteria, right: Criteria) -> Criteria {
    compare(Operator::Ne, vec![left, right])
}

/// `left > right`
pub fn gt(left: Criteria, right: Criteria) -> Criteria {
    compare(Operator::Gt, vec![left, right])
}

/// `left >= right`
pub fn gte(left: Criteria, right: Criteria) -> Criteria {
    compare(Operator::Gte, vec![left, right])
}

/// `left < right`
pub fn lt(left: Criteria, right: Criteria) -> Criteria {
    compare(Operator::Lt, vec![left, right])
}

/// `left <= right`
pub fn lte(left: Criteria, right: Criteria) -> Criteria {
    compare(Operator::Lte, vec![left, right])
}

/// `left LIKE pattern`
pub fn like(left: Criteria, pattern: Criteria) -> Criteria {
    compare(Operator::Like, vec![left, pattern])
}

/// `left ILIKE pattern`
pub fn ilike(left: Criteria, pattern: Criteria) -> Criteria {
    compare(Operator::ILike, vec![left, pattern])
}

/// `left IN (values...)`, or `left IN (SELECT ...)` when given a single subquery
pub fn is_in(left: Criteria, values: Vec<Criteria>) -> Criteria {
    let mut operands = vec![left];
    operands.extend(values);
    compare(Operator::In, operands)
}

/// `left NOT IN (values...)`
pub fn not_in(left: Criteria, values: Vec<Criteria>) -> Criteria {
    let mut operands = vec![left];
    operands.extend(values);
    compare(Operator::NotIn, operands)
}

/// `operand IS NULL`
pub fn is_null(operand: Criteria) -> Criteria {
    compare(Operator::IsNull, vec![operand])
}

/// `operand IS NOT NULL`
pub fn is_not_null(operand: Criteria) -> Criteria {
    compare(Operator::IsNotNull, vec![operand])
}

/// `EXISTS (SELECT ...)`
pub fn exists(select: SelectStatement) -> Criteria {
    compare(Operator::Exists, vec![subquery(select)])
}

/// Conjunction. A single member is returned as is.
pub fn and(members: Vec<Criteria>) -> Criteria {
    combine(LogicalOp::And, members)
}

/// Disjunction. A single member is returned as is.
pub fn or(members: Vec<Criteria>) -> Criteria {
    combine(LogicalOp::Or, members)
}

/// Negation of a single member
pub fn not(member: Criteria) -> Criteria {
    Criteria::Boolean {
        op: LogicalOp::Not,
        members: vec![member],
    }
}

fn combine(op: LogicalOp, mut members: Vec<Criteria>) -> Criteria {
    if members.len() == 1 {
        return members.remove(0);
    }
    Criteria::Boolean { op, members }
}
