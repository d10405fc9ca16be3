pub mod builders;
pub mod criteria;
pub mod statement;
pub mod values;

pub use self::criteria::{ColumnRef, Criteria, LogicalOp, Operator};
pub use self::statement::{JoinCondition, JoinHop, JoinKind, Parameters, SelectStatement};
pub use self::values::Value;
