use serde::Serialize;

use crate::ast::{Parameters, Value};
use crate::error::{SqlPathError, SqlPathResult};

/// Generated SQL with its placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawSql {
    /// SQL with `:name` placeholders
    pub original: String,
    /// SQL with the placeholders of the target dialect
    pub sql: String,
    /// Parameter name of each placeholder, in order of appearance
    pub names: Vec<String>,
}

impl RawSql {
    /// Values of the placeholders, in order.
    ///
    /// A name missing from `parameters` aborts with
    /// [`SqlPathError::UnresolvableParameter`]; nothing is defaulted.
    pub fn build_values(&self, parameters: &Parameters) -> SqlPathResult<Vec<Value>> {
        self.names
            .iter()
            .map(|name| {
                parameters
                    .get(name)
                    .cloned()
                    .ok_or_else(|| SqlPathError::unresolvable(name, &self.original))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> RawSql {
        RawSql {
            original: "SELECT * FROM t t0 WHERE t0.a = :a AND t0.b = :b AND t0.c = :a".into(),
            sql: "SELECT * FROM t t0 WHERE t0.a = $1 AND t0.b = $2 AND t0.c = $3".into(),
            names: vec!["a".into(), "b".into(), "a".into()],
        }
    }

    #[test]
    fn test_build_values_in_order() {
        let mut params = Parameters::new();
        params.insert("a".into(), Value::Int(1));
        params.insert("b".into(), Value::Null);
        let values = raw().build_values(&params).unwrap();
        assert_eq!(values, vec![Value::Int(1), Value::Null, Value::Int(1)]);
    }

    #[test]
    fn test_missing_value_is_fatal() {
        let mut params = Parameters::new();
        params.insert("a".into(), Value::Int(1));
        let err = raw().build_values(&params).unwrap_err();
        match err {
            SqlPathError::UnresolvableParameter { name, sql } => {
                assert_eq!(name, "b");
                assert!(sql.contains(":b"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
