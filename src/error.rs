//! Error types for sqlpath.

use thiserror::Error;

/// The main error type for sqlpath operations.
#[derive(Debug, Error)]
pub enum SqlPathError {
    /// A bound parameter has no value at build time.
    #[error("No value supplied for the SQL parameter '{name}' for the SQL {sql}")]
    UnresolvableParameter { name: String, sql: String },

    /// A subquery parameter name is already bound to another value.
    #[error("Parameter '{0}' bound to different values by a subquery and its parent")]
    ConflictingParameter(String),

    /// Table not declared in the schema.
    #[error("Unknown table: '{0}'")]
    UnknownTable(String),

    /// Association not declared in the schema.
    #[error("Unknown association: '{0}'")]
    UnknownAssociation(String),

    /// Column not declared on the table.
    #[error("Unknown column '{column}' in table '{table}'")]
    UnknownColumn { table: String, column: String },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed TOML.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SqlPathError {
    /// Create an unresolvable parameter error.
    pub fn unresolvable(name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self::UnresolvableParameter {
            name: name.into(),
            sql: sql.into(),
        }
    }

    /// Create an unknown column error.
    pub fn unknown_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::UnknownColumn {
            table: table.into(),
            column: column.into(),
        }
    }
}

/// Result type alias for sqlpath operations.
pub type SqlPathResult<T> = Result<T, SqlPathError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let sql = "SELECT * FROM orders t0 WHERE t0.id = :t0_R1";
        let err = SqlPathError::unresolvable("t0_R1", sql);
        assert_eq!(
            err.to_string(),
            format!("No value supplied for the SQL parameter 't0_R1' for the SQL {sql}")
        );
    }

    #[test]
    fn test_unknown_column_display() {
        let err = SqlPathError::unknown_column("orders", "nope");
        assert_eq!(err.to_string(), "Unknown column 'nope' in table 'orders'");
    }

    #[test]
    fn test_conflicting_parameter_display() {
        let err = SqlPathError::ConflictingParameter("t0_R1".into());
        assert_eq!(
            err.to_string(),
            "Parameter 't0_R1' bound to different values by a subquery and its parent"
        );
    }
}
