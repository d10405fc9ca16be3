use serde::{Deserialize, Serialize};

/// Placeholder style of the generated SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// `:name` placeholders, as kept in [`super::RawSql::original`]
    Named,
    /// `$1`, `$2`, ...
    #[default]
    Postgres,
    /// `?`
    MySQL,
    /// `?`
    SQLite,
}

impl Dialect {
    /// Placeholder for the `position`-th (1-based) parameter called `name`.
    pub fn placeholder(&self, name: &str, position: usize) -> String {
        match self {
            Dialect::Named => format!(":{}", name),
            Dialect::Postgres => format!("${}", position),
            Dialect::MySQL | Dialect::SQLite => "?".to_string(),
        }
    }
}

impl std::str::FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "named" => Ok(Dialect::Named),
            "postgres" | "postgresql" | "pg" => Ok(Dialect::Postgres),
            "mysql" => Ok(Dialect::MySQL),
            "sqlite" => Ok(Dialect::SQLite),
            other => Err(format!("unknown dialect '{}'", other)),
        }
    }
}
