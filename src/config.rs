//! Schema and settings configuration.
//!
//! A schema can be declared in TOML instead of through [`SchemaBuilder`]:
//!
//! ```toml
//! [settings]
//! dialect = "postgres"
//!
//! [[tables]]
//! name = "customers"
//! columns = ["id", "address_id", "active"]
//! discriminators = [{ column = "active", value = true }]
//!
//! [[associations]]
//! name = "customer"
//! from = "orders"
//! to = "customers"
//! relations = [["customer_id", "id"]]
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::ast::builders::{col, eq, raw};
use crate::ast::Value;
use crate::error::{SqlPathError, SqlPathResult};
use crate::schema::{Schema, SchemaBuilder};
use crate::transpiler::Dialect;

/// Contents of a configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,

    #[serde(flatten)]
    pub schema: SchemaConfig,
}

/// Build settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Placeholder style of the generated SQL
    #[serde(default)]
    pub dialect: Dialect,

    /// Alias of the base table
    #[serde(default = "default_alias")]
    pub alias: String,
}

fn default_alias() -> String {
    "t0".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            alias: default_alias(),
        }
    }
}

/// Tables and associations.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchemaConfig {
    #[serde(default)]
    pub tables: Vec<TableConfig>,

    #[serde(default)]
    pub associations: Vec<AssociationConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableConfig {
    pub name: String,
    pub columns: Vec<String>,

    /// column -> parameter key
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,

    #[serde(default)]
    pub discriminators: Vec<ColumnValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ColumnValue {
    pub column: String,
    pub value: Literal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssociationConfig {
    pub name: String,
    pub from: String,
    pub to: String,

    /// `[from column, to column]` pairs; for many-to-many, pairs of
    /// `from` with the junction.
    #[serde(default)]
    pub relations: Vec<[String; 2]>,

    pub junction: Option<JunctionConfig>,

    #[serde(default)]
    pub discriminators: Vec<AssociationDiscriminator>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JunctionConfig {
    pub table: String,
    /// `[junction column, to column]` pairs
    pub relations: Vec<[String; 2]>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssociationDiscriminator {
    /// Either end of the association
    pub table: String,
    pub column: String,
    pub value: Literal,
}

/// A scalar literal as written in TOML.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<Literal> for Value {
    fn from(lit: Literal) -> Self {
        match lit {
            Literal::Bool(b) => Value::Bool(b),
            Literal::Int(i) => Value::Int(i),
            Literal::Float(f) => Value::Float(f),
            Literal::Text(s) => Value::String(s),
        }
    }
}

fn pairs(relations: &[[String; 2]]) -> Vec<(&str, &str)> {
    relations
        .iter()
        .map(|[from, to]| (from.as_str(), to.as_str()))
        .collect()
}

impl SchemaConfig {
    /// Freeze the declarations into a [`Schema`].
    ///
    /// Tables are registered first, so associations may reference tables
    /// declared anywhere in the file.
    pub fn into_schema(self) -> SqlPathResult<Schema> {
        let mut b = SchemaBuilder::default();

        for t in &self.tables {
            let columns: Vec<&str> = t.columns.iter().map(String::as_str).collect();
            let id = b.table(&t.name, &columns);
            for (column, alias) in &t.aliases {
                b.column_alias(id, column, alias)?;
            }
            for d in &t.discriminators {
                b.table_discriminator(id, eq(col(&d.column), raw(d.value.clone())));
            }
        }

        for a in &self.associations {
            let from = b.table_by_name(&a.from)?;
            let to = b.table_by_name(&a.to)?;
            let id = match &a.junction {
                Some(junction) => {
                    let junction_table = b.table_by_name(&junction.table)?;
                    b.many_to_many(
                        &a.name,
                        from,
                        junction_table,
                        to,
                        &pairs(&a.relations),
                        &pairs(&junction.relations),
                    )?
                }
                None => b.associate(&a.name, from, to, &pairs(&a.relations))?,
            };
            for d in &a.discriminators {
                let table = b.table_by_name(&d.table)?;
                b.association_discriminator(id, table, &d.column, d.value.clone())?;
            }
        }

        Ok(b.build())
    }
}

impl Config {
    /// Parse a configuration from TOML text.
    pub fn from_toml(content: &str) -> SqlPathResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Read a configuration file.
    pub fn load(path: &Path) -> SqlPathResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Read `path`, or the default configuration file when `None`.
    pub fn load_or_default(path: Option<&Path>) -> SqlPathResult<Self> {
        match path {
            Some(p) => Self::load(p),
            None => {
                let p = default_path().ok_or_else(|| {
                    SqlPathError::Config("could not determine the config directory".into())
                })?;
                Self::load(&p)
            }
        }
    }
}

/// `<config dir>/sqlpath/config.toml`
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("sqlpath").join("config.toml"))
}

/// Load a configuration file and build its schema.
pub fn load_schema(path: &Path) -> SqlPathResult<Schema> {
    Config::load(path)?.schema.into_schema()
}
