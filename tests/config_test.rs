use std::sync::Arc;

use pretty_assertions::assert_eq;
use sqlpath::config::{load_schema, Config};
use sqlpath::prelude::*;

const SHOP: &str = r#"
[settings]
dialect = "named"
alias = "o"

[[tables]]
name = "orders"
columns = ["id", "customer_id"]

[[tables]]
name = "customers"
columns = ["id", "address_id", "kind"]

[[tables]]
name = "addresses"
columns = ["id", "city"]

[[associations]]
name = "customer"
from = "orders"
to = "customers"
relations = [["customer_id", "id"]]
discriminators = [{ table = "customers", column = "kind", value = "retail" }]

[[associations]]
name = "address"
from = "customers"
to = "addresses"
relations = [["address_id", "id"]]
"#;

#[test]
fn test_schema_from_file() {
    let path = std::env::temp_dir().join(format!("sqlpath-config-{}.toml", std::process::id()));
    std::fs::write(&path, SHOP).unwrap();
    let schema = load_schema(&path);
    std::fs::remove_file(&path).unwrap();

    let schema = schema.unwrap();
    assert_eq!(schema.tables().len(), 3);
    assert_eq!(schema.associations().len(), 2);
}

#[test]
fn test_missing_file() {
    let err = Config::load(std::path::Path::new("/nonexistent/sqlpath.toml")).unwrap_err();
    assert!(matches!(err, SqlPathError::Io(_)));
}

#[test]
fn test_build_with_configured_settings() {
    let config = Config::from_toml(SHOP).unwrap();
    let settings = config.settings.clone();
    let schema = Arc::new(config.schema.into_schema().unwrap());
    let orders = schema.table_by_name("orders").unwrap();
    let chain = schema.resolve_path(orders, "customer.address").unwrap();

    let mut s = Session::new(Arc::clone(&schema), orders)
        .with_alias(&settings.alias)
        .with_observer(Arc::new(NoopObserver));
    s.inner(&chain).join();
    let stmt = s.build(&[], settings.dialect).unwrap();

    assert_eq!(
        stmt.raw.sql,
        "SELECT o.* FROM orders o \
         INNER JOIN customers o_j1 ON o.customer_id = o_j1.id AND o_j1.kind = :o_R1 \
         INNER JOIN addresses o_j2 ON o_j1.address_id = o_j2.id"
    );
    assert_eq!(stmt.values, vec![Value::from("retail")]);
}

#[test]
fn test_discriminator_on_foreign_table_rejected() {
    let toml = SHOP.replace(
        r#"{ table = "customers", column = "kind", value = "retail" }"#,
        r#"{ table = "addresses", column = "city", value = "Oslo" }"#,
    );
    let err = Config::from_toml(&toml).unwrap().schema.into_schema().unwrap_err();
    assert!(matches!(err, SqlPathError::Config(_)));
}
