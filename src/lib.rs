//! # sqlpath
//!
//! Join-path resolution and criteria composition for SQL statements.
//!
//! Callers describe *what* to join as chains of schema associations
//! (`orders -> customer -> address`). A [`Session`](session::Session)
//! turns them into concrete JOIN hops with stable aliases, reuses the hops
//! of shared path prefixes, expands many-to-many associations through
//! their junction table, attaches table and association discriminators to
//! the hop they govern and rewrites every inline literal into a named
//! parameter.
//!
//! ## Quick Example
//!
//! ```rust
//! use std::sync::Arc;
//! use sqlpath::prelude::*;
//!
//! let mut b = Schema::builder();
//! let orders = b.table("orders", &["id", "customer_id"]);
//! let customers = b.table("customers", &["id", "active"]);
//! b.table_discriminator(customers, eq(col("active"), raw(true)));
//! let customer = b.associate("customer", orders, customers, &[("customer_id", "id")])?;
//! let schema = Arc::new(b.build());
//!
//! let mut session = Session::new(schema, orders).with_observer(Arc::new(NoopObserver));
//! session.inner(&[customer]).join();
//! session.where_(vec![eq(col("id"), raw(7))]);
//!
//! let stmt = session.build(&[], Dialect::Named)?;
//! assert_eq!(
//!     stmt.raw.sql,
//!     "SELECT t0.* FROM orders t0 INNER JOIN customers t0_j1 ON t0.customer_id = t0_j1.id \
//!      AND t0_j1.active = :t0_R1 WHERE t0.id = :t0_R2"
//! );
//! assert_eq!(stmt.values, vec![Value::Bool(true), Value::Int(7)]);
//! # Ok::<(), sqlpath::SqlPathError>(())
//! ```
//!
//! ## Aliases
//!
//! | Alias    | Given to                                   |
//! |----------|--------------------------------------------|
//! | `t0`     | base table                                 |
//! | `t0_jN`  | destination of the N-th association joined |
//! | `t0_mN`  | N-th many-to-many junction table           |
//! | `t0_RN`  | N-th rewritten literal (parameter name)    |

pub mod ast;
pub mod config;
pub mod error;
pub mod observer;
pub mod schema;
pub mod session;
pub mod transpiler;

pub use error::{SqlPathError, SqlPathResult};

pub mod prelude {
    pub use crate::ast::builders::*;
    pub use crate::ast::*;
    pub use crate::config::{Config, Settings};
    pub use crate::error::*;
    pub use crate::observer::{BuildObserver, NoopObserver, TracingObserver};
    pub use crate::schema::{AssociationId, Schema, SchemaBuilder, TableId};
    pub use crate::session::{PathElement, Session, Statement};
    pub use crate::transpiler::{Dialect, RawSql, ToSql};
}
