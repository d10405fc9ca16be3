//! Build instrumentation.
//!
//! A session reports what it does to a [`BuildObserver`] handed to it at
//! construction. The default one forwards everything to `tracing`.

use std::time::Duration;

use crate::ast::{Criteria, Parameters, Value};

/// Receives build events of a session.
pub trait BuildObserver: Send + Sync {
    /// A join endpoint received its alias.
    fn alias_assigned(&self, _association: &str, _alias: &str) {}

    /// Criteria were composed for the hop aliased `alias`.
    fn criteria_composed(&self, _alias: &str, _criteria: &Criteria) {}

    /// A statement was assembled.
    fn statement_built(&self, _sql: &str, _parameters: &Parameters, _elapsed: Duration) {}
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl BuildObserver for NoopObserver {}

/// Emits every event as a `tracing` event under the `sqlpath` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl BuildObserver for TracingObserver {
    fn alias_assigned(&self, association: &str, alias: &str) {
        tracing::trace!(target: "sqlpath", association, alias, "alias assigned");
    }

    fn criteria_composed(&self, alias: &str, criteria: &Criteria) {
        tracing::debug!(target: "sqlpath", alias, criteria = %criteria, "criteria composed");
    }

    fn statement_built(&self, sql: &str, parameters: &Parameters, elapsed: Duration) {
        tracing::debug!(
            target: "sqlpath",
            sql,
            parameters = %dump_parameters(parameters),
            elapsed_secs = elapsed.as_secs_f64(),
            "statement built"
        );
    }
}

/// Render parameters for logs.
///
/// Names ending with `$` are secrets and are masked. Entries are sorted by
/// name so the output is stable.
pub fn dump_parameters(parameters: &Parameters) -> String {
    let mut names: Vec<&String> = parameters.keys().collect();
    names.sort();
    names
        .into_iter()
        .map(|name| {
            if name.ends_with('$') {
                return format!("[{}=****]", name);
            }
            match &parameters[name] {
                Value::Null => format!("[{}=NULL]", name),
                Value::Bytes(_) => format!("[{}=<BLOB>]", name),
                Value::String(s) => format!("[{}={}]", name, s),
                v => format!("[{}={}]", name, v),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dump_parameters() {
        let mut params = Parameters::new();
        params.insert("t0_R1".into(), Value::Int(42));
        params.insert("password$".into(), Value::from("hunter2"));
        params.insert("avatar".into(), Value::Bytes(vec![0xff]));
        params.insert("note".into(), Value::Null);
        params.insert("name".into(), Value::from("bob"));
        assert_eq!(
            dump_parameters(&params),
            "[avatar=<BLOB>][name=bob][note=NULL][password$=****][t0_R1=42]"
        );
    }
}
