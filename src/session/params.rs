use crate::ast::{Criteria, Value};
use crate::session::Session;

impl Session {
    /// Replace raw literals with named parameters, registering their values.
    ///
    /// Parameters are named `<base alias>_R<n>`. Subqueries are not
    /// descended into; their parameter maps are copied into this session
    /// instead. A copied name already bound to a different value is kept as
    /// is and recorded, making the next [`Session::build`] fail. The tree is
    /// rewritten in place, so callers clone templates before handing them
    /// over.
    pub fn replace_raw(&mut self, token: &mut Criteria) {
        match token {
            Criteria::Raw(value) => {
                let value = std::mem::replace(value, Value::Null);
                let index = self.next_raw_index();
                let name = format!("{}_R{}", self.table_alias, index);
                self.parameters.insert(name.clone(), value);
                *token = Criteria::Param(name);
            }
            Criteria::Subquery(subquery) => {
                for (name, value) in &subquery.parameters {
                    match self.parameters.get(name) {
                        Some(existing) if existing != value => {
                            self.conflicts.push(name.clone());
                        }
                        Some(_) => {}
                        None => {
                            self.parameters.insert(name.clone(), value.clone());
                        }
                    }
                }
            }
            _ => {
                for member in token.members_mut() {
                    self.replace_raw(member);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use crate::ast::builders::*;
    use crate::ast::{Criteria, Value};
    use crate::observer::NoopObserver;
    use crate::schema::Schema;
    use crate::session::Session;

    fn schema() -> Arc<Schema> {
        let mut b = Schema::builder();
        b.table("orders", &["id", "status", "total"]);
        b.table("lines", &["id", "order_id", "sku"]);
        Arc::new(b.build())
    }

    fn session(schema: &Arc<Schema>, table: &str, alias: &str) -> Session {
        let table = schema.table_by_name(table).unwrap();
        Session::new(Arc::clone(schema), table)
            .with_alias(alias)
            .with_observer(Arc::new(NoopObserver))
    }

    #[test]
    fn test_every_raw_becomes_a_unique_param() {
        let schema = schema();
        let mut s = session(&schema, "orders", "t0");
        let mut crit = or(vec![
            eq(col("status"), raw("open")),
            and(vec![gt(col("total"), raw(100)), is_in(col("id"), vec![raw(1), raw(2)])]),
        ]);
        s.replace_raw(&mut crit);

        assert_eq!(crit.raw_count(), 0);
        let names: HashSet<&str> = crit.param_names().into_iter().collect();
        assert_eq!(names.len(), 4);
        assert_eq!(s.parameters().len(), 4);
        assert_eq!(s.parameters().get("t0_R1"), Some(&Value::from("open")));
        assert_eq!(s.parameters().get("t0_R4"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_existing_params_untouched() {
        let schema = schema();
        let mut s = session(&schema, "orders", "t0");
        let mut crit = eq(col("id"), param("order_id"));
        s.replace_raw(&mut crit);
        assert_eq!(crit, eq(col("id"), param("order_id")));
        assert!(s.parameters().is_empty());
    }

    #[test]
    fn test_subquery_params_flow_up() {
        let schema = schema();
        let mut sub = session(&schema, "lines", "t1");
        sub.where_(vec![eq(col("sku"), raw("ABC"))]);
        let select = sub.select(&["order_id"]);

        let mut s = session(&schema, "orders", "t0");
        s.where_(vec![is_in(col("id"), vec![subquery(select)]), eq(col("status"), raw("open"))]);

        assert_eq!(s.parameters().get("t1_R1"), Some(&Value::from("ABC")));
        assert_eq!(s.parameters().get("t0_R1"), Some(&Value::from("open")));
        let filter = s.criteria().unwrap();
        assert!(matches!(filter.members()[0].members()[1], Criteria::Subquery(_)));
    }

    #[test]
    fn test_subquery_name_clash_is_recorded() {
        let schema = schema();
        let mut sub = session(&schema, "lines", "t0");
        sub.where_(vec![eq(col("sku"), raw("ABC"))]);
        let select = sub.select(&["order_id"]);

        let mut s = session(&schema, "orders", "t0");
        s.where_(vec![eq(col("status"), raw("open")), is_in(col("id"), vec![subquery(select)])]);

        // the outer value wins in the map, the clash is reported at build
        assert_eq!(s.parameters().get("t0_R1"), Some(&Value::from("open")));
        assert_eq!(s.conflicts, vec!["t0_R1".to_string()]);
    }
}
