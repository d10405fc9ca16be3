//! Path resolution: turns a requested association chain into derived
//! associations with aliases, reusing whatever a previous chain of the same
//! session already resolved.

use std::sync::Arc;

use crate::ast::ColumnRef;
use crate::schema::AssociationId;
use crate::session::path::{
    deepest_common_path, DerivedAssociation, DerivedId, DerivedRelation, Join, PathElement,
};
use crate::session::Session;

impl Session {
    /// Resolve `path` and record it as a new join.
    ///
    /// The leading elements shared with an already traversed path take
    /// that path's derived associations as is. Every element after the
    /// first divergence gets a fresh derived association and new aliases.
    /// Steps are expected to chain (destination of step `i` is the origin of
    /// step `i + 1`); this is not checked here. An empty path records
    /// nothing and returns `None`.
    pub fn add_join(&mut self, mut path: Vec<PathElement>, fetch: bool) -> Option<&Join> {
        if path.is_empty() {
            return None;
        }
        let common: Vec<Option<DerivedId>> = deepest_common_path(&self.cached_paths, &path)
            .iter()
            .map(|pe| pe.derived)
            .collect();

        let mut matches = true;
        let mut last: Option<DerivedId> = None;
        for (f, pe) in path.iter_mut().enumerate() {
            let cached = if matches { common.get(f).copied().flatten() } else { None };
            let derived = match cached {
                Some(derived) => derived,
                None => {
                    matches = false;
                    self.resolve_element(pe, last)
                }
            };
            pe.derived = Some(derived);
            last = Some(self.derived(derived).terminal());
        }

        // a path entirely covered by a cached one adds nothing to the cache
        if !matches {
            self.cached_paths.push(path.clone());
        }

        self.last_alias = last.and_then(|id| self.alias_for(id).map(str::to_string));
        self.joins.push(Join::new(path, fetch));
        self.joins.last()
    }

    fn resolve_element(&mut self, pe: &PathElement, previous: Option<DerivedId>) -> DerivedId {
        let derived = self.derive(pe.base);

        let from_alias = match previous {
            None => self.table_alias.clone(),
            Some(id) => self.join_alias(id),
        };

        let many_to_many = self.derived(derived).many_to_many;
        match many_to_many {
            Some((from_junction, to_junction)) => {
                let junction_alias = self.junction_bag.alias(from_junction);
                self.notify_alias(from_junction, &junction_alias);
                self.prepare(from_junction, &from_alias, &junction_alias);

                let to_alias = self.destination_alias(to_junction, pe.preferred_alias.as_deref());
                self.prepare(to_junction, &junction_alias, &to_alias);
                self.derived[derived.index()].stamp(&from_alias, &to_alias);
            }
            None => {
                let to_alias = self.destination_alias(derived, pe.preferred_alias.as_deref());
                self.prepare(derived, &from_alias, &to_alias);
            }
        }
        derived
    }

    /// Clone a schema association into the session. Many-to-many
    /// associations bring their two junction edges along.
    fn derive(&mut self, base: AssociationId) -> DerivedId {
        let schema = Arc::clone(&self.schema);
        let association = schema.association(base);
        let many_to_many = association
            .many_to_many
            .map(|m| (self.derive(m.from_junction), self.derive(m.to_junction)));

        let id = DerivedId::new(self.derived.len());
        self.derived.push(DerivedAssociation {
            id,
            base,
            table_from: association.table_from,
            table_to: association.table_to,
            alias_from: None,
            alias_to: None,
            relations: association
                .relations
                .iter()
                .map(|r| DerivedRelation {
                    from: ColumnRef::new(&r.from),
                    to: ColumnRef::new(&r.to),
                })
                .collect(),
            many_to_many,
        });
        id
    }

    fn destination_alias(&mut self, id: DerivedId, preferred: Option<&str>) -> String {
        let alias = match preferred {
            Some(alias) => {
                self.join_bag.set_alias(id, alias);
                alias.to_string()
            }
            None => self.join_bag.alias(id),
        };
        self.notify_alias(id, &alias);
        alias
    }

    /// Alias of a join endpoint, allocating from the join bag if needed.
    fn join_alias(&mut self, id: DerivedId) -> String {
        match self.alias_for(id) {
            Some(alias) => alias.to_string(),
            None => self.join_bag.alias(id),
        }
    }

    /// Alias of the table a resolved element ends at.
    pub(crate) fn terminal_alias(&mut self, id: DerivedId) -> String {
        let terminal = self.derived(id).terminal();
        self.join_alias(terminal)
    }

    fn prepare(&mut self, id: DerivedId, alias_from: &str, alias_to: &str) {
        self.derived[id.index()].stamp(alias_from, alias_to);
    }

    fn notify_alias(&self, id: DerivedId, alias: &str) {
        let name = &self.schema.association(self.derived(id).base).name;
        self.observer.alias_assigned(name, alias);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use crate::observer::NoopObserver;
    use crate::schema::{AssociationId, Schema};
    use crate::session::{PathElement, Session};

    struct Fixture {
        schema: Arc<Schema>,
        customer: AssociationId,
        address: AssociationId,
        items: AssociationId,
        tags: AssociationId,
        group: AssociationId,
    }

    fn fixture() -> Fixture {
        let mut b = Schema::builder();
        let orders = b.table("orders", &["id", "customer_id"]);
        let customers = b.table("customers", &["id", "address_id"]);
        let addresses = b.table("addresses", &["id"]);
        let items = b.table("items", &["id", "order_id"]);
        let order_tags = b.table("order_tags", &["order_id", "tag_id"]);
        let tag_table = b.table("tags", &["id", "group_id"]);
        let groups = b.table("groups", &["id"]);

        let customer = b
            .associate("customer", orders, customers, &[("customer_id", "id")])
            .unwrap();
        let address = b
            .associate("address", customers, addresses, &[("address_id", "id")])
            .unwrap();
        let items = b.associate("items", orders, items, &[("id", "order_id")]).unwrap();
        let tags = b
            .many_to_many(
                "tags",
                orders,
                order_tags,
                tag_table,
                &[("id", "order_id")],
                &[("tag_id", "id")],
            )
            .unwrap();
        let group = b.associate("group", tag_table, groups, &[("group_id", "id")]).unwrap();
        Fixture {
            schema: Arc::new(b.build()),
            customer,
            address,
            items,
            tags,
            group,
        }
    }

    fn session(fx: &Fixture) -> Session {
        let orders = fx.schema.table_by_name("orders").unwrap();
        Session::new(Arc::clone(&fx.schema), orders).with_observer(Arc::new(NoopObserver))
    }

    #[test]
    fn test_empty_path_is_a_no_op() {
        let fx = fixture();
        let mut s = session(&fx);
        s.join_to(Vec::new(), false);
        assert!(s.joins().is_empty());
        assert!(s.cached_paths().is_empty());
    }

    #[test]
    fn test_empty_path_keeps_last_alias() {
        let fx = fixture();
        let mut s = session(&fx);
        s.add_join(vec![PathElement::inner(fx.customer)], false);
        assert!(s.add_join(Vec::new(), false).is_none());
        assert_eq!(s.joins().len(), 1);
        assert_eq!(s.last_alias(), Some("t0_j1"));
    }

    #[test]
    fn test_chain_aliases() {
        let fx = fixture();
        let mut s = session(&fx);
        let join = s
            .add_join(
                vec![PathElement::inner(fx.customer), PathElement::inner(fx.address)],
                false,
            )
            .unwrap();
        let first = join.path[0].derived.unwrap();
        let second = join.path[1].derived.unwrap();

        let d1 = s.derived(first);
        assert_eq!(d1.alias_from.as_deref(), Some("t0"));
        assert_eq!(d1.alias_to.as_deref(), Some("t0_j1"));
        assert_eq!(d1.relations[0].from.to_string(), "t0.customer_id");
        assert_eq!(d1.relations[0].to.to_string(), "t0_j1.id");

        let d2 = s.derived(second);
        assert_eq!(d2.alias_from.as_deref(), Some("t0_j1"));
        assert_eq!(d2.alias_to.as_deref(), Some("t0_j2"));
        assert_eq!(s.last_alias(), Some("t0_j2"));
    }

    #[test]
    fn test_prefix_is_reused() {
        let fx = fixture();
        let mut s = session(&fx);
        s.add_join(
            vec![PathElement::inner(fx.customer), PathElement::inner(fx.address)],
            false,
        );
        let before = s.joins()[0].path[0].derived;

        s.add_join(vec![PathElement::outer(fx.customer)], false);
        assert_eq!(s.joins()[1].path[0].derived, before);
        assert_eq!(s.last_alias(), Some("t0_j1"));
        // fully covered, nothing new cached
        assert_eq!(s.cached_paths().len(), 1);

        let (hops, _) = s.hops();
        assert_eq!(hops.len(), 2);
    }

    #[test]
    fn test_divergent_suffix_gets_new_aliases() {
        let fx = fixture();
        let mut s = session(&fx);
        s.add_join(vec![PathElement::inner(fx.customer)], false);
        s.add_join(
            vec![PathElement::inner(fx.customer), PathElement::inner(fx.address)],
            false,
        );
        s.add_join(vec![PathElement::inner(fx.items)], false);

        let aliases: Vec<_> = s.hops().0.into_iter().map(|h| h.alias).collect();
        assert_eq!(aliases, vec!["t0_j1", "t0_j2", "t0_j3"]);
        assert_eq!(s.cached_paths().len(), 3);
    }

    #[test]
    fn test_many_to_many_two_hops() {
        let fx = fixture();
        let mut s = session(&fx);
        s.add_join(vec![PathElement::inner(fx.tags).with_alias("tg")], false);

        let (hops, _) = s.hops();
        assert_eq!(hops.len(), 2);
        assert_eq!(hops[0].table, "order_tags");
        assert_eq!(hops[0].alias, "t0_m1");
        assert_eq!(hops[0].conditions[0].from.to_string(), "t0.id");
        assert_eq!(hops[0].conditions[0].to.to_string(), "t0_m1.order_id");
        assert_eq!(hops[1].table, "tags");
        assert_eq!(hops[1].alias, "tg");
        assert_eq!(hops[1].conditions[0].from.to_string(), "t0_m1.tag_id");
        assert_eq!(s.last_alias(), Some("tg"));
    }

    #[test]
    fn test_many_to_many_prefix_is_reused() {
        let fx = fixture();
        let mut s = session(&fx);
        s.add_join(vec![PathElement::inner(fx.tags)], false);
        s.add_join(
            vec![PathElement::inner(fx.tags), PathElement::inner(fx.group)],
            false,
        );
        assert_eq!(s.joins()[1].path[0].derived, s.joins()[0].path[0].derived);

        let (hops, _) = s.hops();
        let aliases: Vec<_> = hops.iter().map(|h| h.alias.as_str()).collect();
        assert_eq!(aliases, vec!["t0_m1", "t0_j1", "t0_j2"]);
        // the next step chains from the far side of the junction
        assert_eq!(hops[2].table, "groups");
        assert_eq!(hops[2].conditions[0].from.to_string(), "t0_j1.group_id");
        assert_eq!(hops[2].conditions[0].to.to_string(), "t0_j2.id");
        assert_eq!(s.last_alias(), Some("t0_j2"));
    }

    #[test]
    fn test_preferred_alias_on_shared_prefix_is_reused() {
        let fx = fixture();
        let mut s = session(&fx);
        s.add_join(vec![PathElement::inner(fx.customer)], false);
        s.add_join(vec![PathElement::inner(fx.customer).with_alias("c")], false);
        assert_eq!(s.last_alias(), Some("t0_j1"));
    }

    #[test]
    fn test_schema_template_is_untouched() {
        let fx = fixture();
        let template = fx.schema.association(fx.customer).clone();
        let mut s = session(&fx);
        s.add_join(vec![PathElement::inner(fx.customer)], false);
        assert_eq!(fx.schema.association(fx.customer), &template);
    }
}
