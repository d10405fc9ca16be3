//! Schema metadata.
//!
//! Tables and associations are declared once through [`SchemaBuilder`] and
//! frozen into a [`Schema`]. Sessions only ever read from it, so a schema is
//! usually shared as `Arc<Schema>` between all the sessions of a process.

use serde::{Deserialize, Serialize};

use crate::ast::builders::{col, eq, raw};
use crate::ast::{Criteria, Value};
use crate::error::{SqlPathError, SqlPathResult};

/// Index of a table in its schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableId(usize);

/// Index of an association in its schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssociationId(usize);

impl AssociationId {
    #[cfg(test)]
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index)
    }
}

/// A column of a table.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub table: TableId,
    pub name: String,
    /// Key used in the parameter map when a value is bound for this column.
    pub alias: String,
}

/// A table descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub id: TableId,
    pub name: String,
    pub columns: Vec<Column>,
    /// Criteria applied whenever the table is referenced (e.g. a soft-delete flag).
    pub criteria: Vec<Criteria>,
}

impl Table {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    fn require_column(&self, name: &str) -> SqlPathResult<&Column> {
        self.column(name)
            .ok_or_else(|| SqlPathError::unknown_column(&self.name, name))
    }
}

/// A column pairing between the two ends of an association.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub from: String,
    pub to: String,
}

impl Relation {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// A `column = value` constraint declared on an association edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Discriminator {
    pub column: String,
    pub value: Value,
}

impl Discriminator {
    /// A fresh, unaliased criteria for this discriminator.
    pub fn criteria(&self) -> Criteria {
        eq(col(&self.column), raw(self.value.clone()))
    }
}

/// The two junction edges composing a many-to-many association.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManyToMany {
    /// origin table -> junction table
    pub from_junction: AssociationId,
    /// junction table -> destination table
    pub to_junction: AssociationId,
}

/// A directed foreign-key relationship between two tables.
#[derive(Debug, Clone, PartialEq)]
pub struct Association {
    pub id: AssociationId,
    pub name: String,
    pub table_from: TableId,
    pub table_to: TableId,
    pub relations: Vec<Relation>,
    pub many_to_many: Option<ManyToMany>,
    /// Table the discriminators refer to, either end of the edge.
    pub discriminator_table: Option<TableId>,
    pub discriminators: Vec<Discriminator>,
}

impl Association {
    pub fn is_many_to_many(&self) -> bool {
        self.many_to_many.is_some()
    }
}

/// Immutable schema: the arena of tables and association templates.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    tables: Vec<Table>,
    associations: Vec<Association>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    pub fn table(&self, id: TableId) -> &Table {
        &self.tables[id.0]
    }

    pub fn association(&self, id: AssociationId) -> &Association {
        &self.associations[id.0]
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn associations(&self) -> &[Association] {
        &self.associations
    }

    pub fn table_by_name(&self, name: &str) -> SqlPathResult<TableId> {
        self.tables
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.id)
            .ok_or_else(|| SqlPathError::UnknownTable(name.to_string()))
    }

    /// Look up an association by name among the ones leaving `from`.
    pub fn association_by_name(&self, from: TableId, name: &str) -> SqlPathResult<AssociationId> {
        self.associations
            .iter()
            .find(|a| a.table_from == from && a.name == name)
            .map(|a| a.id)
            .ok_or_else(|| {
                SqlPathError::UnknownAssociation(format!("{}.{}", self.table(from).name, name))
            })
    }

    /// Resolve a dotted association path (`customer.address`) starting at `base`.
    ///
    /// Each step is looked up on the destination table of the previous one,
    /// so the returned chain always connects.
    pub fn resolve_path(&self, base: TableId, path: &str) -> SqlPathResult<Vec<AssociationId>> {
        let mut current = base;
        let mut chain = Vec::new();
        for step in path.split('.').map(str::trim).filter(|s| !s.is_empty()) {
            let id = self.association_by_name(current, step)?;
            current = self.association(id).table_to;
            chain.push(id);
        }
        Ok(chain)
    }
}

/// Collects tables and associations before freezing them into a [`Schema`].
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    /// Declare a table with its columns.
    pub fn table(&mut self, name: &str, columns: &[&str]) -> TableId {
        let id = TableId(self.schema.tables.len());
        self.schema.tables.push(Table {
            id,
            name: name.to_string(),
            columns: columns
                .iter()
                .map(|c| Column {
                    table: id,
                    name: c.to_string(),
                    alias: c.to_string(),
                })
                .collect(),
            criteria: Vec::new(),
        });
        id
    }

    /// Change the parameter key of a column.
    pub fn column_alias(&mut self, table: TableId, column: &str, alias: &str) -> SqlPathResult<()> {
        let t = &mut self.schema.tables[table.0];
        let name = t.name.clone();
        let c = t
            .columns
            .iter_mut()
            .find(|c| c.name == column)
            .ok_or_else(|| SqlPathError::unknown_column(name, column))?;
        c.alias = alias.to_string();
        Ok(())
    }

    /// Add a criteria applied whenever `table` is referenced.
    pub fn table_discriminator(&mut self, table: TableId, criteria: Criteria) {
        self.schema.tables[table.0].criteria.push(criteria);
    }

    /// Declare a single-hop association `from -> to`.
    pub fn associate(
        &mut self,
        name: &str,
        from: TableId,
        to: TableId,
        relations: &[(&str, &str)],
    ) -> SqlPathResult<AssociationId> {
        let relations = self.check_relations(from, to, relations)?;
        Ok(self.push_association(name, from, to, relations, None))
    }

    /// Declare a many-to-many association `from -> junction -> to`.
    ///
    /// `from_relations` pair `from` columns with `junction` columns and
    /// `to_relations` pair `junction` columns with `to` columns. The two
    /// junction edges are registered as associations of their own, named
    /// after the pairing.
    pub fn many_to_many(
        &mut self,
        name: &str,
        from: TableId,
        junction: TableId,
        to: TableId,
        from_relations: &[(&str, &str)],
        to_relations: &[(&str, &str)],
    ) -> SqlPathResult<AssociationId> {
        let from_rel = self.check_relations(from, junction, from_relations)?;
        let to_rel = self.check_relations(junction, to, to_relations)?;
        let from_junction =
            self.push_association(&format!("{}_from", name), from, junction, from_rel, None);
        let to_junction =
            self.push_association(&format!("{}_to", name), junction, to, to_rel, None);
        Ok(self.push_association(
            name,
            from,
            to,
            Vec::new(),
            Some(ManyToMany {
                from_junction,
                to_junction,
            }),
        ))
    }

    /// Constrain an association with `column = value`, where `column`
    /// belongs to `table`, one of the two ends of the edge.
    pub fn association_discriminator(
        &mut self,
        association: AssociationId,
        table: TableId,
        column: &str,
        value: impl Into<Value>,
    ) -> SqlPathResult<()> {
        let (from, to) = {
            let a = &self.schema.associations[association.0];
            (a.table_from, a.table_to)
        };
        if table != from && table != to {
            return Err(SqlPathError::Config(format!(
                "discriminator table '{}' is not an end of association '{}'",
                self.schema.tables[table.0].name, self.schema.associations[association.0].name
            )));
        }
        self.schema.tables[table.0].require_column(column)?;

        let a = &mut self.schema.associations[association.0];
        if a.discriminator_table.is_some_and(|t| t != table) {
            return Err(SqlPathError::Config(format!(
                "association '{}' already has discriminators on the other end",
                a.name
            )));
        }
        a.discriminator_table = Some(table);
        a.discriminators.push(Discriminator {
            column: column.to_string(),
            value: value.into(),
        });
        Ok(())
    }

    pub fn table_by_name(&self, name: &str) -> SqlPathResult<TableId> {
        self.schema.table_by_name(name)
    }

    pub fn association_by_name(&self, from: TableId, name: &str) -> SqlPathResult<AssociationId> {
        self.schema.association_by_name(from, name)
    }

    pub fn build(self) -> Schema {
        self.schema
    }

    fn check_relations(
        &self,
        from: TableId,
        to: TableId,
        relations: &[(&str, &str)],
    ) -> SqlPathResult<Vec<Relation>> {
        if relations.is_empty() {
            return Err(SqlPathError::Config(format!(
                "association {} -> {} declares no column pairing",
                self.schema.tables[from.0].name, self.schema.tables[to.0].name
            )));
        }
        let (tf, tt) = (&self.schema.tables[from.0], &self.schema.tables[to.0]);
        relations
            .iter()
            .map(|(f, t)| {
                tf.require_column(f)?;
                tt.require_column(t)?;
                Ok(Relation::new(*f, *t))
            })
            .collect()
    }

    fn push_association(
        &mut self,
        name: &str,
        from: TableId,
        to: TableId,
        relations: Vec<Relation>,
        many_to_many: Option<ManyToMany>,
    ) -> AssociationId {
        let id = AssociationId(self.schema.associations.len());
        self.schema.associations.push(Association {
            id,
            name: name.to_string(),
            table_from: from,
            table_to: to,
            relations,
            many_to_many,
            discriminator_table: None,
            discriminators: Vec::new(),
        });
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shop() -> Schema {
        let mut b = Schema::builder();
        let orders = b.table("orders", &["id", "customer_id"]);
        let customers = b.table("customers", &["id", "address_id"]);
        let addresses = b.table("addresses", &["id", "city"]);
        b.associate("customer", orders, customers, &[("customer_id", "id")])
            .unwrap();
        b.associate("address", customers, addresses, &[("address_id", "id")])
            .unwrap();
        b.build()
    }

    #[test]
    fn test_resolve_path() {
        let schema = shop();
        let orders = schema.table_by_name("orders").unwrap();
        let chain = schema.resolve_path(orders, "customer.address").unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(schema.table(schema.association(chain[1]).table_to).name, "addresses");
    }

    #[test]
    fn test_resolve_path_wrong_origin() {
        let schema = shop();
        let orders = schema.table_by_name("orders").unwrap();
        let err = schema.resolve_path(orders, "address").unwrap_err();
        assert!(matches!(err, SqlPathError::UnknownAssociation(ref n) if n == "orders.address"));
    }

    #[test]
    fn test_unknown_relation_column() {
        let mut b = Schema::builder();
        let a = b.table("a", &["id"]);
        let c = b.table("c", &["id"]);
        let err = b.associate("c", a, c, &[("c_id", "id")]).unwrap_err();
        assert!(matches!(err, SqlPathError::UnknownColumn { .. }));
    }

    #[test]
    fn test_many_to_many_registers_junction_edges() {
        let mut b = Schema::builder();
        let posts = b.table("posts", &["id"]);
        let link = b.table("post_tags", &["post_id", "tag_id"]);
        let tags = b.table("tags", &["id"]);
        let id = b
            .many_to_many("tags", posts, link, tags, &[("id", "post_id")], &[("tag_id", "id")])
            .unwrap();
        let schema = b.build();
        let m2m = schema.association(id).many_to_many.unwrap();
        assert_eq!(schema.association(m2m.from_junction).table_to, link);
        assert_eq!(schema.association(m2m.to_junction).table_from, link);
        assert_eq!(schema.associations().len(), 3);
    }

    #[test]
    fn test_discriminator_must_be_on_an_end() {
        let mut b = Schema::builder();
        let a = b.table("a", &["id", "kind"]);
        let c = b.table("c", &["id", "a_id"]);
        let other = b.table("other", &["kind"]);
        let id = b.associate("c", a, c, &[("id", "a_id")]).unwrap();
        assert!(b.association_discriminator(id, other, "kind", "x").is_err());
        assert!(b.association_discriminator(id, a, "kind", "x").is_ok());
    }
}
