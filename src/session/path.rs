use serde::Serialize;

use crate::ast::{ColumnRef, Criteria};
use crate::schema::{AssociationId, TableId};

/// Index of a derived association in its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DerivedId(usize);

impl DerivedId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    pub(crate) fn index(self) -> usize {
        self.0
    }
}

/// A column pairing of a derived association, stamped with the endpoint aliases.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedRelation {
    pub from: ColumnRef,
    pub to: ColumnRef,
}

/// Session-scoped copy of a schema association.
///
/// This is the only place alias state lives; the schema template it was
/// cloned from stays untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedAssociation {
    pub id: DerivedId,
    pub base: AssociationId,
    pub table_from: TableId,
    pub table_to: TableId,
    pub alias_from: Option<String>,
    pub alias_to: Option<String>,
    pub relations: Vec<DerivedRelation>,
    /// Derived copies of the (from-junction, to-junction) edges.
    pub many_to_many: Option<(DerivedId, DerivedId)>,
}

impl DerivedAssociation {
    pub fn is_many_to_many(&self) -> bool {
        self.many_to_many.is_some()
    }

    /// The association whose destination is the end of this step: the
    /// to-junction edge for many-to-many, itself otherwise.
    pub fn terminal(&self) -> DerivedId {
        match self.many_to_many {
            Some((_, to)) => to,
            None => self.id,
        }
    }

    /// Set both endpoint aliases on the association and on every relation.
    pub(crate) fn stamp(&mut self, alias_from: &str, alias_to: &str) {
        self.alias_from = Some(alias_from.to_string());
        self.alias_to = Some(alias_to.to_string());
        for rel in &mut self.relations {
            rel.from.table_alias = Some(alias_from.to_string());
            rel.to.table_alias = Some(alias_to.to_string());
        }
    }
}

/// One requested step of a traversal.
#[derive(Debug, Clone, PartialEq)]
pub struct PathElement {
    pub base: AssociationId,
    pub inner: bool,
    pub preferred_alias: Option<String>,
    pub criteria: Option<Criteria>,
    pub columns: Option<Vec<ColumnRef>>,
    /// Set once the step is resolved.
    pub derived: Option<DerivedId>,
}

impl PathElement {
    pub fn new(base: AssociationId, inner: bool) -> Self {
        Self {
            base,
            inner,
            preferred_alias: None,
            criteria: None,
            columns: None,
            derived: None,
        }
    }

    pub fn inner(base: AssociationId) -> Self {
        Self::new(base, true)
    }

    pub fn outer(base: AssociationId) -> Self {
        Self::new(base, false)
    }

    /// Alias the destination table of this step.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.preferred_alias = Some(alias.into());
        self
    }

    /// Restrict the destination table of this step.
    pub fn with_criteria(mut self, criteria: Criteria) -> Self {
        self.criteria = Some(criteria);
        self
    }

    /// Select these destination columns.
    pub fn with_columns(mut self, columns: Vec<ColumnRef>) -> Self {
        self.columns = Some(columns);
        self
    }
}

/// One resolved traversal.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub path: Vec<PathElement>,
    pub fetch: bool,
}

impl Join {
    pub fn new(path: Vec<PathElement>, fetch: bool) -> Self {
        Self { path, fetch }
    }
}

/// The longest prefix of `path` already present in `cached`, compared by
/// schema association. Ties go to the first cached path.
pub fn deepest_common_path<'a>(
    cached: &'a [Vec<PathElement>],
    path: &[PathElement],
) -> &'a [PathElement] {
    let mut common: &[PathElement] = &[];
    for candidate in cached {
        let depth = candidate
            .iter()
            .zip(path)
            .take_while(|(c, p)| c.base == p.base)
            .count();
        if depth > common.len() {
            common = &candidate[..depth];
        }
    }
    common
}
