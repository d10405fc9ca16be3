//! Query-building session.
//!
//! A [`Session`] holds all the mutable state of one statement under
//! construction: the base table alias, the alias bags, the derived
//! associations, the cache of traversed paths and the parameter map.
//! Nothing here is shared; the only thing a session reads from the outside
//! is the immutable [`Schema`].

pub mod alias;
pub mod compose;
pub mod params;
pub mod path;
pub mod resolver;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use crate::ast::builders::and;
use crate::ast::{
    ColumnRef, Criteria, JoinCondition, JoinHop, JoinKind, LogicalOp, Parameters, SelectStatement,
    Value,
};
use crate::error::{SqlPathError, SqlPathResult};
use crate::observer::{BuildObserver, TracingObserver};
use crate::schema::{AssociationId, Column, Schema, TableId};
use crate::transpiler::{Dialect, RawSql, ToSql};

pub use self::alias::AliasBag;
pub use self::compose::PathCriteria;
pub use self::path::{DerivedAssociation, DerivedId, DerivedRelation, Join, PathElement};

/// Prefix of the base table alias.
pub const PREFIX: &str = "t";
/// Suffix appended to the base alias for ordinary join aliases.
pub const JOIN_PREFIX: &str = "j";
/// Suffix appended to the base alias for many-to-many junction aliases.
pub const JUNCTION_PREFIX: &str = "m";
/// Suffix appended to the base alias for subquery base aliases.
pub const SUBQUERY_PREFIX: &str = "s";

/// A built statement: the SQL text and its positional values.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub raw: RawSql,
    pub values: Vec<Value>,
}

/// State of one query under construction.
pub struct Session {
    schema: Arc<Schema>,
    table: TableId,
    table_alias: String,
    joins: Vec<Join>,
    criteria: Option<Criteria>,
    where_applied: bool,
    parameters: Parameters,
    join_bag: AliasBag,
    junction_bag: AliasBag,
    last_alias: Option<String>,
    discriminator_criteria: Vec<Criteria>,
    raw_index: usize,
    /// Paths already traversed, used to reuse joins of shared prefixes.
    cached_paths: Vec<Vec<PathElement>>,
    /// Associations accumulated by `inner`/`outer` and not yet joined.
    path: Vec<PathElement>,
    derived: Vec<DerivedAssociation>,
    /// Hops whose table and association discriminators are already attached.
    composed: HashSet<DerivedId>,
    /// Subquery parameter names clashing with a different value of this session.
    conflicts: Vec<String>,
    subqueries: usize,
    observer: Arc<dyn BuildObserver>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("table", &self.schema.table(self.table).name)
            .field("table_alias", &self.table_alias)
            .field("joins", &self.joins.len())
            .field("parameters", &self.parameters.len())
            .finish()
    }
}

impl Session {
    /// Start a session on `table`, aliased `t0`.
    pub fn new(schema: Arc<Schema>, table: TableId) -> Self {
        let alias = format!("{}0", PREFIX);
        let discriminator_criteria = schema.table(table).criteria.clone();
        Self {
            join_bag: AliasBag::new(format!("{}_{}", alias, JOIN_PREFIX)),
            junction_bag: AliasBag::new(format!("{}_{}", alias, JUNCTION_PREFIX)),
            schema,
            table,
            table_alias: alias,
            joins: Vec::new(),
            criteria: None,
            where_applied: false,
            parameters: Parameters::new(),
            last_alias: None,
            discriminator_criteria,
            raw_index: 0,
            cached_paths: Vec::new(),
            path: Vec::new(),
            derived: Vec::new(),
            composed: HashSet::new(),
            conflicts: Vec::new(),
            subqueries: 0,
            observer: Arc::new(TracingObserver),
        }
    }

    /// Replace the build observer.
    pub fn with_observer(mut self, observer: Arc<dyn BuildObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Use `alias` for the base table. See [`Session::set_table_alias`].
    pub fn with_alias(mut self, alias: &str) -> Self {
        self.set_table_alias(alias);
        self
    }

    /// Start a session for a subquery on `table`.
    ///
    /// Its base alias is derived from this session's (`t0_s1`, `t0_s2`, ...)
    /// so the parameters it names never collide with the enclosing ones.
    pub fn subquery(&mut self, table: TableId) -> Session {
        self.subqueries += 1;
        let alias = format!("{}_{}{}", self.table_alias, SUBQUERY_PREFIX, self.subqueries);
        Session::new(Arc::clone(&self.schema), table)
            .with_alias(&alias)
            .with_observer(Arc::clone(&self.observer))
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn table(&self) -> TableId {
        self.table
    }

    pub fn table_alias(&self) -> &str {
        &self.table_alias
    }

    /// Rename the base table and re-seed both alias bags from it.
    ///
    /// Meant to be called before any join is declared; aliases handed out
    /// earlier are forgotten. An empty alias is ignored.
    pub fn set_table_alias(&mut self, alias: &str) {
        if alias.is_empty() {
            return;
        }
        self.join_bag = AliasBag::new(format!("{}_{}", alias, JOIN_PREFIX));
        self.junction_bag = AliasBag::new(format!("{}_{}", alias, JUNCTION_PREFIX));
        self.table_alias = alias.to_string();
    }

    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    /// The filter built by [`Session::where_`], raw literals already replaced.
    pub fn criteria(&self) -> Option<&Criteria> {
        self.criteria.as_ref()
    }

    /// Alias of the destination of the last declared join.
    pub fn last_alias(&self) -> Option<&str> {
        self.last_alias.as_deref()
    }

    pub fn derived(&self, id: DerivedId) -> &DerivedAssociation {
        &self.derived[id.index()]
    }

    /// Alias already assigned to a derived association, if any.
    pub fn alias_for(&self, id: DerivedId) -> Option<&str> {
        self.join_bag.get(id).or_else(|| self.junction_bag.get(id))
    }

    pub fn cached_paths(&self) -> &[Vec<PathElement>] {
        &self.cached_paths
    }

    pub fn set_parameter(&mut self, key: &str, value: impl Into<Value>) {
        self.parameters.insert(key.to_string(), value.into());
    }

    /// Bind `value` under the parameter key of `column`.
    pub fn set_parameter_for(&mut self, column: &Column, value: impl Into<Value>) {
        self.set_parameter(&column.alias, value);
    }

    pub fn parameter(&self, column: &Column) -> Option<&Value> {
        self.parameters.get(&column.alias)
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn next_raw_index(&mut self) -> usize {
        self.raw_index += 1;
        self.raw_index
    }

    /// Add associations to the pending path as inner joins.
    pub fn inner(&mut self, associations: &[AssociationId]) -> &mut Self {
        self.push_path(associations, true)
    }

    /// Add associations to the pending path as left outer joins.
    pub fn outer(&mut self, associations: &[AssociationId]) -> &mut Self {
        self.push_path(associations, false)
    }

    /// Alias the destination of the last pending association.
    pub fn alias(&mut self, alias: &str) -> &mut Self {
        if let Some(pe) = self.path.last_mut() {
            pe.preferred_alias = Some(alias.to_string());
        }
        self
    }

    /// Restrict the destination of the last pending association.
    pub fn on(&mut self, criteria: Criteria) -> &mut Self {
        if let Some(pe) = self.path.last_mut() {
            pe.criteria = Some(criteria);
        }
        self
    }

    /// Select columns of the destination of the last pending association.
    pub fn include(&mut self, columns: &[&str]) -> &mut Self {
        if let Some(pe) = self.path.last_mut() {
            pe.columns = Some(columns.iter().map(|c| ColumnRef::new(*c)).collect());
        }
        self
    }

    /// Resolve the pending path as a plain join.
    pub fn join(&mut self) -> &mut Self {
        let path = std::mem::take(&mut self.path);
        self.join_to(path, false);
        self
    }

    /// Resolve the pending path as a fetch join, selecting its columns.
    pub fn fetch(&mut self) -> &mut Self {
        let path = std::mem::take(&mut self.path);
        self.join_to(path, true);
        self
    }

    fn push_path(&mut self, associations: &[AssociationId], inner: bool) -> &mut Self {
        self.path
            .extend(associations.iter().map(|&a| PathElement::new(a, inner)));
        self
    }

    /// Set the top-level filter.
    ///
    /// The base table discriminators are appended to `restrictions`; the
    /// whole is cloned, qualified with the base alias where unqualified and
    /// its raw literals turned into parameters.
    pub fn where_(&mut self, restrictions: Vec<Criteria>) -> &mut Self {
        let mut criteria = restrictions;
        criteria.extend(self.discriminator_criteria.iter().cloned());
        self.where_applied = true;
        if criteria.is_empty() {
            self.criteria = None;
        } else {
            self.apply_where(&and(criteria));
        }
        self
    }

    fn apply_where(&mut self, restriction: &Criteria) {
        let mut token = restriction.clone();
        self.replace_raw(&mut token);
        token.default_table_alias(&self.table_alias);
        self.criteria = Some(token);
    }

    /// Physical joins of the session, one per derived association in
    /// declaration order, plus the columns selected through them.
    ///
    /// A hop shared by several joins takes its join kind from the first one;
    /// the ON criteria the later ones attached to it are ANDed on.
    pub fn hops(&self) -> (Vec<JoinHop>, Vec<ColumnRef>) {
        let mut placed: HashMap<DerivedId, usize> = HashMap::new();
        let mut hops = Vec::new();
        let mut columns = Vec::new();
        for join in &self.joins {
            for pe in &join.path {
                let Some(id) = pe.derived else { continue };
                let index = match placed.get(&id) {
                    Some(&index) => {
                        if let Some(criteria) = &pe.criteria {
                            merge_on(&mut hops[index], criteria);
                        }
                        index
                    }
                    None => {
                        let kind = if pe.inner { JoinKind::Inner } else { JoinKind::Left };
                        let derived = self.derived(id);
                        if let Some((from_junction, _)) = derived.many_to_many {
                            hops.push(self.hop(from_junction, kind, None, false));
                        }
                        let terminal = derived.terminal();
                        hops.push(self.hop(terminal, kind, pe.criteria.clone(), join.fetch));
                        placed.insert(id, hops.len() - 1);
                        hops.len() - 1
                    }
                };

                let selected = match &pe.columns {
                    Some(cols) => cols.clone(),
                    None if join.fetch => vec![ColumnRef::qualified(&hops[index].alias, "*")],
                    None => Vec::new(),
                };
                for column in selected {
                    if !columns.contains(&column) {
                        columns.push(column);
                    }
                }
            }
        }
        (hops, columns)
    }

    fn hop(&self, id: DerivedId, kind: JoinKind, on: Option<Criteria>, fetch: bool) -> JoinHop {
        let derived = self.derived(id);
        JoinHop {
            kind,
            table: self.schema.table(derived.table_to).name.clone(),
            alias: derived.alias_to.clone().unwrap_or_default(),
            conditions: derived
                .relations
                .iter()
                .map(|r| JoinCondition {
                    from: r.from.clone(),
                    to: r.to.clone(),
                })
                .collect(),
            on,
            fetch,
        }
    }

    /// Flatten the session into a SELECT of `columns`, names of base table
    /// columns, each qualified with the base alias. An empty list selects
    /// every base column.
    pub fn select(&mut self, columns: &[&str]) -> SelectStatement {
        if !self.where_applied {
            self.where_(Vec::new());
        }
        let (joins, included) = self.hops();
        let mut selected: Vec<ColumnRef> = if columns.is_empty() {
            vec![ColumnRef::qualified(&self.table_alias, "*")]
        } else {
            columns
                .iter()
                .map(|c| ColumnRef::qualified(&self.table_alias, *c))
                .collect()
        };
        selected.extend(included);
        SelectStatement {
            columns: selected,
            table: self.schema.table(self.table).name.clone(),
            alias: self.table_alias.clone(),
            joins,
            filter: self.criteria.clone(),
            parameters: self.parameters.clone(),
        }
    }

    /// Assemble the SELECT for `dialect` and bind its values.
    ///
    /// Fails with [`SqlPathError::UnresolvableParameter`] when a
    /// placeholder has no value in the parameter map, and with
    /// [`SqlPathError::ConflictingParameter`] when a subquery reused one of
    /// this session's parameter names for another value.
    pub fn build(&mut self, columns: &[&str], dialect: Dialect) -> SqlPathResult<Statement> {
        let started = Instant::now();
        let select = self.select(columns);
        if let Some(name) = self.conflicts.first() {
            return Err(SqlPathError::ConflictingParameter(name.clone()));
        }
        let raw = select.to_sql(dialect);
        let values = raw.build_values(&self.parameters)?;
        self.observer
            .statement_built(&raw.original, &self.parameters, started.elapsed());
        Ok(Statement { raw, values })
    }
}

/// AND `extra` onto the ON criteria of `hop`, skipping it when already there.
fn merge_on(hop: &mut JoinHop, extra: &Criteria) {
    hop.on = match hop.on.take() {
        None => Some(extra.clone()),
        Some(on) if on == *extra => Some(on),
        Some(Criteria::Boolean {
            op: LogicalOp::And,
            mut members,
        }) => {
            if !members.contains(extra) {
                members.push(extra.clone());
            }
            Some(Criteria::Boolean {
                op: LogicalOp::And,
                members,
            })
        }
        Some(on) => Some(and(vec![on, extra.clone()])),
    };
}
