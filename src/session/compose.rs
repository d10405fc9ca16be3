//! Composition of the criteria implied by a resolved path.
//!
//! A step can carry caller criteria, its destination table can declare
//! discriminators, and the association itself can constrain either of its
//! ends. All of them land in per-step slots which then become ON clauses.
//! Slot 0 stands for the base table; its discriminators are seeded into the
//! WHERE clause when the session starts, so the slot stays empty.

use std::sync::Arc;

use crate::ast::builders::and;
use crate::ast::{ColumnRef, Criteria};
use crate::session::path::PathElement;
use crate::session::Session;

/// What a path position adds to the statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathCriteria {
    pub criteria: Vec<Criteria>,
    pub columns: Option<Vec<ColumnRef>>,
}

fn slot(slots: &mut [Option<PathCriteria>], index: usize) -> &mut PathCriteria {
    slots[index].get_or_insert_with(PathCriteria::default)
}

impl Session {
    /// Resolve `path` as a join and attach everything it implies.
    ///
    /// Discriminators of a hop already composed by an earlier join are not
    /// attached again; only the caller criteria of this join are, and
    /// [`Session::hops`] ANDs them onto the shared hop.
    pub fn join_to(&mut self, path: Vec<PathElement>, fetch: bool) {
        let Some(join) = self.add_join(path, fetch) else {
            return;
        };
        let resolved = join.path.clone();
        let join_index = self.joins.len() - 1;

        let slots = self.build_path_criteria(&resolved);
        // slot 0 is never filled
        for (index, path_criteria) in slots.into_iter().enumerate().skip(1) {
            let Some(pc) = path_criteria else { continue };
            let element = &resolved[index - 1];
            let criteria = match element.derived {
                Some(id) if !self.composed.insert(id) => {
                    element.criteria.iter().cloned().collect()
                }
                _ => pc.criteria,
            };
            if !criteria.is_empty() {
                self.apply_on(join_index, index - 1, and(criteria));
            }
            if let Some(columns) = pc.columns {
                self.apply_include(join_index, index - 1, columns);
            }
        }
    }

    /// Slot `i` (1-based) gathers what applies to the destination of step
    /// `i`; slot 0 is the base table.
    pub fn build_path_criteria(&mut self, path: &[PathElement]) -> Vec<Option<PathCriteria>> {
        let schema = Arc::clone(&self.schema);
        let mut slots: Vec<Option<PathCriteria>> = (0..=path.len()).map(|_| None).collect();

        for (i, pe) in path.iter().enumerate() {
            let index = i + 1;
            if let Some(criteria) = &pe.criteria {
                slot(&mut slots, index).criteria.push(criteria.clone());
            }

            let association = schema.association(pe.base);
            let table_criteria = &schema.table(association.table_to).criteria;
            if !table_criteria.is_empty() {
                slot(&mut slots, index)
                    .criteria
                    .extend(table_criteria.iter().cloned());
            }

            if let Some(columns) = &pe.columns {
                slot(&mut slots, index).columns = Some(columns.clone());
            }
        }

        // association discriminators
        let mut last_alias = self.table_alias.clone();
        for (i, pe) in path.iter().enumerate() {
            let association = schema.association(pe.base);
            if !association.discriminators.is_empty() {
                let pc = slot(&mut slots, i + 1);
                if association.discriminator_table == Some(association.table_to) {
                    pc.criteria
                        .extend(association.discriminators.iter().map(|d| d.criteria()));
                } else {
                    // origin side: pin to the alias the previous hop ended at
                    for d in &association.discriminators {
                        let mut criteria = d.criteria();
                        criteria.set_table_alias(&last_alias);
                        pc.criteria.push(criteria);
                    }
                }
            }
            if let Some(derived) = pe.derived {
                last_alias = self.terminal_alias(derived);
            }
        }

        slots
    }

    /// Attach `criteria` to the ON clause of element `element` of join `join`.
    fn apply_on(&mut self, join: usize, element: usize, criteria: Criteria) {
        let Some(derived) = self.joins[join].path[element].derived else {
            return;
        };
        let alias = self.terminal_alias(derived);

        let mut cpy = criteria.clone();
        cpy.default_table_alias(&alias);
        self.replace_raw(&mut cpy);
        self.observer.criteria_composed(&alias, &cpy);
        self.joins[join].path[element].criteria = Some(cpy);
    }

    fn apply_include(&mut self, join: usize, element: usize, mut columns: Vec<ColumnRef>) {
        let Some(derived) = self.joins[join].path[element].derived else {
            return;
        };
        let alias = self.terminal_alias(derived);
        for column in &mut columns {
            column.table_alias = Some(alias.clone());
        }
        self.joins[join].path[element].columns = Some(columns);
    }
}
