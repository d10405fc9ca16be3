use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ast::{ColumnRef, Criteria, Value};

/// Named parameter values of a statement.
pub type Parameters = HashMap<String, Value>;

/// Join type of a physical hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinKind {
    Inner,
    Left,
}

/// A column pairing of a hop, already qualified with both endpoint aliases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinCondition {
    pub from: ColumnRef,
    pub to: ColumnRef,
}

/// One physical `JOIN table alias ON ...` of a built statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinHop {
    pub kind: JoinKind,
    pub table: String,
    pub alias: String,
    pub conditions: Vec<JoinCondition>,
    /// Extra restriction appended to the column pairings.
    #[serde(default)]
    pub on: Option<Criteria>,
    /// Whether the hop's columns are selected (eager fetch).
    #[serde(default)]
    pub fetch: bool,
}

/// A flattened SELECT produced by a session.
///
/// Used both as the top-level output handed to the SQL assembly and as the
/// payload of [`Criteria::Subquery`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectStatement {
    pub columns: Vec<ColumnRef>,
    pub table: String,
    pub alias: String,
    pub joins: Vec<JoinHop>,
    pub filter: Option<Criteria>,
    #[serde(default)]
    pub parameters: Parameters,
}
