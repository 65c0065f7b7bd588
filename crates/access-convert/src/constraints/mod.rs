//! Index and relationship translation.
//!
//! Indexes belong to one table and are emitted right after that table's
//! rows. Relationships are attributed to their referencing (child) table and
//! held back until every table exists.

use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::core::{ColumnHints, Relationship, Table};

/// Kind of a same-table index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Primary,
    Unique,
    Plain,
}

/// A same-table index ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexFragment {
    pub name: String,
    pub table: String,
    pub columns: Vec<String>,
    pub kind: IndexKind,
}

impl IndexFragment {
    pub fn is_primary(&self) -> bool {
        self.kind == IndexKind::Primary
    }
}

/// Referential action of a foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferentialAction {
    Cascade,
    SetNull,
}

impl ReferentialAction {
    pub fn as_sql(self) -> &'static str {
        match self {
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::SetNull => "SET NULL",
        }
    }
}

/// A relationship ready for rendering, attributed to its child table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyFragment {
    pub name: Option<String>,
    pub table: String,
    pub columns: Vec<String>,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
    pub on_delete: Option<ReferentialAction>,
    pub on_update: Option<ReferentialAction>,
}

impl ForeignKeyFragment {
    fn from_relationship(rel: &Relationship) -> Self {
        let on_delete = if rel.cascade_delete {
            Some(ReferentialAction::Cascade)
        } else if rel.cascade_null_on_delete {
            Some(ReferentialAction::SetNull)
        } else {
            None
        };
        let on_update = rel.cascade_update.then_some(ReferentialAction::Cascade);

        Self {
            name: rel.name.clone().filter(|n| !n.is_empty()),
            table: rel.table.clone(),
            columns: rel.columns.clone(),
            referenced_table: rel.referenced_table.clone(),
            referenced_columns: rel.referenced_columns.clone(),
            on_delete,
            on_update,
        }
    }
}

/// Builds index and relationship fragments from the full schema.
#[derive(Debug, Default)]
pub struct ConstraintTranslator {
    indexes: HashMap<String, Vec<IndexFragment>>,
    /// Child table name and its relationships, in table order.
    foreign_keys: Vec<(String, Vec<ForeignKeyFragment>)>,
    /// (child table, column) pairs referencing an auto-number parent.
    unsigned_refs: HashSet<(String, String)>,
}

impl ConstraintTranslator {
    /// Build fragments for `tables` (in processing order) and `relationships`.
    pub fn new(tables: &[Table], relationships: &[Relationship]) -> Self {
        let by_name: HashMap<&str, &Table> = tables.iter().map(|t| (t.name.as_str(), t)).collect();

        let mut indexes = HashMap::new();
        for table in tables {
            indexes.insert(table.name.clone(), Self::table_indexes(table));
        }

        let mut grouped: HashMap<&str, Vec<ForeignKeyFragment>> = HashMap::new();
        let mut unsigned_refs = HashSet::new();

        for rel in relationships {
            let (Some(child), Some(parent)) = (
                by_name.get(rel.table.as_str()),
                by_name.get(rel.referenced_table.as_str()),
            ) else {
                warn!(
                    "Skipping relationship {:?}: table {} or {} is not in the catalog",
                    rel.name, rel.table, rel.referenced_table
                );
                continue;
            };

            if rel.columns.is_empty() || rel.columns.len() != rel.referenced_columns.len() {
                warn!(
                    "Skipping relationship {:?} on {}: column lists do not match",
                    rel.name, rel.table
                );
                continue;
            }

            let missing = rel
                .columns
                .iter()
                .find(|c| child.column(c).is_none())
                .or_else(|| rel.referenced_columns.iter().find(|c| parent.column(c).is_none()));
            if let Some(col) = missing {
                warn!(
                    "Skipping relationship {:?} on {}: unknown column {}",
                    rel.name, rel.table, col
                );
                continue;
            }

            for (child_col, parent_col) in rel.columns.iter().zip(&rel.referenced_columns) {
                let parent_is_auto = parent
                    .column(parent_col)
                    .is_some_and(|c| c.is_auto_number);
                if parent_is_auto {
                    unsigned_refs.insert((rel.table.clone(), child_col.clone()));
                }
            }

            grouped
                .entry(child.name.as_str())
                .or_default()
                .push(ForeignKeyFragment::from_relationship(rel));
        }

        let foreign_keys = tables
            .iter()
            .filter_map(|t| {
                grouped
                    .remove(t.name.as_str())
                    .map(|fks| (t.name.clone(), fks))
            })
            .collect();

        Self {
            indexes,
            foreign_keys,
            unsigned_refs,
        }
    }

    fn table_indexes(table: &Table) -> Vec<IndexFragment> {
        let mut seen_primary = false;
        let mut fragments = Vec::new();

        for idx in &table.indexes {
            if idx.columns.is_empty() {
                continue;
            }
            if let Some(col) = idx.columns.iter().find(|c| table.column(c).is_none()) {
                warn!(
                    "Skipping index {} on {}: unknown column {}",
                    idx.name, table.name, col
                );
                continue;
            }

            let kind = if idx.is_primary_key && !seen_primary {
                seen_primary = true;
                IndexKind::Primary
            } else if idx.is_unique || idx.is_primary_key {
                IndexKind::Unique
            } else {
                IndexKind::Plain
            };

            fragments.push(IndexFragment {
                name: idx.name.clone(),
                table: table.name.clone(),
                columns: idx.columns.clone(),
                kind,
            });
        }

        fragments
    }

    /// Same-table index fragments, primary key first if present.
    pub fn index_fragments(&self, table: &str) -> Vec<&IndexFragment> {
        let Some(fragments) = self.indexes.get(table) else {
            return Vec::new();
        };
        let mut ordered: Vec<&IndexFragment> = fragments.iter().filter(|f| f.is_primary()).collect();
        ordered.extend(fragments.iter().filter(|f| !f.is_primary()));
        ordered
    }

    /// The table's primary key fragment.
    pub fn primary_key(&self, table: &str) -> Option<&IndexFragment> {
        self.indexes
            .get(table)
            .and_then(|fs| fs.iter().find(|f| f.is_primary()))
    }

    /// Relationships owned by a table.
    pub fn foreign_keys_for(&self, table: &str) -> &[ForeignKeyFragment] {
        self.foreign_keys
            .iter()
            .find(|(t, _)| t == table)
            .map(|(_, fks)| fks.as_slice())
            .unwrap_or(&[])
    }

    /// All relationships grouped by child table, in table order.
    pub fn deferred(&self) -> impl Iterator<Item = (&str, &[ForeignKeyFragment])> {
        self.foreign_keys
            .iter()
            .map(|(t, fks)| (t.as_str(), fks.as_slice()))
    }

    /// Mapper hints for one column.
    pub fn column_hints(&self, table: &str, column: &str) -> ColumnHints {
        ColumnHints {
            references_auto_number: self
                .unsigned_refs
                .contains(&(table.to_string(), column.to_string())),
        }
    }
}
