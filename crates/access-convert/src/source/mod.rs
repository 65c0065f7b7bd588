//! Source catalog implementations.

mod snapshot;

pub use snapshot::SnapshotCatalog;

use crate::core::{SourceCatalog, Table};
use crate::error::Result;

/// Load every table in a deterministic order: names sorted
/// case-insensitively, ties broken by exact name.
pub fn ordered_tables<S: SourceCatalog + ?Sized>(source: &S) -> Result<Vec<Table>> {
    let mut names = source.table_names()?;
    names.sort_by(|a, b| a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b)));
    names.dedup();

    names.iter().map(|name| source.table(name)).collect()
}
