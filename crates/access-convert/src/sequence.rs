//! Auto-increment reconciliation.
//!
//! Rows are loaded with their original auto-number values, so the target's
//! own counter has to be moved past the largest one afterwards.

use std::collections::HashMap;

/// A request to set a table's next sequence value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceReset {
    pub table: String,
    pub column: String,
    /// Value the target assigns to the next inserted row.
    pub next_value: i64,
}

#[derive(Debug)]
struct AutoIncrementState {
    column: String,
    max_observed: Option<i64>,
}

/// Tracks the maximum auto-number value per table.
///
/// Only one column per table is tracked; the first column observed for a
/// table claims it.
#[derive(Debug, Default)]
pub struct AutoIncrementReconciler {
    states: HashMap<String, AutoIncrementState>,
}

impl AutoIncrementReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one auto-number value.
    pub fn observe(&mut self, table: &str, column: &str, value: i64) {
        let state = self
            .states
            .entry(table.to_string())
            .or_insert_with(|| AutoIncrementState {
                column: column.to_string(),
                max_observed: None,
            });

        if state.column != column {
            return;
        }

        state.max_observed = Some(match state.max_observed {
            Some(max) => max.max(value),
            None => value,
        });
    }

    /// Produce the reset for a table and discard its state.
    ///
    /// Yields nothing for a table without observations.
    pub fn finalize(&mut self, table: &str) -> Option<SequenceReset> {
        let state = self.states.remove(table)?;
        let max = state.max_observed?;

        Some(SequenceReset {
            table: table.to_string(),
            column: state.column,
            next_value: max.saturating_add(1).max(1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finalize_is_max_plus_one() {
        let mut r = AutoIncrementReconciler::new();
        for v in [3, 17, 5] {
            r.observe("Orders", "OrderId", v);
        }
        let reset = r.finalize("Orders").unwrap();
        assert_eq!(reset.table, "Orders");
        assert_eq!(reset.column, "OrderId");
        assert_eq!(reset.next_value, 18);
    }

    #[test]
    fn test_no_observations_yields_nothing() {
        let mut r = AutoIncrementReconciler::new();
        assert!(r.finalize("Empty").is_none());
    }

    #[test]
    fn test_state_discarded_after_finalize() {
        let mut r = AutoIncrementReconciler::new();
        r.observe("T", "Id", 1);
        assert!(r.finalize("T").is_some());
        assert!(r.finalize("T").is_none());
    }

    #[test]
    fn test_only_first_column_tracked() {
        let mut r = AutoIncrementReconciler::new();
        r.observe("T", "Id", 4);
        r.observe("T", "Other", 100);
        assert_eq!(r.finalize("T").unwrap().next_value, 5);
    }

    #[test]
    fn test_negative_values_clamp_to_one() {
        let mut r = AutoIncrementReconciler::new();
        r.observe("Random", "Id", -2_000_000);
        r.observe("Random", "Id", -5);
        assert_eq!(r.finalize("Random").unwrap().next_value, 1);
    }

    #[test]
    fn test_tables_are_independent() {
        let mut r = AutoIncrementReconciler::new();
        r.observe("A", "Id", 10);
        r.observe("B", "Id", 2);
        assert_eq!(r.finalize("B").unwrap().next_value, 3);
        assert_eq!(r.finalize("A").unwrap().next_value, 11);
    }
}
