//! SQLite SQL dialect (Strategy pattern).

use crate::constraints::{ForeignKeyFragment, IndexFragment, IndexKind};
use crate::core::{
    quote_sqlite, ConstraintTiming, DefaultValue, Dialect, SqlValue, TableDefinition, TypeMapper,
};
use crate::sequence::SequenceReset;
use crate::typemap::SqliteTypeMapper;

/// SQLite dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct SqliteDialect {
    mapper: SqliteTypeMapper,
}

impl SqliteDialect {
    pub fn new() -> Self {
        Self::default()
    }

    fn quote_string(s: &str) -> String {
        format!("'{}'", s.replace('\'', "''"))
    }

    fn column_list(&self, columns: &[String]) -> String {
        columns
            .iter()
            .map(|c| self.quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Whether the primary key is exactly the auto-number column, which is
    /// already declared `INTEGER PRIMARY KEY`.
    fn pk_is_auto_column(table: &TableDefinition, index: &IndexFragment) -> bool {
        match table.auto_number_column() {
            Some(auto) => index.columns.len() == 1 && index.columns[0] == auto.name,
            None => false,
        }
    }

    fn foreign_key_clause(&self, fk: &ForeignKeyFragment) -> String {
        let mut clause = String::from("  ");
        if let Some(name) = &fk.name {
            clause.push_str(&format!("CONSTRAINT {} ", self.quote_ident(name)));
        }
        clause.push_str(&format!(
            "FOREIGN KEY ({}) REFERENCES {} ({})",
            self.column_list(&fk.columns),
            self.quote_ident(&fk.referenced_table),
            self.column_list(&fk.referenced_columns)
        ));
        if let Some(action) = fk.on_delete {
            clause.push_str(&format!(" ON DELETE {}", action.as_sql()));
        }
        if let Some(action) = fk.on_update {
            clause.push_str(&format!(" ON UPDATE {}", action.as_sql()));
        }
        clause
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn quote_ident(&self, name: &str) -> String {
        quote_sqlite(name)
    }

    fn param_placeholder(&self, index: usize) -> String {
        format!("?{}", index)
    }

    fn type_mapper(&self) -> &dyn TypeMapper {
        &self.mapper
    }

    fn constraint_timing(&self) -> ConstraintTiming {
        ConstraintTiming::Inline
    }

    // Session control lives in the writer: the transaction has to outlive
    // every statement the engine issues.
    fn session_preamble(&self) -> Vec<String> {
        Vec::new()
    }

    fn session_footer(&self) -> Vec<String> {
        Vec::new()
    }

    fn drop_table(&self, table: &str) -> String {
        format!("DROP TABLE IF EXISTS {}", self.quote_ident(table))
    }

    fn create_table(&self, table: &TableDefinition) -> String {
        let mut lines: Vec<String> = table
            .columns
            .iter()
            .map(|col| {
                if col.is_auto_number && table.auto_number_column().is_some_and(|a| a.name == col.name) {
                    return format!(
                        "  {} INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL",
                        self.quote_ident(&col.name)
                    );
                }
                let mut line = format!("  {} {}", self.quote_ident(&col.name), col.target.sql_type);
                if col.target.is_not_null() {
                    line.push_str(" NOT NULL");
                }
                match &col.target.default {
                    Some(DefaultValue::Literal(v)) => {
                        line.push_str(&format!(" DEFAULT {}", Self::quote_string(v)))
                    }
                    Some(DefaultValue::Keyword(k)) => line.push_str(&format!(" DEFAULT {}", k)),
                    None => {}
                }
                line
            })
            .collect();

        if table.auto_number_column().is_none() {
            if let Some(pk) = &table.primary_key {
                lines.push(format!("  PRIMARY KEY ({})", self.column_list(&pk.columns)));
            }
        }

        lines.extend(table.foreign_keys.iter().map(|fk| self.foreign_key_clause(fk)));

        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{}\n)",
            self.quote_ident(&table.name),
            lines.join(",\n")
        )
    }

    fn index_statement(&self, table: &TableDefinition, index: &IndexFragment) -> Option<String> {
        let unique = match index.kind {
            IndexKind::Primary => {
                if table.auto_number_column().is_none() || Self::pk_is_auto_column(table, index) {
                    return None;
                }
                true
            }
            IndexKind::Unique => true,
            IndexKind::Plain => false,
        };

        Some(format!(
            "CREATE {}INDEX IF NOT EXISTS {} ON {} ({})",
            if unique { "UNIQUE " } else { "" },
            self.quote_ident(&format!("{}_{}", table.name, index.name)),
            self.quote_ident(&table.name),
            self.column_list(&index.columns)
        ))
    }

    fn foreign_key_statement(&self, _fk: &ForeignKeyFragment) -> Option<String> {
        None
    }

    fn sequence_reset(&self, reset: &SequenceReset) -> String {
        format!(
            "UPDATE sqlite_sequence SET seq = {} WHERE name = {}",
            reset.next_value - 1,
            Self::quote_string(&reset.table)
        )
    }

    fn literal(&self, value: &SqlValue<'_>) -> String {
        match value {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Bool(b) => (if *b { "1" } else { "0" }).to_string(),
            SqlValue::I64(v) => v.to_string(),
            SqlValue::F64(v) if v.is_finite() => v.to_string(),
            SqlValue::F64(_) => "NULL".to_string(),
            SqlValue::Decimal(v) => v.to_string(),
            SqlValue::DateTime(v) => format!("'{}'", SqlValue::format_datetime(v)),
            SqlValue::Text(s) => Self::quote_string(s),
            SqlValue::Bytes(b) if b.is_empty() => "NULL".to_string(),
            SqlValue::Bytes(b) => format!("X'{}'", hex::encode_upper(b.as_ref())),
        }
    }
}
