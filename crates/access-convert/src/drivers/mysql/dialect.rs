//! MySQL/MariaDB SQL dialect (Strategy pattern).
//!
//! Renders DDL, literals and session settings for a dump that MySQL 5.7+
//! and MariaDB 10.2+ accept.

use crate::config::TargetConfig;
use crate::constraints::{ForeignKeyFragment, IndexFragment, IndexKind};
use crate::core::{
    quote_mysql, ConstraintTiming, DefaultValue, Dialect, SqlValue, TableDefinition, TypeMapper,
};
use crate::sequence::SequenceReset;
use crate::typemap::MysqlTypeMapper;

/// Prefix length for indexed TEXT and BLOB columns.
const INDEX_PREFIX_LENGTH: u32 = 255;

/// MySQL dialect implementation.
#[derive(Debug, Clone)]
pub struct MysqlDialect {
    charset: String,
    collation: String,
    engine: String,
    mapper: MysqlTypeMapper,
}

impl Default for MysqlDialect {
    fn default() -> Self {
        Self::new("utf8mb4", "utf8mb4_unicode_ci", "InnoDB")
    }
}

impl MysqlDialect {
    pub fn new(charset: impl Into<String>, collation: impl Into<String>, engine: impl Into<String>) -> Self {
        Self {
            charset: charset.into(),
            collation: collation.into(),
            engine: engine.into(),
            mapper: MysqlTypeMapper,
        }
    }

    pub fn from_config(target: &TargetConfig) -> Self {
        Self::new(&target.charset, &target.collation, &target.engine)
    }

    /// Escape text for a single-quoted literal.
    pub fn escape_string(s: &str) -> String {
        let mut out = String::with_capacity(s.len() + 2);
        for c in s.chars() {
            match c {
                '\\' => out.push_str("\\\\"),
                '\'' => out.push_str("''"),
                '\0' => out.push_str("\\0"),
                c => out.push(c),
            }
        }
        out
    }

    fn quote_string(s: &str) -> String {
        format!("'{}'", Self::escape_string(s))
    }

    fn column_list(&self, columns: &[String]) -> String {
        columns
            .iter()
            .map(|c| self.quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Index column list, with a prefix length for long text and blob columns.
    fn index_column_list(&self, table: &TableDefinition, columns: &[String]) -> String {
        columns
            .iter()
            .map(|c| {
                let needs_prefix = table.column(c).is_some_and(|col| {
                    let ty = col.target.sql_type.as_str();
                    ty.ends_with("TEXT") || ty.ends_with("BLOB")
                });
                if needs_prefix {
                    format!("{}({})", self.quote_ident(c), INDEX_PREFIX_LENGTH)
                } else {
                    self.quote_ident(c)
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Dialect for MysqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_ident(&self, name: &str) -> String {
        quote_mysql(name)
    }

    fn param_placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn type_mapper(&self) -> &dyn TypeMapper {
        &self.mapper
    }

    fn constraint_timing(&self) -> ConstraintTiming {
        ConstraintTiming::Deferred
    }

    fn session_preamble(&self) -> Vec<String> {
        vec![
            "SET SQL_MODE = \"NO_AUTO_VALUE_ON_ZERO\"".to_string(),
            "SET AUTOCOMMIT = 0".to_string(),
            "START TRANSACTION".to_string(),
            "SET time_zone = \"+00:00\"".to_string(),
            "/*!40101 SET @OLD_CHARACTER_SET_CLIENT=@@CHARACTER_SET_CLIENT */".to_string(),
            "/*!40101 SET @OLD_CHARACTER_SET_RESULTS=@@CHARACTER_SET_RESULTS */".to_string(),
            "/*!40101 SET @OLD_COLLATION_CONNECTION=@@COLLATION_CONNECTION */".to_string(),
            format!("/*!40101 SET NAMES {} */", self.charset),
        ]
    }

    fn session_footer(&self) -> Vec<String> {
        vec![
            "COMMIT".to_string(),
            "/*!40101 SET CHARACTER_SET_CLIENT=@OLD_CHARACTER_SET_CLIENT */".to_string(),
            "/*!40101 SET CHARACTER_SET_RESULTS=@OLD_CHARACTER_SET_RESULTS */".to_string(),
            "/*!40101 SET COLLATION_CONNECTION=@OLD_COLLATION_CONNECTION */".to_string(),
        ]
    }

    fn drop_table(&self, table: &str) -> String {
        format!("DROP TABLE IF EXISTS {}", self.quote_ident(table))
    }

    fn create_table(&self, table: &TableDefinition) -> String {
        let columns: Vec<String> = table
            .columns
            .iter()
            .map(|col| {
                let mut line = format!("  {} {}", self.quote_ident(&col.name), col.target.sql_type);
                if col.target.needs_collation {
                    line.push_str(&format!(" COLLATE {}", self.collation));
                }
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

        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{}\n) ENGINE={} DEFAULT CHARSET={} COLLATE={}",
            self.quote_ident(&table.name),
            columns.join(",\n"),
            self.engine,
            self.charset,
            self.collation
        )
    }

    fn index_statement(&self, table: &TableDefinition, index: &IndexFragment) -> Option<String> {
        let columns = self.index_column_list(table, &index.columns);
        let sql = match index.kind {
            IndexKind::Primary => format!(
                "ALTER TABLE {}\n  ADD PRIMARY KEY ({})",
                self.quote_ident(&table.name),
                columns
            ),
            IndexKind::Unique | IndexKind::Plain => format!(
                "CREATE {}INDEX {}\n  ON {} ({})",
                if index.kind == IndexKind::Unique { "UNIQUE " } else { "" },
                self.quote_ident(&index.name),
                self.quote_ident(&table.name),
                columns
            ),
        };
        Some(sql)
    }

    fn foreign_key_statement(&self, fk: &ForeignKeyFragment) -> Option<String> {
        let mut sql = format!("ALTER TABLE {}\n  ADD ", self.quote_ident(&fk.table));
        if let Some(name) = &fk.name {
            sql.push_str(&format!("CONSTRAINT {} ", self.quote_ident(name)));
        }
        sql.push_str(&format!(
            "FOREIGN KEY\n  ({})\n  REFERENCES {} ({})",
            self.column_list(&fk.columns),
            self.quote_ident(&fk.referenced_table),
            self.column_list(&fk.referenced_columns)
        ));
        if let Some(action) = fk.on_delete {
            sql.push_str(&format!("\n  ON DELETE {}", action.as_sql()));
        }
        if let Some(action) = fk.on_update {
            sql.push_str(&format!("\n  ON UPDATE {}", action.as_sql()));
        }
        Some(sql)
    }

    fn sequence_reset(&self, reset: &SequenceReset) -> String {
        format!(
            "ALTER TABLE {}\n  MODIFY {} INT(10) UNSIGNED NOT NULL AUTO_INCREMENT, AUTO_INCREMENT={}",
            self.quote_ident(&reset.table),
            self.quote_ident(&reset.column),
            reset.next_value
        )
    }

    // MODIFY .. AUTO_INCREMENT fails with error 1075 on an unindexed column.
    fn sequence_needs_key(&self) -> bool {
        true
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
            SqlValue::Bytes(b) => format!("UNHEX('{}')", hex::encode_upper(b.as_ref())),
        }
    }
}
