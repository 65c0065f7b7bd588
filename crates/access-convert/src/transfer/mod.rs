//! Schema and data emission.
//!
//! [`DataEmitter`] walks the tables in catalog order and, for each one,
//! emits the DDL, streams the rows in bounded batches, then the indexes and
//! the sequence correction. Relationship constraints with deferred timing
//! follow once every table is in place.
//!
//! The emitter is written against [`Dialect`] and [`OutputSink`] only; the
//! same code produces a MySQL dump and a SQLite database.

mod context;

pub use context::{ConversionContext, Progress};

use std::borrow::Cow;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, info, warn};

use crate::blob::{BlobExtractor, Extraction};
use crate::config::Config;
use crate::constraints::ConstraintTranslator;
use crate::core::{
    CellValue, Column, ColumnDefinition, ConstraintTiming, Dialect, InsertPlan, OutputSink,
    Relationship, Row, SourceCatalog, SourceType, SqlValue, Table, TableDefinition, TargetType,
};
use crate::error::{Diagnostic, DiagnosticKind, Result};
use crate::sequence::AutoIncrementReconciler;

/// Round half away from zero to `precision` decimal places.
///
/// Rounds the exact binary value, so `1.005` (stored as 1.00499..) goes
/// down. Returns `None` for NaN and infinities. Values outside the decimal
/// range are returned unchanged.
pub fn round_half_up(value: f64, precision: u32) -> Option<f64> {
    if !value.is_finite() {
        return None;
    }
    match Decimal::from_f64_retain(value) {
        Some(d) => d
            .round_dp_with_strategy(precision, RoundingStrategy::MidpointAwayFromZero)
            .to_f64(),
        None => Some(value),
    }
}

/// Outcome of converting one cell.
struct Converted {
    value: SqlValue<'static>,
    diagnostics: Vec<Diagnostic>,
}

impl Converted {
    fn value(value: SqlValue<'static>) -> Self {
        Self {
            value,
            diagnostics: Vec::new(),
        }
    }

    fn null_with(diagnostic: Diagnostic) -> Self {
        Self {
            value: SqlValue::Null,
            diagnostics: vec![diagnostic],
        }
    }
}

/// Streams schema and data for every table through one dialect.
pub struct DataEmitter<'a, D: Dialect> {
    dialect: &'a D,
    tables: Vec<Table>,
    constraints: ConstraintTranslator,
    sequences: AutoIncrementReconciler,
    blobs: BlobExtractor,
    drop_tables: bool,
    create_indexes: bool,
    create_foreign_keys: bool,
}

impl<'a, D: Dialect> DataEmitter<'a, D> {
    /// Create an emitter for `tables`, in the order they will be processed.
    pub fn new(dialect: &'a D, config: &Config, tables: Vec<Table>, relationships: &[Relationship]) -> Self {
        let constraints = ConstraintTranslator::new(&tables, relationships);
        Self {
            dialect,
            tables,
            constraints,
            sequences: AutoIncrementReconciler::new(),
            blobs: BlobExtractor::from_config(config),
            drop_tables: config.conversion.drop_tables,
            create_indexes: config.conversion.create_indexes,
            create_foreign_keys: config.conversion.create_foreign_keys,
        }
    }

    /// Replace the blob extractor.
    pub fn with_blob_extractor(mut self, blobs: BlobExtractor) -> Self {
        self.blobs = blobs;
        self
    }

    /// Run the whole conversion into `ctx.sink`.
    pub fn run<C, S>(&mut self, source: &C, ctx: &mut ConversionContext<'_, S>) -> Result<()>
    where
        C: SourceCatalog + ?Sized,
        S: OutputSink,
    {
        ctx.progress.tables_total = self.tables.len();
        if let Some(dir) = self.blobs.files_dir() {
            info!("Writing blob files under {}", dir.display());
        }

        for sql in self.dialect.session_preamble() {
            ctx.sink.execute(&sql)?;
        }

        let tables = std::mem::take(&mut self.tables);
        let result = tables
            .iter()
            .try_for_each(|table| self.emit_table(source, table, ctx));
        self.tables = tables;
        result?;

        if self.create_foreign_keys && self.dialect.constraint_timing() == ConstraintTiming::Deferred {
            self.emit_deferred_constraints(ctx)?;
        }

        for sql in self.dialect.session_footer() {
            ctx.sink.execute(&sql)?;
        }

        info!(
            "Converted {} tables ({} failed), {} rows written",
            ctx.progress.tables_done, ctx.progress.tables_failed, ctx.progress.rows_written
        );
        Ok(())
    }

    /// Build the DDL view of a table: mapped columns, primary key and any
    /// inline relationship clauses.
    pub fn table_definition(&self, table: &Table) -> TableDefinition {
        let mapper = self.dialect.type_mapper();
        let auto = table.auto_number_column().map(|c| c.name.as_str());

        let columns = table
            .columns
            .iter()
            .map(|col| {
                let target = mapper.map_column(col, self.constraints.column_hints(&table.name, &col.name));
                if let Some(warning) = &target.warning {
                    warn!("{}.{}: {}", table.name, col.name, warning);
                }
                ColumnDefinition {
                    name: col.name.clone(),
                    target,
                    is_auto_number: auto == Some(col.name.as_str()),
                }
            })
            .collect();

        let foreign_keys = if self.create_foreign_keys
            && self.dialect.constraint_timing() == ConstraintTiming::Inline
        {
            self.constraints.foreign_keys_for(&table.name).to_vec()
        } else {
            Vec::new()
        };

        TableDefinition {
            name: table.name.clone(),
            columns,
            primary_key: self.constraints.primary_key(&table.name).cloned(),
            foreign_keys,
        }
    }

    fn emit_table<C, S>(&mut self, source: &C, table: &Table, ctx: &mut ConversionContext<'_, S>) -> Result<()>
    where
        C: SourceCatalog + ?Sized,
        S: OutputSink,
    {
        let name = table.name.as_str();
        let quoted = self.dialect.quote_ident(name);
        info!("Converting table {} ({} rows)", name, table.row_count);

        if self.drop_tables {
            ctx.sink.comment(&format!("Drop table {} if exists", quoted))?;
            ctx.execute(name, &self.dialect.drop_table(name))?;
        }

        let definition = self.table_definition(table);
        ctx.sink.comment(&format!("Table structure for table {}", quoted))?;
        if !ctx.execute(name, &self.dialect.create_table(&definition))? {
            ctx.progress.tables_done += 1;
            ctx.progress.tables_failed += 1;
            ctx.progress.failed_tables.push(name.to_string());
            return Ok(());
        }
        ctx.sink.begin_table(table)?;

        self.emit_rows(source, table, &definition, ctx)?;

        let auto = definition.auto_number_column().map(|c| c.name.as_str());
        let mut auto_keyed = false;
        if self.create_indexes {
            let mut header_written = false;
            for index in self.constraints.index_fragments(name) {
                let Some(sql) = self.dialect.index_statement(&definition, index) else {
                    continue;
                };
                if !header_written {
                    ctx.sink.comment(&format!("Indexes for table {}", quoted))?;
                    header_written = true;
                }
                let leads_with_auto = index.columns.first().map(String::as_str) == auto;
                if ctx.execute(name, &sql)? && leads_with_auto {
                    auto_keyed = true;
                }
            }
        }

        if let Some(reset) = self.sequences.finalize(name) {
            if self.dialect.sequence_needs_key() && !auto_keyed {
                warn!(
                    "{}: no index on {}, leaving its sequence unchanged",
                    name, reset.column
                );
            } else {
                ctx.sink.comment(&format!("AUTO_INCREMENT for table {}", quoted))?;
                ctx.execute(name, &self.dialect.sequence_reset(&reset))?;
            }
        }

        ctx.progress.tables_done += 1;
        Ok(())
    }

    fn emit_rows<C, S>(
        &mut self,
        source: &C,
        table: &Table,
        definition: &TableDefinition,
        ctx: &mut ConversionContext<'_, S>,
    ) -> Result<()>
    where
        C: SourceCatalog + ?Sized,
        S: OutputSink,
    {
        let column_names: Vec<String> = table.columns.iter().map(|c| c.name.clone()).collect();
        let plan = InsertPlan::new(self.dialect, &table.name, &column_names);
        let batch_rows = ctx.sink.batch_rows().max(1);
        let auto_index = table
            .auto_number_column()
            .and_then(|c| table.column_index(&c.name));

        let mut batch: Vec<Vec<SqlValue<'static>>> = Vec::with_capacity(batch_rows);
        let mut header_written = false;
        let mut row_seq: u64 = 0;

        for item in source.rows(&table.name)? {
            let row = item?;
            row_seq += 1;
            ctx.progress.rows_read += 1;

            if let Some(idx) = auto_index {
                if let Ok(CellValue::Int(v)) = row.get(idx) {
                    self.sequences.observe(&table.name, &table.columns[idx].name, *v);
                }
            }

            let mut values = Vec::with_capacity(table.columns.len());
            for (idx, col) in table.columns.iter().enumerate() {
                let target = &definition.columns[idx].target;
                let converted = self.convert_cell(&table.name, col, target, &row, idx, row_seq);
                for diagnostic in converted.diagnostics {
                    ctx.record(diagnostic);
                }
                values.push(converted.value);
            }
            batch.push(values);

            if batch.len() >= batch_rows {
                self.flush(&plan, &mut batch, &mut header_written, ctx)?;
            }
        }

        self.flush(&plan, &mut batch, &mut header_written, ctx)?;
        debug!("{}: {} rows read", table.name, row_seq);
        Ok(())
    }

    fn flush<S: OutputSink>(
        &self,
        plan: &InsertPlan,
        batch: &mut Vec<Vec<SqlValue<'static>>>,
        header_written: &mut bool,
        ctx: &mut ConversionContext<'_, S>,
    ) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        if !*header_written {
            ctx.sink
                .comment(&format!("Dumping data for table {}", self.dialect.quote_ident(&plan.table)))?;
            *header_written = true;
        }

        match ctx.sink.write_batch(plan, batch) {
            Ok(outcome) => {
                ctx.progress.rows_written += outcome.written;
                ctx.record_failures(&plan.table, &outcome.failures);
            }
            Err(e) if !e.is_fatal() => {
                ctx.record(Diagnostic::from_target_write(&plan.table, &e));
            }
            Err(e) => return Err(e),
        }

        batch.clear();
        Ok(())
    }

    /// Convert one cell. Any problem degrades the value to NULL.
    fn convert_cell(
        &self,
        table: &str,
        col: &Column,
        target: &TargetType,
        row: &Row,
        idx: usize,
        row_seq: u64,
    ) -> Converted {
        let value_read = |message: String| {
            Diagnostic::new(DiagnosticKind::ValueRead, format!("row {}: {}", row_seq, message))
                .with_table(table)
                .with_column(&col.name)
        };

        let cell = match row.get(idx) {
            Ok(cell) => cell,
            Err(reason) => return Converted::null_with(value_read(reason)),
        };

        let value = match (col.source_type, cell) {
            (_, CellValue::Null) => SqlValue::Null,
            (SourceType::Integer, CellValue::Int(v)) => SqlValue::I64(*v),
            (SourceType::Float, CellValue::Float(v)) => {
                let rounded = match target.value_precision {
                    Some(precision) => round_half_up(*v, precision),
                    None => v.is_finite().then_some(*v),
                };
                match rounded {
                    Some(rounded) => SqlValue::F64(rounded),
                    None => return Converted::null_with(value_read(format!("non-finite value {}", v))),
                }
            }
            (SourceType::Float, CellValue::Int(v)) => SqlValue::F64(*v as f64),
            (SourceType::Decimal | SourceType::Money, CellValue::Decimal(d)) => SqlValue::Decimal(*d),
            (SourceType::Decimal | SourceType::Money, CellValue::Int(v)) => SqlValue::Decimal(Decimal::from(*v)),
            (SourceType::Boolean, CellValue::Bool(b)) => SqlValue::Bool(*b),
            (SourceType::Timestamp, CellValue::DateTime(dt)) => SqlValue::DateTime(*dt),
            (t, CellValue::Text(s)) if t.is_textual() => SqlValue::Text(Cow::Owned(s.clone())),
            (SourceType::Binary, CellValue::Bytes(b)) if b.is_empty() => SqlValue::Null,
            (SourceType::Binary, CellValue::Bytes(b)) => SqlValue::Bytes(Cow::Owned(b.clone())),
            (SourceType::Complex, CellValue::Attachments(items)) => {
                let extraction = self.blobs.extract_attachments(table, &col.name, row_seq, items);
                return self.sidecar(extraction, value_read);
            }
            (SourceType::Ole, CellValue::Ole(content)) => {
                let extraction = self.blobs.extract_ole(table, &col.name, row_seq, content);
                return self.sidecar(extraction, value_read);
            }
            (expected, other) => {
                return Converted::null_with(value_read(format!(
                    "expected {:?} value, found {}",
                    expected,
                    other.kind_name()
                )))
            }
        };

        Converted::value(value)
    }

    /// Sidecar JSON for an extracted cell; an empty record list is NULL.
    fn sidecar(&self, extraction: Extraction, value_read: impl Fn(String) -> Diagnostic) -> Converted {
        let json = extraction.to_json();
        let mut diagnostics = extraction.diagnostics;
        let value = match json {
            Ok(Some(json)) => SqlValue::Text(Cow::Owned(json)),
            Ok(None) => SqlValue::Null,
            Err(e) => {
                diagnostics.push(value_read(e.to_string()));
                SqlValue::Null
            }
        };
        Converted { value, diagnostics }
    }

    fn emit_deferred_constraints<S: OutputSink>(&self, ctx: &mut ConversionContext<'_, S>) -> Result<()> {
        let failed = ctx.progress.failed_tables.clone();
        for (table, fks) in self.constraints.deferred() {
            let statements: Vec<String> = fks
                .iter()
                .filter(|fk| !failed.contains(&fk.table) && !failed.contains(&fk.referenced_table))
                .filter_map(|fk| self.dialect.foreign_key_statement(fk))
                .collect();
            if statements.is_empty() {
                continue;
            }

            ctx.sink.comment(&format!(
                "Relationships for table {}",
                self.dialect.quote_ident(table)
            ))?;
            for sql in statements {
                ctx.execute(table, &sql)?;
            }
        }
        Ok(())
    }
}
