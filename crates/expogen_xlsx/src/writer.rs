//! Document builder: streams one sheet through a [`SheetSink`].

use std::borrow::Borrow;
use std::io::{Seek, Write};
use std::marker::PhantomData;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::conf::{N_NROWS_BODY_WARN, N_ROW_IDX_HEADER};
use crate::error::ExportError;
use crate::export::ExportPlan;
use crate::formula::plan_formula_cells;
use crate::record::Record;
use crate::sink::{MemorySheet, MemorySheetSink, SheetSink, XlsxSheetSink};
use crate::spec::{EnumCellValue, SpecExportReport};
use crate::style::{SpecStyleKey, StyleHandle, StyleInterner};
use crate::util::{
    cast_col_num, cast_row_num, convert_field_value, estimate_unicode_string_width,
    estimate_width_len,
};

/// Lifecycle of one document; transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EnumDocumentState {
    Idle,
    HeaderWritten,
    BodyStreaming,
    FormulasApplied,
    Finalized,
}

/// Per-export writer state: row counter, style table, width tracking, report.
///
/// Owned by exactly one export call. Earlier stages run implicitly when a later
/// one is requested, so `write_record` on a fresh builder writes the header first.
pub struct DocumentBuilder<'a, R: Record, S: SheetSink> {
    plan: &'a ExportPlan,
    sink: S,
    state: EnumDocumentState,
    interner: StyleInterner,
    l_styles_header: Vec<StyleHandle>,
    l_styles_body: Vec<StyleHandle>,
    n_rows_body: usize,
    n_rows_seen_for_autofit: usize,
    l_width_by_col_header: Vec<usize>,
    l_width_by_col_body: Vec<usize>,
    report: SpecExportReport,
    _record: PhantomData<fn(&R)>,
}

impl<'a, R: Record, S: SheetSink> DocumentBuilder<'a, R, S> {
    pub(crate) fn new(plan: &'a ExportPlan, sink: S) -> Self {
        let n_cols = plan.schema.columns().len();
        Self {
            plan,
            sink,
            state: EnumDocumentState::Idle,
            interner: StyleInterner::new(),
            l_styles_header: Vec::with_capacity(n_cols),
            l_styles_body: Vec::with_capacity(n_cols),
            n_rows_body: 0,
            n_rows_seen_for_autofit: 0,
            l_width_by_col_header: vec![0; n_cols],
            l_width_by_col_body: vec![0; n_cols],
            report: SpecExportReport {
                sheet_name: plan.sheet_name.clone(),
                ..Default::default()
            },
            _record: PhantomData,
        }
    }

    pub fn state(&self) -> EnumDocumentState {
        self.state
    }

    /// Body rows written so far.
    pub fn n_rows_body(&self) -> usize {
        self.n_rows_body
    }

    /// Name the sheet, intern every column style and write the header row.
    pub fn write_header(&mut self) -> Result<(), ExportError> {
        self.check_transition(EnumDocumentState::HeaderWritten, false)?;

        let plan = self.plan;
        self.sink.set_sheet_name(&plan.sheet_name)?;

        let columns = plan.schema.columns();
        for col in columns {
            let style_header = self.intern_style(&col.style_header)?;
            let style_body = self.intern_style(&col.style_body)?;
            self.l_styles_header.push(style_header);
            self.l_styles_body.push(style_body);
        }

        let n_row_header = cast_row_num(N_ROW_IDX_HEADER)?;
        for (n_idx_col, col) in columns.iter().enumerate() {
            self.sink.write_text(
                n_row_header,
                cast_col_num(n_idx_col)?,
                &col.header_text,
                self.l_styles_header[n_idx_col],
            )?;
            if plan.schema.if_autosize_columns() {
                self.l_width_by_col_header[n_idx_col] =
                    estimate_unicode_string_width(&col.header_text);
            }
        }

        self.state = EnumDocumentState::HeaderWritten;
        Ok(())
    }

    /// Resolve, format and write one body row.
    pub fn write_record(&mut self, record: &R) -> Result<(), ExportError> {
        self.check_transition(EnumDocumentState::BodyStreaming, true)?;
        if self.state < EnumDocumentState::HeaderWritten {
            self.write_header()?;
        }
        self.state = EnumDocumentState::BodyStreaming;

        let plan = self.plan;
        let n_row = cast_row_num(N_ROW_IDX_HEADER + 1 + self.n_rows_body)?;
        let n_rows_seen_for_autofit = self.n_rows_seen_for_autofit;
        let if_track_width = plan.schema.if_autosize_columns()
            && plan
                .options
                .policy_autofit
                .height_body_inferred_max
                .is_none_or(|n_max| n_rows_seen_for_autofit < n_max);

        for (n_idx_col, (col, access)) in plan
            .schema
            .columns()
            .iter()
            .zip(&plan.l_access_plans)
            .enumerate()
        {
            let value_raw = access.resolve(record);
            let value = convert_field_value(&value_raw, col.column.column_type);

            if if_track_width {
                self.l_width_by_col_body[n_idx_col] = usize::max(
                    self.l_width_by_col_body[n_idx_col],
                    estimate_width_len(&value),
                );
            }

            write_cell_with_style(
                &mut self.sink,
                n_row,
                cast_col_num(n_idx_col)?,
                &value,
                self.l_styles_body[n_idx_col],
            )?;
        }

        if if_track_width {
            self.n_rows_seen_for_autofit += 1;
        }
        self.n_rows_body += 1;
        if self.n_rows_body == N_NROWS_BODY_WARN {
            let c_msg = format!(
                "Sheet {:?} reached {N_NROWS_BODY_WARN} body rows; the worksheet row limit is close.",
                plan.sheet_name
            );
            warn!("{c_msg}");
            self.report.warn(c_msg);
        }
        Ok(())
    }

    /// Stream every record of `records`, one at a time, in input order.
    pub fn write_records<I>(&mut self, records: I) -> Result<(), ExportError>
    where
        I: IntoIterator,
        I::Item: Borrow<R>,
    {
        for record in records {
            self.write_record(record.borrow())?;
        }
        Ok(())
    }

    /// Stream a fallible source; the first source error aborts the export.
    pub fn try_write_records<I, T, E>(&mut self, records: I) -> Result<(), ExportError>
    where
        I: IntoIterator<Item = Result<T, E>>,
        T: Borrow<R>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        for record in records {
            let record = record.map_err(|err| ExportError::Source(err.into()))?;
            self.write_record(record.borrow())?;
        }
        Ok(())
    }

    /// Write every formula cell now that the final row count is known.
    pub fn apply_formulas(&mut self) -> Result<(), ExportError> {
        self.check_transition(EnumDocumentState::FormulasApplied, false)?;
        if self.state < EnumDocumentState::HeaderWritten {
            self.write_header()?;
        }

        let l_cells = plan_formula_cells(
            self.plan.schema.columns(),
            self.n_rows_body,
            &mut self.report,
        );
        for cell in &l_cells {
            debug!(
                row = cell.row_idx,
                col = cell.col_idx,
                formula = %cell.text,
                "write formula cell"
            );
            self.sink.write_formula(
                cast_row_num(cell.row_idx)?,
                cast_col_num(cell.col_idx)?,
                &cell.text,
                self.l_styles_body[cell.col_idx],
            )?;
        }
        self.report.n_cells_formula = l_cells.len();

        self.state = EnumDocumentState::FormulasApplied;
        Ok(())
    }

    /// Apply column widths when auto-sizing is enabled and close the document.
    pub fn finalize(&mut self) -> Result<(), ExportError> {
        self.check_transition(EnumDocumentState::Finalized, false)?;
        if self.state < EnumDocumentState::FormulasApplied {
            self.apply_formulas()?;
        }

        if self.plan.schema.if_autosize_columns() {
            self.apply_column_widths()?;
        }

        self.report.n_rows_body = self.n_rows_body;
        self.report.n_styles = self.interner.len();
        self.state = EnumDocumentState::Finalized;

        info!(
            sheet = %self.report.sheet_name,
            rows = self.report.n_rows_body,
            formulas = self.report.n_cells_formula,
            styles = self.report.n_styles,
            "export finalized"
        );
        Ok(())
    }

    /// Finalize if needed and hand over the completed document.
    pub fn into_document(mut self) -> Result<Document<S>, ExportError> {
        if self.state != EnumDocumentState::Finalized {
            self.finalize()?;
        }
        Ok(Document {
            sink: self.sink,
            report: self.report,
        })
    }

    fn check_transition(
        &self,
        to: EnumDocumentState,
        if_reentrant: bool,
    ) -> Result<(), ExportError> {
        let from = self.state;
        if from == EnumDocumentState::Finalized {
            return Err(ExportError::DocumentClosed);
        }
        if from > to || (from == to && !if_reentrant) {
            return Err(ExportError::InvalidTransition { from, to });
        }
        Ok(())
    }

    fn intern_style(&mut self, key: &SpecStyleKey) -> Result<StyleHandle, ExportError> {
        let (handle, if_new) = self.interner.intern(key);
        if if_new {
            debug!(handle = handle.index(), style = ?key, "intern style");
            self.sink.define_style(handle, key)?;
        }
        Ok(handle)
    }

    fn apply_column_widths(&mut self) -> Result<(), ExportError> {
        let policy_autofit = &self.plan.options.policy_autofit;
        let n_min = usize::max(1, policy_autofit.width_cell_min);
        let n_max = usize::min(255, usize::max(n_min, policy_autofit.width_cell_max));
        let n_pad = policy_autofit.width_cell_padding;

        for n_idx_col in 0..self.l_width_by_col_header.len() {
            let n_width_recorded = usize::max(
                self.l_width_by_col_header[n_idx_col],
                self.l_width_by_col_body[n_idx_col],
            );
            let n_width_final = usize::min(n_max, usize::max(n_min, n_width_recorded + n_pad));
            self.sink
                .set_column_width(cast_col_num(n_idx_col)?, n_width_final as f64)?;
        }
        Ok(())
    }
}

fn write_cell_with_style<S: SheetSink>(
    sink: &mut S,
    row: u32,
    col: u16,
    value: &EnumCellValue,
    style: StyleHandle,
) -> Result<(), ExportError> {
    match value {
        EnumCellValue::None => sink.write_blank(row, col, style),
        EnumCellValue::String(s) => sink.write_text(row, col, s, style),
        EnumCellValue::Number(n) => sink.write_number(row, col, *n, style),
        EnumCellValue::Boolean(b) => sink.write_boolean(row, col, *b, style),
    }
}

/// Completed single-sheet document and its export report.
pub struct Document<S = XlsxSheetSink> {
    sink: S,
    report: SpecExportReport,
}

impl<S> Document<S> {
    pub fn report(&self) -> &SpecExportReport {
        &self.report
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}

impl Document<XlsxSheetSink> {
    /// Serialize to XLSX bytes.
    pub fn save_to_buffer(&mut self) -> Result<Vec<u8>, ExportError> {
        self.sink.save_to_buffer()
    }

    /// Serialize to an XLSX file.
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ExportError> {
        self.sink.save(path)
    }

    /// Serialize into any seekable writer.
    pub fn save_to_writer<W: Write + Seek + Send>(&mut self, writer: W) -> Result<(), ExportError> {
        self.sink.save_to_writer(writer)
    }
}

impl Document<MemorySheetSink> {
    /// Logical sheet content.
    pub fn sheet(&self) -> &MemorySheet {
        self.sink.sheet()
    }
}
