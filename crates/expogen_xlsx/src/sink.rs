//! Backing sheet sinks: the low-level cell writers behind a document.

use std::collections::BTreeMap;
use std::io::{Seek, Write};
use std::path::Path;

use rust_xlsxwriter::{
    Color, DocProperties, ExcelDateTime, Format, FormatAlign, Workbook, Worksheet,
};

use crate::error::ExportError;
use crate::spec::{EnumSheetMemoryMode, EnumStyleAlign, SpecExportOptions};
use crate::style::{SpecStyleKey, StyleHandle};

/// Cell-level writer capability of a spreadsheet backend.
///
/// Styles are announced once through [`SheetSink::define_style`] before any
/// cell references their handle. Rows arrive in ascending order.
pub trait SheetSink {
    fn set_sheet_name(&mut self, name: &str) -> Result<(), ExportError>;

    fn define_style(&mut self, handle: StyleHandle, key: &SpecStyleKey)
    -> Result<(), ExportError>;

    fn write_text(
        &mut self,
        row: u32,
        col: u16,
        value: &str,
        style: StyleHandle,
    ) -> Result<(), ExportError>;

    fn write_number(
        &mut self,
        row: u32,
        col: u16,
        value: f64,
        style: StyleHandle,
    ) -> Result<(), ExportError>;

    fn write_boolean(
        &mut self,
        row: u32,
        col: u16,
        value: bool,
        style: StyleHandle,
    ) -> Result<(), ExportError>;

    fn write_blank(&mut self, row: u32, col: u16, style: StyleHandle) -> Result<(), ExportError>;

    fn write_formula(
        &mut self,
        row: u32,
        col: u16,
        formula: &str,
        style: StyleHandle,
    ) -> Result<(), ExportError>;

    fn set_column_width(&mut self, col: u16, width: f64) -> Result<(), ExportError>;
}

////////////////////////////////////////////////////////////////////////////////
// #region XlsxSink

/// `rust_xlsxwriter` workbook holding a single worksheet.
pub struct XlsxSheetSink {
    workbook: Workbook,
    l_formats: Vec<Format>,
}

impl XlsxSheetSink {
    /// Create the workbook and its only worksheet.
    pub fn new(options: &SpecExportOptions) -> Result<Self, ExportError> {
        let mut workbook = Workbook::new();
        match options.rule_memory {
            EnumSheetMemoryMode::ConstantMemory => {
                workbook.add_worksheet_with_constant_memory();
            }
            EnumSheetMemoryMode::Standard => {
                workbook.add_worksheet();
            }
        }

        if let Some((n_year, n_month, n_day)) = options.date_created {
            let datetime_created = ExcelDateTime::from_ymd(n_year, n_month, n_day)?;
            let properties = DocProperties::new().set_creation_datetime(&datetime_created);
            workbook.set_properties(&properties);
        }

        Ok(Self {
            workbook,
            l_formats: Vec::new(),
        })
    }

    /// Serialize the workbook into an in-memory buffer.
    pub fn save_to_buffer(&mut self) -> Result<Vec<u8>, ExportError> {
        Ok(self.workbook.save_to_buffer()?)
    }

    /// Serialize the workbook to a file.
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ExportError> {
        Ok(self.workbook.save(path.as_ref())?)
    }

    /// Serialize the workbook into any seekable writer.
    pub fn save_to_writer<W: Write + Seek + Send>(&mut self, writer: W) -> Result<(), ExportError> {
        Ok(self.workbook.save_to_writer(writer)?)
    }

    fn derive_target(&mut self, style: StyleHandle) -> Result<(&mut Worksheet, &Format), ExportError> {
        let Self {
            workbook,
            l_formats,
        } = self;
        let format = l_formats
            .get(style.index())
            .ok_or(ExportError::UnknownStyle(style.index()))?;
        let worksheet = workbook.worksheet_from_index(0)?;
        Ok((worksheet, format))
    }
}

impl SheetSink for XlsxSheetSink {
    fn set_sheet_name(&mut self, name: &str) -> Result<(), ExportError> {
        self.workbook.worksheet_from_index(0)?.set_name(name)?;
        Ok(())
    }

    fn define_style(
        &mut self,
        handle: StyleHandle,
        key: &SpecStyleKey,
    ) -> Result<(), ExportError> {
        let format = derive_rust_xlsx_format(key);
        if handle.index() < self.l_formats.len() {
            self.l_formats[handle.index()] = format;
        } else {
            self.l_formats.push(format);
        }
        Ok(())
    }

    fn write_text(
        &mut self,
        row: u32,
        col: u16,
        value: &str,
        style: StyleHandle,
    ) -> Result<(), ExportError> {
        let (worksheet, format) = self.derive_target(style)?;
        worksheet.write_string_with_format(row, col, value, format)?;
        Ok(())
    }

    fn write_number(
        &mut self,
        row: u32,
        col: u16,
        value: f64,
        style: StyleHandle,
    ) -> Result<(), ExportError> {
        let (worksheet, format) = self.derive_target(style)?;
        worksheet.write_number_with_format(row, col, value, format)?;
        Ok(())
    }

    fn write_boolean(
        &mut self,
        row: u32,
        col: u16,
        value: bool,
        style: StyleHandle,
    ) -> Result<(), ExportError> {
        let (worksheet, format) = self.derive_target(style)?;
        worksheet.write_boolean_with_format(row, col, value, format)?;
        Ok(())
    }

    fn write_blank(&mut self, row: u32, col: u16, style: StyleHandle) -> Result<(), ExportError> {
        let (worksheet, format) = self.derive_target(style)?;
        worksheet.write_blank(row, col, format)?;
        Ok(())
    }

    fn write_formula(
        &mut self,
        row: u32,
        col: u16,
        formula: &str,
        style: StyleHandle,
    ) -> Result<(), ExportError> {
        let (worksheet, format) = self.derive_target(style)?;
        worksheet.write_formula_with_format(row, col, formula, format)?;
        Ok(())
    }

    fn set_column_width(&mut self, col: u16, width: f64) -> Result<(), ExportError> {
        self.workbook
            .worksheet_from_index(0)?
            .set_column_width(col, width)?;
        Ok(())
    }
}

fn derive_rust_xlsx_format(key: &SpecStyleKey) -> Format {
    let mut format = Format::new()
        .set_font_name(key.font_name.as_str())
        .set_font_size(f64::from(key.font_size))
        .set_align(derive_format_align(key.alignment));

    if key.bold {
        format = format.set_bold();
    }
    if let Some(val) = key.background_color {
        format = format.set_background_color(Color::RGB(val));
    }
    if let Some(val) = key.num_format {
        format = format.set_num_format(val);
    }

    format
}

fn derive_format_align(alignment: EnumStyleAlign) -> FormatAlign {
    match alignment {
        EnumStyleAlign::Left => FormatAlign::Left,
        EnumStyleAlign::Center => FormatAlign::Center,
        EnumStyleAlign::Right => FormatAlign::Right,
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region MemorySink

/// Logical content of one written cell.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumSheetCell {
    Blank,
    Text(String),
    Number(f64),
    Boolean(bool),
    Formula(String),
}

/// One recorded cell with its style handle.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecSheetCell {
    pub value: EnumSheetCell,
    pub style: StyleHandle,
}

/// Sheet content recorded by [`MemorySheetSink`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MemorySheet {
    /// Sheet name.
    pub name: String,
    /// Cells keyed by zero-based `(row, col)`.
    pub cells: BTreeMap<(u32, u16), SpecSheetCell>,
    /// Style table indexed by handle.
    pub styles: Vec<SpecStyleKey>,
    /// Column widths set by the autofit pass.
    pub widths: BTreeMap<u16, f64>,
}

impl MemorySheet {
    pub fn cell(&self, row: u32, col: u16) -> Option<&SpecSheetCell> {
        self.cells.get(&(row, col))
    }

    /// Values of one row, ordered by column.
    pub fn row_values(&self, row: u32) -> Vec<&EnumSheetCell> {
        self.cells
            .range((row, 0)..=(row, u16::MAX))
            .map(|(_, cell)| &cell.value)
            .collect()
    }

    /// Number of rows holding at least one cell.
    pub fn n_rows(&self) -> usize {
        let mut n_rows = 0;
        let mut row_last = None;
        for (row, _) in self.cells.keys() {
            if row_last != Some(*row) {
                n_rows += 1;
                row_last = Some(*row);
            }
        }
        n_rows
    }

    /// Style key behind a cell's handle.
    pub fn style_of(&self, row: u32, col: u16) -> Option<&SpecStyleKey> {
        self.cell(row, col)
            .and_then(|cell| self.styles.get(cell.style.index()))
    }
}

/// Sink recording logical content in memory, for inspection and previews.
#[derive(Debug, Clone, Default)]
pub struct MemorySheetSink {
    sheet: MemorySheet,
}

impl MemorySheetSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sheet(&self) -> &MemorySheet {
        &self.sheet
    }

    pub fn into_sheet(self) -> MemorySheet {
        self.sheet
    }

    fn put(
        &mut self,
        row: u32,
        col: u16,
        value: EnumSheetCell,
        style: StyleHandle,
    ) -> Result<(), ExportError> {
        if style.index() >= self.sheet.styles.len() {
            return Err(ExportError::UnknownStyle(style.index()));
        }
        self.sheet
            .cells
            .insert((row, col), SpecSheetCell { value, style });
        Ok(())
    }
}

impl SheetSink for MemorySheetSink {
    fn set_sheet_name(&mut self, name: &str) -> Result<(), ExportError> {
        self.sheet.name = name.to_string();
        Ok(())
    }

    fn define_style(
        &mut self,
        handle: StyleHandle,
        key: &SpecStyleKey,
    ) -> Result<(), ExportError> {
        if handle.index() < self.sheet.styles.len() {
            self.sheet.styles[handle.index()] = key.clone();
        } else {
            self.sheet.styles.push(key.clone());
        }
        Ok(())
    }

    fn write_text(
        &mut self,
        row: u32,
        col: u16,
        value: &str,
        style: StyleHandle,
    ) -> Result<(), ExportError> {
        self.put(row, col, EnumSheetCell::Text(value.to_string()), style)
    }

    fn write_number(
        &mut self,
        row: u32,
        col: u16,
        value: f64,
        style: StyleHandle,
    ) -> Result<(), ExportError> {
        self.put(row, col, EnumSheetCell::Number(value), style)
    }

    fn write_boolean(
        &mut self,
        row: u32,
        col: u16,
        value: bool,
        style: StyleHandle,
    ) -> Result<(), ExportError> {
        self.put(row, col, EnumSheetCell::Boolean(value), style)
    }

    fn write_blank(&mut self, row: u32, col: u16, style: StyleHandle) -> Result<(), ExportError> {
        self.put(row, col, EnumSheetCell::Blank, style)
    }

    fn write_formula(
        &mut self,
        row: u32,
        col: u16,
        formula: &str,
        style: StyleHandle,
    ) -> Result<(), ExportError> {
        self.put(row, col, EnumSheetCell::Formula(formula.to_string()), style)
    }

    fn set_column_width(&mut self, col: u16, width: f64) -> Result<(), ExportError> {
        self.sheet.widths.insert(col, width);
        Ok(())
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
