//! Export schema models, writer options and report types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::conf::{derive_default_cell_style, derive_default_export_options};

////////////////////////////////////////////////////////////////////////////////
// #region EnumsInit

/// Declared value type of one exported column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnumColumnType {
    /// Textual representation of any value.
    #[serde(alias = "STRING", alias = "String", alias = "TEXT", alias = "text")]
    Text,
    /// Numeric cell with a fixed two-decimal display format.
    #[serde(alias = "NUMBER", alias = "number")]
    Number,
    /// Day/month/year rendered date.
    #[serde(alias = "DATE", alias = "date")]
    Date,
    /// Boolean literal cell.
    #[serde(alias = "BOOLEAN", alias = "boolean")]
    Boolean,
}

/// Whether an aggregate formula spans a column's data range or targets one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EnumFormulaScope {
    /// `function(<col>2:<col><lastDataRow>)` on the trailing formula row.
    #[default]
    #[serde(alias = "COLUMN", alias = "column")]
    WholeColumn,
    /// Function text used verbatim, placed on one target row.
    #[serde(alias = "CELL", alias = "cell")]
    SingleCell,
}

/// Horizontal alignment of a cell style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EnumStyleAlign {
    Left,
    Center,
    Right,
}

impl EnumStyleAlign {
    /// Canonical upper-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "LEFT",
            Self::Center => "CENTER",
            Self::Right => "RIGHT",
        }
    }
}

impl FromStr for EnumStyleAlign {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LEFT" => Ok(Self::Left),
            "CENTER" => Ok(Self::Center),
            "RIGHT" => Ok(Self::Right),
            _ => Err(format!(
                "Unrecognized alignment {s:?}; expected one of LEFT, CENTER, RIGHT."
            )),
        }
    }
}

/// Memory strategy of the backing worksheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumSheetMemoryMode {
    /// Flush each row as soon as the next one starts (default).
    #[default]
    ConstantMemory,
    /// Keep the whole worksheet in memory until save.
    Standard,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SchemaModels

/// Visual style of header or body cells of one column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpecCellStyle {
    /// Font family name.
    pub font_name: String,
    /// Font size in points; must be positive.
    pub font_size: i64,
    /// Bold font.
    pub bold: bool,
    /// Solid fill as six hex digits (`"CCCCCC"`); empty means no fill.
    pub background_color: String,
    /// Horizontal alignment name (`LEFT`, `CENTER` or `RIGHT`, case-insensitive).
    pub alignment: String,
}

impl Default for SpecCellStyle {
    fn default() -> Self {
        derive_default_cell_style()
    }
}

impl SpecCellStyle {
    pub fn with_font_name(mut self, font_name: impl Into<String>) -> Self {
        self.font_name = font_name.into();
        self
    }

    pub fn with_font_size(mut self, font_size: i64) -> Self {
        self.font_size = font_size;
        self
    }

    pub fn with_bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }

    pub fn with_background_color(mut self, background_color: impl Into<String>) -> Self {
        self.background_color = background_color.into();
        self
    }

    pub fn with_alignment(mut self, alignment: impl Into<String>) -> Self {
        self.alignment = alignment.into();
        self
    }
}

/// Aggregate formula attached to a column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpecFormula {
    /// Function name (`SUM`) for whole-column scope, or the full formula text
    /// for single-cell scope.
    #[serde(alias = "formula")]
    pub function: String,
    /// Formula scope.
    #[serde(alias = "applyTo")]
    pub scope: EnumFormulaScope,
    /// Zero-based target row for single-cell scope; negative means the row
    /// right after the last data row.
    pub row_offset: i64,
}

impl Default for SpecFormula {
    fn default() -> Self {
        Self {
            function: String::new(),
            scope: EnumFormulaScope::WholeColumn,
            row_offset: -1,
        }
    }
}

impl SpecFormula {
    /// Aggregate over the column's whole data range, e.g. `SUM`.
    pub fn whole_column(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            ..Default::default()
        }
    }

    /// Verbatim formula text on one target row.
    pub fn single_cell(function: impl Into<String>, row_offset: i64) -> Self {
        Self {
            function: function.into(),
            scope: EnumFormulaScope::SingleCell,
            row_offset,
        }
    }
}

/// Declarative description of one exported column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecColumn {
    /// Accessor names from the record to the leaf value.
    #[serde(alias = "fieldName", deserialize_with = "deserialize_field_path")]
    pub field_path: Vec<String>,
    /// Header text; the last path segment is used when empty.
    #[serde(default, alias = "columnName")]
    pub display_name: String,
    /// Declared value type.
    #[serde(rename = "type")]
    pub column_type: EnumColumnType,
    /// Sort key; ties keep declaration order.
    #[serde(default)]
    pub order: i64,
    /// Header cell style.
    #[serde(default)]
    pub header_style: SpecCellStyle,
    /// Body cell style.
    #[serde(default)]
    pub body_style: SpecCellStyle,
    /// Optional aggregate formula.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<SpecFormula>,
}

impl SpecColumn {
    /// Column over a dotted field path (`"address.city"`) with default styles.
    pub fn new(field_path: &str, column_type: EnumColumnType) -> Self {
        Self {
            field_path: split_field_path(field_path),
            display_name: String::new(),
            column_type,
            order: 0,
            header_style: SpecCellStyle::default(),
            body_style: SpecCellStyle::default(),
            formula: None,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    pub fn with_order(mut self, order: i64) -> Self {
        self.order = order;
        self
    }

    pub fn with_header_style(mut self, style: SpecCellStyle) -> Self {
        self.header_style = style;
        self
    }

    pub fn with_body_style(mut self, style: SpecCellStyle) -> Self {
        self.body_style = style;
        self
    }

    pub fn with_formula(mut self, formula: SpecFormula) -> Self {
        self.formula = Some(formula);
        self
    }

    /// Header text: `display_name`, or the last path segment when empty.
    pub fn derive_header_text(&self) -> &str {
        if !self.display_name.is_empty() {
            return &self.display_name;
        }
        self.field_path.last().map(String::as_str).unwrap_or_default()
    }
}

/// One sheet export definition.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpecExportSchema {
    /// Identifier inside a catalog; optional for standalone schemas.
    pub name: String,
    /// Sheet name; the record type name is used when empty.
    pub sheet_name: String,
    /// Columns in declaration order.
    pub columns: Vec<SpecColumn>,
    /// Fit column widths after the data pass.
    #[serde(rename = "autoSizeColumns")]
    pub if_autosize_columns: bool,
}

impl SpecExportSchema {
    pub fn new(sheet_name: impl Into<String>) -> Self {
        Self {
            sheet_name: sheet_name.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_column(mut self, column: SpecColumn) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_autosize_columns(mut self, if_autosize_columns: bool) -> Self {
        self.if_autosize_columns = if_autosize_columns;
        self
    }

    /// Parse a schema from JSON.
    pub fn from_json_str(c_json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(c_json)
    }
}

/// Several named export schemas for one record type.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecExportCatalog {
    /// Export definitions; names must be unique.
    pub exports: Vec<SpecExportSchema>,
}

impl SpecExportCatalog {
    /// Parse a catalog from JSON.
    pub fn from_json_str(c_json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(c_json)
    }
}

/// Split a dotted path into segments; an empty string yields no segments.
pub fn split_field_path(field_path: &str) -> Vec<String> {
    if field_path.is_empty() {
        return vec![];
    }
    field_path.split('.').map(ToString::to_string).collect()
}

fn deserialize_field_path<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TypeFieldPathRaw {
        Dotted(String),
        Segments(Vec<String>),
    }

    Ok(match TypeFieldPathRaw::deserialize(deserializer)? {
        TypeFieldPathRaw::Dotted(c_path) => split_field_path(&c_path),
        TypeFieldPathRaw::Segments(l_segments) => l_segments,
    })
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region WriteOptions

/// Autofit policy applied when a schema enables column auto-sizing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecAutofitCellsPolicy {
    /// Max body rows inspected for width inference; `None` inspects all.
    pub height_body_inferred_max: Option<usize>,
    /// Minimum final width.
    pub width_cell_min: usize,
    /// Maximum final width.
    pub width_cell_max: usize,
    /// Width padding added after inference.
    pub width_cell_padding: usize,
}

impl Default for SpecAutofitCellsPolicy {
    fn default() -> Self {
        Self {
            height_body_inferred_max: Some(20_000),
            width_cell_min: 8,
            width_cell_max: 60,
            width_cell_padding: 2,
        }
    }
}

/// Writer-wide options shared by every export of one exporter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecExportOptions {
    /// Backing worksheet memory strategy.
    pub rule_memory: EnumSheetMemoryMode,
    /// Width inference policy.
    pub policy_autofit: SpecAutofitCellsPolicy,
    /// Fixed creation date `(year, month, day)`; `None` stamps the current time.
    pub date_created: Option<(u16, u8, u8)>,
}

impl Default for SpecExportOptions {
    fn default() -> Self {
        derive_default_export_options()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellModels

/// Formatted cell content produced for one body cell.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumCellValue {
    /// Empty cell.
    None,
    /// Text value.
    String(String),
    /// Numeric value.
    Number(f64),
    /// Boolean literal.
    Boolean(bool),
}

/// One planned formula cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecFormulaCell {
    /// Zero-based sheet row.
    pub row_idx: usize,
    /// Zero-based sheet column.
    pub col_idx: usize,
    /// Formula text without a leading `=`.
    pub text: String,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReportSpecification

/// One schema consistency problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSchemaViolation {
    /// Catalog schema name, when validating a catalog.
    pub schema: Option<String>,
    /// Declaration index of the offending column.
    pub idx_column: Option<usize>,
    /// User-facing error text.
    pub message: String,
}

impl SpecSchemaViolation {
    pub fn schema_level(message: impl Into<String>) -> Self {
        Self {
            schema: None,
            idx_column: None,
            message: message.into(),
        }
    }

    pub fn column_level(idx_column: usize, message: impl Into<String>) -> Self {
        Self {
            schema: None,
            idx_column: Some(idx_column),
            message: message.into(),
        }
    }
}

impl fmt::Display for SpecSchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(c_schema) = &self.schema {
            write!(f, "[{c_schema}] ")?;
        }
        if let Some(n_idx) = self.idx_column {
            write!(f, "column #{n_idx}: ")?;
        }
        write!(f, "{}", self.message)
    }
}

/// Per-export report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecExportReport {
    /// Sheet name actually used.
    pub sheet_name: String,
    /// Number of body rows written.
    pub n_rows_body: usize,
    /// Number of formula cells written.
    pub n_cells_formula: usize,
    /// Number of distinct interned styles.
    pub n_styles: usize,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
}

impl SpecExportReport {
    /// Add a warning message.
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        self.warnings.push(msg.as_ref().to_string());
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
