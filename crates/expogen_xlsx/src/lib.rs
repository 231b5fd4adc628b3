//! `expogen_xlsx` v1:
//! Schema-driven streaming export of typed records into one XLSX sheet.
//!
//! Layout:
//! - `conf`    : constants and default presets
//! - `spec`    : schema models, options and report types
//! - `error`   : schema and export errors
//! - `record`  : record trait and compiled field access
//! - `schema`  : schema and catalog validation
//! - `style`   : per-document style interning
//! - `util`    : pure helper functions
//! - `formula` : formula composition and placement
//! - `sink`    : XLSX and in-memory sheet sinks
//! - `writer`  : document builder state machine
//! - `export`  : exporter entry points
pub mod conf;
pub mod error;
pub mod export;
pub mod formula;
pub mod record;
pub mod schema;
pub mod sink;
pub mod spec;
pub mod style;
pub mod util;
pub mod writer;

pub use conf::{
    C_NUM_FORMAT_DATE, C_NUM_FORMAT_NUMBER, N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX,
    N_NROWS_EXCEL_MAX,
};
pub use error::{ExportError, SchemaError};
pub use export::{ExportPlan, Exporter};
pub use formula::{compose_formula_text, derive_column_letter};
pub use record::{FieldAccessPlan, FieldId, FieldValue, Record, RecordShape, nested};
pub use schema::{SpecResolvedColumn, ValidatedSchema, validate_export_catalog};
pub use sink::{EnumSheetCell, MemorySheet, MemorySheetSink, SheetSink, XlsxSheetSink};
pub use spec::{
    EnumColumnType, EnumFormulaScope, EnumSheetMemoryMode, EnumStyleAlign,
    SpecAutofitCellsPolicy, SpecCellStyle, SpecColumn, SpecExportCatalog, SpecExportOptions,
    SpecExportReport, SpecExportSchema, SpecFormula, SpecSchemaViolation,
};
pub use style::{SpecStyleKey, StyleHandle, StyleInterner};
pub use util::sanitize_sheet_name;
pub use writer::{Document, DocumentBuilder, EnumDocumentState};
