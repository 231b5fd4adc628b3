//! Export constants and default preset factories.

use crate::spec::{SpecAutofitCellsPolicy, SpecCellStyle, SpecExportOptions};

/// Excel worksheet maximum row count.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Body row count past which a streaming export warns about the row limit.
pub const N_NROWS_BODY_WARN: usize = 1_000_000;
/// Excel worksheet maximum column count.
pub const N_NCOLS_EXCEL_MAX: usize = 16_384;
/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Characters not allowed in sheet names.
pub const TUP_EXCEL_ILLEGAL: [&str; 7] = ["*", ":", "?", "/", "\\", "[", "]"];
/// Largest font size Excel accepts, in points.
pub const N_FONT_SIZE_EXCEL_MAX: i64 = 409;

/// Display format carried by body cells of `Number` columns.
pub const C_NUM_FORMAT_NUMBER: &str = "0.00";
/// Display format carried by body cells of `Date` columns.
pub const C_NUM_FORMAT_DATE: &str = "dd/mm/yyyy";
/// Pattern used to render date values into cell text.
pub const C_DATE_RENDER_PATTERN: &str = "%d/%m/%Y";

/// Default font family of a style.
pub const C_FONT_NAME_DEFAULT: &str = "Arial";
/// Default font size of a style, in points.
pub const N_FONT_SIZE_DEFAULT: i64 = 12;
/// Default horizontal alignment of a style.
pub const C_ALIGNMENT_DEFAULT: &str = "CENTER";

/// Sheet name used when neither the schema nor the record type provides one.
pub const C_SHEET_NAME_FALLBACK: &str = "Sheet";
/// Replacement for characters Excel rejects in sheet names.
pub const C_SHEET_NAME_REPLACE_TO: &str = "_";
/// Creation date stamped into document properties, as `(year, month, day)`.
pub const TUP_DATE_CREATED_DEFAULT: (u16, u8, u8) = (2000, 1, 1);

/// Zero-based row index of the header row.
pub const N_ROW_IDX_HEADER: usize = 0;
/// One-based sheet row number of the first body row.
pub const N_ROW_NUM_BODY_FIRST: usize = 2;

/// Allowed export schema names inside a catalog.
pub const C_PATTERN_SCHEMA_NAME: &str = r"^[A-Za-z][A-Za-z0-9]*$";
/// Allowed background colors (six hex digits, no `#`).
pub const C_PATTERN_BACKGROUND_COLOR: &str = r"^[0-9A-Fa-f]{6}$";

/// Build the default cell style (`Arial`, 12pt, regular, centered, no fill).
pub fn derive_default_cell_style() -> SpecCellStyle {
    SpecCellStyle {
        font_name: C_FONT_NAME_DEFAULT.to_string(),
        font_size: N_FONT_SIZE_DEFAULT,
        bold: false,
        background_color: String::new(),
        alignment: C_ALIGNMENT_DEFAULT.to_string(),
    }
}

/// Build default export options.
pub fn derive_default_export_options() -> SpecExportOptions {
    SpecExportOptions {
        rule_memory: Default::default(),
        policy_autofit: SpecAutofitCellsPolicy::default(),
        date_created: Some(TUP_DATE_CREATED_DEFAULT),
    }
}
