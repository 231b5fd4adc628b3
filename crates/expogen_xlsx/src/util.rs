//! Stateless helper utilities used by the export writer.

use crate::conf::{
    C_DATE_RENDER_PATTERN, C_SHEET_NAME_FALLBACK, N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX,
    N_NROWS_EXCEL_MAX, TUP_EXCEL_ILLEGAL,
};
use crate::error::ExportError;
use crate::record::FieldValue;
use crate::spec::{EnumCellValue, EnumColumnType};

////////////////////////////////////////////////////////////////////////////////
// #region CellValueConversion

/// Render a resolved value into cell content for a column of `column_type`.
///
/// Missing values give an empty cell. A value that does not match the declared
/// type degrades to its textual representation instead of failing the export.
pub fn convert_field_value(value: &FieldValue<'_>, column_type: EnumColumnType) -> EnumCellValue {
    if value.is_null() {
        return EnumCellValue::None;
    }

    let value_converted = match (column_type, value) {
        (EnumColumnType::Text, _) => None,
        (EnumColumnType::Number, FieldValue::Integer(n)) => Some(EnumCellValue::Number(*n as f64)),
        (EnumColumnType::Number, FieldValue::Number(n)) if n.is_finite() => {
            Some(EnumCellValue::Number(*n))
        }
        (EnumColumnType::Date, FieldValue::Date(d)) => Some(EnumCellValue::String(
            d.format(C_DATE_RENDER_PATTERN).to_string(),
        )),
        (EnumColumnType::Date, FieldValue::DateTime(dt)) => Some(EnumCellValue::String(
            dt.date().format(C_DATE_RENDER_PATTERN).to_string(),
        )),
        (EnumColumnType::Boolean, FieldValue::Boolean(b)) => Some(EnumCellValue::Boolean(*b)),
        _ => None,
    };

    value_converted.unwrap_or_else(|| {
        derive_field_text(value).map_or(EnumCellValue::None, EnumCellValue::String)
    })
}

/// Textual representation of a leaf value; `None` for missing or nested values.
pub fn derive_field_text(value: &FieldValue<'_>) -> Option<String> {
    match value {
        FieldValue::Null | FieldValue::Record(_) => None,
        FieldValue::Text(s) => Some(s.to_string()),
        FieldValue::Integer(n) => Some(n.to_string()),
        FieldValue::Number(n) => Some(if n.is_nan() {
            "NaN".to_string()
        } else if n.is_infinite() {
            if n.is_sign_positive() { "Inf" } else { "-Inf" }.to_string()
        } else {
            n.to_string()
        }),
        FieldValue::Boolean(b) => Some(b.to_string()),
        FieldValue::Date(d) => Some(d.format(C_DATE_RENDER_PATTERN).to_string()),
        FieldValue::DateTime(dt) => Some(
            dt.format(&format!("{C_DATE_RENDER_PATTERN} %H:%M:%S"))
                .to_string(),
        ),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetNormalization

/// Replace invalid chars and trim to valid Excel sheet name.
///
/// Excel also rejects names starting or ending with an apostrophe.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    let c_name: String = c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect();
    let c_name = c_name.trim().trim_matches('\'').trim();
    if c_name.is_empty() {
        return C_SHEET_NAME_FALLBACK.to_string();
    }
    c_name.to_string()
}

/// Zero-based row index as a worksheet row; fails past the Excel grid.
pub fn cast_row_num(value: usize) -> Result<u32, ExportError> {
    if value >= N_NROWS_EXCEL_MAX {
        return Err(ExportError::RowOverflow(value));
    }
    u32::try_from(value).map_err(|_| ExportError::RowOverflow(value))
}

/// Zero-based column index as a worksheet column; fails past the Excel grid.
pub fn cast_col_num(value: usize) -> Result<u16, ExportError> {
    if value >= N_NCOLS_EXCEL_MAX {
        return Err(ExportError::ColumnOverflow(value));
    }
    u16::try_from(value).map_err(|_| ExportError::ColumnOverflow(value))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region WidthEstimation

/// Estimate displayed width units for one formatted cell value.
///
/// Used by autofit inference logic.
pub fn estimate_width_len(value: &EnumCellValue) -> usize {
    match value {
        EnumCellValue::None => 0,
        EnumCellValue::String(s) => estimate_unicode_string_width(s),
        EnumCellValue::Number(n) => format!("{n:.2}").len(),
        EnumCellValue::Boolean(b) => {
            if *b {
                4
            } else {
                5
            }
        }
    }
}

/// Wide (non-ASCII) characters count as 1.6 units.
pub fn estimate_unicode_string_width(s: &str) -> usize {
    let n_ascii = s.chars().filter(|chr| chr.is_ascii()).count();
    let n_non_ascii = s.chars().count().saturating_sub(n_ascii);
    n_ascii + (n_non_ascii as f64 * 1.6).round() as usize
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn test_null_is_empty_for_every_type() {
        for column_type in [
            EnumColumnType::Text,
            EnumColumnType::Number,
            EnumColumnType::Date,
            EnumColumnType::Boolean,
        ] {
            assert_eq!(
                convert_field_value(&FieldValue::Null, column_type),
                EnumCellValue::None
            );
        }
    }

    #[test]
    fn test_matching_types_render_natively() {
        assert_eq!(
            convert_field_value(&FieldValue::Integer(30), EnumColumnType::Number),
            EnumCellValue::Number(30.0)
        );
        assert_eq!(
            convert_field_value(&FieldValue::Boolean(true), EnumColumnType::Boolean),
            EnumCellValue::Boolean(true)
        );
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(
            convert_field_value(&FieldValue::Date(date), EnumColumnType::Date),
            EnumCellValue::String("05/01/2024".to_string())
        );
        assert_eq!(
            convert_field_value(
                &FieldValue::DateTime(date.and_hms_opt(13, 4, 5).unwrap()),
                EnumColumnType::Date
            ),
            EnumCellValue::String("05/01/2024".to_string())
        );
        assert_eq!(
            convert_field_value(&FieldValue::Number(30.0), EnumColumnType::Text),
            EnumCellValue::String("30".to_string())
        );
    }

    #[test]
    fn test_mismatched_types_degrade_to_text() {
        assert_eq!(
            convert_field_value(
                &FieldValue::Text(Cow::Borrowed("n/a")),
                EnumColumnType::Number
            ),
            EnumCellValue::String("n/a".to_string())
        );
        assert_eq!(
            convert_field_value(&FieldValue::Number(f64::NAN), EnumColumnType::Number),
            EnumCellValue::String("NaN".to_string())
        );
        assert_eq!(
            convert_field_value(&FieldValue::Integer(1), EnumColumnType::Boolean),
            EnumCellValue::String("1".to_string())
        );
        assert_eq!(
            convert_field_value(&FieldValue::Boolean(false), EnumColumnType::Date),
            EnumCellValue::String("false".to_string())
        );
    }

    #[test]
    fn test_sanitize_sheet_name() {
        assert_eq!(sanitize_sheet_name("  a:b  ", "_"), "a_b");
        assert_eq!(sanitize_sheet_name("***", ""), "Sheet");
        assert_eq!(sanitize_sheet_name(&"x".repeat(40), "_").len(), 31);
    }

    #[test]
    fn test_sanitize_sheet_name_strips_edge_apostrophes() {
        assert_eq!(sanitize_sheet_name("'Q1'", "_"), "Q1");
        assert_eq!(sanitize_sheet_name(" ' Q1's ' ", "_"), "Q1's");
        assert_eq!(sanitize_sheet_name("''", "_"), "Sheet");
        let c_name_long = format!("{}'tail", "y".repeat(30));
        assert_eq!(sanitize_sheet_name(&c_name_long, "_"), "y".repeat(30));
    }

    #[test]
    fn test_cast_checks_excel_grid() {
        assert_eq!(cast_row_num(1_048_575).unwrap(), 1_048_575);
        assert!(matches!(
            cast_row_num(1_048_576),
            Err(ExportError::RowOverflow(1_048_576))
        ));
        assert_eq!(cast_col_num(16_383).unwrap(), 16_383);
        assert!(matches!(
            cast_col_num(16_384),
            Err(ExportError::ColumnOverflow(16_384))
        ));
    }

    #[test]
    fn test_estimate_width_len() {
        assert_eq!(estimate_width_len(&EnumCellValue::Number(30.0)), 5);
        assert_eq!(estimate_width_len(&EnumCellValue::String("abc".into())), 3);
        assert_eq!(estimate_unicode_string_width("سن"), 3);
        assert_eq!(estimate_width_len(&EnumCellValue::None), 0);
    }
}
