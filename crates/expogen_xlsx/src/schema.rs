//! Schema validation: accumulates every violation, then freezes the schema.

use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;

use crate::conf::{
    C_NUM_FORMAT_DATE, C_NUM_FORMAT_NUMBER, C_PATTERN_BACKGROUND_COLOR, C_PATTERN_SCHEMA_NAME,
    C_SHEET_NAME_REPLACE_TO, N_FONT_SIZE_EXCEL_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX,
};
use crate::error::SchemaError;
use crate::spec::{
    EnumColumnType, EnumFormulaScope, EnumStyleAlign, SpecCellStyle, SpecColumn, SpecExportCatalog,
    SpecExportSchema, SpecSchemaViolation,
};
use crate::style::SpecStyleKey;
use crate::util::sanitize_sheet_name;

/// Column after validation, in sorted position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecResolvedColumn {
    /// Position of the column in the schema's declaration order.
    pub idx_declared: usize,
    /// Source column definition.
    pub column: SpecColumn,
    /// Header cell text.
    pub header_text: String,
    /// Normalized header style.
    pub style_header: SpecStyleKey,
    /// Normalized body style, carrying the column type's number format.
    pub style_body: SpecStyleKey,
}

/// Immutable, validated export schema; safe to share across export calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSchema {
    name: String,
    sheet_name: String,
    columns: Vec<SpecResolvedColumn>,
    if_autosize_columns: bool,
}

impl ValidatedSchema {
    /// Validate `schema`, reporting all violations together.
    pub fn new(schema: SpecExportSchema) -> Result<Self, SchemaError> {
        let re_background_color = compile_pattern(C_PATTERN_BACKGROUND_COLOR)?;

        let mut l_violations = Vec::new();
        let mut l_columns = Vec::with_capacity(schema.columns.len());

        if schema.columns.len() > N_NCOLS_EXCEL_MAX {
            l_violations.push(SpecSchemaViolation::schema_level(format!(
                "Schema declares {} columns; at most {N_NCOLS_EXCEL_MAX} are allowed.",
                schema.columns.len()
            )));
        }

        for (idx_declared, column) in schema.columns.into_iter().enumerate() {
            let n_violations_before = l_violations.len();
            validate_field_path(&column, idx_declared, &mut l_violations);

            let style_header = validate_cell_style(
                &column.header_style,
                "headerStyle",
                idx_declared,
                &re_background_color,
                &mut l_violations,
            );
            let style_body = validate_cell_style(
                &column.body_style,
                "bodyStyle",
                idx_declared,
                &re_background_color,
                &mut l_violations,
            );

            if let Some(formula) = &column.formula {
                if formula.function.trim().is_empty() {
                    l_violations.push(SpecSchemaViolation::column_level(
                        idx_declared,
                        "formula.function must not be empty.",
                    ));
                }
                if formula.scope == EnumFormulaScope::SingleCell
                    && usize::try_from(formula.row_offset)
                        .is_ok_and(|n_row_idx| n_row_idx >= N_NROWS_EXCEL_MAX)
                {
                    l_violations.push(SpecSchemaViolation::column_level(
                        idx_declared,
                        format!(
                            "formula.rowOffset must be < {N_NROWS_EXCEL_MAX} (got {}).",
                            formula.row_offset
                        ),
                    ));
                }
            }

            if l_violations.len() > n_violations_before {
                continue;
            }
            let (Some(style_header), Some(style_body)) = (style_header, style_body) else {
                continue;
            };

            l_columns.push(SpecResolvedColumn {
                idx_declared,
                header_text: column.derive_header_text().to_string(),
                style_body: style_body.with_num_format(derive_num_format(column.column_type)),
                style_header,
                column,
            });
        }

        if !l_violations.is_empty() {
            return Err(SchemaError::new(l_violations));
        }

        // Stable sort: equal `order` keeps declaration order.
        l_columns.sort_by_key(|col| col.column.order);

        Ok(Self {
            name: schema.name,
            sheet_name: schema.sheet_name,
            columns: l_columns,
            if_autosize_columns: schema.if_autosize_columns,
        })
    }

    /// Catalog name (may be empty for standalone schemas).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Configured sheet name (may be empty).
    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    /// Columns in sorted order.
    pub fn columns(&self) -> &[SpecResolvedColumn] {
        &self.columns
    }

    pub fn if_autosize_columns(&self) -> bool {
        self.if_autosize_columns
    }

    /// Final, Excel-safe sheet name; falls back to `record_name` when unset.
    pub fn derive_sheet_name(&self, record_name: &str) -> String {
        let c_sheet_name = if self.sheet_name.trim().is_empty() {
            record_name
        } else {
            &self.sheet_name
        };
        sanitize_sheet_name(c_sheet_name, C_SHEET_NAME_REPLACE_TO)
    }
}

impl TryFrom<SpecExportSchema> for ValidatedSchema {
    type Error = SchemaError;

    fn try_from(schema: SpecExportSchema) -> Result<Self, Self::Error> {
        Self::new(schema)
    }
}

/// Validate every schema of a catalog, keyed by schema name.
///
/// Names must match `[A-Za-z][A-Za-z0-9]*` and be unique; violations of all
/// schemas are reported together.
pub fn validate_export_catalog(
    catalog: SpecExportCatalog,
) -> Result<BTreeMap<String, ValidatedSchema>, SchemaError> {
    let re_schema_name = compile_pattern(C_PATTERN_SCHEMA_NAME)?;

    let mut l_violations = Vec::new();
    let mut set_names_seen = BTreeSet::new();
    let mut dict_schemas = BTreeMap::new();

    for schema in catalog.exports {
        let c_name = schema.name.clone();
        if !re_schema_name.is_match(&c_name) {
            l_violations.push(SpecSchemaViolation::schema_level(format!(
                "Invalid schema name {c_name:?}; expected [A-Za-z][A-Za-z0-9]*."
            )));
        } else if !set_names_seen.insert(c_name.clone()) {
            l_violations.push(SpecSchemaViolation::schema_level(format!(
                "Duplicate schema name {c_name:?}."
            )));
        }

        match ValidatedSchema::new(schema) {
            Ok(validated) => {
                dict_schemas.entry(c_name).or_insert(validated);
            }
            Err(err) => {
                l_violations.extend(err.violations.into_iter().map(|mut violation| {
                    violation.schema = Some(c_name.clone());
                    violation
                }));
            }
        }
    }

    if !l_violations.is_empty() {
        return Err(SchemaError::new(l_violations));
    }
    Ok(dict_schemas)
}

fn compile_pattern(c_pattern: &str) -> Result<Regex, SchemaError> {
    Regex::new(c_pattern).map_err(|err| {
        SchemaError::new(vec![SpecSchemaViolation::schema_level(format!(
            "Invalid validation pattern {c_pattern:?}: {err}"
        ))])
    })
}

fn derive_num_format(column_type: EnumColumnType) -> Option<&'static str> {
    match column_type {
        EnumColumnType::Number => Some(C_NUM_FORMAT_NUMBER),
        EnumColumnType::Date => Some(C_NUM_FORMAT_DATE),
        EnumColumnType::Text | EnumColumnType::Boolean => None,
    }
}

fn validate_field_path(
    column: &SpecColumn,
    idx_declared: usize,
    l_violations: &mut Vec<SpecSchemaViolation>,
) {
    if column.field_path.is_empty() {
        l_violations.push(SpecSchemaViolation::column_level(
            idx_declared,
            "fieldPath must have at least one segment.",
        ));
        return;
    }

    for (n_idx_segment, c_segment) in column.field_path.iter().enumerate() {
        if c_segment.trim().is_empty() {
            l_violations.push(SpecSchemaViolation::column_level(
                idx_declared,
                format!("fieldPath segment #{n_idx_segment} is empty."),
            ));
        }
    }
}

fn validate_cell_style(
    style: &SpecCellStyle,
    c_role: &str,
    idx_declared: usize,
    re_background_color: &Regex,
    l_violations: &mut Vec<SpecSchemaViolation>,
) -> Option<SpecStyleKey> {
    let mut if_valid = true;

    let font_size = if style.font_size <= 0 {
        l_violations.push(SpecSchemaViolation::column_level(
            idx_declared,
            format!("{c_role}.fontSize must be > 0 (got {}).", style.font_size),
        ));
        if_valid = false;
        0
    } else if style.font_size > N_FONT_SIZE_EXCEL_MAX {
        l_violations.push(SpecSchemaViolation::column_level(
            idx_declared,
            format!(
                "{c_role}.fontSize must be <= {N_FONT_SIZE_EXCEL_MAX} (got {}).",
                style.font_size
            ),
        ));
        if_valid = false;
        0
    } else {
        u16::try_from(style.font_size).unwrap_or(0)
    };

    let background_color = if style.background_color.is_empty() {
        None
    } else if re_background_color.is_match(&style.background_color) {
        u32::from_str_radix(&style.background_color, 16).ok()
    } else {
        l_violations.push(SpecSchemaViolation::column_level(
            idx_declared,
            format!(
                "{c_role}.backgroundColor must be six hex digits (got {:?}).",
                style.background_color
            ),
        ));
        if_valid = false;
        None
    };

    let alignment = match style.alignment.parse::<EnumStyleAlign>() {
        Ok(val) => val,
        Err(err) => {
            l_violations.push(SpecSchemaViolation::column_level(
                idx_declared,
                format!("{c_role}.alignment: {err}"),
            ));
            if_valid = false;
            EnumStyleAlign::Center
        }
    };

    if !if_valid {
        return None;
    }

    Some(SpecStyleKey {
        font_name: style.font_name.clone(),
        font_size,
        bold: style.bold,
        background_color,
        alignment,
        num_format: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::SpecFormula;

    fn derive_valid_schema() -> SpecExportSchema {
        SpecExportSchema::new("Users")
            .with_column(SpecColumn::new("name", EnumColumnType::Text).with_order(2))
            .with_column(SpecColumn::new("age", EnumColumnType::Number).with_order(1))
            .with_column(SpecColumn::new("address.city", EnumColumnType::Text).with_order(1))
    }

    #[test]
    fn test_columns_sorted_by_order_then_declaration() {
        let schema = ValidatedSchema::new(derive_valid_schema()).expect("valid schema");
        let l_headers: Vec<&str> = schema
            .columns()
            .iter()
            .map(|col| col.header_text.as_str())
            .collect();
        assert_eq!(l_headers, vec!["age", "city", "name"]);
        assert_eq!(
            schema
                .columns()
                .iter()
                .map(|col| col.idx_declared)
                .collect::<Vec<_>>(),
            vec![1, 2, 0]
        );
    }

    #[test]
    fn test_body_style_carries_type_num_format() {
        let schema = ValidatedSchema::new(derive_valid_schema()).unwrap();
        let col_age = &schema.columns()[0];
        assert_eq!(col_age.style_body.num_format, Some("0.00"));
        assert_eq!(col_age.style_header.num_format, None);
        assert_eq!(schema.columns()[1].style_body.num_format, None);
    }

    #[test]
    fn test_violations_are_accumulated() {
        let schema = SpecExportSchema::new("Bad")
            .with_column(SpecColumn::new("", EnumColumnType::Text))
            .with_column(
                SpecColumn::new("age", EnumColumnType::Number)
                    .with_header_style(SpecCellStyle::default().with_font_size(0))
                    .with_body_style(
                        SpecCellStyle::default()
                            .with_background_color("#FFF")
                            .with_alignment("JUSTIFY"),
                    ),
            )
            .with_column(
                SpecColumn::new("name", EnumColumnType::Text)
                    .with_formula(SpecFormula::whole_column(" ")),
            );

        let err = ValidatedSchema::new(schema).expect_err("schema must be rejected");
        assert_eq!(err.violations.len(), 5);

        let l_columns: Vec<Option<usize>> =
            err.violations.iter().map(|v| v.idx_column).collect();
        assert_eq!(
            l_columns,
            vec![Some(0), Some(1), Some(1), Some(1), Some(2)]
        );
        assert!(err.messages()[1].contains("headerStyle.fontSize"));
        assert!(err.messages()[2].contains("bodyStyle.backgroundColor"));
        assert!(err.messages()[3].contains("bodyStyle.alignment"));
        assert!(err.to_string().contains("5 violation(s)"));
    }

    #[test]
    fn test_formula_row_offset_past_sheet_is_rejected() {
        let schema = SpecExportSchema::new("S")
            .with_column(
                SpecColumn::new("name", EnumColumnType::Text)
                    .with_formula(SpecFormula::single_cell("COUNTA(A2:A3)", 5_000_000)),
            )
            .with_column(
                SpecColumn::new("age", EnumColumnType::Number)
                    .with_formula(SpecFormula::single_cell("SUM(B2:B3)", 1_048_575)),
            )
            .with_column(
                SpecColumn::new("score", EnumColumnType::Number)
                    .with_formula(SpecFormula::single_cell(" ", 1_048_576)),
            );

        let err = ValidatedSchema::new(schema).expect_err("row offsets must be rejected");
        assert_eq!(err.violations.len(), 3);
        assert_eq!(err.violations[0].idx_column, Some(0));
        assert!(err.violations[0].message.contains("rowOffset"));
        assert!(err.violations[1].message.contains("formula.function"));
        assert!(err.violations[2].message.contains("rowOffset"));
        assert_eq!(err.violations[2].idx_column, Some(2));
    }

    #[test]
    fn test_quoted_sheet_name_is_made_excel_safe() {
        let schema = ValidatedSchema::new(SpecExportSchema::new("'Q1'")).unwrap();
        assert_eq!(schema.derive_sheet_name("UserDto"), "Q1");
    }

    #[test]
    fn test_background_color_is_case_insensitive() {
        let schema = SpecExportSchema::new("S").with_column(
            SpecColumn::new("name", EnumColumnType::Text)
                .with_header_style(SpecCellStyle::default().with_background_color("ccCC0a")),
        );
        let schema = ValidatedSchema::new(schema).unwrap();
        assert_eq!(
            schema.columns()[0].style_header.background_color,
            Some(0xCCCC0A)
        );
    }

    #[test]
    fn test_sheet_name_falls_back_to_record_name_and_is_sanitized() {
        let schema = ValidatedSchema::new(SpecExportSchema::new("")).unwrap();
        assert_eq!(schema.derive_sheet_name("UserDto"), "UserDto");

        let schema = ValidatedSchema::new(SpecExportSchema::new("Q1/Q2 [draft]")).unwrap();
        assert_eq!(schema.derive_sheet_name("UserDto"), "Q1_Q2 _draft_");
    }

    #[test]
    fn test_catalog_checks_names_and_prefixes_violations() {
        let catalog = SpecExportCatalog {
            exports: vec![
                derive_valid_schema().with_name("UserExporter"),
                derive_valid_schema().with_name("UserExporter"),
                derive_valid_schema().with_name("1st"),
                SpecExportSchema::new("x")
                    .with_name("Broken")
                    .with_column(SpecColumn::new("", EnumColumnType::Text)),
            ],
        };

        let err = validate_export_catalog(catalog).expect_err("catalog must be rejected");
        assert_eq!(err.violations.len(), 3);
        assert!(err.violations[0].message.contains("Duplicate"));
        assert!(err.violations[1].message.contains("Invalid schema name"));
        assert_eq!(err.violations[2].schema.as_deref(), Some("Broken"));
    }

    #[test]
    fn test_catalog_returns_schemas_by_name() {
        let catalog = SpecExportCatalog {
            exports: vec![
                derive_valid_schema().with_name("Full"),
                SpecExportSchema::new("Short")
                    .with_name("Short")
                    .with_column(SpecColumn::new("name", EnumColumnType::Text)),
            ],
        };
        let dict_schemas = validate_export_catalog(catalog).unwrap();
        assert_eq!(dict_schemas.len(), 2);
        assert_eq!(dict_schemas["Short"].columns().len(), 1);
    }
}
