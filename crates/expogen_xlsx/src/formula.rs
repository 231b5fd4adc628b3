//! Aggregate formula composition and placement.

use tracing::warn;

use crate::conf::N_ROW_NUM_BODY_FIRST;
use crate::schema::SpecResolvedColumn;
use crate::spec::{EnumFormulaScope, SpecExportReport, SpecFormula, SpecFormulaCell};

/// Bijective base-26 column letters for a zero-based column index.
///
/// `0 -> "A"`, `25 -> "Z"`, `26 -> "AA"`, `701 -> "ZZ"`, `702 -> "AAA"`.
pub fn derive_column_letter(idx_col: usize) -> String {
    let mut n_dividend = idx_col + 1;
    let mut l_letters = Vec::new();
    while n_dividend > 0 {
        let n_remainder = (n_dividend - 1) % 26;
        l_letters.push(char::from(b'A' + n_remainder as u8));
        n_dividend = (n_dividend - n_remainder - 1) / 26;
    }
    l_letters.iter().rev().collect()
}

/// One-based sheet row number of the last data row.
///
/// A header-only sheet reports row 1, so whole-column ranges become empty
/// (`B2:B1`).
pub fn derive_last_data_row(n_rows_body: usize) -> usize {
    n_rows_body + 1
}

/// Formula text for `formula` on column `idx_col`.
pub fn compose_formula_text(
    formula: &SpecFormula,
    idx_col: usize,
    n_row_last_data: usize,
) -> String {
    let c_function = formula.function.trim();
    match formula.scope {
        EnumFormulaScope::WholeColumn => {
            let c_letter = derive_column_letter(idx_col);
            format!("{c_function}({c_letter}{N_ROW_NUM_BODY_FIRST}:{c_letter}{n_row_last_data})")
        }
        EnumFormulaScope::SingleCell => c_function.trim_start_matches('=').to_string(),
    }
}

/// Plan every formula cell once the final body row count is known.
///
/// Cells are returned in `(row, column)` order. Formula rows always follow the
/// body rows, so a single-cell target at or above the last body row moves to
/// the trailing formula row.
pub fn plan_formula_cells(
    columns: &[SpecResolvedColumn],
    n_rows_body: usize,
    report: &mut SpecExportReport,
) -> Vec<SpecFormulaCell> {
    let n_row_last_data = derive_last_data_row(n_rows_body);
    // Zero-based index of the row right after the last data row.
    let n_row_idx_trailing = n_row_last_data;

    let mut l_cells = Vec::new();
    for (idx_col, col) in columns.iter().enumerate() {
        let Some(formula) = &col.column.formula else {
            continue;
        };

        let row_idx = match formula.scope {
            EnumFormulaScope::WholeColumn => n_row_idx_trailing,
            EnumFormulaScope::SingleCell => match usize::try_from(formula.row_offset) {
                Err(_) => n_row_idx_trailing,
                Ok(n_row_idx_target) if n_row_idx_target < n_row_idx_trailing => {
                    let c_msg = format!(
                        "Formula on column {:?} targets row index {n_row_idx_target}, inside the header or body rows; formula rows follow the body, so it moved to row index {n_row_idx_trailing}.",
                        col.header_text
                    );
                    warn!("{c_msg}");
                    report.warn(c_msg);
                    n_row_idx_trailing
                }
                Ok(n_row_idx_target) => n_row_idx_target,
            },
        };

        l_cells.push(SpecFormulaCell {
            row_idx,
            col_idx: idx_col,
            text: compose_formula_text(formula, idx_col, n_row_last_data),
        });
    }

    l_cells.sort_by_key(|cell| (cell.row_idx, cell.col_idx));
    l_cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ValidatedSchema;
    use crate::spec::{EnumColumnType, SpecColumn, SpecExportSchema};

    #[test]
    fn test_column_letters_are_bijective_base26() {
        assert_eq!(derive_column_letter(0), "A");
        assert_eq!(derive_column_letter(1), "B");
        assert_eq!(derive_column_letter(25), "Z");
        assert_eq!(derive_column_letter(26), "AA");
        assert_eq!(derive_column_letter(27), "AB");
        assert_eq!(derive_column_letter(51), "AZ");
        assert_eq!(derive_column_letter(52), "BA");
        assert_eq!(derive_column_letter(701), "ZZ");
        assert_eq!(derive_column_letter(702), "AAA");
        assert_eq!(derive_column_letter(16_383), "XFD");
    }

    #[test]
    fn test_column_letters_are_distinct_and_ordered() {
        let l_letters: Vec<String> = (0..2_000).map(derive_column_letter).collect();
        for pair in l_letters.windows(2) {
            let (c_prev, c_next) = (&pair[0], &pair[1]);
            assert!(
                (c_prev.len(), c_prev) < (c_next.len(), c_next),
                "{c_prev} !< {c_next}"
            );
        }
    }

    #[test]
    fn test_whole_column_sum_over_five_rows() {
        let formula = SpecFormula::whole_column("SUM");
        assert_eq!(
            compose_formula_text(&formula, 1, derive_last_data_row(5)),
            "SUM(B2:B6)"
        );
    }

    #[test]
    fn test_single_cell_text_is_verbatim() {
        let formula = SpecFormula::single_cell("=AVERAGE(C2:C9)", -1);
        assert_eq!(compose_formula_text(&formula, 2, 9), "AVERAGE(C2:C9)");
    }

    fn derive_columns() -> Vec<SpecResolvedColumn> {
        let schema = SpecExportSchema::new("S")
            .with_column(SpecColumn::new("name", EnumColumnType::Text).with_formula(
                SpecFormula::single_cell("COUNTA(A2:A4)", 10),
            ))
            .with_column(
                SpecColumn::new("age", EnumColumnType::Number)
                    .with_formula(SpecFormula::whole_column("SUM")),
            )
            .with_column(
                SpecColumn::new("score", EnumColumnType::Number)
                    .with_formula(SpecFormula::single_cell("MAX(C2:C4)", 1)),
            );
        ValidatedSchema::new(schema).unwrap().columns().to_vec()
    }

    #[test]
    fn test_plan_orders_cells_and_moves_written_targets() {
        let mut report = SpecExportReport::default();
        let l_cells = plan_formula_cells(&derive_columns(), 3, &mut report);

        assert_eq!(
            l_cells,
            vec![
                SpecFormulaCell {
                    row_idx: 4,
                    col_idx: 1,
                    text: "SUM(B2:B4)".to_string(),
                },
                SpecFormulaCell {
                    row_idx: 4,
                    col_idx: 2,
                    text: "MAX(C2:C4)".to_string(),
                },
                SpecFormulaCell {
                    row_idx: 10,
                    col_idx: 0,
                    text: "COUNTA(A2:A4)".to_string(),
                },
            ]
        );
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("formula rows follow the body"));
    }

    #[test]
    fn test_plan_with_empty_body_references_empty_range() {
        let mut report = SpecExportReport::default();
        let l_cells = plan_formula_cells(&derive_columns(), 0, &mut report);
        assert_eq!(l_cells[0].row_idx, 1);
        assert_eq!(l_cells[0].text, "SUM(B2:B1)");
    }
}
