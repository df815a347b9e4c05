//! Global constants and per-document configuration.

/// Largest row index a sheet may address (Excel-compatible 1,048,576 rows).
pub const ROW_UPPER_BOUND: i32 = 1_048_575;
/// Largest column index a sheet may address (16,384 columns, `XFD`).
pub const COLUMN_UPPER_BOUND: i32 = 16_383;
/// String id of the canonical empty string.
pub const EMPTY_STRING_ID: u32 = 0;
/// Sentinel sheet index meaning "no sheet" / "invalid".
pub const INVALID_SHEET: i32 = -1;
/// Scope marker for a named expression defined outside any sheet.
pub const GLOBAL_SCOPE: i32 = -1;

/// Model-context-supplied formatting knobs, from `get_config()`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormulaConfig {
    pub sep_function_arg: char,
    pub sep_matrix_column: char,
    pub sep_matrix_row: char,
    /// `-1` means "full precision" (no rounding on output).
    pub output_precision: i32,
}

impl Default for FormulaConfig {
    fn default() -> Self {
        FormulaConfig {
            sep_function_arg: ',',
            sep_matrix_column: ',',
            sep_matrix_row: ';',
            output_precision: -1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_documented_defaults() {
        let cfg = FormulaConfig::default();
        assert_eq!(cfg.sep_function_arg, ',');
        assert_eq!(cfg.sep_matrix_column, ',');
        assert_eq!(cfg.sep_matrix_row, ';');
        assert_eq!(cfg.output_precision, -1);
    }
}
