//! Excel A1 dialect: `Sheet1!$A$1`, `'Sheet 1'!A1:B2`, `A:A`, `1:1`.

use ixion_common::{Address, Range};

use super::column::{format_column, parse_a1_cell, parse_a1_column_only, parse_a1_row_only};
use super::{quote_sheet_name_if_needed, split_sheet_prefix, DialectGrammar, ParsedRef, SheetResolver};

pub(crate) struct ExcelA1;

/// Parse one endpoint of a (possibly half-open) range: a full cell, a
/// column-only component (`A`, `$A`), or a row-only component (`1`, `$1`).
///
/// A relative axis is stored as its distance from `origin` (the cell the
/// formula lives in), not the literal parsed index - `Address::resolve`
/// expects a delta to add back to whatever origin it is evaluated
/// against, so `A1` typed into a formula at row 9 must store `row = -9`,
/// not `row = 0`.
fn parse_endpoint(text: &str, sheet: i32, abs_sheet: bool, origin: &Address) -> Option<Address> {
    if let Some((col_abs, col, row_abs, row)) = parse_a1_cell(text) {
        let row = if row_abs { row } else { row - origin.row };
        let col = if col_abs { col } else { col - origin.col };
        return Some(Address::new(sheet, row, col, abs_sheet, row_abs, col_abs));
    }
    if let Some((col_abs, col)) = parse_a1_column_only(text) {
        let col = if col_abs { col } else { col - origin.col };
        return Some(Address::new(sheet, ixion_common::ROW_UNSET, col, abs_sheet, false, col_abs));
    }
    if let Some((row_abs, row)) = parse_a1_row_only(text) {
        let row = if row_abs { row } else { row - origin.row };
        return Some(Address::new(sheet, row, ixion_common::COLUMN_UNSET, abs_sheet, row_abs, false));
    }
    None
}

impl DialectGrammar for ExcelA1 {
    fn parse_reference(&self, text: &str, sheets: &dyn SheetResolver, origin: &Address) -> Option<ParsedRef> {
        let (sheet_name, rest) = split_sheet_prefix(text, '!');
        let (sheet, abs_sheet) = super::resolve_sheet_component(sheet_name.as_deref(), sheets)?;

        match rest.split_once(':') {
            Some((lhs, rhs)) => {
                let first = parse_endpoint(lhs, sheet, abs_sheet, origin)?;
                let last = parse_endpoint(rhs, sheet, abs_sheet, origin)?;
                Some(ParsedRef::Range(Range::new(first, last)))
            }
            None => parse_endpoint(rest, sheet, abs_sheet, origin).map(ParsedRef::Address),
        }
    }

    fn format_address(&self, addr: &Address, origin: &Address, include_sheet: bool, sheets: &dyn SheetResolver) -> String {
        let mut out = String::new();
        if include_sheet {
            push_sheet_prefix(&mut out, addr, origin, sheets, '!');
        }
        push_cell(&mut out, addr, origin);
        out
    }

    fn format_range(&self, range: &Range, origin: &Address, include_sheet: bool, sheets: &dyn SheetResolver) -> String {
        let mut out = String::new();
        if include_sheet {
            push_sheet_prefix(&mut out, &range.first, origin, sheets, '!');
        }
        push_endpoint(&mut out, &range.first, origin);
        out.push(':');
        push_endpoint(&mut out, &range.last, origin);
        out
    }
}

fn push_sheet_prefix(out: &mut String, addr: &Address, origin: &Address, sheets: &dyn SheetResolver, sep: char) {
    let sheet_index = if addr.abs_sheet { addr.sheet } else { origin.sheet + addr.sheet };
    if let Some(name) = sheets.sheet_name(sheet_index) {
        out.push_str(&quote_sheet_name_if_needed(&name));
        out.push(sep);
    }
}

fn push_cell(out: &mut String, addr: &Address, origin: &Address) {
    let row = if addr.abs_row || addr.is_row_unset() { addr.row } else { origin.row + addr.row };
    let col = if addr.abs_col || addr.is_column_unset() { addr.col } else { origin.col + addr.col };
    if addr.abs_col {
        out.push('$');
    }
    out.push_str(&format_column(col));
    if addr.abs_row {
        out.push('$');
    }
    out.push_str(&(row + 1).to_string());
}

fn push_endpoint(out: &mut String, addr: &Address, origin: &Address) {
    if addr.is_row_unset() {
        let col = if addr.abs_col { addr.col } else { origin.col + addr.col };
        if addr.abs_col {
            out.push('$');
        }
        out.push_str(&format_column(col));
        return;
    }
    if addr.is_column_unset() {
        let row = if addr.abs_row { addr.row } else { origin.row + addr.row };
        if addr.abs_row {
            out.push('$');
        }
        out.push_str(&(row + 1).to_string());
        return;
    }
    push_cell(out, addr, origin);
}
