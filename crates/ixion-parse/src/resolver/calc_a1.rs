//! Calc A1 dialect: LibreOffice Calc's `.`-separated sheet qualifier,
//! e.g. `Sheet1.A1`, `'Sheet 1'.A1:B2`.

use ixion_common::{Address, Range};

use super::column::{format_column, parse_a1_cell, parse_a1_column_only, parse_a1_row_only};
use super::{quote_sheet_name_if_needed, split_sheet_prefix, DialectGrammar, ParsedRef, SheetResolver};

pub(crate) struct CalcA1;

/// A relative axis is stored as its distance from `origin`, matching
/// `Address::resolve`'s expectation of a delta rather than a literal index.
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

impl DialectGrammar for CalcA1 {
    fn parse_reference(&self, text: &str, sheets: &dyn SheetResolver, origin: &Address) -> Option<ParsedRef> {
        let (sheet_name, rest) = split_sheet_prefix(text, '.');
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
            push_sheet_prefix(&mut out, addr, origin, sheets);
        }
        push_cell(&mut out, addr, origin);
        out
    }

    fn format_range(&self, range: &Range, origin: &Address, include_sheet: bool, sheets: &dyn SheetResolver) -> String {
        let mut out = String::new();
        if include_sheet {
            push_sheet_prefix(&mut out, &range.first, origin, sheets);
        }
        push_endpoint(&mut out, &range.first, origin);
        out.push(':');
        push_endpoint(&mut out, &range.last, origin);
        out
    }
}

fn push_sheet_prefix(out: &mut String, addr: &Address, origin: &Address, sheets: &dyn SheetResolver) {
    let sheet_index = if addr.abs_sheet { addr.sheet } else { origin.sheet + addr.sheet };
    if let Some(name) = sheets.sheet_name(sheet_index) {
        out.push_str(&quote_sheet_name_if_needed(&name));
        out.push('.');
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

#[cfg(test)]
mod tests {
    use super::super::test_support::FixedSheets;
    use super::super::{format_address, resolve, Dialect, NameType};
    use super::*;

    fn origin() -> Address {
        Address::absolute(0, 0, 0)
    }

    #[test]
    fn parses_qualified_cell() {
        let result = resolve(Dialect::CalcA1, "Sheet2.A1", &origin(), &FixedSheets);
        assert_eq!(result, NameType::Address(Address::new(1, 0, 0, true, false, false)));
    }

    #[test]
    fn parses_quoted_sheet_range() {
        let result = resolve(Dialect::CalcA1, "'Sheet 1'.A1:B2", &origin(), &FixedSheets);
        assert_eq!(
            result,
            NameType::Range(Range::new(
                Address::new(0, 0, 0, true, false, false),
                Address::new(0, 1, 1, true, false, false),
            ))
        );
    }

    #[test]
    fn formats_round_trip_with_sheet() {
        let addr = Address::absolute(1, 0, 0);
        let text = format_address(Dialect::CalcA1, &addr, &origin(), true, &FixedSheets);
        assert_eq!(text, "Sheet2.$A$1");
    }

    #[test]
    fn relative_reference_resolves_correctly_from_a_nonzero_origin() {
        let formula_cell = Address::absolute(0, 4, 2);
        let result = resolve(Dialect::CalcA1, "A1", &formula_cell, &FixedSheets);
        let NameType::Address(addr) = result else {
            panic!("expected address");
        };
        assert_eq!(addr.resolve(&formula_cell), Address::absolute(0, 0, 0));
    }
}
