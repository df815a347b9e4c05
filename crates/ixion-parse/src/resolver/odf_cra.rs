//! ODF-CRA dialect: unbracketed, per-endpoint-qualified references,
//! like `Sheet1.A1`, `Sheet1.A1:Sheet2.B2`. Unlike Calc A1, each range endpoint
//! carries its own sheet qualifier rather than inheriting the first.

use ixion_common::{Address, Range};

use super::column::parse_a1_cell;
use super::{quote_sheet_name_if_needed, DialectGrammar, ParsedRef, SheetResolver};

pub(crate) struct OdfCra;

/// A relative axis is stored as its distance from `origin`, matching
/// `Address::resolve`'s expectation of a delta rather than a literal index.
fn parse_endpoint(text: &str, sheets: &dyn SheetResolver, origin: &Address) -> Option<Address> {
    let (sheet_name, cell) = super::split_sheet_prefix(text, '.');
    let (sheet, abs_sheet) = super::resolve_sheet_component(sheet_name.as_deref(), sheets)?;
    let (col_abs, col, row_abs, row) = parse_a1_cell(cell)?;
    let row = if row_abs { row } else { row - origin.row };
    let col = if col_abs { col } else { col - origin.col };
    Some(Address::new(sheet, row, col, abs_sheet, row_abs, col_abs))
}

impl DialectGrammar for OdfCra {
    fn parse_reference(&self, text: &str, sheets: &dyn SheetResolver, origin: &Address) -> Option<ParsedRef> {
        match text.split_once(':') {
            Some((lhs, rhs)) => {
                let first = parse_endpoint(lhs, sheets, origin)?;
                let last = parse_endpoint(rhs, sheets, origin)?;
                Some(ParsedRef::Range(Range::new(first, last)))
            }
            None => parse_endpoint(text, sheets, origin).map(ParsedRef::Address),
        }
    }

    fn format_address(&self, addr: &Address, origin: &Address, include_sheet: bool, sheets: &dyn SheetResolver) -> String {
        format_endpoint(addr, origin, include_sheet, sheets)
    }

    fn format_range(&self, range: &Range, origin: &Address, include_sheet: bool, sheets: &dyn SheetResolver) -> String {
        format!(
            "{}:{}",
            format_endpoint(&range.first, origin, include_sheet, sheets),
            format_endpoint(&range.last, origin, include_sheet, sheets),
        )
    }
}

fn format_endpoint(addr: &Address, origin: &Address, include_sheet: bool, sheets: &dyn SheetResolver) -> String {
    let mut out = String::new();
    if include_sheet {
        let sheet_index = if addr.abs_sheet { addr.sheet } else { origin.sheet + addr.sheet };
        if let Some(name) = sheets.sheet_name(sheet_index) {
            out.push_str(&quote_sheet_name_if_needed(&name));
            out.push('.');
        }
    }
    let row = if addr.abs_row { addr.row } else { origin.row + addr.row };
    let col = if addr.abs_col { addr.col } else { origin.col + addr.col };
    if addr.abs_col {
        out.push('$');
    }
    out.push_str(&super::column::format_column(col));
    if addr.abs_row {
        out.push('$');
    }
    out.push_str(&(row + 1).to_string());
    out
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
    fn each_endpoint_carries_its_own_sheet() {
        let result = resolve(Dialect::OdfCra, "Sheet2.A1:Sheet2.B2", &origin(), &FixedSheets);
        assert_eq!(
            result,
            NameType::Range(Range::new(
                Address::new(1, 0, 0, true, false, false),
                Address::new(1, 1, 1, true, false, false),
            ))
        );
    }

    #[test]
    fn mismatched_sheet_endpoints_are_allowed() {
        let result = resolve(Dialect::OdfCra, "Sheet2.A1:'Sheet 1'.B2", &origin(), &FixedSheets);
        let NameType::Range(range) = result else {
            panic!("expected range");
        };
        assert_eq!(range.first.sheet, 1);
        assert_eq!(range.last.sheet, 0);
    }

    #[test]
    fn formats_each_endpoint_with_its_sheet() {
        let range = Range::new(Address::absolute(1, 0, 0), Address::absolute(0, 1, 1));
        let text = format_address(Dialect::OdfCra, &range.first, &origin(), true, &FixedSheets);
        assert_eq!(text, "Sheet2.$A$1");
    }

    #[test]
    fn relative_reference_resolves_correctly_from_a_nonzero_origin() {
        let formula_cell = Address::absolute(0, 4, 2);
        let result = resolve(Dialect::OdfCra, "A1", &formula_cell, &FixedSheets);
        let NameType::Address(addr) = result else {
            panic!("expected address");
        };
        assert_eq!(addr.resolve(&formula_cell), Address::absolute(0, 0, 0));
    }
}
