//! ODFF (OpenFormula) dialect: bracketed references `[.A1]`, `[.A1:.B2]`,
//! `[$Sheet.$A$1]`. A leading `.` with no sheet name means "current sheet".

use ixion_common::{Address, Range};

use super::column::parse_a1_cell;
use super::{quote_sheet_name_if_needed, unquote_sheet_name, DialectGrammar, ParsedRef, SheetResolver};

pub(crate) struct Odff;

fn strip_brackets(text: &str) -> Option<&str> {
    text.strip_prefix('[')?.strip_suffix(']')
}

/// Split one ODFF endpoint (`$Sheet.$A$1`, `.A1`) into `(sheet, cell)`.
/// A sheet name may itself be `$`-prefixed (absolute sheet marker); the
/// dot separator is mandatory even with no sheet name (`.A1`).
fn split_sheet_dot(text: &str) -> Option<(Option<&str>, &str)> {
    let dot = text.find('.')?;
    let sheet = &text[..dot];
    let cell = &text[dot + 1..];
    if sheet.is_empty() {
        Some((None, cell))
    } else {
        Some((Some(sheet.trim_start_matches('$')), cell))
    }
}

/// A relative axis is stored as its distance from `origin`, matching
/// `Address::resolve`'s expectation of a delta rather than a literal index.
fn parse_endpoint(text: &str, sheets: &dyn SheetResolver, origin: &Address) -> Option<Address> {
    let (sheet_name, cell) = split_sheet_dot(text)?;
    let (sheet, abs_sheet) = match sheet_name {
        None => (0, false),
        Some(name) => (sheets.sheet_index(&unquote_sheet_name(name))?, true),
    };
    let (col_abs, col, row_abs, row) = parse_a1_cell(cell)?;
    let row = if row_abs { row } else { row - origin.row };
    let col = if col_abs { col } else { col - origin.col };
    Some(Address::new(sheet, row, col, abs_sheet, row_abs, col_abs))
}

impl DialectGrammar for Odff {
    fn parse_reference(&self, text: &str, sheets: &dyn SheetResolver, origin: &Address) -> Option<ParsedRef> {
        let inner = strip_brackets(text)?;
        match inner.split_once(':') {
            Some((lhs, rhs)) => {
                let first = parse_endpoint(lhs, sheets, origin)?;
                let last = parse_endpoint(rhs, sheets, origin)?;
                Some(ParsedRef::Range(Range::new(first, last)))
            }
            None => parse_endpoint(inner, sheets, origin).map(ParsedRef::Address),
        }
    }

    fn format_address(&self, addr: &Address, origin: &Address, include_sheet: bool, sheets: &dyn SheetResolver) -> String {
        format!("[{}]", format_endpoint(addr, origin, include_sheet, sheets))
    }

    fn format_range(&self, range: &Range, origin: &Address, include_sheet: bool, sheets: &dyn SheetResolver) -> String {
        format!(
            "[{}:{}]",
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
            out.push('$');
            out.push_str(&quote_sheet_name_if_needed(&name));
        }
    }
    out.push('.');
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
    fn parses_unqualified_cell() {
        let result = resolve(Dialect::Odff, "[.A1]", &origin(), &FixedSheets);
        assert_eq!(result, NameType::Address(Address::new(0, 0, 0, false, false, false)));
    }

    #[test]
    fn parses_qualified_range() {
        let result = resolve(Dialect::Odff, "[$Sheet2.$A$1:.$B$2]", &origin(), &FixedSheets);
        assert_eq!(
            result,
            NameType::Range(Range::new(
                Address::new(1, 0, 0, true, true, true),
                Address::new(0, 1, 1, false, true, true),
            ))
        );
    }

    #[test]
    fn non_bracketed_text_does_not_match() {
        assert!(Odff.parse_reference("A1", &FixedSheets, &origin()).is_none());
    }

    #[test]
    fn formats_round_trip_with_sheet() {
        let addr = Address::absolute(0, 0, 0);
        let text = format_address(Dialect::Odff, &addr, &origin(), true, &FixedSheets);
        assert_eq!(text, "[$'Sheet 1'.$A$1]");
    }

    #[test]
    fn relative_reference_resolves_correctly_from_a_nonzero_origin() {
        let formula_cell = Address::absolute(0, 4, 2);
        let result = resolve(Dialect::Odff, "[.A1]", &formula_cell, &FixedSheets);
        let NameType::Address(addr) = result else {
            panic!("expected address");
        };
        assert_eq!(addr.resolve(&formula_cell), Address::absolute(0, 0, 0));
    }
}
