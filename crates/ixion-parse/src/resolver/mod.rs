//! Name resolver: converts between textual references and
//! structured `(address|range|table|named_expression|function)` values
//! across five dialects.

pub mod calc_a1;
pub mod column;
pub mod excel_a1;
pub mod excel_r1c1;
pub mod odf_cra;
pub mod odff;

pub use column::{format_column, parse_column};

use ixion_common::{Address, Range, TableReference};

use crate::table;
use crate::token::FunctionOpcode;

/// The five reference-string dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    ExcelA1,
    ExcelR1C1,
    Odff,
    CalcA1,
    OdfCra,
}

/// What the model context exposes so the resolver can qualify/validate
/// sheet-bound references.
pub trait SheetResolver {
    fn sheet_index(&self, name: &str) -> Option<i32>;
    fn sheet_name(&self, index: i32) -> Option<String>;
    /// `(rows, cols)` for the given sheet, used for the out-of-bounds check.
    fn sheet_size(&self, index: i32) -> Option<(i32, i32)>;
    fn sheet_count(&self) -> i32;
}

/// Result of resolving an arbitrary name string. Unknown strings fall
/// back to `NamedExpression`; a syntactically
/// malformed reference is `Invalid`.
#[derive(Debug, Clone, PartialEq)]
pub enum NameType {
    Address(Address),
    Range(Range),
    Table(TableReference),
    NamedExpression(String),
    Function(FunctionOpcode),
    Invalid,
}

/// Per-dialect parse/format entry points. Implemented once per dialect
/// module; [`resolve`]/[`format_address`]/[`format_range`] dispatch on
/// [`Dialect`] to pick one.
pub(crate) trait DialectGrammar {
    fn parse_reference(&self, text: &str, sheets: &dyn SheetResolver, origin: &Address) -> Option<ParsedRef>;
    fn format_address(&self, addr: &Address, origin: &Address, include_sheet: bool, sheets: &dyn SheetResolver) -> String;
    fn format_range(&self, range: &Range, origin: &Address, include_sheet: bool, sheets: &dyn SheetResolver) -> String;
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ParsedRef {
    Address(Address),
    Range(Range),
}

fn grammar_for(dialect: Dialect) -> &'static dyn DialectGrammar {
    match dialect {
        Dialect::ExcelA1 => &excel_a1::ExcelA1,
        Dialect::ExcelR1C1 => &excel_r1c1::ExcelR1C1,
        Dialect::Odff => &odff::Odff,
        Dialect::CalcA1 => &calc_a1::CalcA1,
        Dialect::OdfCra => &odf_cra::OdfCra,
    }
}

/// Quote a sheet name if it contains a space or a single quote.
/// Embedded quotes are doubled.
pub(crate) fn quote_sheet_name_if_needed(name: &str) -> String {
    if name.contains(' ') || name.contains('\'') {
        format!("'{}'", name.replace('\'', "''"))
    } else {
        name.to_string()
    }
}

/// Strip one layer of single-quoting from a sheet name token, undoubling
/// embedded quotes.
pub(crate) fn unquote_sheet_name(text: &str) -> String {
    if let Some(stripped) = text.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
        stripped.replace("''", "'")
    } else {
        text.to_string()
    }
}

/// Split `'Sheet 1'!A1` / `Sheet1!A1` / `A1` on `sep`, honoring single
/// quoting around the sheet name. Returns `(sheet_name, rest)`; `rest`
/// is the whole input when no sheet qualifier is present.
pub(crate) fn split_sheet_prefix<'a>(text: &'a str, sep: char) -> (Option<String>, &'a str) {
    if let Some(rest) = text.strip_prefix('\'') {
        let bytes = rest.as_bytes();
        let mut i = 0;
        loop {
            if i >= bytes.len() {
                return (None, text);
            }
            if bytes[i] == b'\'' {
                if bytes.get(i + 1) == Some(&b'\'') {
                    i += 2;
                    continue;
                }
                break;
            }
            i += 1;
        }
        let quoted = &text[..=i + 1];
        let after = &text[i + 2..];
        if let Some(tail) = after.strip_prefix(sep) {
            return (Some(unquote_sheet_name(quoted)), tail);
        }
        return (None, text);
    }
    if let Some(idx) = text.find(sep) {
        let (sheet, tail) = text.split_at(idx);
        return (Some(sheet.to_string()), &tail[sep.len_utf8()..]);
    }
    (None, text)
}

/// Resolve a split sheet-name component (or "no qualifier") into the
/// `(sheet, abs_sheet)` pair `Address`/`Range` store. `None` sheet name
/// means "current sheet" - a relative offset of `0` against the origin.
pub(crate) fn resolve_sheet_component(sheet_name: Option<&str>, sheets: &dyn SheetResolver) -> Option<(i32, bool)> {
    match sheet_name {
        None => Some((0, false)),
        Some(name) => sheets.sheet_index(name).map(|idx| (idx, true)),
    }
}

/// `resolve(text, origin) -> name_type`.
pub fn resolve(dialect: Dialect, text: &str, origin: &Address, sheets: &dyn SheetResolver) -> NameType {
    if let Some(opcode) = FunctionOpcode::from_name(text) {
        return NameType::Function(opcode);
    }
    if let Some(table_ref) = table::try_parse_table(text) {
        return NameType::Table(table_ref);
    }
    match grammar_for(dialect).parse_reference(text, sheets, origin) {
        Some(ParsedRef::Address(addr)) => {
            if bounds_ok(&addr, origin, sheets) {
                NameType::Address(addr)
            } else {
                NameType::Invalid
            }
        }
        Some(ParsedRef::Range(range)) => {
            if bounds_ok(&range.first, origin, sheets) && bounds_ok(&range.last, origin, sheets) {
                NameType::Range(range)
            } else {
                NameType::Invalid
            }
        }
        None => {
            if is_plausible_identifier(text) {
                NameType::NamedExpression(text.to_string())
            } else {
                NameType::Invalid
            }
        }
    }
}

/// Bounds-checks the *resolved* (absolute) target a parsed address points
/// at. `addr` itself may still carry relative axes stored as a delta from
/// `origin`, which can be negative - it's the resolved position that must
/// fall within the sheet, not the raw delta.
fn bounds_ok(addr: &Address, origin: &Address, sheets: &dyn SheetResolver) -> bool {
    let resolved = addr.resolve(origin);
    if resolved.is_invalid() {
        return false;
    }
    match sheets.sheet_size(resolved.sheet) {
        Some((rows, cols)) => resolved.in_bounds(sheets.sheet_count(), rows, cols),
        None => false,
    }
}

fn is_plausible_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '.')
}

pub fn format_address(dialect: Dialect, addr: &Address, origin: &Address, include_sheet: bool, sheets: &dyn SheetResolver) -> String {
    grammar_for(dialect).format_address(addr, origin, include_sheet, sheets)
}

pub fn format_range(dialect: Dialect, range: &Range, origin: &Address, include_sheet: bool, sheets: &dyn SheetResolver) -> String {
    grammar_for(dialect).format_range(range, origin, include_sheet, sheets)
}


#[cfg(test)]
mod tests {
    use super::test_support::FixedSheets;
    use super::*;

    #[test]
    fn unknown_name_falls_back_to_named_expression() {
        let origin = Address::absolute(0, 0, 0);
        let result = resolve(Dialect::ExcelA1, "MyRate", &origin, &FixedSheets);
        assert_eq!(result, NameType::NamedExpression("MyRate".to_string()));
    }

    #[test]
    fn known_function_name_resolves_to_function() {
        let origin = Address::absolute(0, 0, 0);
        assert_eq!(
            resolve(Dialect::ExcelA1, "SUM", &origin, &FixedSheets),
            NameType::Function(FunctionOpcode::Sum)
        );
    }

    #[test]
    fn out_of_bounds_absolute_address_is_invalid() {
        let origin = Address::absolute(0, 0, 0);
        // Sheet index 9 doesn't exist under FixedSheets.
        let result = resolve(Dialect::ExcelA1, "Missing!A1", &origin, &FixedSheets);
        assert_eq!(result, NameType::Invalid);
    }

    #[test]
    fn malformed_token_is_not_mistaken_for_a_name() {
        let origin = Address::absolute(0, 0, 0);
        assert_eq!(
            resolve(Dialect::ExcelA1, "1abc", &origin, &FixedSheets),
            NameType::Invalid
        );
    }
}
