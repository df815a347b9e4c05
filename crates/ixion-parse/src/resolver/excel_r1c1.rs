//! Excel R1C1 dialect: `R1C1`, `R[-1]C[1]`, `RC1`, whole-row `R5`,
//! whole-column `C3`.

use ixion_common::{Address, Range, COLUMN_UNSET, ROW_UNSET};

use super::{quote_sheet_name_if_needed, split_sheet_prefix, DialectGrammar, ParsedRef, SheetResolver};

pub(crate) struct ExcelR1C1;

enum Axis {
    /// Letter absent entirely: whole row/column, half-open on this axis.
    Absent,
    /// `R[n]`/`C[n]`, or the bare letter (delta `0`).
    Relative(i32),
    /// `Rn`/`Cn`, one-based in text.
    Absolute(i32),
}

/// Consume one `R`/`C` axis starting at `pos`, if the text has that
/// letter there. Returns the parsed axis and the position just past it.
fn consume_axis(bytes: &[u8], pos: usize, letter: u8) -> (Axis, usize) {
    if bytes.get(pos) != Some(&letter) {
        return (Axis::Absent, pos);
    }
    let mut i = pos + 1;
    if bytes.get(i) == Some(&b'[') {
        let start = i + 1;
        let mut j = start;
        if bytes.get(j) == Some(&b'-') {
            j += 1;
        }
        while bytes.get(j).is_some_and(u8::is_ascii_digit) {
            j += 1;
        }
        if bytes.get(j) == Some(&b']') && j > start {
            if let Ok(delta) = std::str::from_utf8(&bytes[start..j]).unwrap().parse::<i32>() {
                return (Axis::Relative(delta), j + 1);
            }
        }
        return (Axis::Absent, pos);
    }
    let start = i;
    while bytes.get(i).is_some_and(u8::is_ascii_digit) {
        i += 1;
    }
    if i == start {
        (Axis::Relative(0), i)
    } else {
        let value: i32 = std::str::from_utf8(&bytes[start..i]).unwrap().parse().unwrap_or(0);
        (Axis::Absolute(value), i)
    }
}

fn parse_cell(text: &str, sheet: i32, abs_sheet: bool) -> Option<Address> {
    let bytes = text.as_bytes();
    let (row_axis, pos) = consume_axis(bytes, 0, b'R');
    let (col_axis, pos) = consume_axis(bytes, pos, b'C');
    if pos != bytes.len() || (matches!(row_axis, Axis::Absent) && matches!(col_axis, Axis::Absent)) {
        return None;
    }
    let (row, abs_row) = match row_axis {
        Axis::Absent => (ROW_UNSET, false),
        Axis::Relative(d) => (d, false),
        Axis::Absolute(v) => (v - 1, true),
    };
    let (col, abs_col) = match col_axis {
        Axis::Absent => (COLUMN_UNSET, false),
        Axis::Relative(d) => (d, false),
        Axis::Absolute(v) => (v - 1, true),
    };
    Some(Address::new(sheet, row, col, abs_sheet, abs_row, abs_col))
}

impl DialectGrammar for ExcelR1C1 {
    fn parse_reference(&self, text: &str, sheets: &dyn SheetResolver, _origin: &Address) -> Option<ParsedRef> {
        let (sheet_name, rest) = split_sheet_prefix(text, '!');
        let (sheet, abs_sheet) = super::resolve_sheet_component(sheet_name.as_deref(), sheets)?;

        match rest.split_once(':') {
            Some((lhs, rhs)) => {
                let first = parse_cell(lhs, sheet, abs_sheet)?;
                let last = parse_cell(rhs, sheet, abs_sheet)?;
                Some(ParsedRef::Range(Range::new(first, last)))
            }
            None => parse_cell(rest, sheet, abs_sheet).map(ParsedRef::Address),
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
        push_cell(&mut out, &range.first, origin);
        out.push(':');
        push_cell(&mut out, &range.last, origin);
        out
    }
}

fn push_sheet_prefix(out: &mut String, addr: &Address, origin: &Address, sheets: &dyn SheetResolver) {
    let sheet_index = if addr.abs_sheet { addr.sheet } else { origin.sheet + addr.sheet };
    if let Some(name) = sheets.sheet_name(sheet_index) {
        out.push_str(&quote_sheet_name_if_needed(&name));
        out.push('!');
    }
}

fn push_cell(out: &mut String, addr: &Address, origin: &Address) {
    if !addr.is_row_unset() {
        out.push('R');
        if addr.abs_row {
            out.push_str(&(addr.row + 1).to_string());
        } else if addr.row != 0 {
            out.push_str(&format!("[{}]", addr.row));
        }
    }
    if !addr.is_column_unset() {
        out.push('C');
        if addr.abs_col {
            out.push_str(&(addr.col + 1).to_string());
        } else if addr.col != 0 {
            out.push_str(&format!("[{}]", addr.col));
        }
    }
    let _ = origin;
}
