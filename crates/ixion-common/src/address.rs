//! Cell addresses: sheet/row/column indices with per-axis absolute flags.
//!
//! An [`Address`] is the unit of reference in every dialect the name
//! resolver understands. Sheet indices are signed so that `-1`
//! (`INVALID_SHEET`) can flag "no sheet". Row/column carry their own
//! sentinel (`ROW_UNSET`/`COLUMN_UNSET`) for half-open references like
//! `A:A` or `1:1`, where only one axis is pinned.

use std::fmt;

use crate::config::{COLUMN_UPPER_BOUND, INVALID_SHEET, ROW_UPPER_BOUND};

/// Sentinel meaning "row not specified" (used by column-only ranges like `A:A`).
///
/// Deliberately outside any reachable literal row or origin-relative delta
/// (`i32::MIN`, not `-1`) so it can never collide with a real relative
/// address one row above its origin.
pub const ROW_UNSET: i32 = i32::MIN;
/// Sentinel meaning "column not specified" (used by row-only ranges like `1:1`).
pub const COLUMN_UNSET: i32 = i32::MIN;

/// A single cell address, with independent absolute/relative flags per axis.
///
/// `sheet == INVALID_SHEET` marks an address that failed to resolve
/// (out-of-bounds, unknown sheet name, …); such addresses are never
/// dereferenced, only carried around long enough to become a
/// `ref_result_not_available` result.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    pub sheet: i32,
    pub row: i32,
    pub col: i32,
    pub abs_sheet: bool,
    pub abs_row: bool,
    pub abs_col: bool,
}

impl Address {
    pub const INVALID: Address = Address {
        sheet: INVALID_SHEET,
        row: ROW_UNSET,
        col: COLUMN_UNSET,
        abs_sheet: false,
        abs_row: false,
        abs_col: false,
    };

    pub const fn new(sheet: i32, row: i32, col: i32, abs_sheet: bool, abs_row: bool, abs_col: bool) -> Self {
        Address {
            sheet,
            row,
            col,
            abs_sheet,
            abs_row,
            abs_col,
        }
    }

    /// A fully-absolute address at `(sheet, row, col)`, as produced once a
    /// relative reference has been resolved against an origin.
    pub const fn absolute(sheet: i32, row: i32, col: i32) -> Self {
        Address::new(sheet, row, col, true, true, true)
    }

    pub const fn is_invalid(&self) -> bool {
        self.sheet == INVALID_SHEET
    }

    pub const fn is_row_unset(&self) -> bool {
        self.row == ROW_UNSET
    }

    pub const fn is_column_unset(&self) -> bool {
        self.col == COLUMN_UNSET
    }

    /// Resolve a (possibly relative) address against an origin position:
    /// a relative address is resolved against an origin position by
    /// integer addition.
    pub fn resolve(&self, origin: &Address) -> Address {
        Address {
            sheet: if self.abs_sheet { self.sheet } else { origin.sheet + self.sheet },
            row: if self.abs_row || self.is_row_unset() { self.row } else { origin.row + self.row },
            col: if self.abs_col || self.is_column_unset() { self.col } else { origin.col + self.col },
            abs_sheet: true,
            abs_row: true,
            abs_col: true,
        }
    }

    /// Re-anchor an absolute address as relative-to-`origin`, the inverse of
    /// [`Address::resolve`]. Used when re-anchoring a shared formula's
    /// relative tokens onto a different cell in the sharing range.
    pub fn rebase(&self, old_origin: &Address, new_origin: &Address) -> Address {
        let mut out = *self;
        if !self.abs_row && !self.is_row_unset() {
            out.row = self.row + (old_origin.row - new_origin.row);
        }
        if !self.abs_col && !self.is_column_unset() {
            out.col = self.col + (old_origin.col - new_origin.col);
        }
        out
    }

    /// Invariant: every address stored as "absolute" satisfies
    /// `0 <= sheet < sheet_count`, `0 <= row < sheet_rows`, `0 <= col < sheet_cols`.
    /// A half-open endpoint (`is_row_unset`/`is_column_unset`, used by
    /// column-only ranges like `A:A` and row-only ranges like `1:1`) has no
    /// position on that axis to check, so that axis is always in bounds.
    pub fn in_bounds(&self, sheet_count: i32, rows: i32, cols: i32) -> bool {
        let row_ok = self.is_row_unset() || (self.row >= 0 && self.row < rows && self.row <= ROW_UPPER_BOUND);
        let col_ok = self.is_column_unset() || (self.col >= 0 && self.col < cols && self.col <= COLUMN_UPPER_BOUND);
        self.sheet >= 0 && self.sheet < sheet_count && row_ok && col_ok
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(sheet={}, row={}, col={}, abs={}{}{})",
            self.sheet,
            self.row,
            self.col,
            if self.abs_sheet { "S" } else { "s" },
            if self.abs_row { "R" } else { "r" },
            if self.abs_col { "C" } else { "c" },
        )
    }
}
