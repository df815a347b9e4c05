//! Range and table references.

use bitflags::bitflags;

use crate::address::Address;

/// Inclusive pair of addresses. Half-open forms (`A:A`, `1:1`) are expressed
/// by `ROW_UNSET`/`COLUMN_UNSET` on the appropriate axis of `first`/`last`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    pub first: Address,
    pub last: Address,
}

impl Range {
    pub const fn new(first: Address, last: Address) -> Self {
        Range { first, last }
    }

    /// A single-cell range (first == last), as produced by some dialects'
    /// `[.A1]` shorthand.
    pub const fn from_cell(addr: Address) -> Self {
        Range::new(addr, addr)
    }

    pub fn resolve(&self, origin: &Address) -> Range {
        Range::new(self.first.resolve(origin), self.last.resolve(origin))
    }

    /// Whether `addr` falls within this (already-resolved, absolute) range.
    pub fn contains(&self, addr: &Address) -> bool {
        if self.first.sheet != self.last.sheet || addr.sheet != self.first.sheet {
            return false;
        }
        let row_ok = self.first.is_row_unset()
            || (addr.row >= self.first.row.min(self.last.row) && addr.row <= self.first.row.max(self.last.row));
        let col_ok = self.first.is_column_unset()
            || (addr.col >= self.first.col.min(self.last.col) && addr.col <= self.first.col.max(self.last.col));
        row_ok && col_ok
    }

    /// Iterate every concrete cell in a bounded (non half-open) range,
    /// row-major. Used by SUM/MIN/MAX/AVERAGE to walk a range argument.
    pub fn iter_cells(&self) -> impl Iterator<Item = Address> + '_ {
        let sheet = self.first.sheet;
        let (r0, r1) = (self.first.row.min(self.last.row), self.first.row.max(self.last.row));
        let (c0, c1) = (self.first.col.min(self.last.col), self.first.col.max(self.last.col));
        (r0..=r1).flat_map(move |row| (c0..=c1).map(move |col| Address::absolute(sheet, row, col)))
    }
}

bitflags! {
    /// Table areas, accumulated by OR. `ALL` overrides
    /// any combination of the other three bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TableAreas: u8 {
        const HEADERS = 0b0001;
        const DATA    = 0b0010;
        const TOTALS  = 0b0100;
        const ALL     = 0b1000;
    }
}

impl Default for TableAreas {
    fn default() -> Self {
        TableAreas::DATA
    }
}

/// `(name, column_first, column_last, areas)`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableReference {
    pub name: Option<String>,
    pub column_first: Option<String>,
    pub column_last: Option<String>,
    pub areas: TableAreas,
}

impl TableReference {
    pub fn single_column(name: Option<String>, column: String) -> Self {
        TableReference {
            name,
            column_first: Some(column),
            column_last: None,
            areas: TableAreas::DATA,
        }
    }
}

/// Resolves a [`TableReference`] against the sheet that hosts the formula,
/// producing the absolute [`Range`] it denotes, via a table handler that
/// maps it to an absolute range.
pub trait TableHandler {
    fn resolve_table(&self, table: &TableReference, origin: &Address) -> Option<Range>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_contains_respects_bounds() {
        let range = Range::new(Address::absolute(0, 0, 0), Address::absolute(0, 2, 2));
        assert!(range.contains(&Address::absolute(0, 1, 1)));
        assert!(!range.contains(&Address::absolute(0, 3, 1)));
        assert!(!range.contains(&Address::absolute(1, 1, 1)));
    }

    #[test]
    fn range_iter_cells_is_row_major() {
        let range = Range::new(Address::absolute(0, 0, 0), Address::absolute(0, 1, 1));
        let cells: Vec<_> = range.iter_cells().map(|a| (a.row, a.col)).collect();
        assert_eq!(cells, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
    }

    #[test]
    fn table_areas_all_overrides_others() {
        let areas = TableAreas::HEADERS | TableAreas::ALL;
        assert!(areas.contains(TableAreas::ALL));
        assert!(areas.contains(TableAreas::HEADERS));
    }
}
