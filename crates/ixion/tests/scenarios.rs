//! Black-box integration tests over [`ixion::Engine`]/[`ixion::Workbook`]:
//! the concrete scenarios and the quantified round-trip properties.

use ixion::{format_address, format_column, parse_column, Address, Dialect, Engine, FormulaErrorKind, FormulaResult};

fn cell(row: i32, col: i32) -> Address {
    Address::absolute(0, row, col)
}

#[test]
fn basic_arithmetic_respects_precedence() {
    let engine = Engine::new();
    let wb = engine.workbook();
    wb.set_value(cell(0, 0), 1.0);
    wb.set_value(cell(1, 0), 2.0);
    wb.set_formula(cell(2, 0), Dialect::ExcelA1, "=A1+A2*3").unwrap();

    engine.recalc(2).unwrap();
    assert_eq!(wb.result_of(cell(2, 0)), FormulaResult::Value(7.0));
}

#[test]
fn named_expression_recursion_guard_trips_invalid_expression() {
    let engine = Engine::new();
    let wb = engine.workbook();
    wb.set_named_expression(None, "Name1", Dialect::ExcelA1, "Name2+1").unwrap();
    wb.set_named_expression(None, "Name2", Dialect::ExcelA1, "Name1+1").unwrap();
    wb.set_formula(cell(0, 0), Dialect::ExcelA1, "=Name1").unwrap();

    engine.recalc(0).unwrap();
    assert_eq!(
        wb.result_of(cell(0, 0)),
        FormulaResult::Error(FormulaErrorKind::InvalidExpression)
    );
}

#[test]
fn division_by_zero_is_tagged() {
    let engine = Engine::new();
    let wb = engine.workbook();
    wb.set_value(cell(0, 0), 0.0);
    wb.set_formula(cell(1, 0), Dialect::ExcelA1, "=1/A1").unwrap();

    engine.recalc(0).unwrap();
    assert_eq!(wb.result_of(cell(1, 0)), FormulaResult::Error(FormulaErrorKind::DivisionByZero));
}

#[test]
fn self_reference_is_ref_result_not_available() {
    let engine = Engine::new();
    let wb = engine.workbook();
    wb.set_formula(cell(0, 0), Dialect::ExcelA1, "=A1+1").unwrap();

    engine.recalc(0).unwrap();
    assert_eq!(
        wb.result_of(cell(0, 0)),
        FormulaResult::Error(FormulaErrorKind::RefResultNotAvailable)
    );
}

#[test]
fn cycle_of_length_three_marks_every_participant() {
    let engine = Engine::new();
    let wb = engine.workbook();
    wb.set_formula(cell(0, 0), Dialect::ExcelA1, "=A2").unwrap();
    wb.set_formula(cell(1, 0), Dialect::ExcelA1, "=A3").unwrap();
    wb.set_formula(cell(2, 0), Dialect::ExcelA1, "=A1").unwrap();

    engine.recalc(3).unwrap();
    for row in 0..3 {
        assert_eq!(
            wb.result_of(cell(row, 0)),
            FormulaResult::Error(FormulaErrorKind::RefResultNotAvailable)
        );
    }
}

#[test]
fn mixed_comparison_ranks_numbers_below_strings() {
    let engine = Engine::new();
    let wb = engine.workbook();
    wb.set_text(cell(0, 0), "foo");
    wb.set_formula(cell(1, 0), Dialect::ExcelA1, "=1<A1").unwrap();

    engine.recalc(0).unwrap();
    assert_eq!(wb.result_of(cell(1, 0)), FormulaResult::Value(1.0));
}

#[test]
fn sum_over_a_range_flattens_the_cells() {
    let engine = Engine::new();
    let wb = engine.workbook();
    wb.set_value(cell(0, 0), 1.0);
    wb.set_value(cell(1, 0), 2.0);
    wb.set_value(cell(2, 0), 3.0);
    wb.set_formula(cell(0, 1), Dialect::ExcelA1, "=SUM(A1:A3)").unwrap();

    engine.recalc(0).unwrap();
    assert_eq!(wb.result_of(cell(0, 1)), FormulaResult::Value(6.0));
}

#[test]
fn name_resolver_dialects_format_the_same_address_differently() {
    let engine = Engine::new();
    let wb = engine.workbook();
    let sheet = wb.add_sheet("Sheet 1");
    let addr = Address::absolute(sheet, 0, 0);
    let origin = Address::absolute(sheet, 0, 0);

    assert_eq!(format_address(Dialect::ExcelA1, &addr, &origin, true, wb), "'Sheet 1'!$A$1");
    assert_eq!(format_address(Dialect::CalcA1, &addr, &origin, true, wb), "'Sheet 1'.$A$1");
    assert_eq!(format_address(Dialect::ExcelR1C1, &addr, &origin, true, wb), "'Sheet 1'!R1C1");
    assert_eq!(format_address(Dialect::Odff, &addr, &origin, true, wb), "[$'Sheet 1'.$A$1]");
}

#[test]
fn recursive_recompute_agrees_across_worker_counts() {
    for workers in [0usize, 1, 4] {
        let engine = Engine::new();
        let wb = engine.workbook();
        wb.set_value(cell(0, 0), 2.0);
        wb.set_formula(cell(1, 0), Dialect::ExcelA1, "=A1*3").unwrap();
        wb.set_formula(cell(2, 0), Dialect::ExcelA1, "=A2+1").unwrap();
        wb.set_formula(cell(3, 0), Dialect::ExcelA1, "=SUM(A1:A3)").unwrap();

        engine.recalc(workers).unwrap();
        assert_eq!(wb.result_of(cell(1, 0)), FormulaResult::Value(6.0));
        assert_eq!(wb.result_of(cell(2, 0)), FormulaResult::Value(7.0));
        assert_eq!(wb.result_of(cell(3, 0)), FormulaResult::Value(15.0));
    }
}

#[test]
fn column_codec_round_trips_and_matches_documented_fixed_points() {
    assert_eq!(format_column(0), "A");
    assert_eq!(format_column(25), "Z");
    assert_eq!(format_column(26), "AA");
    assert_eq!(format_column(701), "ZZ");
    assert_eq!(format_column(702), "AAA");

    for col in [0, 1, 25, 26, 27, 51, 52, 701, 702, 703, 18277] {
        let text = format_column(col);
        assert_eq!(parse_column(&text), Some(col));
    }
}

#[test]
fn address_format_resolve_round_trip_holds_across_dialects() {
    let engine = Engine::new();
    let wb = engine.workbook();
    let origin = cell(4, 2);
    let addr = Address::new(0, 3, 9, true, false, false);

    for dialect in [Dialect::ExcelA1, Dialect::CalcA1, Dialect::ExcelR1C1, Dialect::Odff, Dialect::OdfCra] {
        let text = format_address(dialect, &addr, &origin, true, wb);
        let resolved = ixion::resolve(dialect, &text, &origin, wb);
        match resolved {
            ixion::NameType::Address(round_tripped) => {
                assert_eq!(round_tripped.resolve(&origin), addr.resolve(&origin), "dialect {dialect:?} mismatched on {text:?}");
            }
            other => panic!("dialect {dialect:?} failed to resolve {text:?} back to an address: {other:?}"),
        }
    }
}
