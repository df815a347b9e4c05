//! Built-in function dispatch. `FunctionOpcode` is closed - every variant is
//! matched explicitly here rather than looked up in a runtime registry.

use ixion_common::FormulaErrorKind;
use ixion_parse::token::FunctionOpcode;

use crate::context::{CellType, ModelContext};
use crate::interpreter::StackValue;

type EvalResult<T> = Result<T, FormulaErrorKind>;

/// Numeric operands of SUM/MIN/MAX/AVERAGE: scalars pass through, ranges
/// flatten cell by cell. Strings and empty cells are skipped rather than
/// erroring; an errored predecessor cell is skipped too, not propagated.
fn numeric_operands(args: &[StackValue], context: &dyn ModelContext) -> Vec<f64> {
    let mut out = Vec::new();
    for arg in args {
        match arg {
            StackValue::Number(n) => out.push(*n),
            StackValue::Text(_) => {}
            StackValue::SingleRef(addr) => {
                if let Some(n) = read_numeric_cell(context, *addr) {
                    out.push(n);
                }
            }
            StackValue::RangeRef(range) => {
                for cell in range.iter_cells() {
                    if let Some(n) = read_numeric_cell(context, cell) {
                        out.push(n);
                    }
                }
            }
        }
    }
    out
}

fn read_numeric_cell(context: &dyn ModelContext, addr: ixion_common::Address) -> Option<f64> {
    if context.is_empty(addr) {
        return None;
    }
    match context.get_celltype(addr) {
        CellType::Numeric => Some(context.get_numeric_value(addr)),
        CellType::Formula => match context.get_formula_cell(addr) {
            Some(ixion_common::FormulaResult::Value(v)) => Some(v),
            _ => None,
        },
        CellType::String | CellType::Empty | CellType::Unknown => None,
    }
}

/// Text coercion for LEN/CONCATENATE: numbers format with the configured
/// output precision trimmed of trailing zeros, references dereference to
/// their displayed text.
fn coerce_text(arg: &StackValue, context: &dyn ModelContext) -> String {
    match arg {
        StackValue::Number(n) => format_number(*n),
        StackValue::Text(id) => context.get_string(*id).unwrap_or_default(),
        StackValue::SingleRef(addr) => cell_text(context, *addr),
        StackValue::RangeRef(range) => match range.iter_cells().next() {
            Some(addr) => cell_text(context, addr),
            None => String::new(),
        },
    }
}

fn cell_text(context: &dyn ModelContext, addr: ixion_common::Address) -> String {
    if context.is_empty(addr) {
        return String::new();
    }
    match context.get_celltype(addr) {
        CellType::Numeric => format_number(context.get_numeric_value(addr)),
        CellType::String => context.get_string(context.get_string_identifier(addr)).unwrap_or_default(),
        CellType::Formula => match context.get_formula_cell(addr) {
            Some(ixion_common::FormulaResult::Value(v)) => format_number(v),
            Some(ixion_common::FormulaResult::String(id)) => context.get_string(id).unwrap_or_default(),
            _ => String::new(),
        },
        CellType::Empty | CellType::Unknown => String::new(),
    }
}

fn format_number(n: f64) -> String {
    if n == n.trunc() && n.abs() < 1e15 {
        format!("{n:.0}")
    } else {
        n.to_string()
    }
}

pub(crate) fn dispatch(opcode: FunctionOpcode, args: &[StackValue], context: &dyn ModelContext) -> EvalResult<StackValue> {
    match opcode {
        FunctionOpcode::Sum => Ok(StackValue::Number(numeric_operands(args, context).into_iter().sum())),
        FunctionOpcode::Min => {
            let values = numeric_operands(args, context);
            let min = values.into_iter().fold(None, |acc, v| Some(acc.map_or(v, |m: f64| m.min(v))));
            Ok(StackValue::Number(min.unwrap_or(0.0)))
        }
        FunctionOpcode::Max => {
            let values = numeric_operands(args, context);
            let max = values.into_iter().fold(None, |acc, v| Some(acc.map_or(v, |m: f64| m.max(v))));
            Ok(StackValue::Number(max.unwrap_or(0.0)))
        }
        FunctionOpcode::Average => {
            let values = numeric_operands(args, context);
            if values.is_empty() {
                return Err(FormulaErrorKind::DivisionByZero);
            }
            let sum: f64 = values.iter().sum();
            Ok(StackValue::Number(sum / values.len() as f64))
        }
        FunctionOpcode::Len => {
            let arg = args.first().ok_or(FormulaErrorKind::InvalidExpression)?;
            let text = coerce_text(arg, context);
            Ok(StackValue::Number(text.chars().count() as f64))
        }
        FunctionOpcode::Concatenate => {
            let mut out = String::new();
            for arg in args {
                out.push_str(&coerce_text(arg, context));
            }
            Ok(StackValue::Text(context.add_string(&out)))
        }
        FunctionOpcode::Wait => {
            let arg = args.first().ok_or(FormulaErrorKind::InvalidExpression)?;
            let seconds = match arg {
                StackValue::Number(n) => *n,
                _ => return Err(FormulaErrorKind::InvalidExpression),
            };
            if seconds > 0.0 {
                std::thread::sleep(std::time::Duration::from_secs_f64(seconds.min(5.0)));
            }
            Ok(StackValue::Number(seconds))
        }
    }
}
