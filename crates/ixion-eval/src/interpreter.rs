//! Recursive-descent interpreter over a flat token stream.
//!
//! ```text
//! expression := term ((+|-|=|<>|<|<=|>|>=) term)*
//! term       := factor ((*|/) factor)*
//! factor     := '(' expression ')' | number | string
//!             | single_ref | range_ref | table_ref | function | named_expression
//! ```
//!
//! Errors are modeled as an early-return `Result`, not an exception: the
//! outermost call writes the error kind into the cell's cached result.

use std::cmp::Ordering;

use ixion_common::{Address, FormulaErrorKind, FormulaResult, Range, StringId};
use ixion_parse::token::{FormulaToken, FunctionOpcode};
use rustc_hash::FxHashSet;

use crate::context::{CellType, ModelContext, SessionHandler};
use crate::functions;

type EvalResult<T> = Result<T, FormulaErrorKind>;

/// An evaluator working-stack entry. References are lazily dereferenced,
/// only when a comparison or a function demands a scalar.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum StackValue {
    Number(f64),
    Text(StringId),
    SingleRef(Address),
    RangeRef(Range),
}

enum Scalar {
    Number(f64),
    Text(StringId),
}

struct Interpreter<'a> {
    tokens: &'a [FormulaToken],
    pos: usize,
    origin: Address,
    context: &'a dyn ModelContext,
    used_names: FxHashSet<String>,
    stack: Vec<StackValue>,
    session: Option<&'a mut dyn SessionHandler>,
}

/// Interpret one cell's token stream against `origin`, producing the
/// result to cache. An empty token stream (parse failure left the cell
/// with nothing to evaluate) is an immediate `general_error`.
pub fn interpret(tokens: &[FormulaToken], origin: Address, context: &dyn ModelContext) -> FormulaResult {
    if tokens.is_empty() {
        return FormulaResult::Error(FormulaErrorKind::GeneralError);
    }
    let mut handler = context.create_session_handler();
    let mut interp = Interpreter {
        tokens,
        pos: 0,
        origin,
        context,
        used_names: FxHashSet::default(),
        stack: Vec::new(),
        session: handler.as_deref_mut(),
    };
    let outcome = interp.expression().and_then(|()| {
        if interp.pos != interp.tokens.len() {
            return Err(FormulaErrorKind::InvalidExpression);
        }
        interp.pop_result()
    });
    match outcome {
        Ok(result) => result,
        Err(kind) => {
            log::trace!("interpret({origin:?}) -> {kind:?}");
            FormulaResult::Error(kind)
        }
    }
}

impl<'a> Interpreter<'a> {
    fn notify(&mut self, token: &FormulaToken) {
        if let Some(handler) = self.session.as_deref_mut() {
            handler.on_token(token);
        }
    }

    fn expression(&mut self) -> EvalResult<()> {
        self.term()?;
        loop {
            let op = match self.tokens.get(self.pos) {
                Some(t @ FormulaToken::Plus) => (t, BinOp::Add),
                Some(t @ FormulaToken::Minus) => (t, BinOp::Sub),
                Some(t @ FormulaToken::Equal) => (t, BinOp::Eq),
                Some(t @ FormulaToken::NotEqual) => (t, BinOp::Ne),
                Some(t @ FormulaToken::Less) => (t, BinOp::Lt),
                Some(t @ FormulaToken::LessEqual) => (t, BinOp::Le),
                Some(t @ FormulaToken::Greater) => (t, BinOp::Gt),
                Some(t @ FormulaToken::GreaterEqual) => (t, BinOp::Ge),
                _ => break,
            };
            self.notify(op.0);
            let op = op.1;
            self.pos += 1;
            self.term()?;
            self.apply_binary(op)?;
        }
        Ok(())
    }

    fn term(&mut self) -> EvalResult<()> {
        self.factor()?;
        loop {
            let op = match self.tokens.get(self.pos) {
                Some(t @ FormulaToken::Multiply) => (t, BinOp::Mul),
                Some(t @ FormulaToken::Divide) => (t, BinOp::Div),
                _ => break,
            };
            self.notify(op.0);
            let op = op.1;
            self.pos += 1;
            self.factor()?;
            self.apply_binary(op)?;
        }
        Ok(())
    }

    fn factor(&mut self) -> EvalResult<()> {
        let token = self.tokens.get(self.pos).ok_or(FormulaErrorKind::InvalidExpression)?;
        self.notify(token);
        match token.clone() {
            FormulaToken::Open => {
                self.pos += 1;
                self.expression()?;
                match self.tokens.get(self.pos) {
                    Some(FormulaToken::Close) => {
                        self.pos += 1;
                        Ok(())
                    }
                    _ => Err(FormulaErrorKind::InvalidExpression),
                }
            }
            FormulaToken::Value(n) => {
                self.pos += 1;
                self.stack.push(StackValue::Number(n));
                Ok(())
            }
            FormulaToken::StringLit(id) => {
                self.pos += 1;
                self.stack.push(StackValue::Text(StringId(id)));
                Ok(())
            }
            FormulaToken::SingleRef(addr) => {
                self.pos += 1;
                let resolved = addr.resolve(&self.origin);
                if resolved == self.origin {
                    return Err(FormulaErrorKind::RefResultNotAvailable);
                }
                self.stack.push(StackValue::SingleRef(resolved));
                Ok(())
            }
            FormulaToken::RangeRef(range) => {
                self.pos += 1;
                let resolved = range.resolve(&self.origin);
                if resolved.contains(&self.origin) {
                    return Err(FormulaErrorKind::RefResultNotAvailable);
                }
                self.stack.push(StackValue::RangeRef(resolved));
                Ok(())
            }
            FormulaToken::TableRef(table) => {
                self.pos += 1;
                let range = self
                    .context
                    .get_table_handler()
                    .and_then(|h| h.resolve_table(&table, &self.origin))
                    .ok_or(FormulaErrorKind::NameNotFound)?;
                if range.contains(&self.origin) {
                    return Err(FormulaErrorKind::RefResultNotAvailable);
                }
                self.stack.push(StackValue::RangeRef(range));
                Ok(())
            }
            FormulaToken::Function(opcode) => {
                self.pos += 1;
                self.call_function(opcode)
            }
            FormulaToken::NamedExpression(name) => {
                self.pos += 1;
                self.expand_named(&name)
            }
            FormulaToken::UnresolvedRef(_) => Err(FormulaErrorKind::NameNotFound),
            FormulaToken::Close | FormulaToken::Sep => Err(FormulaErrorKind::InvalidExpression),
        }
    }

    /// Named expressions are expanded in place: a `used_names` set tracks
    /// the active expansion chain so a name that depends on itself raises
    /// `invalid_expression` instead of recursing forever. Sheet-local
    /// definitions win over a global one of the same name.
    fn expand_named(&mut self, name: &str) -> EvalResult<()> {
        if self.used_names.contains(name) {
            return Err(FormulaErrorKind::InvalidExpression);
        }
        let tokens = self
            .context
            .get_named_expression(Some(self.origin.sheet), name)
            .or_else(|| self.context.get_named_expression(None, name))
            .ok_or(FormulaErrorKind::NameNotFound)?;

        let mut used_names = self.used_names.clone();
        used_names.insert(name.to_string());
        let mut sub = Interpreter {
            tokens: tokens.tokens(),
            pos: 0,
            origin: self.origin,
            context: self.context,
            used_names,
            stack: Vec::new(),
            session: None,
        };
        sub.expression()?;
        if sub.pos != sub.tokens.len() {
            return Err(FormulaErrorKind::InvalidExpression);
        }
        let value = sub.stack.pop().ok_or(FormulaErrorKind::InvalidExpression)?;
        if !sub.stack.is_empty() {
            return Err(FormulaErrorKind::InvalidExpression);
        }
        self.stack.push(value);
        Ok(())
    }

    fn call_function(&mut self, opcode: FunctionOpcode) -> EvalResult<()> {
        match self.tokens.get(self.pos) {
            Some(t @ FormulaToken::Open) => {
                self.notify(t);
                self.pos += 1;
            }
            _ => return Err(FormulaErrorKind::InvalidExpression),
        }
        let mut args: Vec<StackValue> = Vec::new();
        if self.tokens.get(self.pos) != Some(&FormulaToken::Close) {
            self.expression()?;
            args.push(self.stack.pop().ok_or(FormulaErrorKind::InvalidExpression)?);
            while self.tokens.get(self.pos) == Some(&FormulaToken::Sep) {
                let t = &self.tokens[self.pos];
                self.notify(t);
                self.pos += 1;
                self.expression()?;
                args.push(self.stack.pop().ok_or(FormulaErrorKind::InvalidExpression)?);
            }
        }
        match self.tokens.get(self.pos) {
            Some(t @ FormulaToken::Close) => {
                self.notify(t);
                self.pos += 1;
            }
            _ => return Err(FormulaErrorKind::InvalidExpression),
        }
        let result = functions::dispatch(opcode, &args, self.context)?;
        self.stack.push(result);
        Ok(())
    }

    fn apply_binary(&mut self, op: BinOp) -> EvalResult<()> {
        let rhs = self.stack.pop().ok_or(FormulaErrorKind::InvalidExpression)?;
        let lhs = self.stack.pop().ok_or(FormulaErrorKind::InvalidExpression)?;
        let result = match op {
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div => {
                let a = self.coerce_number(lhs)?;
                let b = self.coerce_number(rhs)?;
                let value = match op {
                    BinOp::Add => a + b,
                    BinOp::Sub => a - b,
                    BinOp::Mul => a * b,
                    BinOp::Div => {
                        if b == 0.0 {
                            return Err(FormulaErrorKind::DivisionByZero);
                        }
                        a / b
                    }
                    _ => unreachable!(),
                };
                StackValue::Number(value)
            }
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                let ordering = self.compare(lhs, rhs)?;
                let truth = match op {
                    BinOp::Eq => ordering == Ordering::Equal,
                    BinOp::Ne => ordering != Ordering::Equal,
                    BinOp::Lt => ordering == Ordering::Less,
                    BinOp::Le => ordering != Ordering::Greater,
                    BinOp::Gt => ordering == Ordering::Greater,
                    BinOp::Ge => ordering != Ordering::Less,
                    _ => unreachable!(),
                };
                StackValue::Number(if truth { 1.0 } else { 0.0 })
            }
        };
        self.stack.push(result);
        Ok(())
    }

    /// Numeric coercion for arithmetic: a string operand is a type
    /// mismatch. An errored predecessor cell is *not* propagated
    /// automatically (see the crate's design notes) - it reads as `0.0`,
    /// the same bucket as an empty cell.
    fn coerce_number(&self, value: StackValue) -> EvalResult<f64> {
        match self.coerce_scalar(value)? {
            Scalar::Number(n) => Ok(n),
            Scalar::Text(_) => Err(FormulaErrorKind::InvalidExpression),
        }
    }

    /// "Pop-as-value-or-string" coercion shared by comparisons and
    /// arithmetic: references dereference to the cell's typed value;
    /// empty cells and errored formula cells yield `0.0`.
    fn coerce_scalar(&self, value: StackValue) -> EvalResult<Scalar> {
        match value {
            StackValue::Number(n) => Ok(Scalar::Number(n)),
            StackValue::Text(id) => Ok(Scalar::Text(id)),
            StackValue::SingleRef(addr) => Ok(self.read_scalar(addr)),
            StackValue::RangeRef(range) => {
                let first = range.iter_cells().next().ok_or(FormulaErrorKind::InvalidExpression)?;
                Ok(self.read_scalar(first))
            }
        }
    }

    /// A referenced cell that currently holds an error (a formula cell
    /// whose cached result is `FormulaResult::Error`) is read as `0.0`,
    /// not propagated - see the crate's design notes.
    fn read_scalar(&self, addr: Address) -> Scalar {
        if self.context.is_empty(addr) {
            return Scalar::Number(0.0);
        }
        match self.context.get_celltype(addr) {
            CellType::Numeric => Scalar::Number(self.context.get_numeric_value(addr)),
            CellType::String => Scalar::Text(self.context.get_string_identifier(addr)),
            CellType::Formula => match self.context.get_formula_cell(addr) {
                Some(FormulaResult::Value(n)) => Scalar::Number(n),
                Some(FormulaResult::String(id)) => Scalar::Text(id),
                Some(FormulaResult::Error(_)) | None => Scalar::Number(0.0),
            },
            CellType::Empty | CellType::Unknown => Scalar::Number(0.0),
        }
    }

    fn compare(&self, lhs: StackValue, rhs: StackValue) -> EvalResult<Ordering> {
        let left = self.coerce_scalar(lhs)?;
        let right = self.coerce_scalar(rhs)?;
        Ok(match (left, right) {
            (Scalar::Number(a), Scalar::Number(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            (Scalar::Text(a), Scalar::Text(b)) => self.read_string(a).cmp(&self.read_string(b)),
            // Strings sort above every number, regardless of value.
            (Scalar::Number(_), Scalar::Text(_)) => Ordering::Less,
            (Scalar::Text(_), Scalar::Number(_)) => Ordering::Greater,
        })
    }

    fn read_string(&self, id: StringId) -> String {
        self.context.get_string(id).unwrap_or_default()
    }

    /// Projects the single remaining stack entry to a [`FormulaResult`]:
    /// value and string pass through; a reference reads the target cell
    /// (a range uses its first cell - the implicit-intersection rule).
    fn pop_result(&mut self) -> EvalResult<FormulaResult> {
        if self.stack.len() != 1 {
            return Err(FormulaErrorKind::InvalidExpression);
        }
        Ok(match self.stack.pop().unwrap() {
            StackValue::Number(n) => FormulaResult::Value(n),
            StackValue::Text(id) => FormulaResult::String(id),
            StackValue::SingleRef(addr) => self.read_result(addr),
            StackValue::RangeRef(range) => match range.iter_cells().next() {
                Some(first) => self.read_result(first),
                None => FormulaResult::RESET,
            },
        })
    }

    fn read_result(&self, addr: Address) -> FormulaResult {
        if self.context.is_empty(addr) {
            return FormulaResult::RESET;
        }
        match self.context.get_celltype(addr) {
            CellType::Numeric => FormulaResult::Value(self.context.get_numeric_value(addr)),
            CellType::String => FormulaResult::String(self.context.get_string_identifier(addr)),
            CellType::Formula => self.context.get_formula_cell(addr).unwrap_or(FormulaResult::RESET),
            CellType::Empty | CellType::Unknown => FormulaResult::RESET,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}
