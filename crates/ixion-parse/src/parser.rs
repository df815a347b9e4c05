//! Recursive-descent parser over the lexer's primitive stream. Syntax is
//! validated top-down, but the output is the same flat token sequence the
//! interpreter walks - parens and separators are kept as ordinary tokens,
//! not collapsed into a tree.
//!
//! ```text
//! expression := term ((+|-|=|<>|<|<=|>|>=) term)*
//! term       := factor ((*|/) factor)*
//! factor     := '(' expression ')' | number | string
//!             | single_ref | range_ref | table_ref | function | named_expression
//! ```

use std::fmt;

use ixion_common::Address;

use crate::lexer::{LexError, Lexeme, Lexer};
use crate::resolver::{self, Dialect, NameType, SheetResolver};
use crate::token::{FormulaToken, TokenStore};

/// Interns string literals into the model context's string pool. The
/// parser never stores raw text in a [`FormulaToken::StringLit`].
pub trait StringInterner {
    fn intern(&mut self, text: &str) -> u32;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserOptions {
    pub dialect: Dialect,
    /// Keep a name the resolver couldn't classify as `UnresolvedRef`
    /// instead of failing the parse. Meant for tests and diagnostics.
    pub preserve_unresolved: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        ParserOptions {
            dialect: Dialect::ExcelA1,
            preserve_unresolved: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    Lex(LexError),
    UnexpectedEnd,
    UnexpectedToken { pos: usize },
    UnresolvedName { name: String },
    UnbalancedParens,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Lex(e) => write!(f, "{e}"),
            ParseError::UnexpectedEnd => write!(f, "unexpected end of formula"),
            ParseError::UnexpectedToken { pos } => write!(f, "unexpected token at position {pos}"),
            ParseError::UnresolvedName { name } => write!(f, "could not resolve name '{name}'"),
            ParseError::UnbalancedParens => write!(f, "unbalanced parentheses"),
        }
    }
}

impl std::error::Error for ParseError {}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        ParseError::Lex(e)
    }
}

struct Parser<'a> {
    lexemes: Vec<Lexeme>,
    pos: usize,
    origin: &'a Address,
    sheets: &'a dyn SheetResolver,
    interner: &'a mut dyn StringInterner,
    opts: ParserOptions,
    out: Vec<FormulaToken>,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Lexeme> {
        self.lexemes.get(self.pos)
    }

    fn expression(&mut self) -> Result<(), ParseError> {
        self.term()?;
        loop {
            let op = match self.peek() {
                Some(Lexeme::Plus) => FormulaToken::Plus,
                Some(Lexeme::Minus) => FormulaToken::Minus,
                Some(Lexeme::Eq) => FormulaToken::Equal,
                Some(Lexeme::Ne) => FormulaToken::NotEqual,
                Some(Lexeme::Lt) => FormulaToken::Less,
                Some(Lexeme::Le) => FormulaToken::LessEqual,
                Some(Lexeme::Gt) => FormulaToken::Greater,
                Some(Lexeme::Ge) => FormulaToken::GreaterEqual,
                _ => break,
            };
            self.pos += 1;
            self.out.push(op);
            self.term()?;
        }
        Ok(())
    }

    fn term(&mut self) -> Result<(), ParseError> {
        self.factor()?;
        loop {
            let op = match self.peek() {
                Some(Lexeme::Star) => FormulaToken::Multiply,
                Some(Lexeme::Slash) => FormulaToken::Divide,
                _ => break,
            };
            self.pos += 1;
            self.out.push(op);
            self.factor()?;
        }
        Ok(())
    }

    fn factor(&mut self) -> Result<(), ParseError> {
        match self.peek().cloned() {
            Some(Lexeme::Open) => {
                self.pos += 1;
                self.out.push(FormulaToken::Open);
                self.expression()?;
                match self.peek() {
                    Some(Lexeme::Close) => {
                        self.pos += 1;
                        self.out.push(FormulaToken::Close);
                        Ok(())
                    }
                    _ => Err(ParseError::UnbalancedParens),
                }
            }
            Some(Lexeme::Number(n)) => {
                self.pos += 1;
                self.out.push(FormulaToken::Value(n));
                Ok(())
            }
            Some(Lexeme::Text(s)) => {
                self.pos += 1;
                let id = self.interner.intern(&s);
                self.out.push(FormulaToken::StringLit(id));
                Ok(())
            }
            Some(Lexeme::Name(name)) => {
                self.pos += 1;
                self.resolve_name(&name)
            }
            Some(_) => Err(ParseError::UnexpectedToken { pos: self.pos }),
            None => Err(ParseError::UnexpectedEnd),
        }
    }

    fn resolve_name(&mut self, name: &str) -> Result<(), ParseError> {
        match resolver::resolve(self.opts.dialect, name, self.origin, self.sheets) {
            NameType::Function(opcode) => {
                self.out.push(FormulaToken::Function(opcode));
                self.call_args()
            }
            NameType::Address(addr) => {
                self.out.push(FormulaToken::SingleRef(addr));
                Ok(())
            }
            NameType::Range(range) => {
                self.out.push(FormulaToken::RangeRef(range));
                Ok(())
            }
            NameType::Table(table) => {
                self.out.push(FormulaToken::TableRef(table));
                Ok(())
            }
            NameType::NamedExpression(expr_name) => {
                self.out.push(FormulaToken::NamedExpression(expr_name));
                Ok(())
            }
            NameType::Invalid => {
                if self.opts.preserve_unresolved {
                    self.out.push(FormulaToken::UnresolvedRef(name.to_string()));
                    Ok(())
                } else {
                    Err(ParseError::UnresolvedName { name: name.to_string() })
                }
            }
        }
    }

    /// `(` expression (`,` expression)* `)` - a function call's argument list.
    fn call_args(&mut self) -> Result<(), ParseError> {
        match self.peek() {
            Some(Lexeme::Open) => {
                self.pos += 1;
                self.out.push(FormulaToken::Open);
            }
            _ => return Err(ParseError::UnexpectedToken { pos: self.pos }),
        }
        if self.peek() != Some(&Lexeme::Close) {
            self.expression()?;
            while self.peek() == Some(&Lexeme::Sep) {
                self.pos += 1;
                self.out.push(FormulaToken::Sep);
                self.expression()?;
            }
        }
        match self.peek() {
            Some(Lexeme::Close) => {
                self.pos += 1;
                self.out.push(FormulaToken::Close);
                Ok(())
            }
            _ => Err(ParseError::UnbalancedParens),
        }
    }
}

/// Parse a formula string into a flat token stream, ready to store in a
/// [`TokenStore`] (sharing is the caller's decision - this just builds one
/// cell's tokens).
pub fn parse_formula_string(
    text: &str,
    origin: &Address,
    sheets: &dyn SheetResolver,
    interner: &mut dyn StringInterner,
    opts: ParserOptions,
) -> Result<TokenStore, ParseError> {
    let lexemes = Lexer::new(text).tokenize()?;
    let mut parser = Parser {
        lexemes,
        pos: 0,
        origin,
        sheets,
        interner,
        opts,
        out: Vec::new(),
    };
    parser.expression()?;
    if parser.pos != parser.lexemes.len() {
        return Err(ParseError::UnexpectedToken { pos: parser.pos });
    }
    Ok(TokenStore::new(parser.out))
}
