//! The formula token model.

use std::sync::Arc;

use ixion_common::{Address, Range, TableReference};

/// Built-in function opcode. Closed set, matched exhaustively - new
/// functions are added here and in `ixion_eval::functions`, never via a
/// runtime-registered open set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionOpcode {
    Sum,
    Min,
    Max,
    Average,
    Len,
    Concatenate,
    Wait,
}

impl FunctionOpcode {
    /// Case-insensitive match against the closed function list.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "SUM" => Some(FunctionOpcode::Sum),
            "MIN" => Some(FunctionOpcode::Min),
            "MAX" => Some(FunctionOpcode::Max),
            "AVERAGE" => Some(FunctionOpcode::Average),
            "LEN" => Some(FunctionOpcode::Len),
            "CONCATENATE" => Some(FunctionOpcode::Concatenate),
            "WAIT" => Some(FunctionOpcode::Wait),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            FunctionOpcode::Sum => "SUM",
            FunctionOpcode::Min => "MIN",
            FunctionOpcode::Max => "MAX",
            FunctionOpcode::Average => "AVERAGE",
            FunctionOpcode::Len => "LEN",
            FunctionOpcode::Concatenate => "CONCATENATE",
            FunctionOpcode::Wait => "WAIT",
        }
    }
}

/// A single, immutable formula token. Tokens never mutate once
/// parsed; re-anchoring relative references happens by producing a new
/// [`Address`]/[`Range`] at interpret time, not by editing the token.
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaToken {
    Open,
    Close,
    Sep,
    Plus,
    Minus,
    Multiply,
    Divide,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Value(f64),
    /// Interned string id, resolved against the model context's string pool.
    StringLit(u32),
    SingleRef(Address),
    RangeRef(Range),
    TableRef(TableReference),
    NamedExpression(String),
    Function(FunctionOpcode),
    /// A name the resolver couldn't classify as a reference, function, or
    /// named expression - kept only when the caller opted in via
    /// [`crate::parser::ParserOptions::preserve_unresolved`].
    UnresolvedRef(String),
}

impl FormulaToken {
    pub fn is_operator(&self) -> bool {
        matches!(
            self,
            FormulaToken::Plus
                | FormulaToken::Minus
                | FormulaToken::Multiply
                | FormulaToken::Divide
                | FormulaToken::Equal
                | FormulaToken::NotEqual
                | FormulaToken::Less
                | FormulaToken::LessEqual
                | FormulaToken::Greater
                | FormulaToken::GreaterEqual
        )
    }
}

/// A reference-counted, immutable token array, optionally shared across a
/// contiguous rectangle of cells (grouped/shared formulas). `Arc` rather
/// than `Rc` because worker-pool threads read tokens concurrently.
#[derive(Debug, Clone)]
pub struct TokenStore {
    tokens: Arc<[FormulaToken]>,
    /// `Some(range)` when this store is shared by every cell in `range`;
    /// each cell re-anchors relative refs to its own position at interpret
    /// time.
    shared_range: Option<Range>,
}

impl TokenStore {
    pub fn new(tokens: Vec<FormulaToken>) -> Self {
        TokenStore {
            tokens: Arc::from(tokens),
            shared_range: None,
        }
    }

    pub fn shared(tokens: Vec<FormulaToken>, range: Range) -> Self {
        TokenStore {
            tokens: Arc::from(tokens),
            shared_range: Some(range),
        }
    }

    pub fn tokens(&self) -> &[FormulaToken] {
        &self.tokens
    }

    pub fn is_shared(&self) -> bool {
        self.shared_range.is_some()
    }

    pub fn shared_range(&self) -> Option<&Range> {
        self.shared_range.as_ref()
    }

    /// Invariant: a shared token store's reference count equals the
    /// number of cells in the sharing range. Exposed for that invariant's
    /// tests; the count itself is whatever the `Arc` machinery reports.
    pub fn strong_count(&self) -> usize {
        Arc::strong_count(&self.tokens)
    }
}
