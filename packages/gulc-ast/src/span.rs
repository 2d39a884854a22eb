use serde::{Deserialize, Serialize};

/// A single point in source text, 0-indexed byte offset plus 1-indexed line/column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TextPosition {
    pub index: u32,
    pub line: u32,
    pub column: u32,
}

impl TextPosition {
    pub const fn new(index: u32, line: u32, column: u32) -> Self {
        Self { index, line, column }
    }
}

/// Every AST node carries one of these. Mirrors GULC's `Node::startPosition`/`endPosition` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceSpan {
    pub start: TextPosition,
    pub end: TextPosition,
}

impl SourceSpan {
    pub const fn new(start: TextPosition, end: TextPosition) -> Self {
        Self { start, end }
    }
}
