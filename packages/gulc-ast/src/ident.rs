use crate::span::SourceSpan;

/// The `Identifier` node kind. A single unqualified name plus its source span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    pub span: SourceSpan,
    pub name: String,
}

impl Identifier {
    pub fn new(span: SourceSpan, name: impl Into<String>) -> Self {
        Self { span, name: name.into() }
    }
}
