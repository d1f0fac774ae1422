use thiserror::Error;

pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unterminated quoted argument at line {line}, column {column}")]
    UnterminatedQuote { line: usize, column: usize },

    #[error("Invalid syntax at line {line}: {message}")]
    InvalidSyntax { line: usize, message: String },
}

impl ParseError {
    pub fn unterminated_quote(line: usize, column: usize) -> Self {
        Self::UnterminatedQuote { line, column }
    }

    pub fn invalid_syntax(line: usize, message: impl Into<String>) -> Self {
        Self::InvalidSyntax {
            line,
            message: message.into(),
        }
    }

    /// 1-based source line the error points at
    pub fn line(&self) -> usize {
        match self {
            Self::UnterminatedQuote { line, .. } | Self::InvalidSyntax { line, .. } => *line,
        }
    }
}
