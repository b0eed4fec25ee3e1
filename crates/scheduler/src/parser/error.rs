use thiserror::Error;

/// Rejected expression text. Offsets are byte offsets into the input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyntaxError {
    #[error("expression is empty")]
    Empty { offset: usize },

    #[error("expected a number or '(' at offset {offset}, found {}", describe(.found))]
    ExpectedOperand { offset: usize, found: Option<char> },

    #[error("malformed number '{text}' at offset {offset}")]
    MalformedNumber { offset: usize, text: String },

    #[error("unclosed '(' opened at offset {offset}")]
    UnclosedParen { offset: usize },

    #[error("unexpected '{found}' at offset {offset}")]
    UnexpectedChar { offset: usize, found: char },

    #[error("parentheses nested too deeply at offset {offset}")]
    NestingTooDeep { offset: usize },
}

impl SyntaxError {
    pub fn offset(&self) -> usize {
        match self {
            SyntaxError::Empty { offset }
            | SyntaxError::ExpectedOperand { offset, .. }
            | SyntaxError::MalformedNumber { offset, .. }
            | SyntaxError::UnclosedParen { offset }
            | SyntaxError::UnexpectedChar { offset, .. }
            | SyntaxError::NestingTooDeep { offset } => *offset,
        }
    }
}

fn describe(found: &Option<char>) -> String {
    match found {
        Some(c) => format!("'{c}'"),
        None => "end of input".to_string(),
    }
}
