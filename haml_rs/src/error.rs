use thiserror::Error;

#[derive(Debug, Error)]
pub enum HamlError {
    #[error("line {line}: do not close `{keyword}` manually, closing directives are generated")]
    ManualClose { line: usize, keyword: String },
    #[error("line {line}: unknown doctype `{token}`")]
    UnknownDoctype { line: usize, token: String },
    #[error("line {line}: conditional comment is missing its closing `]`")]
    UnterminatedCondition { line: usize },
    #[error("line {line}: {message}")]
    Element { line: usize, message: String },
    #[error("line {line}: no closing brace found for multi-line attributes")]
    UnclosedAttributes { line: usize },
    #[error("line {line}: code execution is not enabled for this compiler")]
    ExecutionDisabled { line: usize },
    #[error("line {line}: code execution failed: {message}")]
    Execution { line: usize, message: String },
    #[error("invalid compile options: {0}")]
    Options(#[from] serde_json::Error),
}

impl HamlError {
    /// Source line the error points at, when there is one.
    pub fn line(&self) -> Option<usize> {
        match self {
            HamlError::ManualClose { line, .. }
            | HamlError::UnknownDoctype { line, .. }
            | HamlError::UnterminatedCondition { line }
            | HamlError::Element { line, .. }
            | HamlError::UnclosedAttributes { line }
            | HamlError::ExecutionDisabled { line }
            | HamlError::Execution { line, .. } => Some(*line),
            HamlError::Options(_) => None,
        }
    }
}
