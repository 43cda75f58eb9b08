use thiserror::Error;

/// Compilation is fatal on the first error; whoever drives the pipeline
/// decides how to report it.
#[derive(Debug, Error, PartialEq)]
pub enum Error {
    #[error("lexical error at line {line}, column {column}: invalid token")]
    Lexical { line: usize, column: usize },

    #[error(
        "syntax error at line {line}, column {column}: found {found}{}",
        .expected.as_deref().map(|e| format!(" but expected {}", e)).unwrap_or_default()
    )]
    Syntax {
        line: usize,
        column: usize,
        found: String,
        expected: Option<String>,
    },

    #[error("undeclared variable '{name}'")]
    UnresolvedVariable { name: String },

    #[error("variable '{name}' is declared more than once")]
    DuplicateVariable { name: String },

    #[error("'if' in return position has no 'else' branch")]
    MissingElse,
}
