use thiserror::Error;

/// Failures while evaluating a single binary operation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComputeError {
    #[error("division by zero")]
    DivisionByZero,

    #[error("unknown operator: {0}")]
    UnknownOperator(String),

    #[error("result is not a finite number")]
    NonFinite,
}
