//! Error types for flow-calc

use thiserror::Error;

/// Calculation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalcError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Evaluation error: {0}")]
    Evaluation(String),

    #[error("Function error: {0}")]
    Function(String),

    #[error("Variable not found: {0}")]
    VariableNotFound(String),

    #[error("Expression did not evaluate to a number: {0}")]
    NotNumeric(String),
}

impl CalcError {
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }

    pub fn function(msg: impl Into<String>) -> Self {
        Self::Function(msg.into())
    }

    pub fn variable_not_found(name: impl Into<String>) -> Self {
        Self::VariableNotFound(name.into())
    }

    pub fn not_numeric(formula: impl Into<String>) -> Self {
        Self::NotNumeric(formula.into())
    }
}

pub type Result<T> = std::result::Result<T, CalcError>;
