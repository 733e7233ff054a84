//! Built-in functions available inside formulas
//!
//! All functions are unary and operate on `f64` (radians for the
//! trigonometric ones): `sin`, `cos`, `tan`, `sqrt`.

use crate::error::{CalcError, Result};
use evalexpr::{ContextWithMutableFunctions, EvalexprError, Function, HashMapContext, Value};

/// Functions registered by [`register_functions`], by formula name
const BUILTINS: [(&str, fn(f64) -> f64); 4] =
    [("sin", sin), ("cos", cos), ("tan", tan), ("sqrt", sqrt)];

/// Sine (radians)
pub fn sin(value: f64) -> f64 {
    value.sin()
}

/// Cosine (radians)
pub fn cos(value: f64) -> f64 {
    value.cos()
}

/// Tangent (radians)
pub fn tan(value: f64) -> f64 {
    value.tan()
}

/// Square root, NaN for negative input
pub fn sqrt(value: f64) -> f64 {
    value.sqrt()
}

/// Extract the single numeric argument of a unary function call.
///
/// evalexpr passes one argument as the bare value, several as a tuple and
/// none as `Empty`.
fn unary_argument(name: &str, args: &Value) -> std::result::Result<f64, EvalexprError> {
    match args {
        Value::Float(f) => Ok(*f),
        Value::Int(i) => Ok(*i as f64),
        Value::Tuple(values) => Err(EvalexprError::CustomMessage(format!(
            "{}() takes 1 argument, {} given",
            name,
            values.len()
        ))),
        Value::Empty => Err(EvalexprError::CustomMessage(format!(
            "{}() takes 1 argument, 0 given",
            name
        ))),
        other => Err(EvalexprError::expected_number(other.clone())),
    }
}

/// Register the built-in functions with an evalexpr context
pub fn register_functions(context: &mut HashMapContext) -> Result<()> {
    for (name, function) in BUILTINS {
        context
            .set_function(
                name.to_string(),
                Function::new(move |args| {
                    Ok(Value::Float(function(unary_argument(name, args)?)))
                }),
            )
            .map_err(|e| CalcError::function(format!("Failed to register {}: {}", name, e)))?;
    }

    Ok(())
}
