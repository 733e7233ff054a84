//! Formula evaluation
//!
//! Provides formula evaluation with support for:
//! - Arithmetic: +, -, *, /, %, ^ and unary minus
//! - Comparison and logic: <, >, <=, >=, ==, !=, &&, || (booleans become 1.0 / 0.0)
//! - Built-in functions: sin, cos, tan, sqrt
//!
//! Operator precedence follows evalexpr: `^` binds tightest, then unary minus,
//! then `* / %`, then `+ -`, then comparisons, `&&` and finally `||`. Binary
//! operators are left-associative. Two integer literals divide as integers
//! (`7 / 2 == 3`); a float operand on either side gives float division.

use crate::error::{CalcError, Result};
use crate::functions;
use evalexpr::{ContextWithMutableVariables, EvalexprError, HashMapContext, Node, Value};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// A parsed formula that can be evaluated repeatedly
///
/// # Example
/// ```
/// use flow_calc::Formula;
/// use std::collections::HashMap;
///
/// let formula = Formula::parse("F * (P / 255) * (T / 255)").unwrap();
///
/// let mut vars = HashMap::new();
/// vars.insert("F".to_string(), 1000.0);
/// vars.insert("P".to_string(), 255.0);
/// vars.insert("T".to_string(), 255.0);
///
/// assert_eq!(formula.evaluate(&vars).unwrap(), 1000.0);
/// ```
#[derive(Debug, Clone)]
pub struct Formula {
    source: String,
    tree: Node,
}

impl Formula {
    /// Parse a formula into an operator tree
    pub fn parse(formula: &str) -> Result<Self> {
        if formula.trim().is_empty() {
            return Err(CalcError::parse("empty formula"));
        }

        let tree = evalexpr::build_operator_tree(formula)
            .map_err(|e| CalcError::parse(format!("Failed to parse '{}': {}", formula, e)))?;

        Ok(Self {
            source: formula.to_string(),
            tree,
        })
    }

    /// Original formula text
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate the formula against a set of variables
    ///
    /// Each call builds its own context, so concurrent evaluations of the
    /// same `Formula` never share mutable state.
    pub fn evaluate(&self, variables: &HashMap<String, f64>) -> Result<f64> {
        let mut context = HashMapContext::new();

        for (name, value) in variables {
            context
                .set_value(name.to_string(), Value::from(*value))
                .map_err(|e| {
                    CalcError::evaluation(format!("Failed to set variable {}: {}", name, e))
                })?;
        }

        functions::register_functions(&mut context)?;

        let value = self
            .tree
            .eval_with_context(&context)
            .map_err(|e| classify_error(e, &self.source))?;

        value_to_f64(value, &self.source)
    }
}

/// CalcEngine - formula evaluation with a compiled-formula cache
///
/// The cache only stores successfully parsed formulas, keyed by their text,
/// so evaluating through the engine gives the same results as
/// [`Formula::parse`] followed by [`Formula::evaluate`].
#[derive(Debug, Default)]
pub struct CalcEngine {
    cache: RwLock<HashMap<String, Arc<Formula>>>,
}

impl CalcEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a formula, reusing a cached tree when one exists
    pub fn compile(&self, formula: &str) -> Result<Arc<Formula>> {
        if let Some(compiled) = self.cache.read().get(formula) {
            return Ok(Arc::clone(compiled));
        }

        let compiled = Arc::new(Formula::parse(formula)?);
        debug!(formula = formula, "formula compiled");
        self.cache
            .write()
            .insert(formula.to_string(), Arc::clone(&compiled));
        Ok(compiled)
    }

    /// Evaluate a formula with the given variables
    pub fn evaluate(&self, formula: &str, variables: &HashMap<String, f64>) -> Result<f64> {
        self.compile(formula)?.evaluate(variables)
    }

    /// Number of formulas held in the cache
    pub fn cached_formulas(&self) -> usize {
        self.cache.read().len()
    }
}

/// Parse and evaluate a formula in one step
pub fn evaluate(formula: &str, variables: &HashMap<String, f64>) -> Result<f64> {
    Formula::parse(formula)?.evaluate(variables)
}

fn classify_error(error: EvalexprError, formula: &str) -> CalcError {
    match error {
        EvalexprError::VariableIdentifierNotFound(name) => CalcError::variable_not_found(name),
        EvalexprError::FunctionIdentifierNotFound(name) => {
            CalcError::function(format!("Unknown function '{}' in '{}'", name, formula))
        },
        EvalexprError::WrongFunctionArgumentAmount { .. } => {
            CalcError::function(format!("Failed to evaluate '{}': {}", formula, error))
        },
        EvalexprError::CustomMessage(msg) => {
            CalcError::function(format!("Failed to evaluate '{}': {}", formula, msg))
        },
        other => CalcError::evaluation(format!("Failed to evaluate '{}': {}", formula, other)),
    }
}

/// Convert evalexpr Value to f64
fn value_to_f64(value: Value, formula: &str) -> Result<f64> {
    match value {
        Value::Float(f) => Ok(f),
        Value::Int(i) => Ok(i as f64),
        Value::Boolean(b) => Ok(if b { 1.0 } else { 0.0 }),
        _ => Err(CalcError::not_numeric(formula)),
    }
}
