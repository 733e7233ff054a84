//! flow-calc - Formula evaluation for the flow meter simulator
//!
//! Evaluates the small arithmetic formulas used both to shape simulated sensor
//! waveforms and to compute the corrected flow rate.
//!
//! # Example
//!
//! ```rust
//! use flow_calc::CalcEngine;
//! use std::collections::HashMap;
//!
//! let engine = CalcEngine::new();
//!
//! let mut vars = HashMap::new();
//! vars.insert("t".to_string(), 5.0);
//!
//! assert_eq!(engine.evaluate("10 + t", &vars).unwrap(), 15.0);
//! assert!(engine.evaluate("10 + missing", &vars).is_err());
//! ```
//!
//! # Built-in Functions
//!
//! | Function | Signature | Description |
//! |----------|-----------|-------------|
//! | `sin` | `sin(x)` | Sine, radians |
//! | `cos` | `cos(x)` | Cosine, radians |
//! | `tan` | `tan(x)` | Tangent, radians |
//! | `sqrt` | `sqrt(x)` | Square root |

pub mod error;
pub mod evaluator;
pub mod functions;

pub use error::{CalcError, Result};
pub use evaluator::{evaluate, CalcEngine, Formula};
pub use functions::{cos, sin, sqrt, tan};
