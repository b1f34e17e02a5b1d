//! In-process fallback evaluator.
//!
//! Stateless and reentrant: safe to call from any number of tasks at
//! once. Input goes through [`validate`](crate::validator::validate)
//! and then a grammar-restricted parser; nothing is ever interpreted
//! as code.

pub mod parser;

use crate::error::EvalError;
use crate::validator::validate;

/// Decimal places kept in a local result.
pub const ROUND_DIGITS: usize = 10;

/// Evaluate `expression` locally.
///
/// Non-finite results fail with [`EvalError::InvalidCalculation`];
/// finite ones are rounded to [`ROUND_DIGITS`] decimal places.
pub fn evaluate_locally(expression: &str) -> Result<f64, EvalError> {
    validate(expression)?;
    let value = parser::evaluate(expression)?;
    if !value.is_finite() {
        return Err(EvalError::InvalidCalculation);
    }
    Ok(round(value))
}

/// Round to [`ROUND_DIGITS`] decimals via the fixed-point rendering, so
/// large magnitudes are not pushed through a lossy multiply.
fn round(value: f64) -> f64 {
    let rounded = format!("{:.*}", ROUND_DIGITS, value)
        .parse::<f64>()
        .unwrap_or(value);
    // Normalise -0 so "-0" never shows up in history.
    if rounded == 0.0 { 0.0 } else { rounded }
}
