use thiserror::Error;

/// Errors raised by the calculation model itself.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalculationError {
    /// Factory tag did not name a known variant.
    #[error("Unsupported calculation type: {0}")]
    UnsupportedType(String),
    /// A divisor after the first input was zero.
    #[error("Cannot divide by zero.")]
    DivisionByZero,
    #[error("Inputs must contain at least one number.")]
    EmptyInputs,
    /// The reduction overflowed to infinity or produced NaN.
    #[error("Result is out of range.")]
    OutOfRange,
}
