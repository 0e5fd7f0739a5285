//! Calculation hierarchy.
//!
//! Every calculation is stored in one table and told apart by its
//! [`CalculationKind`] discriminator. The four variants each implement
//! [`Operation`], which reduces the ordered inputs to a single number.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::error::CalculationError;

/// Discriminator stored in `calculations.calculation_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalculationKind {
    Addition,
    Subtraction,
    Multiplication,
    Division,
}

impl CalculationKind {
    pub const ALL: [CalculationKind; 4] = [
        CalculationKind::Addition,
        CalculationKind::Subtraction,
        CalculationKind::Multiplication,
        CalculationKind::Division,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Addition => "addition",
            Self::Subtraction => "subtraction",
            Self::Multiplication => "multiplication",
            Self::Division => "division",
        }
    }

    /// Dispatch to the variant's reduction. Non-finite results are errors,
    /// since JSON has no way to carry them.
    pub fn evaluate(self, inputs: &[f64]) -> Result<f64, CalculationError> {
        let result = match self {
            Self::Addition => Addition::reduce(inputs),
            Self::Subtraction => Subtraction::reduce(inputs),
            Self::Multiplication => Multiplication::reduce(inputs),
            Self::Division => Division::reduce(inputs),
        }?;
        if result.is_finite() {
            Ok(result)
        } else {
            Err(CalculationError::OutOfRange)
        }
    }
}

impl fmt::Display for CalculationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive; surrounding whitespace is ignored.
impl FromStr for CalculationKind {
    type Err = CalculationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(tag))
            .ok_or_else(|| CalculationError::UnsupportedType(s.to_string()))
    }
}

/// A concrete calculation variant.
pub trait Operation {
    const KIND: CalculationKind;

    /// Fold `inputs` left to right into one result.
    fn reduce(inputs: &[f64]) -> Result<f64, CalculationError>;

    fn build(user_id: Uuid, inputs: Vec<f64>) -> Result<NewCalculation, CalculationError> {
        NewCalculation::new(Self::KIND, user_id, inputs)
    }
}

pub struct Addition;
pub struct Subtraction;
pub struct Multiplication;
pub struct Division;

fn split(inputs: &[f64]) -> Result<(f64, &[f64]), CalculationError> {
    inputs
        .split_first()
        .map(|(first, rest)| (*first, rest))
        .ok_or(CalculationError::EmptyInputs)
}

impl Operation for Addition {
    const KIND: CalculationKind = CalculationKind::Addition;

    fn reduce(inputs: &[f64]) -> Result<f64, CalculationError> {
        let (first, rest) = split(inputs)?;
        Ok(rest.iter().fold(first, |acc, x| acc + x))
    }
}

impl Operation for Subtraction {
    const KIND: CalculationKind = CalculationKind::Subtraction;

    fn reduce(inputs: &[f64]) -> Result<f64, CalculationError> {
        let (first, rest) = split(inputs)?;
        Ok(rest.iter().fold(first, |acc, x| acc - x))
    }
}

impl Operation for Multiplication {
    const KIND: CalculationKind = CalculationKind::Multiplication;

    fn reduce(inputs: &[f64]) -> Result<f64, CalculationError> {
        let (first, rest) = split(inputs)?;
        Ok(rest.iter().fold(first, |acc, x| acc * x))
    }
}

impl Operation for Division {
    const KIND: CalculationKind = CalculationKind::Division;

    fn reduce(inputs: &[f64]) -> Result<f64, CalculationError> {
        let (first, rest) = split(inputs)?;
        rest.iter().try_fold(first, |acc, &divisor| {
            if divisor == 0.0 {
                Err(CalculationError::DivisionByZero)
            } else {
                Ok(acc / divisor)
            }
        })
    }
}

/// A calculation that has not been persisted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCalculation {
    user_id: Uuid,
    kind: CalculationKind,
    inputs: Vec<f64>,
}

impl NewCalculation {
    /// Only the inputs are checked here; divisors are checked by `result()`.
    pub fn new(
        kind: CalculationKind,
        user_id: Uuid,
        inputs: Vec<f64>,
    ) -> Result<Self, CalculationError> {
        if inputs.is_empty() {
            return Err(CalculationError::EmptyInputs);
        }
        Ok(Self {
            user_id,
            kind,
            inputs,
        })
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn kind(&self) -> CalculationKind {
        self.kind
    }

    pub fn inputs(&self) -> &[f64] {
        &self.inputs
    }

    pub fn result(&self) -> Result<f64, CalculationError> {
        self.kind.evaluate(&self.inputs)
    }
}

/// A stored calculation row, typed by its discriminator.
#[derive(Debug, Clone, PartialEq)]
pub struct Calculation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: CalculationKind,
    pub inputs: Vec<f64>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Calculation {
    /// Factory: build the variant named by `calculation_type`.
    pub fn create(
        calculation_type: &str,
        user_id: Uuid,
        inputs: Vec<f64>,
    ) -> Result<NewCalculation, CalculationError> {
        match calculation_type.parse::<CalculationKind>()? {
            CalculationKind::Addition => Addition::build(user_id, inputs),
            CalculationKind::Subtraction => Subtraction::build(user_id, inputs),
            CalculationKind::Multiplication => Multiplication::build(user_id, inputs),
            CalculationKind::Division => Division::build(user_id, inputs),
        }
    }

    pub fn result(&self) -> Result<f64, CalculationError> {
        self.kind.evaluate(&self.inputs)
    }
}
