use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;
use uuid::Uuid;

use super::{
    error::CalculationError,
    model::{Calculation, CalculationKind},
};

/// Raw `calculations` row before the discriminator is resolved.
#[derive(Debug, FromRow)]
pub struct CalculationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub calculation_type: String,
    pub inputs: Json<Vec<f64>>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl TryFrom<CalculationRow> for Calculation {
    type Error = CalculationError;

    fn try_from(r: CalculationRow) -> Result<Self, Self::Error> {
        let kind = r.calculation_type.parse::<CalculationKind>()?;
        Ok(Self {
            id: r.id,
            user_id: r.user_id,
            kind,
            inputs: r.inputs.0,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}
