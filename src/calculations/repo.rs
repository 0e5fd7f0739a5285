use anyhow::Context;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use super::{
    model::{Calculation, CalculationKind, NewCalculation},
    repo_types::CalculationRow,
};

fn into_models(rows: Vec<CalculationRow>) -> anyhow::Result<Vec<Calculation>> {
    rows.into_iter()
        .map(|r| Calculation::try_from(r).context("decode calculation row"))
        .collect()
}

fn into_model(row: Option<CalculationRow>) -> anyhow::Result<Option<Calculation>> {
    row.map(|r| Calculation::try_from(r).context("decode calculation row"))
        .transpose()
}

/// Persist a calculation; the discriminator comes from its kind.
pub async fn insert(db: &PgPool, new: &NewCalculation) -> anyhow::Result<Calculation> {
    let row = sqlx::query_as::<_, CalculationRow>(
        r#"
        INSERT INTO calculations (user_id, calculation_type, inputs)
        VALUES ($1, $2, $3)
        RETURNING id, user_id, calculation_type, inputs, created_at, updated_at
        "#,
    )
    .bind(new.user_id())
    .bind(new.kind().as_str())
    .bind(Json(new.inputs()))
    .fetch_one(db)
    .await
    .context("insert calculation")?;

    Ok(Calculation::try_from(row)?)
}

/// Fetch a calculation owned by `user_id`.
pub async fn get(db: &PgPool, user_id: Uuid, id: Uuid) -> anyhow::Result<Option<Calculation>> {
    let row = sqlx::query_as::<_, CalculationRow>(
        r#"
        SELECT id, user_id, calculation_type, inputs, created_at, updated_at
          FROM calculations
         WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(db)
    .await
    .context("get calculation")?;

    into_model(row)
}

#[cfg(test)]
pub async fn get_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Calculation>> {
    let row = sqlx::query_as::<_, CalculationRow>(
        r#"
        SELECT id, user_id, calculation_type, inputs, created_at, updated_at
          FROM calculations
         WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await
    .context("get calculation by id")?;

    into_model(row)
}

/// Page through a user's history, newest first. Without `kind` every variant
/// is returned; with it, only rows of that variant.
pub async fn list_by_user(
    db: &PgPool,
    user_id: Uuid,
    kind: Option<CalculationKind>,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<Calculation>> {
    let rows = sqlx::query_as::<_, CalculationRow>(
        r#"
        SELECT id, user_id, calculation_type, inputs, created_at, updated_at
          FROM calculations
         WHERE user_id = $1
           AND ($4::text IS NULL OR calculation_type = $4)
         ORDER BY created_at DESC, id
         LIMIT $2 OFFSET $3
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .bind(kind.map(CalculationKind::as_str))
    .fetch_all(db)
    .await
    .context("list calculations by user")?;

    into_models(rows)
}

pub async fn count_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<i64> {
    sqlx::query_scalar::<_, i64>("SELECT count(*) FROM calculations WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(db)
        .await
        .context("count calculations by user")
}

/// The whole owned collection, oldest first.
pub async fn list_all_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Calculation>> {
    let rows = sqlx::query_as::<_, CalculationRow>(
        r#"
        SELECT id, user_id, calculation_type, inputs, created_at, updated_at
          FROM calculations
         WHERE user_id = $1
         ORDER BY created_at ASC, id
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("list all calculations by user")?;

    into_models(rows)
}

/// Replace the inputs. Callers must pass a non-empty slice.
pub async fn update_inputs(
    db: &PgPool,
    user_id: Uuid,
    id: Uuid,
    inputs: &[f64],
) -> anyhow::Result<Option<Calculation>> {
    anyhow::ensure!(!inputs.is_empty(), "inputs must not be empty");

    let row = sqlx::query_as::<_, CalculationRow>(
        r#"
        UPDATE calculations
           SET inputs = $3, updated_at = now()
         WHERE id = $1 AND user_id = $2
        RETURNING id, user_id, calculation_type, inputs, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(Json(inputs))
    .fetch_optional(db)
    .await
    .context("update calculation inputs")?;

    into_model(row)
}

pub async fn delete(db: &PgPool, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM calculations WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(db)
        .await
        .context("delete calculation")?;
    Ok(res.rows_affected() > 0)
}
