use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::model::{Calculation, CalculationKind};

#[derive(Debug, Deserialize)]
pub struct CreateCalculationRequest {
    #[serde(rename = "type")]
    pub calculation_type: String,
    pub inputs: Vec<f64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCalculationRequest {
    pub inputs: Vec<f64>,
}

#[derive(Debug, Serialize)]
pub struct CalculationResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub kind: CalculationKind,
    pub inputs: Vec<f64>,
    pub result: Option<f64>,
    pub error: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Evaluation errors are reported in the body so stored rows stay listable.
impl From<Calculation> for CalculationResponse {
    fn from(c: Calculation) -> Self {
        let (result, error) = match c.result() {
            Ok(v) => (Some(v), None),
            Err(e) => (None, Some(e.to_string())),
        };
        Self {
            id: c.id,
            user_id: c.user_id,
            kind: c.kind,
            inputs: c.inputs,
            result,
            error,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    /// Restrict the listing to one variant.
    #[serde(default, rename = "type")]
    pub calculation_type: Option<String>,
}
fn default_limit() -> i64 {
    20
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calc(kind: CalculationKind, inputs: Vec<f64>) -> Calculation {
        Calculation {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            kind,
            inputs,
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn response_carries_result() {
        let resp = CalculationResponse::from(calc(CalculationKind::Addition, vec![1.0, 2.0]));
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["type"], "addition");
        assert_eq!(json["result"], 3.0);
        assert!(json["error"].is_null());
    }

    #[test]
    fn response_reports_division_by_zero() {
        let resp = CalculationResponse::from(calc(CalculationKind::Division, vec![1.0, 0.0]));
        assert_eq!(resp.result, None);
        assert_eq!(resp.error.as_deref(), Some("Cannot divide by zero."));
    }

    #[test]
    fn response_reports_overflow_instead_of_null_result() {
        let resp = CalculationResponse::from(calc(CalculationKind::Multiplication, vec![1e308, 10.0]));
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json["result"].is_null());
        assert_eq!(json["error"], "Result is out of range.");
    }

    #[test]
    fn create_request_reads_type_field() {
        let req: CreateCalculationRequest =
            serde_json::from_str(r#"{"type":"Multiplication","inputs":[2,3]}"#).unwrap();
        assert_eq!(req.calculation_type, "Multiplication");
        assert_eq!(req.inputs, vec![2.0, 3.0]);
    }
}
