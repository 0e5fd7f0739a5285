use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::{
    calculations::{error::CalculationError, model::CalculationKind},
    state::AppState,
};

const INDEX_HTML: &str = include_str!("../../templates/index.html");

#[derive(Debug, Deserialize)]
pub struct OperationRequest {
    pub a: f64,
    pub b: f64,
}

#[derive(Debug, Serialize)]
pub struct OperationResponse {
    pub result: f64,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/add", post(add))
        .route("/subtract", post(subtract))
        .route("/multiply", post(multiply))
        .route("/divide", post(divide))
}

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

fn error_response(status: StatusCode, msg: impl Into<String>) -> Response {
    (status, Json(ErrorResponse { error: msg.into() })).into_response()
}

/// Evaluate `a ⊕ b` with the stored-calculation semantics.
#[instrument(skip(payload))]
fn apply(kind: CalculationKind, payload: Result<Json<OperationRequest>, JsonRejection>) -> Response {
    let Json(OperationRequest { a, b }) = match payload {
        Ok(p) => p,
        Err(rejection) => {
            warn!(error = %rejection, "invalid operation payload");
            return error_response(StatusCode::BAD_REQUEST, rejection.body_text());
        }
    };

    match kind.evaluate(&[a, b]) {
        Ok(result) => {
            debug!(a, b, result, "operation evaluated");
            Json(OperationResponse { result }).into_response()
        }
        Err(CalculationError::DivisionByZero) => {
            warn!(a, b, "division by zero");
            error_response(StatusCode::BAD_REQUEST, "Cannot divide by zero!")
        }
        Err(e) => {
            warn!(a, b, error = %e, "operation failed");
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
    }
}

pub async fn add(payload: Result<Json<OperationRequest>, JsonRejection>) -> Response {
    apply(CalculationKind::Addition, payload)
}

pub async fn subtract(payload: Result<Json<OperationRequest>, JsonRejection>) -> Response {
    apply(CalculationKind::Subtraction, payload)
}

pub async fn multiply(payload: Result<Json<OperationRequest>, JsonRejection>) -> Response {
    apply(CalculationKind::Multiplication, payload)
}

pub async fn divide(payload: Result<Json<OperationRequest>, JsonRejection>) -> Response {
    apply(CalculationKind::Division, payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use serde_json::Value;
    use tower::ServiceExt;

    async fn post_json(uri: &str, body: &str) -> (StatusCode, Value) {
        let app = routes().with_state(AppState::fake());
        let res = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn index_page_has_calculator_controls() {
        let app = routes().with_state(AppState::fake());
        let res = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("<h1>Hello World</h1>"));
        assert!(html.contains(r#"id="a""#));
        assert!(html.contains(r#"id="b""#));
        assert!(html.contains(r#"id="result""#));
        assert!(html.contains(">Divide</button>"));
    }

    #[tokio::test]
    async fn add_returns_result() {
        let (status, json) = post_json("/add", r#"{"a":10,"b":5}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["result"], 15.0);
    }

    #[tokio::test]
    async fn each_operation_evaluates() {
        for (uri, expected) in [("/subtract", 5.0), ("/multiply", 50.0), ("/divide", 2.0)] {
            let (status, json) = post_json(uri, r#"{"a":10,"b":5}"#).await;
            assert_eq!(status, StatusCode::OK, "{uri}");
            assert_eq!(json["result"], expected, "{uri}");
        }
    }

    #[tokio::test]
    async fn divide_by_zero_returns_error() {
        let (status, json) = post_json("/divide", r#"{"a":10,"b":0}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Cannot divide by zero!");
    }

    #[tokio::test]
    async fn overflowing_result_returns_error() {
        let (status, json) = post_json("/multiply", r#"{"a":1e308,"b":10}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Result is out of range.");
        assert!(json.get("result").is_none());
    }

    #[tokio::test]
    async fn malformed_payload_returns_error_json() {
        let (status, json) = post_json("/add", r#"{"a":"ten","b":5}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].is_string());
    }
}
