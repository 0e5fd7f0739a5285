use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::get,
    Json, Router,
};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{CalculationResponse, CreateCalculationRequest, Pagination, UpdateCalculationRequest},
    error::CalculationError,
    model::{Calculation, CalculationKind},
    repo,
};
use crate::{auth::jwt::AuthUser, state::AppState};

const MAX_PAGE: i64 = 100;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/calculations", get(list_calculations).post(create_calculation))
        .route(
            "/calculations/:id",
            get(get_calculation)
                .put(update_calculation)
                .delete(delete_calculation),
        )
}

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

fn bad_request(e: CalculationError) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, e.to_string())
}

fn not_found() -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, "Calculation not found".into())
}

#[instrument(skip(state, body))]
pub async fn create_calculation(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CreateCalculationRequest>,
) -> Result<(StatusCode, HeaderMap, Json<CalculationResponse>), (StatusCode, String)> {
    let new = Calculation::create(&body.calculation_type, user_id, body.inputs).map_err(|e| {
        warn!(error = %e, calculation_type = %body.calculation_type, "rejected calculation");
        bad_request(e)
    })?;

    match new.result() {
        Ok(result) => debug!(kind = %new.kind(), result, "calculation evaluated"),
        Err(e) => debug!(kind = %new.kind(), error = %e, "calculation stored with evaluation error"),
    }

    let calc = repo::insert(&state.db, &new).await.map_err(|e| {
        error!(error = %e, %user_id, "insert calculation failed");
        internal(e)
    })?;
    info!(%user_id, calculation_id = %calc.id, kind = %calc.kind, "calculation created");

    let mut headers = HeaderMap::new();
    if let Ok(location) = HeaderValue::from_str(&format!("/api/v1/calculations/{}", calc.id)) {
        headers.insert(header::LOCATION, location);
    }

    Ok((StatusCode::CREATED, headers, Json(calc.into())))
}

#[instrument(skip(state))]
pub async fn list_calculations(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<CalculationResponse>>, (StatusCode, String)> {
    let kind = p
        .calculation_type
        .as_deref()
        .map(str::parse::<CalculationKind>)
        .transpose()
        .map_err(bad_request)?;
    let limit = p.limit.clamp(1, MAX_PAGE);
    let offset = p.offset.max(0);

    let calcs = repo::list_by_user(&state.db, user_id, kind, limit, offset)
        .await
        .map_err(|e| {
            error!(error = %e, %user_id, "list calculations failed");
            internal(e)
        })?;
    Ok(Json(calcs.into_iter().map(Into::into).collect()))
}

#[instrument(skip(state))]
pub async fn get_calculation(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<CalculationResponse>, (StatusCode, String)> {
    match repo::get(&state.db, user_id, id).await {
        Ok(Some(calc)) => Ok(Json(calc.into())),
        Ok(None) => Err(not_found()),
        Err(e) => {
            error!(error = %e, %user_id, %id, "get calculation failed");
            Err(internal(e))
        }
    }
}

#[instrument(skip(state, body))]
pub async fn update_calculation(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateCalculationRequest>,
) -> Result<Json<CalculationResponse>, (StatusCode, String)> {
    if body.inputs.is_empty() {
        return Err(bad_request(CalculationError::EmptyInputs));
    }
    match repo::update_inputs(&state.db, user_id, id, &body.inputs).await {
        Ok(Some(calc)) => {
            info!(%user_id, calculation_id = %id, "calculation updated");
            Ok(Json(calc.into()))
        }
        Ok(None) => Err(not_found()),
        Err(e) => {
            error!(error = %e, %user_id, %id, "update calculation failed");
            Err(internal(e))
        }
    }
}

#[instrument(skip(state))]
pub async fn delete_calculation(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    match repo::delete(&state.db, user_id, id).await {
        Ok(true) => {
            info!(%user_id, calculation_id = %id, "calculation deleted");
            Ok(StatusCode::NO_CONTENT)
        }
        Ok(false) => Err(not_found()),
        Err(e) => {
            error!(error = %e, %user_id, %id, "delete calculation failed");
            Err(internal(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::JwtKeys;
    use axum::{body::Body, extract::FromRef, http::Request};
    use tower::ServiceExt;

    fn app(state: AppState) -> Router {
        routes().with_state(state)
    }

    fn bearer(state: &AppState) -> String {
        let token = JwtKeys::from_ref(state).sign_access(Uuid::new_v4()).unwrap();
        format!("Bearer {token}")
    }

    async fn body_text(res: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn requires_authentication() {
        let res = app(AppState::fake())
            .oneshot(Request::builder().uri("/calculations").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn create_rejects_unsupported_type() {
        let state = AppState::fake();
        let auth = bearer(&state);
        let res = app(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/calculations")
                    .header("authorization", auth)
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"type":"modulus","inputs":[10,3]}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(res).await, "Unsupported calculation type: modulus");
    }

    #[tokio::test]
    async fn create_rejects_empty_inputs() {
        let state = AppState::fake();
        let auth = bearer(&state);
        let res = app(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/calculations")
                    .header("authorization", auth)
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"type":"addition","inputs":[]}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn list_rejects_unknown_type_filter() {
        let state = AppState::fake();
        let auth = bearer(&state);
        let res = app(state)
            .oneshot(
                Request::builder()
                    .uri("/calculations?type=power")
                    .header("authorization", auth)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn update_rejects_empty_inputs() {
        let state = AppState::fake();
        let auth = bearer(&state);
        let res = app(state)
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri(format!("/calculations/{}", Uuid::new_v4()))
                    .header("authorization", auth)
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"inputs":[]}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(res).await, "Inputs must contain at least one number.");
    }
}
