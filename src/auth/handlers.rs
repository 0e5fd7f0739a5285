use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, RefreshRequest, RegisterRequest},
        jwt::{AuthUser, JwtKeys},
        password::{hash_password, verify_password},
        repo::{NewUser, UpdateUser, User},
        services::{issue_tokens, normalize_registration, validate_registration, validate_update},
    },
    calculations::{dto::CalculationResponse, repo as calc_repo},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me).patch(update_me).delete(delete_me))
        .route("/me/calculations", get(my_calculations))
}

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

fn is_unique_violation(e: &anyhow::Error) -> bool {
    e.chain().any(|cause| {
        cause
            .downcast_ref::<sqlx::Error>()
            .and_then(|err| err.as_database_error())
            .is_some_and(|db_err| db_err.is_unique_violation())
    })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), (StatusCode, String)> {
    normalize_registration(&mut payload);

    if let Err(msg) = validate_registration(&payload) {
        warn!(email = %payload.email, username = %payload.username, reason = msg, "invalid registration");
        return Err((StatusCode::BAD_REQUEST, msg.into()));
    }

    // Ensure email and username are not taken
    match User::find_by_email(&state.db, &payload.email).await {
        Ok(Some(_)) => {
            warn!(email = %payload.email, "email already registered");
            return Err((StatusCode::CONFLICT, "Email already registered".into()));
        }
        Ok(None) => {}
        Err(e) => {
            error!(error = %e, "email lookup failed");
            return Err(internal(e));
        }
    }
    match User::find_by_username(&state.db, &payload.username).await {
        Ok(Some(_)) => {
            warn!(username = %payload.username, "username already taken");
            return Err((StatusCode::CONFLICT, "Username already taken".into()));
        }
        Ok(None) => {}
        Err(e) => {
            error!(error = %e, "username lookup failed");
            return Err(internal(e));
        }
    }

    let hash = match hash_password(&payload.password) {
        Ok(h) => h,
        Err(e) => {
            error!(error = %e, "hash_password failed");
            return Err(internal(e));
        }
    };

    let new_user = NewUser {
        first_name: &payload.first_name,
        last_name: &payload.last_name,
        email: &payload.email,
        username: &payload.username,
        password_hash: &hash,
    };
    let user = match User::create(&state.db, new_user).await {
        Ok(u) => u,
        Err(e) if is_unique_violation(&e) => {
            warn!(email = %payload.email, "concurrent registration conflict");
            return Err((StatusCode::CONFLICT, "User already exists".into()));
        }
        Err(e) => {
            error!(error = %e, "create user failed");
            return Err(internal(e));
        }
    };

    info!(user_id = %user.id, username = %user.username, "user registered");
    let keys = JwtKeys::from_ref(&state);
    let body = issue_tokens(&keys, user.into()).map_err(|e| {
        error!(error = %e, "jwt sign failed");
        internal(e)
    })?;
    Ok((StatusCode::CREATED, Json(body)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let ident = payload.username_or_email.trim();

    let found = if ident.contains('@') {
        User::find_by_email(&state.db, &ident.to_lowercase()).await
    } else {
        User::find_by_username(&state.db, ident).await
    };
    let user = match found {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!(ident = %ident, "login unknown user");
            return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
        }
        Err(e) => {
            error!(error = %e, "user lookup failed");
            return Err(internal(e));
        }
    };

    let ok = match verify_password(&payload.password, &user.password_hash) {
        Ok(v) => v,
        Err(e) => {
            error!(error = %e, "verify_password failed");
            return Err(internal(e));
        }
    };
    if !ok {
        warn!(user_id = %user.id, "login invalid password");
        return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
    }

    info!(user_id = %user.id, "user logged in");
    let keys = JwtKeys::from_ref(&state);
    let body = issue_tokens(&keys, user.into()).map_err(|e| {
        error!(error = %e, "jwt sign failed");
        internal(e)
    })?;
    Ok(Json(body))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| (StatusCode::UNAUTHORIZED, e.to_string()))?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::UNAUTHORIZED, "User not found".to_string()))?;

    let body = issue_tokens(&keys, user.into()).map_err(internal)?;
    Ok(Json(body))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, (StatusCode, String)> {
    match User::find_by_id(&state.db, user_id).await {
        Ok(Some(user)) => Ok(Json(user.into())),
        Ok(None) => {
            warn!(%user_id, "user not found");
            Err((StatusCode::UNAUTHORIZED, "User not found".into()))
        }
        Err(e) => {
            error!(error = %e, %user_id, "get_me failed");
            Err(internal(e))
        }
    }
}

#[instrument(skip(state, payload))]
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(mut payload): Json<UpdateUser>,
) -> Result<Json<PublicUser>, (StatusCode, String)> {
    validate_update(&mut payload).map_err(|msg| (StatusCode::BAD_REQUEST, msg.to_string()))?;

    match User::update_profile(&state.db, user_id, &payload).await {
        Ok(Some(user)) => {
            info!(%user_id, "profile updated");
            Ok(Json(user.into()))
        }
        Ok(None) => Err((StatusCode::UNAUTHORIZED, "User not found".into())),
        Err(e) if is_unique_violation(&e) => {
            Err((StatusCode::CONFLICT, "Email already registered".into()))
        }
        Err(e) => {
            error!(error = %e, %user_id, "update_me failed");
            Err(internal(e))
        }
    }
}

/// The caller's whole history, oldest first.
#[instrument(skip(state))]
pub async fn my_calculations(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<CalculationResponse>>, (StatusCode, String)> {
    let calcs = User::calculations(&state.db, user_id).await.map_err(|e| {
        error!(error = %e, %user_id, "load calculations failed");
        internal(e)
    })?;
    Ok(Json(calcs.into_iter().map(Into::into).collect()))
}

/// Deletes the account together with its calculations.
#[instrument(skip(state))]
pub async fn delete_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<StatusCode, (StatusCode, String)> {
    let owned = match calc_repo::count_by_user(&state.db, user_id).await {
        Ok(n) => n,
        Err(e) => {
            error!(error = %e, %user_id, "count calculations failed");
            return Err(internal(e));
        }
    };
    match User::delete(&state.db, user_id).await {
        Ok(true) => {
            info!(%user_id, calculations = owned, "user deleted");
            Ok(StatusCode::NO_CONTENT)
        }
        Ok(false) => Err((StatusCode::NOT_FOUND, "User not found".into())),
        Err(e) => {
            error!(error = %e, %user_id, "delete_me failed");
            Err(internal(e))
        }
    }
}
