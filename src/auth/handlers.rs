use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    routing::{get, post},
    Form, Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginForm, PublicUser, RegisterRequest, TokenResponse, UpdateUserRequest},
        extractors::{CurrentUser, RequireAdmin},
        jwt::JwtKeys,
        repo_types::UserRole,
        services::{self, is_valid_email, LoginError, RegisterError},
    },
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/me", get(get_me))
        .route("/auth/admin/me", get(get_admin_me))
}

pub fn user_admin_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/users", get(list_users))
        .route(
            "/auth/users/:id",
            axum::routing::put(update_user).delete(delete_user),
        )
}

#[instrument(skip(state, caller, payload))]
pub async fn register(
    State(state): State<AppState>,
    caller: Option<RequireAdmin>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<PublicUser>), (StatusCode, String)> {
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err((StatusCode::BAD_REQUEST, "Invalid email".into()));
    }

    if payload.password.len() < 8 {
        warn!("password too short");
        return Err((StatusCode::BAD_REQUEST, "Password too short".into()));
    }

    // An elevated role is only honored for authenticated admins
    let role = match payload.role {
        Some(UserRole::Admin) if caller.is_none() => {
            warn!(email = %payload.email, "unprivileged caller requested ADMIN role");
            UserRole::User
        }
        Some(requested) => requested,
        None => UserRole::User,
    };

    let user = services::register(
        state.users.as_ref(),
        services::NewUser {
            email: payload.email,
            username: payload.username,
            password: payload.password,
            role,
        },
    )
    .await
    .map_err(|e| match e {
        RegisterError::EmailTaken | RegisterError::UsernameTaken => {
            (StatusCode::BAD_REQUEST, e.to_string())
        }
        RegisterError::Store(e) => {
            error!(error = %e, "register failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    })?;

    info!(user_id = user.id, email = %user.email, "user registered");
    Ok((StatusCode::CREATED, Json(PublicUser::from(user))))
}

#[instrument(skip(state, form))]
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenResponse>, (StatusCode, String)> {
    // OAuth2 form convention: the username field carries the email
    let user = services::authenticate_user(state.users.as_ref(), &form.username, &form.password)
        .await
        .map_err(|e| match e {
            LoginError::InvalidCredentials => (StatusCode::UNAUTHORIZED, e.to_string()),
            LoginError::Store(e) => {
                error!(error = %e, "login failed");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        })?;

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(&user.email, user.role).map_err(|e| {
        error!(error = %e, "jwt sign failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    info!(user_id = user.id, email = %user.email, "user logged in");
    Ok(Json(TokenResponse::bearer(token)))
}

#[instrument(skip_all)]
pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<PublicUser> {
    Json(PublicUser::from(user))
}

#[instrument(skip_all)]
pub async fn get_admin_me(RequireAdmin(user): RequireAdmin) -> Json<PublicUser> {
    Json(PublicUser::from(user))
}

#[instrument(skip_all)]
pub async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
) -> Result<Json<Vec<PublicUser>>, (StatusCode, String)> {
    let users = state.users.list().await.map_err(|e| {
        error!(error = %e, "list users failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<PublicUser>, (StatusCode, String)> {
    if let Some(email) = &payload.email {
        if !is_valid_email(email) {
            return Err((StatusCode::BAD_REQUEST, "Invalid email".into()));
        }
    }
    if let Some(password) = &payload.password {
        if password.len() < 8 {
            return Err((StatusCode::BAD_REQUEST, "Password too short".into()));
        }
    }

    let updated = services::update_user(
        state.users.as_ref(),
        id,
        payload.email,
        payload.username,
        payload.password,
    )
    .await
    .map_err(|e| {
        error!(error = %e, user_id = id, "update user failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?
    .ok_or((StatusCode::NOT_FOUND, "User not found".to_string()))?;

    info!(user_id = id, "user updated");
    Ok(Json(PublicUser::from(updated)))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(id): Path<i64>,
) -> Result<StatusCode, (StatusCode, String)> {
    let deleted = services::delete_user(state.users.as_ref(), id)
        .await
        .map_err(|e| {
            error!(error = %e, user_id = id, "delete user failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    match deleted {
        Some(user) => {
            info!(user_id = user.id, "user deleted");
            Ok(StatusCode::NO_CONTENT)
        }
        None => Err((StatusCode::NOT_FOUND, "User not found".to_string())),
    }
}
