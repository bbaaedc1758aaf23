use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::auth::jwt::JwtKeys;
use crate::auth::repo_types::{User, UserRole};
use crate::auth::services::require_role;
use crate::state::AppState;

/// Rejection for the auth extractors. Unauthorized responses carry the
/// `WWW-Authenticate: Bearer` challenge; forbidden and server errors do not.
#[derive(Debug)]
pub struct AuthRejection {
    pub status: StatusCode,
    pub message: String,
}

impl AuthRejection {
    fn unauthorized(message: &str) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: message.into(),
        }
    }

    fn forbidden(message: String) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message,
        }
    }

    fn internal() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "Internal error".into(),
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        if self.status == StatusCode::UNAUTHORIZED {
            (
                self.status,
                [(header::WWW_AUTHENTICATE, "Bearer")],
                self.message,
            )
                .into_response()
        } else {
            (self.status, self.message).into_response()
        }
    }
}

/// Authenticated user resolved from a bearer token.
///
/// The wrapped record's `role` is the token's role claim, not necessarily the
/// persisted one: authorization for this request follows what was issued.
#[derive(Debug)]
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Read Authorization header
        let auth = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| AuthRejection::unauthorized("Missing Authorization header"))?;

        // Expect "Bearer <token>"
        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or_else(|| AuthRejection::unauthorized("Invalid auth scheme"))?;

        // Expired, bad signature and malformed all collapse into one message
        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(token).map_err(|e| {
            warn!(error = %e, "token rejected");
            AuthRejection::unauthorized("Could not validate credentials")
        })?;

        let user = state
            .users
            .find_by_email(&claims.sub)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "user lookup failed");
                AuthRejection::internal()
            })?
            .ok_or_else(|| {
                warn!(sub = %claims.sub, "token subject no longer exists");
                AuthRejection::unauthorized("Could not validate credentials")
            })?;

        // The token's role claim is the effective role for this request
        let mut user = user;
        user.role = claims.role;
        Ok(CurrentUser(user))
    }
}

/// `CurrentUser` plus an exact ADMIN role requirement.
#[derive(Debug)]
pub struct RequireAdmin(pub User);

#[async_trait]
impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        let user = require_role(user, UserRole::Admin)
            .map_err(|e| AuthRejection::forbidden(e.to_string()))?;
        Ok(RequireAdmin(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::services::{register, NewUser};
    use axum::http::{header::AUTHORIZATION, Request};

    fn parts_with_auth(value: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/v1/auth/me");
        if let Some(v) = value {
            builder = builder.header(AUTHORIZATION, v);
        }
        let (parts, ()) = builder.body(()).unwrap().into_parts();
        parts
    }

    async fn seed_user(state: &AppState, email: &str, username: &str, role: UserRole) {
        register(
            state.users.as_ref(),
            NewUser {
                email: email.into(),
                username: username.into(),
                password: "pw1secret".into(),
                role,
            },
        )
        .await
        .expect("seed user");
    }

    fn token_for(state: &AppState, email: &str, role: UserRole) -> String {
        JwtKeys::from_ref(state).sign(email, role).expect("sign")
    }

    #[tokio::test]
    async fn resolves_user_from_valid_token() {
        let state = AppState::fake();
        seed_user(&state, "a@x.com", "alice", UserRole::User).await;
        let token = token_for(&state, "a@x.com", UserRole::User);

        let mut parts = parts_with_auth(Some(&format!("Bearer {token}")));
        let CurrentUser(user) = CurrentUser::from_request_parts(&mut parts, &state)
            .await
            .expect("authenticated");
        assert_eq!(user.email, "a@x.com");
        assert_eq!(user.role, UserRole::User);
    }

    #[tokio::test]
    async fn token_role_claim_is_effective_role() {
        let state = AppState::fake();
        seed_user(&state, "a@x.com", "alice", UserRole::User).await;
        // stale elevated token: record says USER, claim says ADMIN
        let token = token_for(&state, "a@x.com", UserRole::Admin);

        let mut parts = parts_with_auth(Some(&format!("Bearer {token}")));
        let CurrentUser(user) = CurrentUser::from_request_parts(&mut parts, &state)
            .await
            .expect("authenticated");
        assert_eq!(user.role, UserRole::Admin);
    }

    #[tokio::test]
    async fn missing_header_and_bad_scheme_are_unauthorized() {
        let state = AppState::fake();

        let mut parts = parts_with_auth(None);
        let rejection = CurrentUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert_eq!(rejection.status, StatusCode::UNAUTHORIZED);

        let mut parts = parts_with_auth(Some("Basic abc"));
        let rejection = CurrentUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert_eq!(rejection.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn invalid_token_and_unknown_subject_share_one_message() {
        let state = AppState::fake();
        // token for a user that was never registered
        let token = token_for(&state, "ghost@x.com", UserRole::User);

        let mut parts = parts_with_auth(Some(&format!("Bearer {token}")));
        let unknown = CurrentUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);

        let mut parts = parts_with_auth(Some("Bearer garbage.token.here"));
        let garbage = CurrentUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);
        assert_eq!(unknown.message, garbage.message);
    }

    #[tokio::test]
    async fn unauthorized_response_carries_bearer_challenge() {
        let state = AppState::fake();

        let mut parts = parts_with_auth(None);
        let rejection = CurrentUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        let response = rejection.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response
                .headers()
                .get(header::WWW_AUTHENTICATE)
                .expect("challenge header"),
            "Bearer"
        );
    }

    #[tokio::test]
    async fn require_admin_forbids_regular_users() {
        let state = AppState::fake();
        seed_user(&state, "a@x.com", "alice", UserRole::User).await;
        let token = token_for(&state, "a@x.com", UserRole::User);

        let mut parts = parts_with_auth(Some(&format!("Bearer {token}")));
        let rejection = RequireAdmin::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert_eq!(rejection.status, StatusCode::FORBIDDEN);

        // forbidden is an authorization failure, not a bearer challenge
        let response = rejection.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());
    }

    #[tokio::test]
    async fn require_admin_passes_admins_through() {
        let state = AppState::fake();
        seed_user(&state, "root@x.com", "root", UserRole::Admin).await;
        let token = token_for(&state, "root@x.com", UserRole::Admin);

        let mut parts = parts_with_auth(Some(&format!("Bearer {token}")));
        let RequireAdmin(user) = RequireAdmin::from_request_parts(&mut parts, &state)
            .await
            .expect("admin allowed");
        assert_eq!(user.username, "root");
    }
}
