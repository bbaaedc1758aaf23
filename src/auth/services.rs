use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use tracing::warn;

use crate::auth::password::{hash_password, verify_password};
use crate::auth::repo::UserStore;
use crate::auth::repo_types::{NewUserRecord, User, UserChanges, UserRole};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Registration failures that are the caller's fault.
#[derive(Debug, Error)]
pub enum RegisterError {
    #[error("Email already registered")]
    EmailTaken,
    #[error("Username already taken")]
    UsernameTaken,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Login failures. Unknown email, wrong password and deactivated account all
/// collapse into `InvalidCredentials` so callers cannot probe which emails
/// are registered.
#[derive(Debug, Error)]
pub enum LoginError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
#[error("The user does not have enough privileges")]
pub struct Forbidden;

/// Candidate registration, already validated at the HTTP boundary and with
/// the effective role resolved by the caller.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password: String,
    pub role: UserRole,
}

/// Register a new user: uniqueness checks, hash, persist.
///
/// Email uniqueness is checked before username uniqueness so duplicate
/// submissions always report the same field first.
pub async fn register(store: &dyn UserStore, candidate: NewUser) -> Result<User, RegisterError> {
    if store.find_by_email(&candidate.email).await?.is_some() {
        warn!(email = %candidate.email, "registration with taken email");
        return Err(RegisterError::EmailTaken);
    }
    if store.find_by_username(&candidate.username).await?.is_some() {
        warn!(username = %candidate.username, "registration with taken username");
        return Err(RegisterError::UsernameTaken);
    }

    let hashed = hash_password(&candidate.password)?;
    let user = store
        .create(&NewUserRecord {
            email: candidate.email,
            username: candidate.username,
            hashed_password: hashed,
            role: candidate.role,
        })
        .await?;
    Ok(user)
}

/// Look up a user by email and verify the password against the stored hash.
pub async fn authenticate_user(
    store: &dyn UserStore,
    email: &str,
    password: &str,
) -> Result<User, LoginError> {
    let Some(user) = store.find_by_email(email).await? else {
        warn!(email = %email, "login with unknown email");
        return Err(LoginError::InvalidCredentials);
    };

    if !user.is_active {
        warn!(user_id = user.id, "login for deactivated account");
        return Err(LoginError::InvalidCredentials);
    }

    if !verify_password(password, &user.hashed_password) {
        warn!(user_id = user.id, "login with invalid password");
        return Err(LoginError::InvalidCredentials);
    }

    Ok(user)
}

/// Apply a partial update to a user, re-hashing the password if one is given.
pub async fn update_user(
    store: &dyn UserStore,
    id: i64,
    email: Option<String>,
    username: Option<String>,
    password: Option<String>,
) -> anyhow::Result<Option<User>> {
    let hashed_password = match password {
        Some(plain) => Some(hash_password(&plain)?),
        None => None,
    };
    store
        .update(
            id,
            &UserChanges {
                email,
                username,
                hashed_password,
            },
        )
        .await
}

pub async fn delete_user(store: &dyn UserStore, id: i64) -> anyhow::Result<Option<User>> {
    store.delete(id).await
}

/// Exact-match role check: no hierarchy, ADMIN does not satisfy a USER-only
/// requirement. Passes the user through unchanged on success.
pub fn require_role(user: User, required: UserRole) -> Result<User, Forbidden> {
    if user.role != required {
        return Err(Forbidden);
    }
    Ok(user)
}
