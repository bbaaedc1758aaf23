use serde::{Deserialize, Serialize};

use crate::auth::repo_types::UserRole;

/// JWT payload used for authentication.
///
/// `sub` carries the user's email; `role` is the role at issuance time and is
/// what authorization decisions are made against for the token's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: String,    // user email
    pub role: UserRole, // role at issuance
    pub iat: usize,     // issued at (unix timestamp)
    pub exp: usize,     // expires at (unix timestamp)
}
