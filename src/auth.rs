use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};

use crate::{
    config::{AppConfig, Env},
    error::RepoError,
    models::{Role, User},
    repository::RepositoryState,
};

/// Lifetime of tokens minted by [`issue_token`].
pub const TOKEN_TTL_HOURS: i64 = 24;

/// Claims
///
/// Payload of the HS256 bearer token. Tokens are minted at sign-in and checked
/// on every authenticated request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): id of the row in `users`. Older tokens name it `id`.
    #[serde(alias = "id")]
    pub sub: i64,
    pub email: String,
    /// Roles granted at sign-in. `ADMIN` unlocks the `/admin` routes.
    #[serde(default)]
    pub roles: Vec<Role>,
    /// Expiration Time (exp): always validated.
    pub exp: usize,
    /// Issued At (iat). Not every issuer sets it.
    #[serde(default)]
    pub iat: usize,
}

/// issue_token
///
/// Signs a token for `user` valid for [`TOKEN_TTL_HOURS`]. The role claim is
/// taken from the stored account.
pub fn issue_token(secret: &str, user: &User) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id,
        email: user.email.clone(),
        roles: vec![user.role],
        exp: (now + Duration::hours(TOKEN_TTL_HOURS)).timestamp() as usize,
        iat: now.timestamp() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// decode_token
///
/// Verifies signature and expiry and returns the claims.
pub fn decode_token(secret: &str, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::default();
    validation.validate_exp = true;
    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)?;
    Ok(data.claims)
}

/// AuthUser Extractor Result
///
/// The resolved identity of an authenticated request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub roles: Vec<Role>,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::Admin)
    }
}

/// AuthUser Extractor Implementation
///
/// Usable as an argument of any authenticated handler. Resolution order:
/// 1. Local bypass: `x-user-id: <id>` when running in `Env::Local`.
/// 2. `Authorization: Bearer <jwt>`, verified with the configured secret.
/// 3. The subject must still exist in `users`.
///
/// Rejection: 401 on any failure.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        // Roles come from the stored account here since no token carries them.
        if config.env == Env::Local {
            let bypass_id = parts
                .headers
                .get("x-user-id")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<i64>().ok());
            if let Some(user_id) = bypass_id {
                if let Ok(user) = repo.get_user(user_id).await {
                    return Ok(AuthUser {
                        id: user.id,
                        roles: vec![user.role],
                    });
                }
            }
        }

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let claims = decode_token(&config.jwt_secret, token).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => tracing::debug!("rejected expired token"),
                other => tracing::debug!("rejected token: {:?}", other),
            }
            StatusCode::UNAUTHORIZED
        })?;

        // A valid token for a deleted account is refused.
        let user = repo.get_user(claims.sub).await.map_err(|e| match e {
            RepoError::NotFound => StatusCode::UNAUTHORIZED,
            other => {
                tracing::error!("account lookup failed: {}", other);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        })?;

        Ok(AuthUser {
            id: user.id,
            roles: claims.roles,
        })
    }
}
