use actix_web::http::StatusCode;
use actix_web::ResponseError;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::helper::error_chain_fmt;

/// Repository to handle JWT tokens
///
/// The tokens themselves are issued by the external authentication system;
/// this service only decodes them into a caller identity. `create_token`
/// exists for tests and operational tooling.
#[derive(Clone)]
pub struct AuthenticationJwtRepository {
    secret: Secret<String>,
    expire_in_s: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: the user id
    pub sub: String,

    /// Premium entitlement of the subject, as decided by the billing system
    pub premium: bool,

    /// Issued At
    pub iat: usize,

    /// Expires At
    pub exp: usize,
}

impl AuthenticationJwtRepository {
    pub fn new(secret: Secret<String>, expire_in_s: i64) -> Self {
        Self {
            secret,
            expire_in_s,
        }
    }

    /// Creates a new JWT for `user_id` carrying its premium entitlement
    #[tracing::instrument(name = "Create JWT token", skip(self))]
    pub fn create_token(
        &self,
        user_id: Uuid,
        premium: bool,
    ) -> Result<String, AuthenticationJwtRepositoryError> {
        let now = Utc::now();
        let claims = TokenClaims {
            sub: user_id.to_string(),
            premium,
            iat: now.timestamp() as usize,
            exp: (now + Duration::seconds(self.expire_in_s)).timestamp() as usize,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.expose_secret().as_bytes()),
        )?;

        Ok(token)
    }

    /// Decodes a token into the caller identity claims
    pub fn decode_token(
        &self,
        token: &str,
    ) -> Result<TokenClaims, AuthenticationJwtRepositoryError> {
        let decoded = decode::<TokenClaims>(
            token,
            &DecodingKey::from_secret(self.secret.expose_secret().as_bytes()),
            &Validation::new(Algorithm::HS256),
        )?;

        Ok(decoded.claims)
    }
}

#[derive(thiserror::Error)]
pub enum AuthenticationJwtRepositoryError {
    #[error("Invalid or expired access token")]
    TokenError(#[from] jsonwebtoken::errors::Error),
}

impl std::fmt::Debug for AuthenticationJwtRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for AuthenticationJwtRepositoryError {
    fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }
}
