use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::config::AppConfig;
use crate::errors::ServiceError;

/// Role claim carried by back-office staff.
pub const ADMIN_ROLE: &str = "ADMIN";

/// JWT claims issued by the identity service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    pub role: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

/// Authenticated caller extracted from a bearer token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: String,
    pub email: Option<String>,
    pub role: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role.eq_ignore_ascii_case(ADMIN_ROLE)
    }
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            role: claims.role,
        }
    }
}

/// Authenticated caller holding the ADMIN role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminUser(pub AuthUser);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing token")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Insufficient permissions")]
    InsufficientPermissions,
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken => ServiceError::Unauthorized("Unauthorized".to_string()),
            AuthError::InvalidToken | AuthError::TokenExpired => {
                ServiceError::Unauthorized("Invalid token".to_string())
            }
            AuthError::InsufficientPermissions => {
                ServiceError::Forbidden("Forbidden".to_string())
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ServiceError::from(self).into_response()
    }
}

/// Verifies HS256 bearer tokens against the shared secret and expected issuer.
#[derive(Clone)]
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str, issuer: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[issuer]);
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.jwt_secret, &config.auth_issuer)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => {
                    debug!(error = %e, "Rejected bearer token");
                    AuthError::InvalidToken
                }
            })
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, AuthError> {
    let value = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingToken)?;

    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .map(str::trim)
        .ok_or(AuthError::MissingToken)?;

    if token.is_empty() {
        return Err(AuthError::MissingToken);
    }
    Ok(token)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<JwtVerifier>: FromRef<S>,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let verifier = Arc::<JwtVerifier>::from_ref(state);
        let token = bearer_token(parts)?;
        let claims = verifier.verify(token)?;
        Ok(AuthUser::from(claims))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    Arc<JwtVerifier>: FromRef<S>,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(AuthError::InsufficientPermissions.into());
        }
        Ok(AdminUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "unit_test_secret_that_is_long_enough_123";
    const ISSUER: &str = "foodie-auth";

    fn token(role: &str, exp_offset: i64, issuer: &str) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: "user-1".into(),
            email: Some("staff@foodie.example".into()),
            role: role.into(),
            iss: issuer.into(),
            iat: now,
            exp: now + exp_offset,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[derive(Clone)]
    struct TestState(Arc<JwtVerifier>);

    impl FromRef<TestState> for Arc<JwtVerifier> {
        fn from_ref(state: &TestState) -> Self {
            state.0.clone()
        }
    }

    fn state() -> TestState {
        TestState(Arc::new(JwtVerifier::new(SECRET, ISSUER)))
    }

    fn parts(authorization: Option<String>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn verifier_accepts_valid_token() {
        let claims = JwtVerifier::new(SECRET, ISSUER)
            .verify(&token("ADMIN", 600, ISSUER))
            .unwrap();
        assert_eq!(claims.role, "ADMIN");
    }

    #[test]
    fn verifier_rejects_wrong_issuer_and_expiry() {
        let verifier = JwtVerifier::new(SECRET, ISSUER);
        assert_eq!(
            verifier.verify(&token("ADMIN", 600, "someone-else")).unwrap_err(),
            AuthError::InvalidToken
        );
        assert_eq!(
            verifier.verify(&token("ADMIN", -3600, ISSUER)).unwrap_err(),
            AuthError::TokenExpired
        );
        assert_eq!(
            verifier.verify("not.a.jwt").unwrap_err(),
            AuthError::InvalidToken
        );
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let mut parts = parts(None);
        let err = AdminUser::from_request_parts(&mut parts, &state())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.response_message(), "Unauthorized");
    }

    #[tokio::test]
    async fn non_admin_is_forbidden() {
        let mut parts = parts(Some(format!("Bearer {}", token("USER", 600, ISSUER))));
        let err = AdminUser::from_request_parts(&mut parts, &state())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn admin_is_extracted() {
        let mut parts = parts(Some(format!("Bearer {}", token("ADMIN", 600, ISSUER))));
        let AdminUser(user) = AdminUser::from_request_parts(&mut parts, &state())
            .await
            .unwrap();
        assert_eq!(user.user_id, "user-1");
        assert!(user.is_admin());
    }
}
