// src/utils/jwt.rs

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{config::Config, error::AppError};

/// Resolved identity claims.
///
/// Token issuance belongs to the external identity service; this engine
/// only verifies and trusts the resolved claims.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - the identity's stable ID (as string).
    pub sub: String,
    /// Candidate/staff email; the key the allow-list and attempt store use.
    pub email: String,
    /// Owning organization for staff identities.
    pub org_id: Option<i64>,
    /// 'candidate' or 'staff'.
    pub role: String,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

impl Claims {
    /// True for staff identities belonging to the given organization.
    pub fn is_staff_of(&self, org_id: i64) -> bool {
        self.role == "staff" && self.org_id == Some(org_id)
    }
}

/// Signs an identity token. Used by tests and dev tooling only; production
/// tokens come from the identity service.
pub fn sign_identity(
    id: i64,
    email: &str,
    org_id: Option<i64>,
    role: &str,
    secret: &str,
    expiration_seconds: u64,
) -> Result<String, AppError> {
    let expiration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(e.to_string()))?
        .as_secs() as usize
        + expiration_seconds as usize;

    let claims = Claims {
        sub: id.to_string(),
        email: email.to_owned(),
        org_id,
        role: role.to_owned(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(e.to_string()))
}

/// Verifies and decodes an identity token.
pub fn verify_identity(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthError("Invalid token".to_string()))?;

    Ok(token_data.claims)
}

/// Axum middleware: identity resolution.
///
/// Validates the 'Authorization: Bearer <token>' header and injects
/// `Claims` into the request extensions for handlers to use.
pub async fn auth_middleware(
    State(config): State<Config>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let token = match auth_header {
        Some(header) if header.starts_with("Bearer ") => &header[7..],
        _ => return Err(StatusCode::UNAUTHORIZED),
    };

    match verify_identity(token, &config.jwt_secret) {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            Ok(next.run(req).await)
        }
        Err(_) => Err(StatusCode::UNAUTHORIZED),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify_round_trips_claims() {
        let token =
            sign_identity(7, "c@example.com", None, "candidate", "secret", 600).unwrap();
        let claims = verify_identity(&token, "secret").unwrap();
        assert_eq!(claims.sub, "7");
        assert_eq!(claims.email, "c@example.com");
        assert_eq!(claims.role, "candidate");
        assert!(!claims.is_staff_of(1));
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let token = sign_identity(7, "c@example.com", None, "candidate", "secret", 600).unwrap();
        assert!(verify_identity(&token, "other").is_err());
    }

    #[test]
    fn staff_check_requires_matching_org() {
        let token =
            sign_identity(3, "s@example.com", Some(42), "staff", "secret", 600).unwrap();
        let claims = verify_identity(&token, "secret").unwrap();
        assert!(claims.is_staff_of(42));
        assert!(!claims.is_staff_of(41));
    }
}
