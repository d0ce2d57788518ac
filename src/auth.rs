//! Bearer-token and basic authentication.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::Role;
use crate::state::AppState;

// Salted digest, stored as "salt$hex"
fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password);
    format!("{:x}", hasher.finalize())
}

pub fn hash_password(password: &str) -> String {
    let salt = Uuid::new_v4().simple().to_string();
    format!("{salt}${}", digest(&salt, password))
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    stored
        .split_once('$')
        .is_some_and(|(salt, hash)| digest(salt, password) == hash)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: Role,
    pub iss: String,
    pub aud: String,
    pub exp: u64,
    pub iat: u64,
    pub nbf: u64,
}

#[derive(Clone)]
pub struct Authenticator {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    ttl: Duration,
}

impl Authenticator {
    pub fn new(secret: &str, issuer: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.to_string(),
            ttl,
        }
    }

    pub fn issue(&self, id: i64, email: &str, role: Role) -> Result<String, AppError> {
        let now = Utc::now().timestamp().max(0) as u64;
        let claims = Claims {
            sub: id.to_string(),
            email: email.to_string(),
            role,
            iss: self.issuer.clone(),
            aud: self.issuer.clone(),
            exp: now + self.ttl.as_secs(),
            iat: now,
            nbf: now,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))
    }

    pub fn validate(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.issuer]);
        validation.validate_nbf = true;

        Ok(decode::<Claims>(token, &self.decoding, &validation)?.claims)
    }
}

/// Caller identity attached to the request once the bearer token checks out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
    pub role: Role,
}

fn authorization<'a>(request: &'a Request, scheme: &str) -> Result<&'a str, AppError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("authorization header is missing".into()))?
        .to_str()
        .map_err(|_| AppError::Unauthorized("authorization header is malformed".into()))?;

    match header.split_once(' ') {
        Some((s, value)) if s == scheme && !value.is_empty() => Ok(value),
        _ => Err(AppError::Unauthorized("authorization header is malformed".into())),
    }
}

/// Validates the bearer token and resolves its subject against the store.
/// Users deleted after the token was issued are rejected.
pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = authorization(&request, "Bearer")?;
    let claims = state.authenticator.validate(token)?;

    let id: i64 = claims
        .sub
        .parse()
        .map_err(|_| AppError::Unauthorized("invalid subject".into()))?;
    let unknown = |_| AppError::Unauthorized("unknown user".into());

    let role = match claims.role {
        Role::Admin | Role::Manager => state.store.execs.get(id).map_err(unknown)?.role,
        Role::Teacher => state.store.teachers.get(id).map(|_| Role::Teacher).map_err(unknown)?,
        Role::Student => state.store.students.get(id).map(|_| Role::Student).map_err(unknown)?,
    };

    request.extensions_mut().insert(AuthUser { id, role });
    Ok(next.run(request).await)
}

fn caller(request: &Request) -> Result<AuthUser, AppError> {
    request
        .extensions()
        .get::<AuthUser>()
        .copied()
        .ok_or_else(|| AppError::Unauthorized("user not found in request".into()))
}

// Admins and managers only
pub async fn require_exec(request: Request, next: Next) -> Result<Response, AppError> {
    if !caller(&request)?.role.is_exec() {
        return Err(AppError::Forbidden);
    }
    Ok(next.run(request).await)
}

// Execs and teachers
pub async fn require_staff(request: Request, next: Next) -> Result<Response, AppError> {
    let role = caller(&request)?.role;
    if !(role.is_exec() || role == Role::Teacher) {
        return Err(AppError::Forbidden);
    }
    Ok(next.run(request).await)
}

/// HTTP basic check against the configured credentials.
pub async fn basic_auth(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let encoded = authorization(&request, "Basic")?;
    let decoded = STANDARD
        .decode(encoded)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or_else(|| AppError::Unauthorized("authorization header is malformed".into()))?;

    let expected = (state.config.basic_user.as_str(), state.config.basic_pass.as_str());
    if decoded.split_once(':') != Some(expected) {
        return Err(AppError::Unauthorized("invalid credentials".into()));
    }
    Ok(next.run(request).await)
}
