use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use serde_json::{Value, json};

use crate::auth::verify_password;
use crate::error::{AppError, StoreError};
use crate::models::{LoginPayload, Role};
use crate::state::AppState;

/// `{"entity": ..., "token": ...}` body shared by login and registration.
pub(super) fn token_response<T: Serialize>(
    state: &AppState,
    status: StatusCode,
    entity: &T,
    id: i64,
    email: &str,
    role: Role,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let token = state.authenticator.issue(id, email, role)?;
    Ok((status, Json(json!({ "entity": entity, "token": token }))))
}

fn invalid_credentials(_: StoreError) -> AppError {
    AppError::Unauthorized("invalid credentials".into())
}

fn check_password(password: &str, stored: &str) -> Result<(), AppError> {
    if !verify_password(password, stored) {
        return Err(AppError::Unauthorized("invalid credentials".into()));
    }
    Ok(())
}

pub async fn login_exec_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginPayload>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    payload.validate()?;
    let exec = state
        .store
        .execs
        .get_by_email(&payload.email)
        .map_err(invalid_credentials)?;
    check_password(&payload.password, &exec.password_hash)?;

    token_response(&state, StatusCode::OK, &exec, exec.id, &exec.email, exec.role)
}

pub async fn login_teacher_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginPayload>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    payload.validate()?;
    let teacher = state
        .store
        .teachers
        .get_by_email(&payload.email)
        .map_err(invalid_credentials)?;
    check_password(&payload.password, &teacher.password_hash)?;

    token_response(&state, StatusCode::OK, &teacher, teacher.id, &teacher.email, Role::Teacher)
}

pub async fn login_student_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginPayload>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    payload.validate()?;
    let student = state
        .store
        .students
        .get_by_email(&payload.email)
        .map_err(invalid_credentials)?;
    check_password(&payload.password, &student.password_hash)?;

    token_response(&state, StatusCode::OK, &student, student.id, &student.email, Role::Student)
}
