use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use serde_json::Value;

use super::{cached_list, login::token_response};
use crate::auth::hash_password;
use crate::error::AppError;
use crate::models::{Exec, ExecRegisterPayload, PaginatedQuery, PaginationParams, UpdateExecPayload};
use crate::state::AppState;

fn create_exec(state: &AppState, payload: ExecRegisterPayload) -> Result<Exec, AppError> {
    payload.validate()?;
    let now = Utc::now();
    let exec = state.store.execs.create(Exec {
        id: 0,
        first_name: payload.first_name,
        last_name: payload.last_name,
        email: payload.email,
        password_hash: hash_password(&payload.password),
        role: payload.role,
        created_at: now,
        updated_at: now,
    })?;
    tracing::info!(exec_id = exec.id, role = ?exec.role, "Exec created");
    Ok(exec)
}

// Self-registration behind basic auth, answers with a token for the new exec
pub async fn register_exec_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ExecRegisterPayload>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let exec = create_exec(&state, payload)?;
    token_response(&state, StatusCode::CREATED, &exec, exec.id, &exec.email, exec.role)
}

pub async fn create_exec_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ExecRegisterPayload>,
) -> Result<(StatusCode, Json<Exec>), AppError> {
    let exec = create_exec(&state, payload)?;
    Ok((StatusCode::CREATED, Json(exec)))
}

pub async fn list_execs_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Vec<Exec>>, AppError> {
    let pq = PaginatedQuery::try_from(params)?;
    let execs = cached_list(&state, "execs:list", &pq, || state.store.execs.list(&pq)).await?;
    Ok(Json(execs))
}

pub async fn get_exec_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Exec>, AppError> {
    Ok(Json(state.store.execs.get(id)?))
}

pub async fn update_exec_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateExecPayload>,
) -> Result<Json<Exec>, AppError> {
    payload.validate()?;
    let mut exec = state.store.execs.get(id)?;
    payload.apply(&mut exec);
    Ok(Json(state.store.execs.update(exec)?))
}

pub async fn delete_exec_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.store.execs.delete(id)?;
    Ok(StatusCode::NO_CONTENT)
}
