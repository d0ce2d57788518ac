use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;

use super::cached_list;
use crate::error::AppError;
use crate::models::{
    Classroom, ClassroomPayload, PaginatedQuery, PaginationParams, UpdateClassroomPayload,
};
use crate::state::AppState;

pub async fn create_classroom_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ClassroomPayload>,
) -> Result<(StatusCode, Json<Classroom>), AppError> {
    payload.validate()?;
    let now = Utc::now();
    let classroom = state.store.create_classroom(Classroom {
        id: 0,
        name: payload.name,
        capacity: payload.capacity,
        grade: payload.grade,
        teacher_id: payload.teacher_id,
        created_at: now,
        updated_at: now,
    })?;
    Ok((StatusCode::CREATED, Json(classroom)))
}

pub async fn list_classrooms_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Vec<Classroom>>, AppError> {
    let pq = PaginatedQuery::try_from(params)?;
    let classrooms =
        cached_list(&state, "classrooms:list", &pq, || state.store.classrooms.list(&pq)).await?;
    Ok(Json(classrooms))
}

pub async fn get_classroom_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Classroom>, AppError> {
    Ok(Json(state.store.classrooms.get(id)?))
}

pub async fn update_classroom_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateClassroomPayload>,
) -> Result<Json<Classroom>, AppError> {
    payload.validate()?;
    let mut classroom = state.store.classrooms.get(id)?;
    payload.apply(&mut classroom);
    Ok(Json(state.store.update_classroom(classroom)?))
}

pub async fn delete_classroom_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.store.delete_classroom(id)?;
    Ok(StatusCode::NO_CONTENT)
}
