use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;

use super::cached_list;
use crate::auth::hash_password;
use crate::cache::{get_by_key_with_cache, students_by_teacher_key};
use crate::error::AppError;
use crate::models::{
    PaginatedQuery, PaginationParams, Student, Teacher, TeacherRegisterPayload,
    UpdateTeacherPayload,
};
use crate::state::AppState;

pub async fn create_teacher_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TeacherRegisterPayload>,
) -> Result<(StatusCode, Json<Teacher>), AppError> {
    payload.validate()?;
    let now = Utc::now();
    let teacher = state.store.teachers.create(Teacher {
        id: 0,
        first_name: payload.first_name,
        last_name: payload.last_name,
        email: payload.email,
        password_hash: hash_password(&payload.password),
        subject: payload.subject,
        phone_number: payload.phone_number,
        hire_date: payload.hire_date,
        created_at: now,
        updated_at: now,
    })?;
    tracing::info!(teacher_id = teacher.id, "Teacher created");
    Ok((StatusCode::CREATED, Json(teacher)))
}

pub async fn list_teachers_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Vec<Teacher>>, AppError> {
    let pq = PaginatedQuery::try_from(params)?;
    let teachers =
        cached_list(&state, "teachers:list", &pq, || state.store.teachers.list(&pq)).await?;
    Ok(Json(teachers))
}

pub async fn get_teacher_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Teacher>, AppError> {
    Ok(Json(state.store.teachers.get(id)?))
}

pub async fn update_teacher_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateTeacherPayload>,
) -> Result<Json<Teacher>, AppError> {
    payload.validate()?;
    let mut teacher = state.store.teachers.get(id)?;
    payload.apply(&mut teacher);
    Ok(Json(state.store.teachers.update(teacher)?))
}

pub async fn delete_teacher_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.store.delete_teacher(id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn students_by_teacher_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Student>>, AppError> {
    let fetch = || async { state.store.students_by_teacher(id).map_err(AppError::from) };

    let students = match &state.cache {
        Some(cache) => {
            get_by_key_with_cache(cache.as_ref(), &students_by_teacher_key(id), state.cache_ttl, fetch)
                .await?
        }
        None => fetch().await?,
    };
    Ok(Json(students))
}
