use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;

use super::cached_list;
use crate::auth::hash_password;
use crate::error::AppError;
use crate::models::{
    PaginatedQuery, PaginationParams, Student, StudentRegisterPayload, UpdateStudentPayload,
};
use crate::state::AppState;

pub async fn create_student_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<StudentRegisterPayload>,
) -> Result<(StatusCode, Json<Student>), AppError> {
    payload.validate()?;
    let now = Utc::now();
    let student = state.store.create_student(Student {
        id: 0,
        first_name: payload.first_name,
        last_name: payload.last_name,
        email: payload.email,
        password_hash: hash_password(&payload.password),
        phone_number: payload.phone_number,
        classroom_id: payload.classroom_id,
        birth_date: payload.birth_date,
        address: payload.address,
        parent_name: payload.parent_name,
        parent_phone_number: payload.parent_phone_number,
        teacher_id: payload.teacher_id,
        created_at: now,
        updated_at: now,
    })?;
    tracing::info!(
        student_id = student.id,
        teacher_id = student.teacher_id,
        "Student created"
    );
    Ok((StatusCode::CREATED, Json(student)))
}

pub async fn list_students_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Vec<Student>>, AppError> {
    let pq = PaginatedQuery::try_from(params)?;
    let students =
        cached_list(&state, "students:list", &pq, || state.store.students.list(&pq)).await?;
    Ok(Json(students))
}

pub async fn get_student_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Student>, AppError> {
    Ok(Json(state.store.students.get(id)?))
}

pub async fn update_student_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateStudentPayload>,
) -> Result<Json<Student>, AppError> {
    payload.validate()?;
    let mut student = state.store.students.get(id)?;
    payload.apply(&mut student);
    Ok(Json(state.store.update_student(student)?))
}

pub async fn delete_student_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.store.delete_student(id)?;
    Ok(StatusCode::NO_CONTENT)
}
