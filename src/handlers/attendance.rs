use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use serde_json::{Value, json};

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::models::{
    AttendanceRecord, BulkAttendancePayload, DateQuery, DateRangeQuery, MarkAttendancePayload,
    Role,
};
use crate::state::AppState;

pub async fn mark_attendance_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<MarkAttendancePayload>,
) -> Result<(StatusCode, Json<AttendanceRecord>), AppError> {
    // teachers marking without an explicit teacher are recorded as the marker
    let teacher_id = payload
        .teacher_id
        .or((user.role == Role::Teacher).then_some(user.id));

    let record = state.store.mark_attendance(AttendanceRecord {
        id: 0,
        student_id: payload.student_id,
        teacher_id,
        classroom_id: payload.classroom_id,
        date: payload.date,
        status: payload.status,
        note: payload.note,
        created_at: Utc::now(),
    })?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn bulk_mark_attendance_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<BulkAttendancePayload>,
) -> Result<Json<Value>, AppError> {
    if payload.statuses.is_empty() {
        return Err(AppError::BadRequest("statuses must not be empty".into()));
    }

    // a student listed twice keeps its last status
    let statuses: HashMap<i64, _> = payload
        .statuses
        .into_iter()
        .map(|item| (item.student_id, item.status))
        .collect();

    state
        .store
        .bulk_mark_attendance(payload.classroom_id, payload.date, &statuses)?;
    tracing::info!(
        classroom_id = payload.classroom_id,
        date = %payload.date,
        marked = statuses.len(),
        "Bulk attendance recorded"
    );

    Ok(Json(json!({ "marked": statuses.len() })))
}

pub async fn attendance_by_student_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(range): Query<DateRangeQuery>,
) -> Result<Json<Vec<AttendanceRecord>>, AppError> {
    if range.from.zip(range.to).is_some_and(|(from, to)| from > to) {
        return Err(AppError::BadRequest("from must not be after to".into()));
    }
    state.store.students.get(id)?;

    Ok(Json(state.store.attendance.by_student(id, range.from, range.to)))
}

pub async fn attendance_by_classroom_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(query): Query<DateQuery>,
) -> Result<Json<Vec<AttendanceRecord>>, AppError> {
    state.store.classrooms.get(id)?;
    Ok(Json(state.store.attendance.by_classroom_date(id, query.date)))
}

pub async fn delete_attendance_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.store.attendance.delete(id)?;
    Ok(StatusCode::NO_CONTENT)
}
