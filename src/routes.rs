use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{delete, get, post},
};
use tower_http::{catch_panic::CatchPanicLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::auth::{authenticate, basic_auth, require_exec, require_staff};
use crate::handlers::*;
use crate::rate_limit::rate_limit_middleware;
use crate::state::AppState;

// Admins and managers only
fn exec_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/execs", get(list_execs_handler).post(create_exec_handler))
        .route(
            "/execs/{id}",
            get(get_exec_handler)
                .patch(update_exec_handler)
                .delete(delete_exec_handler),
        )
        .route("/teachers", get(list_teachers_handler).post(create_teacher_handler))
        .route(
            "/teachers/{id}",
            get(get_teacher_handler)
                .patch(update_teacher_handler)
                .delete(delete_teacher_handler),
        )
        .route("/teachers/{id}/students", get(students_by_teacher_handler))
        .route("/students", get(list_students_handler).post(create_student_handler))
        .route(
            "/students/{id}",
            get(get_student_handler)
                .patch(update_student_handler)
                .delete(delete_student_handler),
        )
        .route(
            "/classrooms",
            get(list_classrooms_handler).post(create_classroom_handler),
        )
        .route(
            "/classrooms/{id}",
            get(get_classroom_handler)
                .patch(update_classroom_handler)
                .delete(delete_classroom_handler),
        )
        .route_layer(middleware::from_fn(require_exec))
}

// Execs and teachers
fn attendance_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/attendance", post(mark_attendance_handler))
        .route("/attendance/bulk", post(bulk_mark_attendance_handler))
        .route("/attendance/students/{id}", get(attendance_by_student_handler))
        .route("/attendance/classrooms/{id}", get(attendance_by_classroom_handler))
        .route("/attendance/{id}", delete(delete_attendance_handler))
        .route_layer(middleware::from_fn(require_staff))
}

/// Wraps `routes` in the layers every request passes through.
fn with_middleware(routes: Router<Arc<AppState>>, state: Arc<AppState>) -> Router {
    routes
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(TimeoutLayer::new(state.config.request_timeout()))
        .layer(CatchPanicLayer::new())
        .layer(middleware::from_fn(track_requests))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub fn app(state: Arc<AppState>) -> Router {
    let public = Router::new()
        .route("/health", get(health_handler))
        .route("/execs/login", post(login_exec_handler))
        .route("/teachers/login", post(login_teacher_handler))
        .route("/students/login", post(login_student_handler));

    let register = Router::new()
        .route("/execs/register", post(register_exec_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), basic_auth));

    let protected = exec_routes()
        .merge(attendance_routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate));

    let routes = Router::new()
        .nest("/v1", public.merge(register).merge(protected))
        .route("/metrics", get(metrics_handler));

    with_middleware(routes, state)
}
