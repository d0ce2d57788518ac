use serde::{Serialize, de::DeserializeOwned};

use crate::cache::get_list_with_cache;
use crate::error::AppError;
use crate::models::PaginatedQuery;
use crate::state::AppState;
use crate::store::Record;

mod attendance;
mod classrooms;
mod execs;
mod health;
mod login;
mod metrics;
mod students;
mod teachers;

pub use attendance::{
    attendance_by_classroom_handler, attendance_by_student_handler, bulk_mark_attendance_handler,
    delete_attendance_handler, mark_attendance_handler,
};
pub use classrooms::{
    create_classroom_handler, delete_classroom_handler, get_classroom_handler,
    list_classrooms_handler, update_classroom_handler,
};
pub use execs::{
    create_exec_handler, delete_exec_handler, get_exec_handler, list_execs_handler,
    register_exec_handler, update_exec_handler,
};
pub use health::health_handler;
pub use login::{login_exec_handler, login_student_handler, login_teacher_handler};
pub use metrics::{metrics_handler, track_requests};
pub use students::{
    create_student_handler, delete_student_handler, get_student_handler, list_students_handler,
    update_student_handler,
};
pub use teachers::{
    create_teacher_handler, delete_teacher_handler, get_teacher_handler, list_teachers_handler,
    students_by_teacher_handler, update_teacher_handler,
};

// List a page through the cache when one is configured, straight from the store otherwise
async fn cached_list<T, F>(
    state: &AppState,
    prefix: &str,
    pq: &PaginatedQuery,
    fetch: F,
) -> Result<Vec<T>, AppError>
where
    T: Record + Serialize + DeserializeOwned,
    F: FnOnce() -> Vec<T>,
{
    let load = move || async move { Ok::<_, AppError>(fetch()) };

    match &state.cache {
        Some(cache) => {
            // key on the page the table will actually serve
            let params = pq.normalized(T::SORTABLE).cache_params();
            get_list_with_cache(cache.as_ref(), prefix, params, state.cache_ttl, load).await
        }
        None => load().await,
    }
}
