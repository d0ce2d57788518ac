use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

const MAX_NAME_LEN: usize = 72;
const MIN_PASSWORD_LEN: usize = 8;
const MAX_PASSWORD_LEN: usize = 72;
const MAX_PAGE_SIZE: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Teacher,
    Student,
}

impl Role {
    pub fn is_exec(self) -> bool {
        matches!(self, Role::Admin | Role::Manager)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Exec {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Teacher {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub subject: String,
    pub phone_number: String,
    pub hire_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Student {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub phone_number: Option<String>,
    pub classroom_id: i64,
    pub birth_date: NaiveDate,
    pub address: String,
    pub parent_name: String,
    pub parent_phone_number: String,
    pub teacher_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Classroom {
    pub id: i64,
    pub name: String,
    pub capacity: i64,
    pub grade: i64,
    pub teacher_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Excused,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttendanceRecord {
    pub id: i64,
    pub student_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teacher_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classroom_id: Option<i64>,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Request payloads
// ---------------------------------------------------------------------------

fn require(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(format!("{field} is required")));
    }
    max_len(field, value, MAX_NAME_LEN)
}

fn max_len(field: &str, value: &str, max: usize) -> Result<(), AppError> {
    if value.chars().count() > max {
        return Err(AppError::BadRequest(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

fn email(value: &str) -> Result<(), AppError> {
    match value.split_once('@') {
        Some((user, domain)) if !user.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(AppError::BadRequest("email is invalid".to_string())),
    }
}

fn password(value: &str) -> Result<(), AppError> {
    let len = value.chars().count();
    if !(MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&len) {
        return Err(AppError::BadRequest(format!(
            "password must be between {MIN_PASSWORD_LEN} and {MAX_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
}

impl LoginPayload {
    pub fn validate(&self) -> Result<(), AppError> {
        email(&self.email)?;
        password(&self.password)
    }
}

#[derive(Debug, Deserialize)]
pub struct ExecRegisterPayload {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

impl ExecRegisterPayload {
    pub fn validate(&self) -> Result<(), AppError> {
        require("first_name", &self.first_name)?;
        require("last_name", &self.last_name)?;
        email(&self.email)?;
        password(&self.password)?;
        if !self.role.is_exec() {
            return Err(AppError::BadRequest(
                "role must be one of admin, manager".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct TeacherRegisterPayload {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub subject: String,
    pub phone_number: String,
    pub hire_date: NaiveDate,
}

impl TeacherRegisterPayload {
    pub fn validate(&self) -> Result<(), AppError> {
        require("first_name", &self.first_name)?;
        require("last_name", &self.last_name)?;
        email(&self.email)?;
        password(&self.password)?;
        require("subject", &self.subject)?;
        require("phone_number", &self.phone_number)
    }
}

#[derive(Debug, Deserialize)]
pub struct StudentRegisterPayload {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub phone_number: Option<String>,
    pub classroom_id: i64,
    pub birth_date: NaiveDate,
    pub address: String,
    pub parent_name: String,
    pub parent_phone_number: String,
    pub teacher_id: i64,
}

impl StudentRegisterPayload {
    pub fn validate(&self) -> Result<(), AppError> {
        require("first_name", &self.first_name)?;
        require("last_name", &self.last_name)?;
        email(&self.email)?;
        password(&self.password)?;
        require("address", &self.address)?;
        require("parent_name", &self.parent_name)?;
        require("parent_phone_number", &self.parent_phone_number)
    }
}

#[derive(Debug, Deserialize)]
pub struct ClassroomPayload {
    pub name: String,
    pub capacity: i64,
    pub grade: i64,
    pub teacher_id: i64,
}

impl ClassroomPayload {
    pub fn validate(&self) -> Result<(), AppError> {
        require("name", &self.name)?;
        if self.capacity <= 0 {
            return Err(AppError::BadRequest("capacity must be positive".to_string()));
        }
        Ok(())
    }
}

// Partial updates: every field is optional and only present fields are
// written onto the stored entity.

#[derive(Debug, Default, Deserialize)]
pub struct UpdateExecPayload {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
}

impl UpdateExecPayload {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(v) = &self.first_name {
            require("first_name", v)?;
        }
        if let Some(v) = &self.last_name {
            require("last_name", v)?;
        }
        if let Some(v) = &self.email {
            email(v)?;
        }
        if self.role.is_some_and(|r| !r.is_exec()) {
            return Err(AppError::BadRequest(
                "role must be one of admin, manager".to_string(),
            ));
        }
        Ok(())
    }

    pub fn apply(self, exec: &mut Exec) {
        if let Some(v) = self.first_name {
            exec.first_name = v;
        }
        if let Some(v) = self.last_name {
            exec.last_name = v;
        }
        if let Some(v) = self.email {
            exec.email = v;
        }
        if let Some(v) = self.role {
            exec.role = v;
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateTeacherPayload {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub subject: Option<String>,
    pub phone_number: Option<String>,
    pub hire_date: Option<NaiveDate>,
}

impl UpdateTeacherPayload {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(v) = &self.first_name {
            require("first_name", v)?;
        }
        if let Some(v) = &self.last_name {
            require("last_name", v)?;
        }
        if let Some(v) = &self.email {
            email(v)?;
        }
        if let Some(v) = &self.subject {
            require("subject", v)?;
        }
        Ok(())
    }

    pub fn apply(self, teacher: &mut Teacher) {
        if let Some(v) = self.first_name {
            teacher.first_name = v;
        }
        if let Some(v) = self.last_name {
            teacher.last_name = v;
        }
        if let Some(v) = self.email {
            teacher.email = v;
        }
        if let Some(v) = self.subject {
            teacher.subject = v;
        }
        if let Some(v) = self.phone_number {
            teacher.phone_number = v;
        }
        if let Some(v) = self.hire_date {
            teacher.hire_date = v;
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateStudentPayload {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub classroom_id: Option<i64>,
    pub birth_date: Option<NaiveDate>,
    pub address: Option<String>,
    pub parent_name: Option<String>,
    pub parent_phone_number: Option<String>,
    pub teacher_id: Option<i64>,
}

impl UpdateStudentPayload {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(v) = &self.first_name {
            require("first_name", v)?;
        }
        if let Some(v) = &self.last_name {
            require("last_name", v)?;
        }
        if let Some(v) = &self.email {
            email(v)?;
        }
        if let Some(v) = &self.address {
            max_len("address", v, 256)?;
        }
        if let Some(v) = &self.parent_name {
            max_len("parent_name", v, 128)?;
        }
        Ok(())
    }

    pub fn apply(self, student: &mut Student) {
        if let Some(v) = self.first_name {
            student.first_name = v;
        }
        if let Some(v) = self.last_name {
            student.last_name = v;
        }
        if let Some(v) = self.email {
            student.email = v;
        }
        if let Some(v) = self.phone_number {
            student.phone_number = Some(v);
        }
        if let Some(v) = self.classroom_id {
            student.classroom_id = v;
        }
        if let Some(v) = self.birth_date {
            student.birth_date = v;
        }
        if let Some(v) = self.address {
            student.address = v;
        }
        if let Some(v) = self.parent_name {
            student.parent_name = v;
        }
        if let Some(v) = self.parent_phone_number {
            student.parent_phone_number = v;
        }
        if let Some(v) = self.teacher_id {
            student.teacher_id = v;
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateClassroomPayload {
    pub name: Option<String>,
    pub capacity: Option<i64>,
    pub grade: Option<i64>,
    pub teacher_id: Option<i64>,
}

impl UpdateClassroomPayload {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(v) = &self.name {
            require("name", v)?;
        }
        if self.capacity.is_some_and(|c| c <= 0) {
            return Err(AppError::BadRequest("capacity must be positive".to_string()));
        }
        Ok(())
    }

    pub fn apply(self, classroom: &mut Classroom) {
        if let Some(v) = self.name {
            classroom.name = v;
        }
        if let Some(v) = self.capacity {
            classroom.capacity = v;
        }
        if let Some(v) = self.grade {
            classroom.grade = v;
        }
        if let Some(v) = self.teacher_id {
            classroom.teacher_id = v;
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MarkAttendancePayload {
    pub student_id: i64,
    pub teacher_id: Option<i64>,
    pub classroom_id: Option<i64>,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AttendanceStatusItem {
    pub student_id: i64,
    pub status: AttendanceStatus,
}

#[derive(Debug, Deserialize)]
pub struct BulkAttendancePayload {
    pub classroom_id: i64,
    pub date: NaiveDate,
    pub statuses: Vec<AttendanceStatusItem>,
}

#[derive(Debug, Deserialize)]
pub struct DateRangeQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct DateQuery {
    pub date: NaiveDate,
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortOrder::Asc => f.write_str("asc"),
            SortOrder::Desc => f.write_str("desc"),
        }
    }
}

/// Raw `?limit=&offset=&sort_by=&order=&search=` query string.
#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub sort_by: Option<String>,
    pub order: Option<SortOrder>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginatedQuery {
    pub limit: usize,
    pub offset: usize,
    pub sort_by: String,
    pub order: SortOrder,
    pub search: Option<String>,
}

impl Default for PaginatedQuery {
    fn default() -> Self {
        Self {
            limit: 10,
            offset: 0,
            sort_by: "id".to_string(),
            order: SortOrder::Asc,
            search: None,
        }
    }
}

impl TryFrom<PaginationParams> for PaginatedQuery {
    type Error = AppError;

    fn try_from(params: PaginationParams) -> Result<Self, Self::Error> {
        let defaults = PaginatedQuery::default();
        let limit = params.limit.unwrap_or(defaults.limit);
        if !(1..=MAX_PAGE_SIZE).contains(&limit) {
            return Err(AppError::BadRequest(format!(
                "limit must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        let search = params.search.filter(|s| !s.trim().is_empty());
        if let Some(s) = &search {
            max_len("search", s, MAX_NAME_LEN)?;
        }

        Ok(Self {
            limit,
            offset: params.offset.unwrap_or(defaults.offset),
            sort_by: params
                .sort_by
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.sort_by),
            order: params.order.unwrap_or(defaults.order),
            search,
        })
    }
}

impl PaginatedQuery {
    /// The query as a table runs it: a sort field outside `sortable` falls
    /// back to `id asc`.
    pub fn normalized(&self, sortable: &[&str]) -> PaginatedQuery {
        if sortable.contains(&self.sort_by.as_str()) {
            return self.clone();
        }
        PaginatedQuery {
            sort_by: "id".to_string(),
            order: SortOrder::Asc,
            ..self.clone()
        }
    }

    /// Parameters that identify this page in a list cache key.
    pub fn cache_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("limit", self.limit.to_string()),
            ("offset", self.offset.to_string()),
            ("sort", self.sort_by.clone()),
            ("order", self.order.to_string()),
        ];
        if let Some(search) = &self.search {
            params.push(("search", search.clone()));
        }
        params
    }
}
