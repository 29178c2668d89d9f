use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use validator::Validate;

use crate::db;
use crate::db::ProvisioningSettings;
use crate::error::AppError;
use crate::models::{
    AttendanceRecord, BookStatus, DailySessions, MemberRole, MembershipDelta, NewAttendanceBook,
    NewUser, RecordWithSessions, Role, RosterUpdate, SessionMark, SessionStatus,
};
use crate::response::ApiResponse;

#[derive(Debug, Deserialize, Validate)]
pub struct AddMembersRequest {
    pub attendance_book_id: i64,
    #[validate(length(min = 1, message = "At least one user id is required"))]
    pub user_ids: Vec<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddUsersRequest {
    pub attendance_book_id: i64,
    pub teacher_ids: Vec<i64>,
    pub student_ids: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub struct RemoveMemberRequest {
    pub attendance_book_id: i64,
    pub user_id: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct DailySessionEntryRequest {
    pub attendance_book_id: i64,
    pub student_id: i64,
    pub date: NaiveDate,
    pub sessions: Vec<SessionMarkRequest>,
}

#[derive(Debug, Deserialize)]
pub struct SessionMarkRequest {
    pub session_slot_id: i64,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSessionRequest {
    pub attendance_session_id: i64,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct ListRecordsRequest {
    pub attendance_book_id: i64,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewUserRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    pub role: String,
    pub department_id: Option<i64>,
    pub course_id: Option<i64>,
    pub year_id: Option<i64>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    pub phone_no: Option<String>,
}

impl NewUserRequest {
    fn to_new_user(&self) -> Result<NewUser, AppError> {
        Ok(NewUser {
            name: self.name.clone(),
            username: self.username.clone(),
            role: Role::from_str(&self.role)?,
            department_id: self.department_id,
            course_id: self.course_id,
            year_id: self.year_id,
            email: self.email.clone(),
            phone_no: self.phone_no.clone(),
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewBookRequest {
    #[validate(length(min = 1, message = "Book name is required"))]
    pub book_name: String,
    #[validate(length(min = 1, message = "Book code is required"))]
    pub book_code: String,
    pub book_type: String,
    pub subject_id: Option<i64>,
    pub department_id: Option<i64>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_by: i64,
}

#[derive(Debug, Deserialize)]
pub struct BookStatusRequest {
    pub attendance_book_id: i64,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct BulkCreateOutcome {
    pub created_count: u64,
}

/// Adds users to one side of a book's roster. Re-invoking with the same ids
/// reports zero additions, not a failure.
pub async fn add_members(
    pool: &SqlitePool,
    role: MemberRole,
    request: &AddMembersRequest,
) -> ApiResponse<MembershipDelta> {
    if let Err(errors) = request.validate() {
        return ApiResponse::from_validation_errors(&errors);
    }

    match db::add_members(pool, request.attendance_book_id, role, &request.user_ids).await {
        Ok(delta) if delta.added == 0 => ApiResponse::ok(
            200,
            format!("No new {}s to add", role.label().to_lowercase()),
            delta,
        ),
        Ok(delta) => ApiResponse::ok(200, format!("{}s added successfully", role.label()), delta),
        Err(error) => ApiResponse::from_error(&error, "add_members"),
    }
}

/// Adds teachers and students in one atomic unit.
pub async fn add_users(pool: &SqlitePool, request: &AddUsersRequest) -> ApiResponse<RosterUpdate> {
    if let Err(errors) = request.validate() {
        return ApiResponse::from_validation_errors(&errors);
    }

    match db::add_users(
        pool,
        request.attendance_book_id,
        &request.teacher_ids,
        &request.student_ids,
    )
    .await
    {
        Ok(update) => ApiResponse::ok(200, "Teachers and Students added successfully", update),
        Err(error) => ApiResponse::from_error(&error, "add_users"),
    }
}

pub async fn remove_member(
    pool: &SqlitePool,
    role: MemberRole,
    request: &RemoveMemberRequest,
) -> ApiResponse<()> {
    match db::remove_member(pool, request.attendance_book_id, role, request.user_id).await {
        Ok(()) => ApiResponse::ok_message(
            200,
            format!(
                "{} removed from attendance book successfully",
                role.label()
            ),
        ),
        Err(error) => ApiResponse::from_error(&error, "remove_member"),
    }
}

/// Ingests a batch of per-day session submissions. The whole batch is
/// persisted atomically or not at all.
pub async fn ingest_daily_sessions(
    pool: &SqlitePool,
    entries: &[DailySessionEntryRequest],
) -> ApiResponse<Vec<i64>> {
    if entries.is_empty() {
        let error =
            AppError::Validation("Attendance entries should be a non-empty array".to_string());
        return ApiResponse::from_error(&error, "ingest_daily_sessions");
    }

    let mut batch = Vec::with_capacity(entries.len());
    for entry in entries {
        if let Err(errors) = entry.validate() {
            return ApiResponse::from_validation_errors(&errors);
        }
        let mut sessions = Vec::with_capacity(entry.sessions.len());
        for mark in &entry.sessions {
            let status = match SessionStatus::from_str(&mark.status) {
                Ok(status) => status,
                Err(error) => return ApiResponse::from_error(&error, "ingest_daily_sessions"),
            };
            sessions.push(SessionMark {
                session_slot_id: mark.session_slot_id,
                status,
            });
        }
        batch.push(DailySessions {
            attendance_book_id: entry.attendance_book_id,
            student_id: entry.student_id,
            date: entry.date,
            sessions,
        });
    }

    match db::ingest_daily_sessions(pool, &batch).await {
        Ok(record_ids) => {
            ApiResponse::ok(201, "Attendance records created successfully", record_ids)
        }
        Err(error) => ApiResponse::from_error(&error, "ingest_daily_sessions"),
    }
}

pub async fn update_session(
    pool: &SqlitePool,
    request: &UpdateSessionRequest,
) -> ApiResponse<AttendanceRecord> {
    let status = match SessionStatus::from_str(&request.status) {
        Ok(status) => status,
        Err(error) => return ApiResponse::from_error(&error, "update_session"),
    };

    match db::update_single_session(pool, request.attendance_session_id, status).await {
        Ok(record) => ApiResponse::ok(200, "Attendance session updated successfully", record),
        Err(error) => ApiResponse::from_error(&error, "update_session"),
    }
}

pub async fn list_records(
    pool: &SqlitePool,
    request: &ListRecordsRequest,
) -> ApiResponse<Vec<RecordWithSessions>> {
    match db::list_records(pool, request.attendance_book_id, request.date).await {
        Ok(records) => ApiResponse::ok(200, "Attendance records retrieved successfully", records),
        Err(error) => ApiResponse::from_error(&error, "list_records"),
    }
}

pub async fn create_user(
    pool: &SqlitePool,
    request: &NewUserRequest,
    settings: &ProvisioningSettings,
) -> ApiResponse<i64> {
    if let Err(errors) = request.validate() {
        return ApiResponse::from_validation_errors(&errors);
    }
    let new_user = match request.to_new_user() {
        Ok(new_user) => new_user,
        Err(error) => return ApiResponse::from_error(&error, "create_user"),
    };

    match db::create_user(pool, &new_user, settings).await {
        Ok(id) => ApiResponse::ok(201, "User created successfully", id),
        Err(error) => ApiResponse::from_error(&error, "create_user"),
    }
}

/// Bulk identity provisioning. An all-filtered batch is a zero-count
/// success, distinguishable from a created batch by its count and message.
pub async fn bulk_create_users(
    pool: &SqlitePool,
    requests: &[NewUserRequest],
    settings: &ProvisioningSettings,
) -> ApiResponse<BulkCreateOutcome> {
    if requests.is_empty() {
        let error = AppError::Validation("Users should be a non-empty array".to_string());
        return ApiResponse::from_error(&error, "bulk_create_users");
    }

    let mut batch = Vec::with_capacity(requests.len());
    for request in requests {
        if let Err(errors) = request.validate() {
            return ApiResponse::from_validation_errors(&errors);
        }
        match request.to_new_user() {
            Ok(new_user) => batch.push(new_user),
            Err(error) => return ApiResponse::from_error(&error, "bulk_create_users"),
        }
    }

    match db::bulk_create_users(pool, &batch, settings).await {
        Ok(0) => ApiResponse::ok(
            200,
            "No new users to insert. All users already exist.",
            BulkCreateOutcome { created_count: 0 },
        ),
        Ok(count) => ApiResponse::ok(
            201,
            format!("{} users created successfully", count),
            BulkCreateOutcome {
                created_count: count,
            },
        ),
        Err(error) => ApiResponse::from_error(&error, "bulk_create_users"),
    }
}

pub async fn create_attendance_book(
    pool: &SqlitePool,
    request: &NewBookRequest,
) -> ApiResponse<i64> {
    if let Err(errors) = request.validate() {
        return ApiResponse::from_validation_errors(&errors);
    }

    let book = NewAttendanceBook {
        book_name: request.book_name.clone(),
        book_code: request.book_code.clone(),
        book_type: request.book_type.clone(),
        subject_id: request.subject_id,
        department_id: request.department_id,
        start_date: request.start_date,
        end_date: request.end_date,
        created_by: request.created_by,
    };

    match db::create_attendance_book(pool, &book).await {
        Ok(id) => ApiResponse::ok(201, "Attendance book created successfully", id),
        Err(error) => ApiResponse::from_error(&error, "create_attendance_book"),
    }
}

pub async fn set_book_status(
    pool: &SqlitePool,
    request: &BookStatusRequest,
) -> ApiResponse<()> {
    let status = match BookStatus::from_str(&request.status) {
        Ok(status) => status,
        Err(error) => return ApiResponse::from_error(&error, "set_book_status"),
    };

    match db::set_book_status(pool, request.attendance_book_id, status).await {
        Ok(()) => {
            let verb = match status {
                BookStatus::Active => "activated",
                BookStatus::Deleted => "deleted",
                BookStatus::Completed => "completed",
                BookStatus::Closed => "closed",
            };
            ApiResponse::ok_message(200, format!("Attendance book {} successfully", verb))
        }
        Err(error) => ApiResponse::from_error(&error, "set_book_status"),
    }
}
