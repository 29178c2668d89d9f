use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Student,
    Teacher,
    Admin,
    SuperAdmin,
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::Student => "Student",
            Role::Teacher => "Teacher",
            Role::Admin => "Admin",
            Role::SuperAdmin => "SuperAdmin",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, AppError> {
        match s {
            "Student" => Ok(Role::Student),
            "Teacher" => Ok(Role::Teacher),
            "Admin" => Ok(Role::Admin),
            "SuperAdmin" => Ok(Role::SuperAdmin),
            _ => Err(AppError::Validation(format!("Unknown role: {}", s))),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserStatus {
    Active,
    Deleted,
}

impl UserStatus {
    pub fn as_str(&self) -> &str {
        match self {
            UserStatus::Active => "Active",
            UserStatus::Deleted => "Deleted",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, AppError> {
        match s {
            "Active" => Ok(UserStatus::Active),
            "Deleted" => Ok(UserStatus::Deleted),
            _ => Err(AppError::Validation(format!("Unknown user status: {}", s))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookStatus {
    Active,
    Deleted,
    Completed,
    Closed,
}

impl BookStatus {
    pub fn as_str(&self) -> &str {
        match self {
            BookStatus::Active => "Active",
            BookStatus::Deleted => "Deleted",
            BookStatus::Completed => "Completed",
            BookStatus::Closed => "Closed",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, AppError> {
        match s {
            "Active" => Ok(BookStatus::Active),
            "Deleted" => Ok(BookStatus::Deleted),
            "Completed" => Ok(BookStatus::Completed),
            "Closed" => Ok(BookStatus::Closed),
            _ => Err(AppError::Validation(format!("Unknown book status: {}", s))),
        }
    }
}

impl std::fmt::Display for BookStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Present,
    Absent,
}

impl SessionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            SessionStatus::Present => "Present",
            SessionStatus::Absent => "Absent",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, AppError> {
        match s {
            "Present" => Ok(SessionStatus::Present),
            "Absent" => Ok(SessionStatus::Absent),
            _ => Err(AppError::Validation(
                "Invalid status value. Status must be 'Present' or 'Absent'.".to_string(),
            )),
        }
    }
}

/// Which side of the roster a membership operation targets. The two roles
/// live in separate join tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberRole {
    Student,
    Teacher,
}

impl MemberRole {
    pub fn table(&self) -> &'static str {
        match self {
            MemberRole::Student => "attendance_book_students",
            MemberRole::Teacher => "attendance_book_teachers",
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            MemberRole::Student => "student_id",
            MemberRole::Teacher => "teacher_id",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MemberRole::Student => "Student",
            MemberRole::Teacher => "Teacher",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub username: String,
    pub role: Role,
    pub status: UserStatus,
    pub department_id: Option<i64>,
    pub course_id: Option<i64>,
    pub year_id: Option<i64>,
    pub email: Option<String>,
    pub phone_no: Option<String>,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbUser {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub username: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
    pub department_id: Option<i64>,
    pub course_id: Option<i64>,
    pub year_id: Option<i64>,
    pub email: Option<String>,
    pub phone_no: Option<String>,
}

impl From<DbUser> for User {
    fn from(user: DbUser) -> Self {
        Self {
            id: user.id.unwrap_or_default(),
            name: user.name.unwrap_or_default(),
            username: user.username.unwrap_or_default(),
            role: user
                .role
                .as_deref()
                .and_then(|r| Role::from_str(r).ok())
                .unwrap_or(Role::Student),
            status: user
                .status
                .as_deref()
                .and_then(|s| UserStatus::from_str(s).ok())
                .unwrap_or(UserStatus::Active),
            department_id: user.department_id,
            course_id: user.course_id,
            year_id: user.year_id,
            email: user.email,
            phone_no: user.phone_no,
        }
    }
}

/// Descriptor for a user that does not exist yet. The initial credential is
/// not part of the descriptor; provisioning applies it.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub username: String,
    pub role: Role,
    pub department_id: Option<i64>,
    pub course_id: Option<i64>,
    pub year_id: Option<i64>,
    pub email: Option<String>,
    pub phone_no: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttendanceBook {
    pub id: i64,
    pub book_name: String,
    pub book_code: String,
    pub book_type: String,
    pub subject_id: Option<i64>,
    pub department_id: Option<i64>,
    pub status: BookStatus,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_by: i64,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbAttendanceBook {
    pub id: Option<i64>,
    pub book_name: Option<String>,
    pub book_code: Option<String>,
    pub book_type: Option<String>,
    pub subject_id: Option<i64>,
    pub department_id: Option<i64>,
    pub status: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub created_by: Option<i64>,
}

impl From<DbAttendanceBook> for AttendanceBook {
    fn from(book: DbAttendanceBook) -> Self {
        Self {
            id: book.id.unwrap_or_default(),
            book_name: book.book_name.unwrap_or_default(),
            book_code: book.book_code.unwrap_or_default(),
            book_type: book.book_type.unwrap_or_default(),
            subject_id: book.subject_id,
            department_id: book.department_id,
            status: book
                .status
                .as_deref()
                .and_then(|s| BookStatus::from_str(s).ok())
                .unwrap_or(BookStatus::Active),
            start_date: book.start_date.unwrap_or_default(),
            end_date: book.end_date.unwrap_or_default(),
            created_by: book.created_by.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewAttendanceBook {
    pub book_name: String,
    pub book_code: String,
    pub book_type: String,
    pub subject_id: Option<i64>,
    pub department_id: Option<i64>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_by: i64,
}

/// Per-student-per-day aggregate. The counters are a materialized projection
/// of the child sessions and are only ever written together with them.
#[derive(Debug, Clone, Serialize)]
pub struct AttendanceRecord {
    pub id: i64,
    pub attendance_book_id: i64,
    pub student_id: i64,
    pub date: NaiveDate,
    pub total_sessions: i64,
    pub present_sessions: i64,
    pub absent_sessions: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone, Default)]
pub struct DbAttendanceRecord {
    pub id: Option<i64>,
    pub attendance_book_id: Option<i64>,
    pub student_id: Option<i64>,
    pub date: Option<NaiveDate>,
    pub total_sessions: Option<i64>,
    pub present_sessions: Option<i64>,
    pub absent_sessions: Option<i64>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl From<DbAttendanceRecord> for AttendanceRecord {
    fn from(db: DbAttendanceRecord) -> Self {
        Self {
            id: db.id.unwrap_or_default(),
            attendance_book_id: db.attendance_book_id.unwrap_or_default(),
            student_id: db.student_id.unwrap_or_default(),
            date: db.date.unwrap_or_default(),
            total_sessions: db.total_sessions.unwrap_or_default(),
            present_sessions: db.present_sessions.unwrap_or_default(),
            absent_sessions: db.absent_sessions.unwrap_or_default(),
            created_at: db
                .created_at
                .map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc))
                .unwrap_or_else(Utc::now),
            updated_at: db
                .updated_at
                .map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc))
                .unwrap_or_else(Utc::now),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AttendanceSessionEntry {
    pub id: i64,
    pub attendance_record_id: i64,
    pub session_slot_id: i64,
    pub status: SessionStatus,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbAttendanceSession {
    pub id: Option<i64>,
    pub attendance_record_id: Option<i64>,
    pub session_slot_id: Option<i64>,
    pub status: Option<String>,
}

impl From<DbAttendanceSession> for AttendanceSessionEntry {
    fn from(db: DbAttendanceSession) -> Self {
        Self {
            id: db.id.unwrap_or_default(),
            attendance_record_id: db.attendance_record_id.unwrap_or_default(),
            session_slot_id: db.session_slot_id.unwrap_or_default(),
            status: db
                .status
                .as_deref()
                .and_then(|s| SessionStatus::from_str(s).ok())
                .unwrap_or(SessionStatus::Absent),
        }
    }
}

/// A record together with its child sessions, as returned by record listings.
#[derive(Debug, Clone, Serialize)]
pub struct RecordWithSessions {
    pub record: AttendanceRecord,
    pub sessions: Vec<AttendanceSessionEntry>,
}

/// One day of presence for one student in one book, as submitted by a caller.
#[derive(Debug, Clone)]
pub struct DailySessions {
    pub attendance_book_id: i64,
    pub student_id: i64,
    pub date: NaiveDate,
    pub sessions: Vec<SessionMark>,
}

#[derive(Debug, Clone, Copy)]
pub struct SessionMark {
    pub session_slot_id: i64,
    pub status: SessionStatus,
}

/// The derived counters of an attendance record. Always computed from a full
/// set of session statuses, never patched incrementally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionTotals {
    pub total_sessions: i64,
    pub present_sessions: i64,
    pub absent_sessions: i64,
}

impl SessionTotals {
    pub fn from_statuses<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = SessionStatus>,
    {
        let mut total = 0;
        let mut present = 0;
        for status in statuses {
            total += 1;
            if status == SessionStatus::Present {
                present += 1;
            }
        }
        Self {
            total_sessions: total,
            present_sessions: present,
            absent_sessions: total - present,
        }
    }
}

/// Outcome of a membership addition: how many rows were inserted and how
/// many of the requested users were already on the roster.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct MembershipDelta {
    pub added: usize,
    pub already_present: usize,
}

/// Combined outcome of adding teachers and students in one transaction.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RosterUpdate {
    pub teachers: MembershipDelta,
    pub students: MembershipDelta,
}
