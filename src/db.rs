use std::collections::HashSet;

use chrono::NaiveDate;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{info, instrument};

use crate::error::AppError;
use crate::models::{
    AttendanceBook, AttendanceRecord, AttendanceSessionEntry, BookStatus, DailySessions,
    DbAttendanceBook, DbAttendanceRecord, DbAttendanceSession, DbUser, MemberRole,
    MembershipDelta, NewAttendanceBook, NewUser, RecordWithSessions, RosterUpdate, SessionMark,
    SessionStatus, SessionTotals, User, UserStatus,
};

/// Provisioning defaults: the initial credential applied to every newly
/// created identity and the insert chunk size for bulk uploads. Passed in
/// explicitly by the caller rather than read from process-wide state.
#[derive(Clone)]
pub struct ProvisioningSettings {
    pub default_password: String,
    pub chunk_size: usize,
}

impl Default for ProvisioningSettings {
    fn default() -> Self {
        Self {
            default_password: "Welcome@123".to_string(),
            chunk_size: 1000,
        }
    }
}

async fn book_exists(
    executor: impl sqlx::Executor<'_, Database = Sqlite>,
    book_id: i64,
) -> Result<bool, AppError> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM attendance_books WHERE id = ?")
        .bind(book_id)
        .fetch_optional(executor)
        .await?;
    Ok(row.is_some())
}

async fn user_exists(
    executor: impl sqlx::Executor<'_, Database = Sqlite>,
    user_id: i64,
) -> Result<bool, AppError> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(executor)
        .await?;
    Ok(row.is_some())
}

// ---------------------------------------------------------------------------
// Identity store
// ---------------------------------------------------------------------------

#[instrument(skip_all, fields(username = %new_user.username, role = %new_user.role))]
pub async fn create_user(
    pool: &SqlitePool,
    new_user: &NewUser,
    settings: &ProvisioningSettings,
) -> Result<i64, AppError> {
    info!("Creating new user");

    let existing: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE username = ?")
        .bind(new_user.username.as_str())
        .fetch_optional(pool)
        .await?;

    if existing.is_some() {
        return Err(AppError::Validation(format!(
            "Username '{}' already exists",
            new_user.username
        )));
    }

    let hashed_password = bcrypt::hash(&settings.default_password, bcrypt::DEFAULT_COST)?;

    let res = sqlx::query(
        "INSERT INTO users (name, username, password, role, status, department_id, course_id, year_id, email, phone_no)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(new_user.name.as_str())
    .bind(new_user.username.as_str())
    .bind(hashed_password.as_str())
    .bind(new_user.role.as_str())
    .bind(UserStatus::Active.as_str())
    .bind(new_user.department_id)
    .bind(new_user.course_id)
    .bind(new_user.year_id)
    .bind(new_user.email.as_deref())
    .bind(new_user.phone_no.as_deref())
    .execute(pool)
    .await?;

    Ok(res.last_insert_rowid())
}

#[instrument(skip(pool))]
pub async fn get_user(pool: &SqlitePool, id: i64) -> Result<User, AppError> {
    info!("Fetching user by ID");
    let row = sqlx::query_as::<_, DbUser>(
        "SELECT id, name, username, role, status, department_id, course_id, year_id, email, phone_no
         FROM users WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(user) => Ok(User::from(user)),
        _ => Err(AppError::NotFound(format!(
            "User with id {} not found",
            id
        ))),
    }
}

/// Soft status flip; users are never hard-deleted.
#[instrument(skip(pool))]
pub async fn set_user_status(
    pool: &SqlitePool,
    user_id: i64,
    status: UserStatus,
) -> Result<(), AppError> {
    info!("Updating user status");
    let result = sqlx::query(
        "UPDATE users SET status = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
    )
    .bind(status.as_str())
    .bind(user_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "User with id {} not found",
            user_id
        )));
    }

    Ok(())
}

#[instrument(skip_all, fields(user_id))]
pub async fn reset_user_password(
    pool: &SqlitePool,
    user_id: i64,
    new_password: &str,
) -> Result<(), AppError> {
    info!("Resetting user password");
    let hashed_password = bcrypt::hash(new_password, bcrypt::DEFAULT_COST)?;

    let result = sqlx::query(
        "UPDATE users SET password = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
    )
    .bind(hashed_password.as_str())
    .bind(user_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "User with id {} not found",
            user_id
        )));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Attendance books
// ---------------------------------------------------------------------------

#[instrument(skip_all, fields(book_code = %book.book_code))]
pub async fn create_attendance_book(
    pool: &SqlitePool,
    book: &NewAttendanceBook,
) -> Result<i64, AppError> {
    info!("Creating attendance book");

    if !user_exists(pool, book.created_by).await? {
        return Err(AppError::Validation(
            "Invalid creator (User) ID".to_string(),
        ));
    }

    let res = sqlx::query(
        "INSERT INTO attendance_books (book_name, book_code, book_type, subject_id, department_id, status, start_date, end_date, created_by)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(book.book_name.as_str())
    .bind(book.book_code.as_str())
    .bind(book.book_type.as_str())
    .bind(book.subject_id)
    .bind(book.department_id)
    .bind(BookStatus::Active.as_str())
    .bind(book.start_date)
    .bind(book.end_date)
    .bind(book.created_by)
    .execute(pool)
    .await?;

    Ok(res.last_insert_rowid())
}

#[instrument(skip(pool))]
pub async fn get_attendance_book(pool: &SqlitePool, id: i64) -> Result<AttendanceBook, AppError> {
    info!("Fetching attendance book");
    let row = sqlx::query_as::<_, DbAttendanceBook>(
        "SELECT id, book_name, book_code, book_type, subject_id, department_id, status, start_date, end_date, created_by
         FROM attendance_books WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(book) => Ok(AttendanceBook::from(book)),
        _ => Err(AppError::NotFound(format!(
            "Attendance book with id {} not found",
            id
        ))),
    }
}

/// Lifecycle transitions: Activate, Delete, Complete, Close. Books are never
/// physically removed.
#[instrument(skip(pool))]
pub async fn set_book_status(
    pool: &SqlitePool,
    book_id: i64,
    status: BookStatus,
) -> Result<(), AppError> {
    info!("Updating attendance book status");
    let result = sqlx::query(
        "UPDATE attendance_books SET status = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
    )
    .bind(status.as_str())
    .bind(book_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "Attendance book with id {} not found",
            book_id
        )));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Roster membership
// ---------------------------------------------------------------------------

/// Adds users to one side of a book's roster. Idempotent: ids already on the
/// roster are skipped, ids that resolve to no user are dropped. All checks
/// and inserts share one transaction; a dropped transaction rolls back, so
/// every early return leaves the store untouched.
#[instrument(skip(pool))]
pub async fn add_members(
    pool: &SqlitePool,
    book_id: i64,
    role: MemberRole,
    user_ids: &[i64],
) -> Result<MembershipDelta, AppError> {
    info!("Adding members to attendance book");

    let mut tx = pool.begin().await?;

    if !book_exists(&mut *tx, book_id).await? {
        return Err(AppError::NotFound(format!(
            "Attendance book with id {} not found",
            book_id
        )));
    }

    let delta = add_members_in_tx(&mut tx, book_id, role, user_ids).await?;

    tx.commit().await?;
    Ok(delta)
}

/// Adds teachers and students in ONE transaction: either both role additions
/// are durably applied or neither is. This differs from two `add_members`
/// calls, which would commit independently.
#[instrument(skip(pool))]
pub async fn add_users(
    pool: &SqlitePool,
    book_id: i64,
    teacher_ids: &[i64],
    student_ids: &[i64],
) -> Result<RosterUpdate, AppError> {
    info!("Adding teachers and students to attendance book");

    let mut tx = pool.begin().await?;

    if !book_exists(&mut *tx, book_id).await? {
        return Err(AppError::NotFound(format!(
            "Attendance book with id {} not found",
            book_id
        )));
    }

    let teachers = add_members_in_tx(&mut tx, book_id, MemberRole::Teacher, teacher_ids).await?;
    let students = add_members_in_tx(&mut tx, book_id, MemberRole::Student, student_ids).await?;

    tx.commit().await?;
    Ok(RosterUpdate { teachers, students })
}

/// The existence-check-then-insert body shared by the roster operations.
/// Re-executed per transaction, never cached, so concurrent additions for
/// the same book converge on one row per pair.
async fn add_members_in_tx(
    tx: &mut Transaction<'_, Sqlite>,
    book_id: i64,
    role: MemberRole,
    user_ids: &[i64],
) -> Result<MembershipDelta, AppError> {
    if user_ids.is_empty() {
        return Ok(MembershipDelta::default());
    }

    let placeholders = vec!["?"; user_ids.len()].join(", ");
    let sql = format!(
        "SELECT {column} FROM {table} WHERE attendance_book_id = ? AND {column} IN ({placeholders})",
        table = role.table(),
        column = role.column(),
    );
    let mut query = sqlx::query_as::<_, (i64,)>(&sql).bind(book_id);
    for id in user_ids {
        query = query.bind(*id);
    }
    let existing: HashSet<i64> = query
        .fetch_all(&mut **tx)
        .await?
        .into_iter()
        .map(|(id,)| id)
        .collect();

    let new_ids: Vec<i64> = user_ids
        .iter()
        .copied()
        .filter(|id| !existing.contains(id))
        .collect();

    if new_ids.is_empty() {
        return Ok(MembershipDelta {
            added: 0,
            already_present: existing.len(),
        });
    }

    // Ids that resolve to no user are dropped, not an error.
    let placeholders = vec!["?"; new_ids.len()].join(", ");
    let sql = format!("SELECT id FROM users WHERE id IN ({placeholders})");
    let mut query = sqlx::query_as::<_, (i64,)>(&sql);
    for id in &new_ids {
        query = query.bind(*id);
    }
    let resolved: Vec<i64> = query
        .fetch_all(&mut **tx)
        .await?
        .into_iter()
        .map(|(id,)| id)
        .collect();

    let sql = format!(
        "INSERT INTO {} (attendance_book_id, {}) VALUES (?, ?)",
        role.table(),
        role.column(),
    );
    for user_id in &resolved {
        sqlx::query(&sql)
            .bind(book_id)
            .bind(*user_id)
            .execute(&mut **tx)
            .await?;
    }

    Ok(MembershipDelta {
        added: resolved.len(),
        already_present: existing.len(),
    })
}

/// Removing an absent membership reports NotFound; removal is deliberately
/// not idempotent, unlike addition.
#[instrument(skip(pool))]
pub async fn remove_member(
    pool: &SqlitePool,
    book_id: i64,
    role: MemberRole,
    user_id: i64,
) -> Result<(), AppError> {
    info!("Removing member from attendance book");

    let mut tx = pool.begin().await?;

    if !book_exists(&mut *tx, book_id).await? {
        return Err(AppError::NotFound(format!(
            "Attendance book with id {} not found",
            book_id
        )));
    }
    if !user_exists(&mut *tx, user_id).await? {
        return Err(AppError::NotFound(format!(
            "{} with id {} not found",
            role.label(),
            user_id
        )));
    }

    let sql = format!(
        "DELETE FROM {} WHERE attendance_book_id = ? AND {} = ?",
        role.table(),
        role.column(),
    );
    let result = sqlx::query(&sql)
        .bind(book_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "{} with id {} is not a member of attendance book {}",
            role.label(),
            user_id,
            book_id
        )));
    }

    tx.commit().await?;
    Ok(())
}

#[instrument(skip(pool))]
pub async fn get_members(
    pool: &SqlitePool,
    book_id: i64,
    role: MemberRole,
) -> Result<Vec<i64>, AppError> {
    let sql = format!(
        "SELECT {column} FROM {table} WHERE attendance_book_id = ? ORDER BY {column}",
        table = role.table(),
        column = role.column(),
    );
    let rows: Vec<(i64,)> = sqlx::query_as(&sql).bind(book_id).fetch_all(pool).await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

// ---------------------------------------------------------------------------
// Session aggregation
// ---------------------------------------------------------------------------

/// Ingests a batch of per-day session submissions in one transaction. Each
/// entry upserts its `(book, student, date)` record with counters computed
/// from the submitted sessions (last write wins for a re-submitted day) and
/// upserts one session row per slot. A missing book rejects the whole batch.
#[instrument(skip_all, fields(entries = entries.len()))]
pub async fn ingest_daily_sessions(
    pool: &SqlitePool,
    entries: &[DailySessions],
) -> Result<Vec<i64>, AppError> {
    info!("Ingesting daily attendance sessions");

    let mut tx = pool.begin().await?;
    let mut record_ids = Vec::with_capacity(entries.len());

    for entry in entries {
        if !book_exists(&mut *tx, entry.attendance_book_id).await? {
            return Err(AppError::NotFound(format!(
                "Attendance book with id {} not found",
                entry.attendance_book_id
            )));
        }

        // Duplicate slots within one submitted day collapse to the last value.
        let mut marks: Vec<SessionMark> = Vec::with_capacity(entry.sessions.len());
        for mark in &entry.sessions {
            match marks
                .iter_mut()
                .find(|m| m.session_slot_id == mark.session_slot_id)
            {
                Some(seen) => seen.status = mark.status,
                None => marks.push(*mark),
            }
        }

        let totals = SessionTotals::from_statuses(marks.iter().map(|m| m.status));
        let record_id = upsert_record(&mut tx, entry, totals).await?;

        for mark in &marks {
            upsert_session(&mut tx, record_id, mark).await?;
        }

        record_ids.push(record_id);
    }

    tx.commit().await?;
    Ok(record_ids)
}

async fn upsert_record(
    tx: &mut Transaction<'_, Sqlite>,
    entry: &DailySessions,
    totals: SessionTotals,
) -> Result<i64, AppError> {
    let existing: Option<(i64,)> = sqlx::query_as(
        "SELECT id FROM attendance_records WHERE attendance_book_id = ? AND student_id = ? AND date = ?",
    )
    .bind(entry.attendance_book_id)
    .bind(entry.student_id)
    .bind(entry.date)
    .fetch_optional(&mut **tx)
    .await?;

    match existing {
        Some((id,)) => {
            sqlx::query(
                "UPDATE attendance_records
                 SET total_sessions = ?, present_sessions = ?, absent_sessions = ?, updated_at = CURRENT_TIMESTAMP
                 WHERE id = ?",
            )
            .bind(totals.total_sessions)
            .bind(totals.present_sessions)
            .bind(totals.absent_sessions)
            .bind(id)
            .execute(&mut **tx)
            .await?;
            Ok(id)
        }
        None => {
            let res = sqlx::query(
                "INSERT INTO attendance_records (attendance_book_id, student_id, date, total_sessions, present_sessions, absent_sessions)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(entry.attendance_book_id)
            .bind(entry.student_id)
            .bind(entry.date)
            .bind(totals.total_sessions)
            .bind(totals.present_sessions)
            .bind(totals.absent_sessions)
            .execute(&mut **tx)
            .await?;
            Ok(res.last_insert_rowid())
        }
    }
}

async fn upsert_session(
    tx: &mut Transaction<'_, Sqlite>,
    record_id: i64,
    mark: &SessionMark,
) -> Result<(), AppError> {
    let existing: Option<(i64,)> = sqlx::query_as(
        "SELECT id FROM attendance_sessions WHERE attendance_record_id = ? AND session_slot_id = ?",
    )
    .bind(record_id)
    .bind(mark.session_slot_id)
    .fetch_optional(&mut **tx)
    .await?;

    match existing {
        Some((session_id,)) => {
            sqlx::query(
                "UPDATE attendance_sessions SET status = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            )
            .bind(mark.status.as_str())
            .bind(session_id)
            .execute(&mut **tx)
            .await?;
        }
        None => {
            sqlx::query(
                "INSERT INTO attendance_sessions (attendance_record_id, session_slot_id, status)
                 VALUES (?, ?, ?)",
            )
            .bind(record_id)
            .bind(mark.session_slot_id)
            .bind(mark.status.as_str())
            .execute(&mut **tx)
            .await?;
        }
    }

    Ok(())
}

/// Flips one session's status and recomputes the parent record's counters
/// from the full sibling set inside the same transaction. The counters are
/// never patched incrementally; recomputation is what keeps the aggregate
/// honest after arbitrary edit sequences.
#[instrument(skip(pool))]
pub async fn update_single_session(
    pool: &SqlitePool,
    session_id: i64,
    status: SessionStatus,
) -> Result<AttendanceRecord, AppError> {
    info!("Updating attendance session");

    let mut tx = pool.begin().await?;

    let session = sqlx::query_as::<_, DbAttendanceSession>(
        "SELECT id, attendance_record_id, session_slot_id, status FROM attendance_sessions WHERE id = ?",
    )
    .bind(session_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(session) = session else {
        return Err(AppError::NotFound(format!(
            "Attendance session with id {} not found",
            session_id
        )));
    };
    let record_id = session.attendance_record_id.unwrap_or_default();

    sqlx::query(
        "UPDATE attendance_sessions SET status = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
    )
    .bind(status.as_str())
    .bind(session_id)
    .execute(&mut *tx)
    .await?;

    let siblings = sqlx::query_as::<_, DbAttendanceSession>(
        "SELECT id, attendance_record_id, session_slot_id, status FROM attendance_sessions WHERE attendance_record_id = ?",
    )
    .bind(record_id)
    .fetch_all(&mut *tx)
    .await?;

    let totals = SessionTotals::from_statuses(
        siblings
            .iter()
            .map(|s| AttendanceSessionEntry::from(s.clone()).status),
    );

    sqlx::query(
        "UPDATE attendance_records
         SET total_sessions = ?, present_sessions = ?, absent_sessions = ?, updated_at = CURRENT_TIMESTAMP
         WHERE id = ?",
    )
    .bind(totals.total_sessions)
    .bind(totals.present_sessions)
    .bind(totals.absent_sessions)
    .bind(record_id)
    .execute(&mut *tx)
    .await?;

    let record = sqlx::query_as::<_, DbAttendanceRecord>(
        "SELECT * FROM attendance_records WHERE id = ?",
    )
    .bind(record_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(record) = record else {
        return Err(AppError::NotFound(format!(
            "Attendance record with id {} not found",
            record_id
        )));
    };

    tx.commit().await?;
    Ok(AttendanceRecord::from(record))
}

#[instrument(skip(pool))]
pub async fn get_record(pool: &SqlitePool, record_id: i64) -> Result<AttendanceRecord, AppError> {
    let record = sqlx::query_as::<_, DbAttendanceRecord>(
        "SELECT * FROM attendance_records WHERE id = ?",
    )
    .bind(record_id)
    .fetch_optional(pool)
    .await?;

    match record {
        Some(record) => Ok(AttendanceRecord::from(record)),
        _ => Err(AppError::NotFound(format!(
            "Attendance record with id {} not found",
            record_id
        ))),
    }
}

#[instrument(skip(pool))]
pub async fn get_record_sessions(
    pool: &SqlitePool,
    record_id: i64,
) -> Result<Vec<AttendanceSessionEntry>, AppError> {
    let rows = sqlx::query_as::<_, DbAttendanceSession>(
        "SELECT id, attendance_record_id, session_slot_id, status
         FROM attendance_sessions WHERE attendance_record_id = ? ORDER BY session_slot_id",
    )
    .bind(record_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(AttendanceSessionEntry::from).collect())
}

/// Read-only listing of a book's records with their child sessions embedded,
/// optionally narrowed to one day.
#[instrument(skip(pool))]
pub async fn list_records(
    pool: &SqlitePool,
    book_id: i64,
    date: Option<NaiveDate>,
) -> Result<Vec<RecordWithSessions>, AppError> {
    info!("Listing attendance records");

    let rows = match date {
        Some(date) => {
            sqlx::query_as::<_, DbAttendanceRecord>(
                "SELECT * FROM attendance_records
                 WHERE attendance_book_id = ? AND date = ?
                 ORDER BY date, student_id",
            )
            .bind(book_id)
            .bind(date)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, DbAttendanceRecord>(
                "SELECT * FROM attendance_records
                 WHERE attendance_book_id = ?
                 ORDER BY date, student_id",
            )
            .bind(book_id)
            .fetch_all(pool)
            .await?
        }
    };

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let record = AttendanceRecord::from(row);
        let sessions = get_record_sessions(pool, record.id).await?;
        records.push(RecordWithSessions { record, sessions });
    }

    Ok(records)
}

// ---------------------------------------------------------------------------
// Session slot catalog
// ---------------------------------------------------------------------------

#[instrument(skip(pool))]
pub async fn create_session_slot(pool: &SqlitePool, name: &str) -> Result<i64, AppError> {
    info!("Creating session slot");
    let res = sqlx::query("INSERT INTO session_slots (name) VALUES (?)")
        .bind(name)
        .execute(pool)
        .await?;
    Ok(res.last_insert_rowid())
}

// ---------------------------------------------------------------------------
// Bulk identity provisioning
// ---------------------------------------------------------------------------

/// Bulk-creates identities. Username duplicates within the batch reject the
/// whole batch; usernames already in the store are silently filtered. The
/// initial credential is hashed once and shared by every inserted row, and
/// insertion runs in fixed-size chunks inside one transaction.
#[instrument(skip_all, fields(batch = users.len()))]
pub async fn bulk_create_users(
    pool: &SqlitePool,
    users: &[NewUser],
    settings: &ProvisioningSettings,
) -> Result<u64, AppError> {
    info!("Bulk creating users");

    let mut seen: HashSet<&str> = HashSet::new();
    let mut duplicates: Vec<&str> = Vec::new();
    for user in users {
        if !seen.insert(user.username.as_str()) && !duplicates.contains(&user.username.as_str()) {
            duplicates.push(user.username.as_str());
        }
    }
    if !duplicates.is_empty() {
        return Err(AppError::Validation(format!(
            "Duplicate usernames found in the provided data: {}",
            duplicates.join(", ")
        )));
    }

    let usernames: Vec<&str> = users.iter().map(|u| u.username.as_str()).collect();
    let existing = find_existing_usernames(pool, &usernames).await?;

    let new_users: Vec<&NewUser> = users
        .iter()
        .filter(|u| !existing.contains(&u.username))
        .collect();

    if new_users.is_empty() {
        return Ok(0);
    }

    // Hash the shared initial credential once for the whole batch.
    let hashed_password = bcrypt::hash(&settings.default_password, bcrypt::DEFAULT_COST)?;

    let mut tx = pool.begin().await?;
    for chunk in new_users.chunks(settings.chunk_size.max(1)) {
        insert_user_chunk(&mut tx, chunk, &hashed_password).await?;
    }
    tx.commit().await?;

    info!("{} users inserted successfully", new_users.len());
    Ok(new_users.len() as u64)
}

async fn find_existing_usernames(
    pool: &SqlitePool,
    usernames: &[&str],
) -> Result<HashSet<String>, AppError> {
    if usernames.is_empty() {
        return Ok(HashSet::new());
    }

    let placeholders = vec!["?"; usernames.len()].join(", ");
    let sql = format!("SELECT username FROM users WHERE username IN ({placeholders})");
    let mut query = sqlx::query_as::<_, (String,)>(&sql);
    for name in usernames {
        query = query.bind(*name);
    }

    Ok(query
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(|(name,)| name)
        .collect())
}

async fn insert_user_chunk(
    tx: &mut Transaction<'_, Sqlite>,
    chunk: &[&NewUser],
    hashed_password: &str,
) -> Result<(), AppError> {
    let mut sql = String::from(
        "INSERT INTO users (name, username, password, role, status, department_id, course_id, year_id, email, phone_no) VALUES ",
    );
    sql.push_str(&vec!["(?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"; chunk.len()].join(", "));

    let mut query = sqlx::query(&sql);
    for user in chunk {
        query = query
            .bind(user.name.as_str())
            .bind(user.username.as_str())
            .bind(hashed_password)
            .bind(user.role.as_str())
            .bind(UserStatus::Active.as_str())
            .bind(user.department_id)
            .bind(user.course_id)
            .bind(user.year_id)
            .bind(user.email.as_deref())
            .bind(user.phone_no.as_deref());
    }
    query.execute(&mut **tx).await?;

    Ok(())
}
