#[cfg(test)]
pub mod test_db {
    use std::collections::HashMap;
    use std::sync::Once;

    use chrono::NaiveDate;
    use sqlx::{Pool, Sqlite, sqlite::SqlitePoolOptions};

    use crate::db::{self, ProvisioningSettings};
    use crate::error::AppError;
    use crate::models::{MemberRole, NewAttendanceBook, NewUser, Role};

    static INIT: Once = Once::new();

    #[derive(Default)]
    pub struct TestDbBuilder {
        users: Vec<TestUser>,
        books: Vec<TestBook>,
        slots: Vec<String>,
        enrollments: Vec<TestEnrollment>,
    }

    pub struct TestUser {
        pub username: String,
        pub role: Role,
    }

    pub struct TestBook {
        pub code: String,
        pub created_by_username: Option<String>,
    }

    pub struct TestEnrollment {
        pub book_code: String,
        pub student_username: String,
    }

    impl TestDbBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn student(mut self, username: &str) -> Self {
            self.users.push(TestUser {
                username: username.to_string(),
                role: Role::Student,
            });
            self
        }

        pub fn teacher(mut self, username: &str) -> Self {
            self.users.push(TestUser {
                username: username.to_string(),
                role: Role::Teacher,
            });
            self
        }

        pub fn admin(mut self, username: &str) -> Self {
            self.users.push(TestUser {
                username: username.to_string(),
                role: Role::Admin,
            });
            self
        }

        pub fn book(mut self, code: &str) -> Self {
            self.books.push(TestBook {
                code: code.to_string(),
                created_by_username: None,
            });
            self
        }

        pub fn book_created_by(mut self, code: &str, username: &str) -> Self {
            self.books.push(TestBook {
                code: code.to_string(),
                created_by_username: Some(username.to_string()),
            });
            self
        }

        pub fn slot(mut self, name: &str) -> Self {
            self.slots.push(name.to_string());
            self
        }

        pub fn enroll(mut self, book_code: &str, student_username: &str) -> Self {
            self.enrollments.push(TestEnrollment {
                book_code: book_code.to_string(),
                student_username: student_username.to_string(),
            });
            self
        }

        pub async fn build(self) -> Result<TestDb, AppError> {
            INIT.call_once(|| {
                let _ = env_logger::builder().is_test(true).try_init();
            });

            // One connection only: every pooled connection to sqlite::memory:
            // would otherwise open its own empty database.
            let pool = SqlitePoolOptions::new()
                .max_connections(1)
                .connect("sqlite::memory:")
                .await?;

            sqlx::migrate!("./migrations").run(&pool).await?;

            let settings = ProvisioningSettings::default();

            let mut user_id_map: HashMap<String, i64> = HashMap::new();
            let mut book_id_map: HashMap<String, i64> = HashMap::new();
            let mut slot_id_map: HashMap<String, i64> = HashMap::new();

            for user in &self.users {
                let new_user = NewUser {
                    name: format!("Test {}", user.username),
                    username: user.username.clone(),
                    role: user.role,
                    department_id: None,
                    course_id: None,
                    year_id: None,
                    email: None,
                    phone_no: None,
                };
                let user_id = db::create_user(&pool, &new_user, &settings).await?;
                user_id_map.insert(user.username.clone(), user_id);
            }

            for book in &self.books {
                let created_by = match &book.created_by_username {
                    Some(username) => user_id_map.get(username).copied(),
                    None => self
                        .users
                        .iter()
                        .find(|u| matches!(u.role, Role::Teacher | Role::Admin))
                        .and_then(|u| user_id_map.get(&u.username).copied())
                        .or_else(|| user_id_map.values().next().copied()),
                };

                let Some(created_by) = created_by else {
                    return Err(AppError::Validation(format!(
                        "Test book '{}' has no creator user",
                        book.code
                    )));
                };

                let book_id = db::create_attendance_book(
                    &pool,
                    &NewAttendanceBook {
                        book_name: format!("Book {}", book.code),
                        book_code: book.code.clone(),
                        book_type: "Theory".to_string(),
                        subject_id: None,
                        department_id: None,
                        start_date: NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
                        end_date: NaiveDate::from_ymd_opt(2025, 6, 27).unwrap(),
                        created_by,
                    },
                )
                .await?;
                book_id_map.insert(book.code.clone(), book_id);
            }

            for name in &self.slots {
                let slot_id = db::create_session_slot(&pool, name).await?;
                slot_id_map.insert(name.clone(), slot_id);
            }

            for enrollment in &self.enrollments {
                let book_id = book_id_map[&enrollment.book_code];
                let student_id = user_id_map[&enrollment.student_username];
                db::add_members(&pool, book_id, MemberRole::Student, &[student_id]).await?;
            }

            Ok(TestDb {
                pool,
                user_id_map,
                book_id_map,
                slot_id_map,
            })
        }
    }

    pub struct TestDb {
        pub pool: Pool<Sqlite>,
        pub user_id_map: HashMap<String, i64>,
        pub book_id_map: HashMap<String, i64>,
        pub slot_id_map: HashMap<String, i64>,
    }

    impl TestDb {
        pub fn user_id(&self, username: &str) -> Option<i64> {
            self.user_id_map.get(username).copied()
        }

        pub fn book_id(&self, code: &str) -> Option<i64> {
            self.book_id_map.get(code).copied()
        }

        pub fn slot_id(&self, name: &str) -> Option<i64> {
            self.slot_id_map.get(name).copied()
        }

        pub async fn user_count(&self) -> Result<i64, sqlx::Error> {
            let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
                .fetch_one(&self.pool)
                .await?;
            Ok(row.0)
        }

        pub async fn password_hash(&self, username: &str) -> Result<String, sqlx::Error> {
            let row: (String,) = sqlx::query_as("SELECT password FROM users WHERE username = ?")
                .bind(username)
                .fetch_one(&self.pool)
                .await?;
            Ok(row.0)
        }
    }
}
