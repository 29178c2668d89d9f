#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::db::{
        get_record, get_record_sessions, ingest_daily_sessions, list_records,
        update_single_session,
    };
    use crate::error::AppError;
    use crate::models::{DailySessions, SessionMark, SessionStatus};
    use crate::test::utils::test_db::{TestDb, TestDbBuilder};

    fn day(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
    }

    async fn build_book_with_slots() -> TestDb {
        TestDbBuilder::new()
            .teacher("coach")
            .student("alice")
            .student("bob")
            .book("CS101")
            .enroll("CS101", "alice")
            .enroll("CS101", "bob")
            .slot("Session 1")
            .slot("Session 2")
            .slot("Session 3")
            .build()
            .await
            .expect("Failed to build test database")
    }

    fn entry(
        test_db: &TestDb,
        student: &str,
        date: NaiveDate,
        marks: &[(&str, SessionStatus)],
    ) -> DailySessions {
        DailySessions {
            attendance_book_id: test_db.book_id("CS101").expect("Book not found"),
            student_id: test_db.user_id(student).expect("User not found"),
            date,
            sessions: marks
                .iter()
                .map(|(slot, status)| SessionMark {
                    session_slot_id: test_db.slot_id(slot).expect("Slot not found"),
                    status: *status,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_ingest_creates_record_with_counters() {
        let test_db = build_book_with_slots().await;

        let entries = vec![entry(
            &test_db,
            "alice",
            day(10),
            &[
                ("Session 1", SessionStatus::Present),
                ("Session 2", SessionStatus::Present),
                ("Session 3", SessionStatus::Absent),
            ],
        )];

        let record_ids = ingest_daily_sessions(&test_db.pool, &entries)
            .await
            .expect("Ingestion should succeed");
        assert_eq!(record_ids.len(), 1);

        let record = get_record(&test_db.pool, record_ids[0])
            .await
            .expect("Record should exist");
        assert_eq!(record.total_sessions, 3);
        assert_eq!(record.present_sessions, 2);
        assert_eq!(record.absent_sessions, 1);
        assert_eq!(
            record.total_sessions,
            record.present_sessions + record.absent_sessions
        );

        let sessions = get_record_sessions(&test_db.pool, record_ids[0])
            .await
            .expect("Sessions should exist");
        assert_eq!(sessions.len(), 3);
    }

    #[tokio::test]
    async fn test_ingest_zero_sessions_yields_zeroed_record() {
        let test_db = build_book_with_slots().await;

        let entries = vec![entry(&test_db, "alice", day(11), &[])];

        let record_ids = ingest_daily_sessions(&test_db.pool, &entries)
            .await
            .expect("A zero-session entry is valid");

        let record = get_record(&test_db.pool, record_ids[0])
            .await
            .expect("Record should exist");
        assert_eq!(record.total_sessions, 0);
        assert_eq!(record.present_sessions, 0);
        assert_eq!(record.absent_sessions, 0);

        let sessions = get_record_sessions(&test_db.pool, record_ids[0])
            .await
            .expect("Session query should succeed");
        assert!(sessions.is_empty());
    }

    #[tokio::test]
    async fn test_ingest_duplicate_slot_last_value_wins() {
        let test_db = build_book_with_slots().await;

        let entries = vec![entry(
            &test_db,
            "alice",
            day(12),
            &[
                ("Session 1", SessionStatus::Present),
                ("Session 1", SessionStatus::Absent),
            ],
        )];

        let record_ids = ingest_daily_sessions(&test_db.pool, &entries)
            .await
            .expect("Ingestion should succeed");

        let record = get_record(&test_db.pool, record_ids[0])
            .await
            .expect("Record should exist");
        assert_eq!(record.total_sessions, 1);
        assert_eq!(record.absent_sessions, 1);

        let sessions = get_record_sessions(&test_db.pool, record_ids[0])
            .await
            .expect("Sessions should exist");
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].status, SessionStatus::Absent);
    }

    #[tokio::test]
    async fn test_reingest_same_day_overwrites() {
        let test_db = build_book_with_slots().await;

        let first = vec![entry(
            &test_db,
            "alice",
            day(13),
            &[
                ("Session 1", SessionStatus::Present),
                ("Session 2", SessionStatus::Absent),
            ],
        )];
        let first_ids = ingest_daily_sessions(&test_db.pool, &first)
            .await
            .expect("First ingestion should succeed");

        let second = vec![entry(
            &test_db,
            "alice",
            day(13),
            &[
                ("Session 1", SessionStatus::Present),
                ("Session 2", SessionStatus::Present),
            ],
        )];
        let second_ids = ingest_daily_sessions(&test_db.pool, &second)
            .await
            .expect("Re-ingestion should succeed");

        assert_eq!(
            first_ids, second_ids,
            "Re-submitting a day updates the same record"
        );

        let record = get_record(&test_db.pool, second_ids[0])
            .await
            .expect("Record should exist");
        assert_eq!(record.total_sessions, 2);
        assert_eq!(record.present_sessions, 2);
        assert_eq!(record.absent_sessions, 0);

        let sessions = get_record_sessions(&test_db.pool, second_ids[0])
            .await
            .expect("Sessions should exist");
        assert_eq!(sessions.len(), 2, "Re-submission must not duplicate slots");
        assert!(
            sessions
                .iter()
                .all(|s| s.status == SessionStatus::Present)
        );
    }

    #[tokio::test]
    async fn test_ingest_batch_is_atomic() {
        let test_db = build_book_with_slots().await;

        let mut entries = vec![entry(
            &test_db,
            "alice",
            day(14),
            &[("Session 1", SessionStatus::Present)],
        )];
        let mut bad = entry(&test_db, "bob", day(14), &[]);
        bad.attendance_book_id = 9999;
        entries.push(bad);

        let result = ingest_daily_sessions(&test_db.pool, &entries).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));

        let book_id = test_db.book_id("CS101").expect("Book not found");
        let records = list_records(&test_db.pool, book_id, None)
            .await
            .expect("Listing should succeed");
        assert!(
            records.is_empty(),
            "Nothing from the batch may be persisted"
        );
    }

    #[tokio::test]
    async fn test_update_single_session_recomputes_from_scratch() {
        let test_db = build_book_with_slots().await;

        let entries = vec![entry(
            &test_db,
            "alice",
            day(17),
            &[
                ("Session 1", SessionStatus::Present),
                ("Session 2", SessionStatus::Present),
                ("Session 3", SessionStatus::Absent),
            ],
        )];
        let record_ids = ingest_daily_sessions(&test_db.pool, &entries)
            .await
            .expect("Ingestion should succeed");

        let slot_3 = test_db.slot_id("Session 3").expect("Slot not found");
        let sessions = get_record_sessions(&test_db.pool, record_ids[0])
            .await
            .expect("Sessions should exist");
        let absent_session = sessions
            .iter()
            .find(|s| s.session_slot_id == slot_3)
            .expect("Session for slot 3 should exist");

        let updated = update_single_session(
            &test_db.pool,
            absent_session.id,
            SessionStatus::Present,
        )
        .await
        .expect("Update should succeed");

        assert_eq!(updated.total_sessions, 3);
        assert_eq!(updated.present_sessions, 3);
        assert_eq!(updated.absent_sessions, 0);

        // Stored state agrees with the returned snapshot.
        let stored = get_record(&test_db.pool, record_ids[0])
            .await
            .expect("Record should exist");
        assert_eq!(stored.present_sessions, 3);
        assert_eq!(stored.absent_sessions, 0);
    }

    #[tokio::test]
    async fn test_update_missing_session() {
        let test_db = build_book_with_slots().await;

        let result = update_single_session(&test_db.pool, 9999, SessionStatus::Present).await;

        match result {
            Err(AppError::NotFound(msg)) => {
                assert!(msg.contains("9999"), "Message should name the session")
            }
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_list_records_orders_and_filters() {
        let test_db = build_book_with_slots().await;

        let entries = vec![
            entry(
                &test_db,
                "bob",
                day(20),
                &[("Session 1", SessionStatus::Absent)],
            ),
            entry(
                &test_db,
                "alice",
                day(19),
                &[("Session 1", SessionStatus::Present)],
            ),
        ];
        ingest_daily_sessions(&test_db.pool, &entries)
            .await
            .expect("Ingestion should succeed");

        let book_id = test_db.book_id("CS101").expect("Book not found");

        let all = list_records(&test_db.pool, book_id, None)
            .await
            .expect("Listing should succeed");
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].record.date, day(19), "Records are date-ordered");
        assert_eq!(all[1].record.date, day(20));
        assert_eq!(all[0].sessions.len(), 1, "Children are embedded");

        let filtered = list_records(&test_db.pool, book_id, Some(day(20)))
            .await
            .expect("Filtered listing should succeed");
        assert_eq!(filtered.len(), 1);
        assert_eq!(
            filtered[0].record.student_id,
            test_db.user_id("bob").expect("User not found")
        );
        assert_eq!(filtered[0].sessions[0].status, SessionStatus::Absent);
    }
}
