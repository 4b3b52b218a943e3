#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::attendance::{
        AttendanceEntry, AttendanceSubmission, mark_single, parse_date, record_attendance,
    };
    use crate::db::{count_attendance, get_attendance_for_student};
    use crate::error::AppError;
    use crate::test::test_utils::{TestDbBuilder, create_standard_test_db, date};

    fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2024-03-01").unwrap(), Some(date("2024-03-01")));
        assert_eq!(parse_date("   ").unwrap(), None);
        assert!(matches!(parse_date("01/03/2024"), Err(AppError::Validation(_))));
        assert!(matches!(parse_date("2024-02-30"), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_form_fields_become_entries() {
        let form = fields(&[
            ("date", "2024-03-01"),
            ("note", "ignored blanket note"),
            ("3", "absent"),
            ("1", "present"),
            ("note_3", " sick "),
            ("note_1", ""),
            ("2", "  "),
            ("csrf", "abc"),
            ("0", "present"),
            ("-4", "present"),
        ]);

        let submission = AttendanceSubmission::from_form_fields(&form, date("2030-01-01")).unwrap();

        assert_eq!(submission.date, Some(date("2024-03-01")));
        assert_eq!(
            submission.entries,
            vec![
                AttendanceEntry {
                    student_id: 1,
                    status: "present".to_string(),
                    note: None,
                },
                AttendanceEntry {
                    student_id: 3,
                    status: "absent".to_string(),
                    note: Some("sick".to_string()),
                },
            ]
        );
    }

    #[test]
    fn test_signed_or_padded_keys_are_not_student_ids() {
        let form = fields(&[("+5", "present"), (" 6", "present"), ("7 ", "absent"), ("8", "present")]);

        let submission = AttendanceSubmission::from_form_fields(&form, date("2024-03-01")).unwrap();

        let ids: Vec<i64> = submission.entries.iter().map(|e| e.student_id).collect();
        assert_eq!(ids, vec![8]);
    }

    #[test]
    fn test_form_without_date_uses_today() {
        let today = date("2024-05-20");

        let missing = AttendanceSubmission::from_form_fields(&fields(&[("1", "present")]), today);
        assert_eq!(missing.unwrap().date, Some(today));

        let blank = AttendanceSubmission::from_form_fields(&fields(&[("date", "")]), today);
        assert_eq!(blank.unwrap().date, Some(today));

        let bad = AttendanceSubmission::from_form_fields(&fields(&[("date", "yesterday")]), today);
        assert!(matches!(bad, Err(AppError::Validation(_))));
    }

    #[rocket::async_test]
    async fn test_record_attendance_inserts_every_entry() {
        let test_db = create_standard_test_db().await;
        let ahmed = test_db.student_id("Ahmed");
        let sara = test_db.student_id("Sara");
        let mut conn = test_db.conn().await;
        let before = count_attendance(&mut conn).await.unwrap();

        let submission = AttendanceSubmission {
            date: Some(date("2024-04-10")),
            entries: vec![
                AttendanceEntry {
                    student_id: ahmed,
                    status: "present".to_string(),
                    note: None,
                },
                AttendanceEntry {
                    student_id: sara,
                    status: "absent".to_string(),
                    note: Some("flu".to_string()),
                },
            ],
        };

        let inserted = record_attendance(&mut conn, &submission, date("2030-01-01"))
            .await
            .unwrap();

        assert_eq!(inserted, 2);
        assert_eq!(count_attendance(&mut conn).await.unwrap(), before + 2);

        let history = get_attendance_for_student(&mut conn, sara).await.unwrap();
        assert_eq!(history[0].date, date("2024-04-10"));
        assert_eq!(history[0].note.as_deref(), Some("flu"));
    }

    #[rocket::async_test]
    async fn test_record_attendance_skips_unknown_students() {
        let test_db = create_standard_test_db().await;
        let layla = test_db.student_id("Layla");
        let mut conn = test_db.conn().await;
        let before = count_attendance(&mut conn).await.unwrap();

        let submission = AttendanceSubmission {
            date: Some(date("2024-04-11")),
            entries: vec![
                AttendanceEntry {
                    student_id: 9999,
                    status: "present".to_string(),
                    note: None,
                },
                AttendanceEntry {
                    student_id: layla,
                    status: "present".to_string(),
                    note: None,
                },
            ],
        };

        let inserted = record_attendance(&mut conn, &submission, date("2024-04-11"))
            .await
            .unwrap();

        assert_eq!(inserted, 1);
        assert_eq!(count_attendance(&mut conn).await.unwrap(), before + 1);
    }

    #[rocket::async_test]
    async fn test_invalid_submission_writes_nothing() {
        let test_db = create_standard_test_db().await;
        let ahmed = test_db.student_id("Ahmed");
        let mut conn = test_db.conn().await;
        let before = count_attendance(&mut conn).await.unwrap();

        let submission = AttendanceSubmission {
            date: Some(date("2024-04-12")),
            entries: vec![
                AttendanceEntry {
                    student_id: ahmed,
                    status: "present".to_string(),
                    note: None,
                },
                AttendanceEntry {
                    student_id: ahmed,
                    status: String::new(),
                    note: None,
                },
            ],
        };

        let result = record_attendance(&mut conn, &submission, date("2024-04-12")).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(count_attendance(&mut conn).await.unwrap(), before);
    }

    #[rocket::async_test]
    async fn test_repeated_submissions_accumulate() {
        let test_db = TestDbBuilder::new()
            .student("Hana", None)
            .build()
            .await
            .unwrap();
        let hana = test_db.student_id("Hana");
        let mut conn = test_db.conn().await;
        let today = date("2024-06-01");

        mark_single(&mut conn, hana, "present", today).await.unwrap();
        mark_single(&mut conn, hana, " absent ", today).await.unwrap();

        let history = get_attendance_for_student(&mut conn, hana).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|r| r.date == today));
        assert_eq!(history[0].status, "absent");
    }
}
