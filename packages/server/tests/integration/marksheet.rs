use std::sync::Arc;

use serde_json::json;

use crate::common::{FIXED_REMARK, FailingRemarks, SESSION, TestApp, routes};

fn first_score_id(res: &crate::common::TestResponse) -> i32 {
    res.body["saved"][0]["id"]
        .as_i64()
        .expect("saved score should have an id") as i32
}

mod derivation {
    use super::*;

    #[tokio::test]
    async fn partial_scores_produce_no_marksheet() {
        let app = TestApp::spawn().await;
        let school = app.school(&["MATH", "ENG"]).await;
        let math = app
            .create_exam(&school.admin_token, school.class_id, school.subject_ids[0], "Final", 100.0)
            .await;

        let res = app
            .submit_scores(&school.admin_token, math, &[(school.student_id, 60.0)])
            .await;

        assert_eq!(res.status, 200, "Submit failed: {}", res.text);
        assert_eq!(res.body["marksheets_generated"], json!([]));
        let sheets = app.marksheets(&school.admin_token).await;
        assert_eq!(sheets.body["data"], json!([]));
    }

    #[tokio::test]
    async fn marksheet_materializes_when_last_subject_is_scored() {
        let app = TestApp::spawn().await;
        let school = app.school(&["MATH", "ENG"]).await;
        let token = &school.admin_token;
        let math = app
            .create_exam(token, school.class_id, school.subject_ids[0], "Final", 100.0)
            .await;
        let eng = app
            .create_exam(token, school.class_id, school.subject_ids[1], "Final", 50.0)
            .await;

        app.submit_scores(token, math, &[(school.student_id, 60.0)])
            .await;
        let res = app
            .submit_scores(token, eng, &[(school.student_id, 45.0)])
            .await;

        assert_eq!(res.status, 200, "Submit failed: {}", res.text);
        assert_eq!(res.body["marksheets_generated"], json!([school.student_id]));

        let sheets = app.marksheets(token).await;
        let data = sheets.body["data"].as_array().expect("data should be an array");
        assert_eq!(data.len(), 1);
        let sheet = &data[0];
        assert_eq!(sheet["student_id"], school.student_id);
        assert_eq!(sheet["campus_id"], school.campus_id);
        assert_eq!(sheet["term"], "FirstTerm");
        assert_eq!(sheet["academic_session"], SESSION);
        assert_eq!(sheet["grand_obtained"], 105.0);
        assert_eq!(sheet["grand_total"], 150.0);
        assert_eq!(sheet["overall_percentage"], 70.0);
        assert_eq!(sheet["overall_grade"], "B");
        assert_eq!(sheet["final_remarks"], FIXED_REMARK);
        assert!(sheet["rank"].is_null());

        let subjects = sheet["subjects"].as_array().expect("subjects should be an array");
        assert_eq!(subjects.len(), 2);
        assert_eq!(subjects[0]["subject_id"], school.subject_ids[0]);
        assert_eq!(subjects[0]["percentage"], 60.0);
        assert_eq!(subjects[0]["grade"], "C");
        assert_eq!(subjects[1]["subject_id"], school.subject_ids[1]);
        assert_eq!(subjects[1]["percentage"], 90.0);
        assert_eq!(subjects[1]["grade"], "A+");
    }

    #[tokio::test]
    async fn exam_types_of_a_subject_are_folded_together() {
        let app = TestApp::spawn().await;
        let school = app.school(&["MATH"]).await;
        let token = &school.admin_token;
        let midterm = app
            .create_exam(token, school.class_id, school.subject_ids[0], "Midterm", 100.0)
            .await;
        let quiz = app
            .create_exam(token, school.class_id, school.subject_ids[0], "Quiz", 20.0)
            .await;

        app.submit_scores(token, midterm, &[(school.student_id, 70.0)])
            .await;
        let first = app.marksheets(token).await;
        let first_id = first.body["data"][0]["id"].clone();
        assert_eq!(first.body["data"][0]["overall_percentage"], 70.0);

        app.submit_scores(token, quiz, &[(school.student_id, 18.0)])
            .await;

        let sheets = app.marksheets(token).await;
        let data = sheets.body["data"].as_array().expect("data should be an array");
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["id"], first_id);
        assert_eq!(data[0]["grand_obtained"], 88.0);
        assert_eq!(data[0]["grand_total"], 120.0);
        assert_eq!(data[0]["overall_percentage"], 73.33);
        assert_eq!(data[0]["overall_grade"], "B");
    }

    #[tokio::test]
    async fn resubmitting_scores_updates_the_same_marksheet() {
        let app = TestApp::spawn().await;
        let school = app.school(&["MATH"]).await;
        let token = &school.admin_token;
        let exam = app
            .create_exam(token, school.class_id, school.subject_ids[0], "Final", 100.0)
            .await;

        let first = app
            .submit_scores(token, exam, &[(school.student_id, 40.0)])
            .await;
        let second = app
            .submit_scores(token, exam, &[(school.student_id, 95.0)])
            .await;

        assert_eq!(first_score_id(&first), first_score_id(&second));
        let sheets = app.marksheets(token).await;
        let data = sheets.body["data"].as_array().expect("data should be an array");
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["overall_percentage"], 95.0);
        assert_eq!(data[0]["overall_grade"], "A+");
    }

    #[tokio::test]
    async fn updating_a_single_score_reports_the_regenerated_marksheet() {
        let app = TestApp::spawn().await;
        let school = app.school(&["MATH"]).await;
        let token = &school.admin_token;
        let exam = app
            .create_exam(token, school.class_id, school.subject_ids[0], "Final", 100.0)
            .await;
        let submitted = app
            .submit_scores(token, exam, &[(school.student_id, 40.0)])
            .await;
        let score_id = first_score_id(&submitted);

        let res = app
            .patch_with_token(&routes::score(score_id), &json!({"marks_obtained": 82.0}), token)
            .await;

        assert_eq!(res.status, 200, "Update failed: {}", res.text);
        assert_eq!(res.body["score"]["marks_obtained"], 82.0);
        let marksheet_id = res.body["marksheet_id"]
            .as_i64()
            .expect("marksheet_id should be set") as i32;
        let sheet = app.get_with_token(&routes::marksheet(marksheet_id), token).await;
        assert_eq!(sheet.status, 200);
        assert_eq!(sheet.body["overall_grade"], "A");
    }

    #[tokio::test]
    async fn failed_remark_service_falls_back_to_grade_phrase() {
        let app = TestApp::spawn_with_remarks(Arc::new(FailingRemarks)).await;
        let school = app.school(&["MATH"]).await;
        let token = &school.admin_token;
        let exam = app
            .create_exam(token, school.class_id, school.subject_ids[0], "Final", 100.0)
            .await;

        let res = app
            .submit_scores(token, exam, &[(school.student_id, 75.0)])
            .await;

        assert_eq!(res.status, 200, "Submit failed: {}", res.text);
        let sheets = app.marksheets(token).await;
        assert_eq!(sheets.body["data"][0]["overall_grade"], "B");
        assert_eq!(sheets.body["data"][0]["final_remarks"], "Very Good");
    }
}

mod retraction {
    use super::*;

    #[tokio::test]
    async fn deleting_a_required_score_retracts_the_marksheet() {
        let app = TestApp::spawn().await;
        let school = app.school(&["MATH", "ENG"]).await;
        let token = &school.admin_token;
        let math = app
            .create_exam(token, school.class_id, school.subject_ids[0], "Final", 100.0)
            .await;
        let eng = app
            .create_exam(token, school.class_id, school.subject_ids[1], "Final", 50.0)
            .await;
        app.submit_scores(token, math, &[(school.student_id, 60.0)])
            .await;
        let eng_scores = app
            .submit_scores(token, eng, &[(school.student_id, 45.0)])
            .await;
        assert_eq!(app.marksheets(token).await.body["data"].as_array().map(Vec::len), Some(1));

        let res = app
            .delete_with_token(&routes::score(first_score_id(&eng_scores)), token)
            .await;

        assert_eq!(res.status, 204, "Delete failed: {}", res.text);
        assert_eq!(app.marksheets(token).await.body["data"], json!([]));
    }

    #[tokio::test]
    async fn deleting_one_of_several_exams_scores_rederives_the_marksheet() {
        let app = TestApp::spawn().await;
        let school = app.school(&["MATH"]).await;
        let token = &school.admin_token;
        let midterm = app
            .create_exam(token, school.class_id, school.subject_ids[0], "Midterm", 100.0)
            .await;
        let quiz = app
            .create_exam(token, school.class_id, school.subject_ids[0], "Quiz", 20.0)
            .await;
        app.submit_scores(token, midterm, &[(school.student_id, 70.0)])
            .await;
        let quiz_scores = app
            .submit_scores(token, quiz, &[(school.student_id, 18.0)])
            .await;

        let res = app
            .delete_with_token(&routes::score(first_score_id(&quiz_scores)), token)
            .await;

        assert_eq!(res.status, 204, "Delete failed: {}", res.text);
        let sheets = app.marksheets(token).await;
        assert_eq!(sheets.body["data"][0]["grand_total"], 100.0);
        assert_eq!(sheets.body["data"][0]["overall_percentage"], 70.0);
    }
}

mod exam_changes {
    use super::*;

    #[tokio::test]
    async fn changing_exam_total_rederives_marksheets() {
        let app = TestApp::spawn().await;
        let school = app.school(&["MATH", "ENG"]).await;
        let token = &school.admin_token;
        let math = app
            .create_exam(token, school.class_id, school.subject_ids[0], "Final", 100.0)
            .await;
        let eng = app
            .create_exam(token, school.class_id, school.subject_ids[1], "Final", 50.0)
            .await;
        app.submit_scores(token, math, &[(school.student_id, 60.0)])
            .await;
        app.submit_scores(token, eng, &[(school.student_id, 45.0)])
            .await;

        let res = app
            .patch_with_token(&routes::exam(eng), &json!({"total_marks": 60.0}), token)
            .await;

        assert_eq!(res.status, 200, "Exam update failed: {}", res.text);
        let sheets = app.marksheets(token).await;
        let sheet = &sheets.body["data"][0];
        assert_eq!(sheet["grand_total"], 160.0);
        assert_eq!(sheet["overall_percentage"], 65.63);
        assert_eq!(sheet["overall_grade"], "C");
    }
}

mod recompute {
    use super::*;

    #[tokio::test]
    async fn recompute_is_idempotent() {
        let app = TestApp::spawn().await;
        let school = app.school(&["MATH"]).await;
        let token = &school.admin_token;
        let exam = app
            .create_exam(token, school.class_id, school.subject_ids[0], "Final", 100.0)
            .await;
        app.submit_scores(token, exam, &[(school.student_id, 64.0)])
            .await;
        let body = json!({
            "student_id": school.student_id,
            "class_id": school.class_id,
            "term": "FirstTerm",
            "academic_session": SESSION,
        });

        let first = app
            .post_with_token(routes::MARKSHEETS_RECOMPUTE, &body, token)
            .await;
        let second = app
            .post_with_token(routes::MARKSHEETS_RECOMPUTE, &body, token)
            .await;

        assert_eq!(first.status, 200, "Recompute failed: {}", first.text);
        assert_eq!(first.body["status"], "materialized");
        assert_eq!(second.body["status"], "materialized");
        assert_eq!(first.body["marksheet"]["id"], second.body["marksheet"]["id"]);
        assert_eq!(second.body["marksheet"]["overall_percentage"], 64.0);
        let sheets = app.marksheets(token).await;
        assert_eq!(sheets.body["data"].as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn recompute_reports_missing_subjects_when_incomplete() {
        let app = TestApp::spawn().await;
        let school = app.school(&["MATH", "ENG"]).await;
        let token = &school.admin_token;
        let exam = app
            .create_exam(token, school.class_id, school.subject_ids[0], "Final", 100.0)
            .await;
        app.submit_scores(token, exam, &[(school.student_id, 64.0)])
            .await;

        let res = app
            .post_with_token(
                routes::MARKSHEETS_RECOMPUTE,
                &json!({
                    "student_id": school.student_id,
                    "class_id": school.class_id,
                    "term": "FirstTerm",
                    "academic_session": SESSION,
                }),
                token,
            )
            .await;

        assert_eq!(res.status, 200, "Recompute failed: {}", res.text);
        assert_eq!(res.body["status"], "not_ready");
        assert_eq!(res.body["missing_subject_ids"], json!([school.subject_ids[1]]));
        assert!(res.body["marksheet"].is_null());
    }
}

mod ranking {
    use super::*;

    #[tokio::test]
    async fn equal_percentages_share_a_rank() {
        let app = TestApp::spawn().await;
        let school = app.school(&["MATH"]).await;
        let token = &school.admin_token;
        let mut students = vec![school.student_id];
        for (i, email) in ["b@school.test", "c@school.test", "d@school.test"]
            .into_iter()
            .enumerate()
        {
            let id = app
                .create_user(token, email, "student", Some(school.campus_id))
                .await;
            app.enroll(token, id, school.class_id, &(i + 2).to_string())
                .await;
            students.push(id);
        }
        let exam = app
            .create_exam(token, school.class_id, school.subject_ids[0], "Final", 100.0)
            .await;
        app.submit_scores(
            token,
            exam,
            &[
                (students[0], 70.0),
                (students[1], 90.0),
                (students[2], 70.0),
                (students[3], 40.0),
            ],
        )
        .await;

        let res = app
            .post_with_token(
                routes::MARKSHEETS_RANK,
                &json!({
                    "class_id": school.class_id,
                    "term": "FirstTerm",
                    "academic_session": SESSION,
                }),
                token,
            )
            .await;

        assert_eq!(res.status, 200, "Rank failed: {}", res.text);
        let ranked: Vec<(i64, i64)> = res.body["data"]
            .as_array()
            .expect("data should be an array")
            .iter()
            .map(|m| {
                (
                    m["student_id"].as_i64().unwrap_or_default(),
                    m["rank"].as_i64().unwrap_or_default(),
                )
            })
            .collect();
        assert_eq!(ranked.len(), 4);
        assert_eq!(ranked[0], (students[1] as i64, 1));
        assert_eq!(ranked[1].1, 2);
        assert_eq!(ranked[2].1, 2);
        assert_eq!(ranked[3], (students[3] as i64, 4));
    }
}

mod visibility {
    use super::*;

    #[tokio::test]
    async fn students_only_see_their_own_marksheets() {
        let app = TestApp::spawn().await;
        let school = app.school(&["MATH"]).await;
        let token = &school.admin_token;
        let other = app
            .create_user(token, "other@school.test", "student", Some(school.campus_id))
            .await;
        app.enroll(token, other, school.class_id, "2").await;
        let exam = app
            .create_exam(token, school.class_id, school.subject_ids[0], "Final", 100.0)
            .await;
        app.submit_scores(token, exam, &[(school.student_id, 55.0), (other, 85.0)])
            .await;

        let student = app.login("student@school.test").await;
        let sheets = app.marksheets(&student).await;

        let data = sheets.body["data"].as_array().expect("data should be an array");
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["student_id"], school.student_id);

        let all = app.marksheets(token).await;
        let foreign = all.body["data"]
            .as_array()
            .and_then(|d| d.iter().find(|m| m["student_id"] == other))
            .and_then(|m| m["id"].as_i64())
            .expect("other student's marksheet should exist") as i32;
        let res = app.get_with_token(&routes::marksheet(foreign), &student).await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn teachers_without_a_class_cannot_view_marksheets() {
        let app = TestApp::spawn().await;
        let school = app.school(&["MATH"]).await;
        app.create_user(
            &school.admin_token,
            "teacher@school.test",
            "teacher",
            Some(school.campus_id),
        )
        .await;
        let teacher = app.login("teacher@school.test").await;

        let res = app.get_with_token(routes::MARKSHEETS, &teacher).await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }
}

mod pipeline_failures {
    use super::*;
    use sea_orm::{ConnectionTrait, DbBackend, Statement};

    async fn execute(app: &TestApp, sql: &str) {
        app.db
            .execute_raw(Statement::from_string(DbBackend::Postgres, sql.to_string()))
            .await
            .expect("Failed to run SQL");
    }

    #[tokio::test]
    async fn failed_derivation_keeps_the_written_scores() {
        let app = TestApp::spawn().await;
        let school = app.school(&["MATH"]).await;
        let token = &school.admin_token;
        let other = app
            .create_user(token, "second@school.test", "student", Some(school.campus_id))
            .await;
        app.enroll(token, other, school.class_id, "2").await;
        let exam = app
            .create_exam(token, school.class_id, school.subject_ids[0], "Final", 100.0)
            .await;

        execute(&app, "ALTER TABLE marksheet RENAME TO marksheet_offline").await;

        let res = app
            .submit_scores(token, exam, &[(school.student_id, 70.0), (other, 80.0)])
            .await;
        assert_eq!(res.status, 200, "Submit failed: {}", res.text);
        assert_eq!(res.body["saved"].as_array().map(Vec::len), Some(2));
        assert_eq!(res.body["marksheets_generated"], json!([]));

        let score_of = |student: i32| {
            res.body["saved"]
                .as_array()
                .and_then(|s| s.iter().find(|row| row["student_id"] == student))
                .and_then(|row| row["id"].as_i64())
                .expect("score should be saved") as i32
        };
        let score_id = score_of(school.student_id);
        let updated = app
            .patch_with_token(&routes::score(score_id), &json!({"marks_obtained": 75.0}), token)
            .await;
        assert_eq!(updated.status, 200, "Update failed: {}", updated.text);
        assert_eq!(updated.body["score"]["marks_obtained"], 75.0);
        assert!(updated.body["marksheet_id"].is_null());

        let changed = app
            .patch_with_token(&routes::exam(exam), &json!({"total_marks": 80.0}), token)
            .await;
        assert_eq!(changed.status, 200, "Exam update failed: {}", changed.text);

        let sheet = app.get_with_token(&routes::exam_scores(exam), token).await;
        let rows = sheet.body["data"].as_array().expect("data should be an array");
        assert!(rows.iter().all(|r| r["score_id"].is_i64()));

        let deleted = app.delete_with_token(&routes::score(score_of(other)), token).await;
        assert_eq!(deleted.status, 204);

        execute(&app, "ALTER TABLE marksheet_offline RENAME TO marksheet").await;

        let recomputed = app
            .post_with_token(
                routes::MARKSHEETS_RECOMPUTE,
                &json!({
                    "student_id": school.student_id,
                    "class_id": school.class_id,
                    "term": "FirstTerm",
                    "academic_session": SESSION,
                }),
                token,
            )
            .await;
        assert_eq!(recomputed.status, 200, "Recompute failed: {}", recomputed.text);
        assert_eq!(recomputed.body["marksheet"]["grand_obtained"], 75.0);
        assert_eq!(recomputed.body["marksheet"]["grand_total"], 80.0);
    }
}

mod concurrency {
    use std::time::Duration;

    use ::common::Term;
    use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
    use server::entity::marksheet;
    use server::marksheet::{MarksheetKey, Pipeline};

    use super::*;
    use crate::common::{FixedRemarks, School};

    fn key(school: &School) -> MarksheetKey {
        MarksheetKey {
            student_id: school.student_id,
            class_id: school.class_id,
            term: Term::FirstTerm,
            academic_session: SESSION.to_string(),
        }
    }

    async fn rows_for(app: &TestApp, key: &MarksheetKey) -> Vec<marksheet::Model> {
        marksheet::Entity::find()
            .filter(marksheet::Column::StudentId.eq(key.student_id))
            .filter(marksheet::Column::ClassId.eq(key.class_id))
            .filter(marksheet::Column::Term.eq(key.term))
            .filter(marksheet::Column::AcademicSession.eq(key.academic_session.as_str()))
            .all(&app.db)
            .await
            .expect("Failed to load marksheets")
    }

    #[tokio::test]
    async fn concurrent_submissions_leave_one_marksheet() {
        let app = TestApp::spawn().await;
        let school = app.school(&["MATH", "ENG"]).await;
        let token = &school.admin_token;
        let math = app
            .create_exam(token, school.class_id, school.subject_ids[0], "Final", 100.0)
            .await;
        let eng = app
            .create_exam(token, school.class_id, school.subject_ids[1], "Final", 50.0)
            .await;

        let math_scores = [(school.student_id, 61.5)];
        let eng_scores = [(school.student_id, 42.25)];
        let (a, b) = tokio::join!(
            app.submit_scores(token, math, &math_scores),
            app.submit_scores(token, eng, &eng_scores),
        );
        assert_eq!(a.status, 200, "Submit failed: {}", a.text);
        assert_eq!(b.status, 200, "Submit failed: {}", b.text);

        let key = key(&school);
        let rows = rows_for(&app, &key).await;
        assert_eq!(rows.len(), 1);
        let concurrent = rows[0].clone();

        let pipeline = Pipeline::new(app.db.clone(), Arc::new(FixedRemarks), Duration::from_secs(2));
        let sequential = pipeline
            .run(&key)
            .await
            .expect("Sequential recompute failed")
            .marksheet()
            .cloned()
            .expect("sequential recompute should materialize");

        assert_eq!(sequential.id, concurrent.id);
        assert_eq!(sequential.subjects, concurrent.subjects);
        assert_eq!(sequential.grand_obtained, 103.75);
        assert_eq!(sequential.grand_obtained, concurrent.grand_obtained);
        assert_eq!(sequential.grand_total, concurrent.grand_total);
        assert_eq!(sequential.overall_percentage, concurrent.overall_percentage);
        assert_eq!(sequential.overall_grade, concurrent.overall_grade);
    }

    #[tokio::test]
    async fn racing_pipeline_runs_upsert_a_single_row() {
        let app = TestApp::spawn().await;
        let school = app.school(&["MATH"]).await;
        let token = &school.admin_token;
        let exam = app
            .create_exam(token, school.class_id, school.subject_ids[0], "Final", 100.0)
            .await;
        app.submit_scores(token, exam, &[(school.student_id, 88.0)])
            .await;

        let key = key(&school);
        marksheet::Entity::delete_many()
            .filter(marksheet::Column::StudentId.eq(key.student_id))
            .exec(&app.db)
            .await
            .expect("Failed to clear marksheets");

        let first = Pipeline::new(app.db.clone(), Arc::new(FixedRemarks), Duration::from_secs(2));
        let second = first.clone();
        let (a, b) = tokio::join!(first.run(&key), second.run(&key));
        let a = a.expect("first run failed");
        let b = b.expect("second run failed");

        let count = marksheet::Entity::find()
            .filter(marksheet::Column::StudentId.eq(key.student_id))
            .count(&app.db)
            .await
            .expect("Failed to count marksheets");
        assert_eq!(count, 1);

        let stored = rows_for(&app, &key).await.remove(0);
        for outcome in [&a, &b] {
            let sheet = outcome.marksheet().expect("both runs should materialize");
            assert_eq!(sheet.id, stored.id);
            assert_eq!(sheet.grand_obtained, stored.grand_obtained);
            assert_eq!(sheet.overall_percentage, 88.0);
        }
    }
}
