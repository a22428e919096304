use serde_json::json;

use crate::common::{SESSION, TestApp, routes};

mod creation {
    use super::*;

    #[tokio::test]
    async fn exam_inherits_campus_from_its_class() {
        let app = TestApp::spawn().await;
        let school = app.school(&["MATH"]).await;

        let exam = app
            .create_exam(&school.admin_token, school.class_id, school.subject_ids[0], "Midterm", 100.0)
            .await;
        let res = app.get_with_token(&routes::exam(exam), &school.admin_token).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["campus_id"], school.campus_id);
        assert_eq!(res.body["term"], "FirstTerm");
        assert_eq!(res.body["academic_session"], SESSION);
        assert_eq!(res.body["total_marks"], 100.0);
    }

    #[tokio::test]
    async fn duplicate_exam_is_rejected() {
        let app = TestApp::spawn().await;
        let school = app.school(&["MATH"]).await;
        let body = json!({
            "name": "Midterm",
            "term": "FirstTerm",
            "academic_session": SESSION,
            "class_id": school.class_id,
            "subject_id": school.subject_ids[0],
            "total_marks": 100.0,
            "exam_type": "Midterm",
        });

        let first = app.post_with_token(routes::EXAMS, &body, &school.admin_token).await;
        assert_eq!(first.status, 201, "Create failed: {}", first.text);
        let res = app.post_with_token(routes::EXAMS, &body, &school.admin_token).await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn subject_outside_the_curriculum_is_rejected() {
        let app = TestApp::spawn().await;
        let school = app.school(&["MATH"]).await;
        let art = app.create_subject(&school.admin_token, "ART").await;

        let res = app
            .post_with_token(
                routes::EXAMS,
                &json!({
                    "name": "Art final",
                    "term": "FirstTerm",
                    "academic_session": SESSION,
                    "class_id": school.class_id,
                    "subject_id": art,
                    "total_marks": 50.0,
                    "exam_type": "Final",
                }),
                &school.admin_token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn non_positive_total_is_rejected() {
        let app = TestApp::spawn().await;
        let school = app.school(&["MATH"]).await;

        let res = app
            .post_with_token(
                routes::EXAMS,
                &json!({
                    "name": "Broken",
                    "term": "FirstTerm",
                    "academic_session": SESSION,
                    "class_id": school.class_id,
                    "subject_id": school.subject_ids[0],
                    "total_marks": 0.0,
                    "exam_type": "Final",
                }),
                &school.admin_token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
}

mod modification {
    use super::*;

    #[tokio::test]
    async fn total_cannot_drop_below_a_recorded_score() {
        let app = TestApp::spawn().await;
        let school = app.school(&["MATH"]).await;
        let exam = app
            .create_exam(&school.admin_token, school.class_id, school.subject_ids[0], "Final", 100.0)
            .await;
        app.submit_scores(&school.admin_token, exam, &[(school.student_id, 80.0)])
            .await;

        let res = app
            .patch_with_token(&routes::exam(exam), &json!({"total_marks": 75.0}), &school.admin_token)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn exam_with_scores_cannot_be_deleted() {
        let app = TestApp::spawn().await;
        let school = app.school(&["MATH"]).await;
        let exam = app
            .create_exam(&school.admin_token, school.class_id, school.subject_ids[0], "Final", 100.0)
            .await;
        app.submit_scores(&school.admin_token, exam, &[(school.student_id, 80.0)])
            .await;

        let res = app.delete_with_token(&routes::exam(exam), &school.admin_token).await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn exam_without_scores_can_be_deleted() {
        let app = TestApp::spawn().await;
        let school = app.school(&["MATH"]).await;
        let exam = app
            .create_exam(&school.admin_token, school.class_id, school.subject_ids[0], "Final", 100.0)
            .await;

        let res = app.delete_with_token(&routes::exam(exam), &school.admin_token).await;
        assert_eq!(res.status, 204);

        let res = app.get_with_token(&routes::exam(exam), &school.admin_token).await;
        assert_eq!(res.status, 404);
    }
}

mod listing {
    use super::*;

    #[tokio::test]
    async fn campus_admin_only_sees_exams_of_their_campus() {
        let app = TestApp::spawn().await;
        let school = app.school(&["MATH"]).await;
        let root = &school.admin_token;
        app.create_exam(root, school.class_id, school.subject_ids[0], "Final", 100.0)
            .await;

        let admin_id = app
            .create_user(root, "north@school.test", "campus-admin", None)
            .await;
        let north = app.create_campus(root, "NORTH", Some(admin_id)).await;
        let north_class = app
            .create_class(root, north, "A", &school.subject_ids, None)
            .await;
        let north_exam = app
            .create_exam(root, north_class, school.subject_ids[0], "Final", 50.0)
            .await;
        let admin = app.login("north@school.test").await;

        let res = app.get_with_token(routes::EXAMS, &admin).await;

        assert_eq!(res.status, 200, "List failed: {}", res.text);
        let data = res.body["data"].as_array().expect("data should be an array");
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["id"], north_exam);
        assert_eq!(res.body["pagination"]["total"], 1);

        let res = app
            .get_with_token(&format!("{}?campus_id={}", routes::EXAMS, school.campus_id), &admin)
            .await;
        assert_eq!(res.status, 403);
    }
}
