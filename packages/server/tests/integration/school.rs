use serde_json::json;

use crate::common::{SESSION, TestApp, routes};

mod campuses {
    use super::*;

    #[tokio::test]
    async fn campus_code_is_normalized_and_unique() {
        let app = TestApp::spawn().await;
        let token = app.super_admin_token().await;
        let id = app.create_campus(&token, "main-1", None).await;

        let res = app.get_with_token(&routes::campus(id), &token).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["code"], "MAIN-1");

        let res = app
            .post_with_token(
                routes::CAMPUSES,
                &json!({
                    "name": "Copy",
                    "code": "MAIN-1",
                    "address": "2 School Road",
                    "city": "Springfield",
                    "phone": "555-0101",
                    "email": "copy@school.test",
                }),
                &token,
            )
            .await;
        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn campus_code_rejects_spaces() {
        let app = TestApp::spawn().await;
        let token = app.super_admin_token().await;

        let res = app
            .post_with_token(
                routes::CAMPUSES,
                &json!({
                    "name": "Bad",
                    "code": "NO SPACES",
                    "address": "2 School Road",
                    "city": "Springfield",
                    "phone": "555-0101",
                    "email": "bad@school.test",
                }),
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn campus_admins_cannot_create_campuses() {
        let app = TestApp::spawn().await;
        let root = app.super_admin_token().await;
        let admin_id = app
            .create_user(&root, "admin@school.test", "campus-admin", None)
            .await;
        app.create_campus(&root, "MAIN", Some(admin_id)).await;
        let admin = app.login("admin@school.test").await;

        let res = app
            .post_with_token(
                routes::CAMPUSES,
                &json!({
                    "name": "Annex",
                    "code": "ANNEX",
                    "address": "3 School Road",
                    "city": "Springfield",
                    "phone": "555-0102",
                    "email": "annex@school.test",
                }),
                &admin,
            )
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }
}

mod classes {
    use super::*;

    #[tokio::test]
    async fn class_keeps_curriculum_order() {
        let app = TestApp::spawn().await;
        let school = app.school(&["MATH", "ENG", "SCI"]).await;

        let res = app
            .get_with_token(&routes::class(school.class_id), &school.admin_token)
            .await;

        assert_eq!(res.status, 200, "Get failed: {}", res.text);
        assert_eq!(res.body["section"], "A");
        let ids: Vec<i64> = res.body["subjects"]
            .as_array()
            .expect("subjects should be an array")
            .iter()
            .filter_map(|s| s["subject_id"].as_i64())
            .collect();
        let expected: Vec<i64> = school.subject_ids.iter().map(|&id| id as i64).collect();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn duplicate_grade_and_section_on_a_campus_is_rejected() {
        let app = TestApp::spawn().await;
        let school = app.school(&["MATH"]).await;

        let res = app
            .post_with_token(
                routes::CLASSES,
                &json!({
                    "grade": 9,
                    "section": "A",
                    "campus_id": school.campus_id,
                    "subject_ids": school.subject_ids,
                }),
                &school.admin_token,
            )
            .await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn unknown_subject_in_curriculum_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.super_admin_token().await;
        let campus = app.create_campus(&token, "MAIN", None).await;

        let res = app
            .post_with_token(
                routes::CLASSES,
                &json!({
                    "grade": 5,
                    "section": "B",
                    "campus_id": campus,
                    "subject_ids": [9999],
                }),
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn subject_in_a_curriculum_cannot_be_deleted() {
        let app = TestApp::spawn().await;
        let school = app.school(&["MATH"]).await;

        let res = app
            .delete_with_token(&routes::subject(school.subject_ids[0]), &school.admin_token)
            .await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "CONFLICT");
    }
}

mod enrollments {
    use super::*;

    #[tokio::test]
    async fn student_cannot_be_enrolled_twice_in_a_class() {
        let app = TestApp::spawn().await;
        let school = app.school(&["MATH"]).await;

        let res = app
            .post_with_token(
                routes::ENROLLMENTS,
                &json!({
                    "student_id": school.student_id,
                    "class_id": school.class_id,
                    "roll_number": "7",
                    "academic_session": SESSION,
                }),
                &school.admin_token,
            )
            .await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn student_of_another_campus_cannot_be_enrolled() {
        let app = TestApp::spawn().await;
        let school = app.school(&["MATH"]).await;
        let other = app.create_campus(&school.admin_token, "SOUTH", None).await;
        let stranger = app
            .create_user(&school.admin_token, "stranger@school.test", "student", Some(other))
            .await;

        let res = app
            .post_with_token(
                routes::ENROLLMENTS,
                &json!({
                    "student_id": stranger,
                    "class_id": school.class_id,
                    "roll_number": "2",
                    "academic_session": SESSION,
                }),
                &school.admin_token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn malformed_session_is_rejected() {
        let app = TestApp::spawn().await;
        let school = app.school(&["MATH"]).await;
        let second = app
            .create_user(&school.admin_token, "second@school.test", "student", Some(school.campus_id))
            .await;

        let res = app
            .post_with_token(
                routes::ENROLLMENTS,
                &json!({
                    "student_id": second,
                    "class_id": school.class_id,
                    "roll_number": "2",
                    "academic_session": "2025/26",
                }),
                &school.admin_token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn enrollment_listing_includes_student_names() {
        let app = TestApp::spawn().await;
        let school = app.school(&["MATH"]).await;

        let res = app
            .get_with_token(
                &format!("{}?class_id={}", routes::ENROLLMENTS, school.class_id),
                &school.admin_token,
            )
            .await;

        assert_eq!(res.status, 200, "List failed: {}", res.text);
        assert_eq!(res.body["data"][0]["student_id"], school.student_id);
        assert_eq!(res.body["data"][0]["student_name"], "student");
        assert_eq!(res.body["pagination"]["total"], 1);
    }
}

mod assignments {
    use super::*;

    #[tokio::test]
    async fn subject_must_belong_to_the_class_curriculum() {
        let app = TestApp::spawn().await;
        let school = app.school(&["MATH"]).await;
        let art = app.create_subject(&school.admin_token, "ART").await;
        let teacher = app
            .create_user(&school.admin_token, "teacher@school.test", "teacher", Some(school.campus_id))
            .await;

        let res = app
            .post_with_token(
                routes::ASSIGNMENTS,
                &json!({"teacher_id": teacher, "class_id": school.class_id, "subject_id": art}),
                &school.admin_token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn teacher_sees_only_their_own_assignments() {
        let app = TestApp::spawn().await;
        let school = app.school(&["MATH", "ENG"]).await;
        let token = &school.admin_token;
        let mut teachers = Vec::new();
        for (email, subject) in [
            ("t1@school.test", school.subject_ids[0]),
            ("t2@school.test", school.subject_ids[1]),
        ] {
            let id = app
                .create_user(token, email, "teacher", Some(school.campus_id))
                .await;
            let res = app
                .post_with_token(
                    routes::ASSIGNMENTS,
                    &json!({"teacher_id": id, "class_id": school.class_id, "subject_id": subject}),
                    token,
                )
                .await;
            assert_eq!(res.status, 201, "Assignment failed: {}", res.text);
            teachers.push(id);
        }
        let t1 = app.login("t1@school.test").await;

        let res = app.get_with_token(routes::ASSIGNMENTS, &t1).await;

        assert_eq!(res.status, 200, "List failed: {}", res.text);
        let data = res.body.as_array().expect("body should be an array");
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["teacher_id"], teachers[0]);
        assert_eq!(data[0]["subject_id"], school.subject_ids[0]);
    }
}
