use chrono::{Duration, Utc};
use serde_json::json;

use crate::common::{TestApp, routes};

const MONDAY: &str = "2025-10-13";
const SUNDAY: &str = "2025-10-12";

struct Staff {
    root: String,
    campus_id: i32,
    teacher_id: i32,
    teacher: String,
}

/// Campus "MAIN" with one teacher, `teacher@school.test`.
async fn setup(app: &TestApp) -> Staff {
    let root = app.super_admin_token().await;
    let campus_id = app.create_campus(&root, "MAIN", None).await;
    let teacher_id = app
        .create_user(&root, "teacher@school.test", "teacher", Some(campus_id))
        .await;
    let teacher = app.login("teacher@school.test").await;
    Staff {
        root,
        campus_id,
        teacher_id,
        teacher,
    }
}

mod check_in_and_out {
    use super::*;

    #[tokio::test]
    async fn teacher_checks_in_and_out_once_per_day() {
        let app = TestApp::spawn().await;
        let staff = setup(&app).await;

        let res = app
            .post_with_token(routes::TEACHER_CHECK_IN, &json!({"date": MONDAY}), &staff.teacher)
            .await;
        assert_eq!(res.status, 201, "Check-in failed: {}", res.text);
        assert_eq!(res.body["teacher_id"], staff.teacher_id);
        assert_eq!(res.body["campus_id"], staff.campus_id);
        assert_eq!(res.body["status"], "present");
        assert_eq!(res.body["date"], MONDAY);
        assert!(res.body["check_in"].is_string());
        assert!(res.body["check_out"].is_null());

        let again = app
            .post_with_token(routes::TEACHER_CHECK_IN, &json!({"date": MONDAY}), &staff.teacher)
            .await;
        assert_eq!(again.status, 409);
        assert_eq!(again.body["code"], "CONFLICT");

        let out = app
            .post_with_token(routes::TEACHER_CHECK_OUT, &json!({"date": MONDAY}), &staff.teacher)
            .await;
        assert_eq!(out.status, 200, "Check-out failed: {}", out.text);
        assert_eq!(out.body["id"], res.body["id"]);
        assert!(out.body["check_out"].is_string());

        let twice = app
            .post_with_token(routes::TEACHER_CHECK_OUT, &json!({"date": MONDAY}), &staff.teacher)
            .await;
        assert_eq!(twice.status, 409);
    }

    #[tokio::test]
    async fn check_out_without_check_in_is_not_found() {
        let app = TestApp::spawn().await;
        let staff = setup(&app).await;

        let res = app
            .post_with_token(routes::TEACHER_CHECK_OUT, &json!({"date": MONDAY}), &staff.teacher)
            .await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn sundays_and_future_dates_are_rejected() {
        let app = TestApp::spawn().await;
        let staff = setup(&app).await;
        let next_week = (Utc::now().date_naive() + Duration::days(7)).to_string();

        for date in [SUNDAY.to_string(), next_week] {
            let res = app
                .post_with_token(routes::TEACHER_CHECK_IN, &json!({"date": date}), &staff.teacher)
                .await;
            assert_eq!(res.status, 400, "accepted {date}");
            assert_eq!(res.body["code"], "VALIDATION_ERROR");
        }
    }

    #[tokio::test]
    async fn teachers_cannot_mark_a_colleague() {
        let app = TestApp::spawn().await;
        let staff = setup(&app).await;
        let colleague = app
            .create_user(&staff.root, "colleague@school.test", "teacher", Some(staff.campus_id))
            .await;

        let res = app
            .post_with_token(
                routes::TEACHER_CHECK_IN,
                &json!({"teacher_id": colleague, "date": MONDAY}),
                &staff.teacher,
            )
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }

    #[tokio::test]
    async fn admins_must_name_an_active_teacher() {
        let app = TestApp::spawn().await;
        let staff = setup(&app).await;
        let student = app
            .create_user(&staff.root, "student@school.test", "student", Some(staff.campus_id))
            .await;

        let missing = app
            .post_with_token(routes::TEACHER_CHECK_IN, &json!({"date": MONDAY}), &staff.root)
            .await;
        assert_eq!(missing.status, 400);

        let not_teacher = app
            .post_with_token(
                routes::TEACHER_CHECK_IN,
                &json!({"teacher_id": student, "date": MONDAY}),
                &staff.root,
            )
            .await;
        assert_eq!(not_teacher.status, 400);
    }
}

mod management {
    use super::*;

    #[tokio::test]
    async fn admin_marks_leave_without_a_check_in_time() {
        let app = TestApp::spawn().await;
        let staff = setup(&app).await;

        let res = app
            .post_with_token(
                routes::TEACHER_CHECK_IN,
                &json!({"teacher_id": staff.teacher_id, "status": "leave", "date": MONDAY}),
                &staff.root,
            )
            .await;

        assert_eq!(res.status, 201, "Mark failed: {}", res.text);
        assert_eq!(res.body["status"], "leave");
        assert!(res.body["check_in"].is_null());

        let out = app
            .post_with_token(routes::TEACHER_CHECK_OUT, &json!({"date": MONDAY}), &staff.teacher)
            .await;
        assert_eq!(out.status, 404);
    }

    #[tokio::test]
    async fn listing_is_scoped_to_the_admins_campus() {
        let app = TestApp::spawn().await;
        let staff = setup(&app).await;
        app.post_with_token(routes::TEACHER_CHECK_IN, &json!({"date": MONDAY}), &staff.teacher)
            .await;

        let all = app.get_with_token(routes::TEACHER_ATTENDANCE, &staff.root).await;
        assert_eq!(all.status, 200, "List failed: {}", all.text);
        assert_eq!(all.body["pagination"]["total"], 1);
        assert_eq!(all.body["data"][0]["teacher_email"], "teacher@school.test");

        let admin_id = app
            .create_user(&staff.root, "north@school.test", "campus-admin", None)
            .await;
        app.create_campus(&staff.root, "NORTH", Some(admin_id)).await;
        let north = app.login("north@school.test").await;

        let scoped = app.get_with_token(routes::TEACHER_ATTENDANCE, &north).await;
        assert_eq!(scoped.status, 200, "List failed: {}", scoped.text);
        assert_eq!(scoped.body["pagination"]["total"], 0);

        let foreign = app
            .get_with_token(
                &format!("{}?campus_id={}", routes::TEACHER_ATTENDANCE, staff.campus_id),
                &north,
            )
            .await;
        assert_eq!(foreign.status, 403);

        let teacher_list = app.get_with_token(routes::TEACHER_ATTENDANCE, &staff.teacher).await;
        assert_eq!(teacher_list.status, 403);
    }

    #[tokio::test]
    async fn teachers_read_only_their_own_history() {
        let app = TestApp::spawn().await;
        let staff = setup(&app).await;
        app.post_with_token(routes::TEACHER_CHECK_IN, &json!({"date": MONDAY}), &staff.teacher)
            .await;
        app.create_user(&staff.root, "colleague@school.test", "teacher", Some(staff.campus_id))
            .await;
        let colleague = app.login("colleague@school.test").await;

        let own = app
            .get_with_token(&routes::teacher_attendance_history(staff.teacher_id), &staff.teacher)
            .await;
        assert_eq!(own.status, 200, "History failed: {}", own.text);
        assert_eq!(own.body["pagination"]["total"], 1);
        assert_eq!(own.body["data"][0]["teacher_name"], "teacher");

        let other = app
            .get_with_token(&routes::teacher_attendance_history(staff.teacher_id), &colleague)
            .await;
        assert_eq!(other.status, 403);

        let admin = app
            .get_with_token(&routes::teacher_attendance_history(staff.teacher_id), &staff.root)
            .await;
        assert_eq!(admin.status, 200);
        assert_eq!(admin.body["data"][0]["date"], MONDAY);
    }

    #[tokio::test]
    async fn admin_corrects_and_deletes_a_record() {
        let app = TestApp::spawn().await;
        let staff = setup(&app).await;
        let marked = app
            .post_with_token(routes::TEACHER_CHECK_IN, &json!({"date": MONDAY}), &staff.teacher)
            .await;
        let id = marked.id();

        let bad = app
            .patch_with_token(
                &routes::teacher_attendance(id),
                &json!({"check_in": null, "check_out": "2025-10-13T15:00:00Z"}),
                &staff.root,
            )
            .await;
        assert_eq!(bad.status, 400);

        let res = app
            .patch_with_token(
                &routes::teacher_attendance(id),
                &json!({"status": "absent", "check_in": null}),
                &staff.root,
            )
            .await;
        assert_eq!(res.status, 200, "Update failed: {}", res.text);
        assert_eq!(res.body["status"], "absent");
        assert!(res.body["check_in"].is_null());

        let by_teacher = app
            .delete_with_token(&routes::teacher_attendance(id), &staff.teacher)
            .await;
        assert_eq!(by_teacher.status, 403);

        let deleted = app
            .delete_with_token(&routes::teacher_attendance(id), &staff.root)
            .await;
        assert_eq!(deleted.status, 204);
        let missing = app
            .delete_with_token(&routes::teacher_attendance(id), &staff.root)
            .await;
        assert_eq!(missing.status, 404);
    }
}
