use serde_json::json;

use crate::common::{TestApp, routes};

/// A school whose class has `teacher@school.test` as class teacher.
async fn setup(app: &TestApp) -> (i32, i32, String, String) {
    let root = app.super_admin_token().await;
    let campus = app.create_campus(&root, "MAIN", None).await;
    let math = app.create_subject(&root, "MATH").await;
    let teacher = app
        .create_user(&root, "teacher@school.test", "teacher", Some(campus))
        .await;
    let class = app
        .create_class(&root, campus, "A", &[math], Some(teacher))
        .await;
    let student = app
        .create_user(&root, "student@school.test", "student", Some(campus))
        .await;
    let enrollment = app.enroll(&root, student, class, "1").await;
    let teacher_token = app.login("teacher@school.test").await;
    (class, enrollment, root, teacher_token)
}

#[tokio::test]
async fn class_teacher_marks_attendance_and_remarking_updates_in_place() {
    let app = TestApp::spawn().await;
    let (class, enrollment, _, teacher) = setup(&app).await;
    let body = |status: &str| {
        json!({
            "class_id": class,
            "date": "2025-09-01",
            "records": [{"enrollment_id": enrollment, "status": status}],
        })
    };

    let first = app.post_with_token(routes::ATTENDANCE, &body("absent"), &teacher).await;
    assert_eq!(first.status, 200, "Mark failed: {}", first.text);
    assert_eq!(first.body[0]["status"], "absent");

    let second = app.post_with_token(routes::ATTENDANCE, &body("leave"), &teacher).await;
    assert_eq!(second.status, 200, "Mark failed: {}", second.text);
    assert_eq!(second.body[0]["id"], first.body[0]["id"]);
    assert_eq!(second.body[0]["status"], "leave");

    let res = app
        .get_with_token(&format!("{}?class_id={class}", routes::ATTENDANCE), &teacher)
        .await;
    assert_eq!(res.status, 200, "List failed: {}", res.text);
    assert_eq!(res.body["pagination"]["total"], 1);
    assert_eq!(res.body["data"][0]["date"], "2025-09-01");
}

#[tokio::test]
async fn other_teachers_cannot_mark_attendance() {
    let app = TestApp::spawn().await;
    let (class, enrollment, root, _) = setup(&app).await;
    let campus = app.get_with_token(&routes::class(class), &root).await.body["campus_id"]
        .as_i64()
        .unwrap_or_default() as i32;
    app.create_user(&root, "other@school.test", "teacher", Some(campus))
        .await;
    let other = app.login("other@school.test").await;

    let res = app
        .post_with_token(
            routes::ATTENDANCE,
            &json!({
                "class_id": class,
                "date": "2025-09-01",
                "records": [{"enrollment_id": enrollment, "status": "present"}],
            }),
            &other,
        )
        .await;

    assert_eq!(res.status, 403);
    assert_eq!(res.body["code"], "PERMISSION_DENIED");
}

#[tokio::test]
async fn enrollments_of_other_classes_are_rejected() {
    let app = TestApp::spawn().await;
    let (class, _, _, teacher) = setup(&app).await;

    let res = app
        .post_with_token(
            routes::ATTENDANCE,
            &json!({
                "class_id": class,
                "date": "2025-09-01",
                "records": [{"enrollment_id": 9999, "status": "present"}],
            }),
            &teacher,
        )
        .await;

    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn only_admins_can_correct_attendance() {
    let app = TestApp::spawn().await;
    let (class, enrollment, root, teacher) = setup(&app).await;
    let marked = app
        .post_with_token(
            routes::ATTENDANCE,
            &json!({
                "class_id": class,
                "date": "2025-09-02",
                "records": [{"enrollment_id": enrollment, "status": "absent"}],
            }),
            &teacher,
        )
        .await;
    let id = marked.body[0]["id"].as_i64().unwrap_or_default() as i32;

    let res = app
        .patch_with_token(&routes::attendance(id), &json!({"status": "present"}), &teacher)
        .await;
    assert_eq!(res.status, 403);

    let res = app
        .patch_with_token(&routes::attendance(id), &json!({"status": "present"}), &root)
        .await;
    assert_eq!(res.status, 200, "Update failed: {}", res.text);
    assert_eq!(res.body["status"], "present");

    let res = app.delete_with_token(&routes::attendance(id), &root).await;
    assert_eq!(res.status, 204);
}

#[tokio::test]
async fn inverted_date_range_is_rejected() {
    let app = TestApp::spawn().await;
    let (_, _, root, _) = setup(&app).await;

    let res = app
        .get_with_token(
            &format!("{}?from=2025-09-10&to=2025-09-01", routes::ATTENDANCE),
            &root,
        )
        .await;

    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
}
