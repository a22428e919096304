use serde_json::json;

use crate::common::{SESSION, TestApp, routes};

/// A campus-admin managing the empty campus "NORTH". Returns its token.
async fn north_admin(app: &TestApp, root: &str) -> String {
    let admin_id = app
        .create_user(root, "north@school.test", "campus-admin", None)
        .await;
    app.create_campus(root, "NORTH", Some(admin_id)).await;
    app.login("north@school.test").await
}

#[tokio::test]
async fn overview_counts_active_records_within_scope() {
    let app = TestApp::spawn().await;
    let school = app.school(&["MATH"]).await;
    let root = &school.admin_token;
    app.create_user(root, "teacher@school.test", "teacher", Some(school.campus_id))
        .await;

    let res = app.get_with_token(routes::DASHBOARD_OVERVIEW, root).await;
    assert_eq!(res.status, 200, "Overview failed: {}", res.text);
    assert_eq!(res.body["campus_count"], 1);
    assert_eq!(res.body["class_count"], 1);
    assert_eq!(res.body["student_count"], 1);
    assert_eq!(res.body["teacher_count"], 1);

    let north = north_admin(&app, root).await;
    let scoped = app.get_with_token(routes::DASHBOARD_OVERVIEW, &north).await;
    assert_eq!(scoped.status, 200, "Overview failed: {}", scoped.text);
    assert_eq!(
        scoped.body,
        json!({"campus_count": 1, "class_count": 0, "student_count": 0, "teacher_count": 0})
    );
}

#[tokio::test]
async fn top_performers_are_grouped_by_campus() {
    let app = TestApp::spawn().await;
    let school = app.school(&["MATH"]).await;
    let root = &school.admin_token;
    let other = app
        .create_user(root, "second@school.test", "student", Some(school.campus_id))
        .await;
    app.enroll(root, other, school.class_id, "2").await;
    let exam = app
        .create_exam(root, school.class_id, school.subject_ids[0], "Final", 100.0)
        .await;
    app.submit_scores(root, exam, &[(school.student_id, 72.5), (other, 91.0)])
        .await;

    let res = app
        .get_with_token(
            &format!(
                "{}?term=FirstTerm&academic_session={SESSION}&limit=1",
                routes::DASHBOARD_TOP_PERFORMERS
            ),
            root,
        )
        .await;

    assert_eq!(res.status, 200, "Top performers failed: {}", res.text);
    let campuses = res.body.as_array().expect("body should be an array");
    assert_eq!(campuses.len(), 1);
    assert_eq!(campuses[0]["campus_id"], school.campus_id);
    assert_eq!(campuses[0]["campus_name"], "Campus MAIN");
    let performers = campuses[0]["performers"]
        .as_array()
        .expect("performers should be an array");
    assert_eq!(performers.len(), 1);
    assert_eq!(performers[0]["student_id"], other);
    assert_eq!(performers[0]["student_name"], "second");
    assert_eq!(performers[0]["average_percentage"], 91.0);
    assert_eq!(performers[0]["marksheet_count"], 1);

    let all = app
        .get_with_token(routes::DASHBOARD_TOP_PERFORMERS, root)
        .await;
    assert_eq!(all.body[0]["performers"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn campus_admins_only_see_their_campus() {
    let app = TestApp::spawn().await;
    let school = app.school(&["MATH"]).await;
    let root = &school.admin_token;
    let exam = app
        .create_exam(root, school.class_id, school.subject_ids[0], "Final", 100.0)
        .await;
    app.submit_scores(root, exam, &[(school.student_id, 80.0)])
        .await;
    let north = north_admin(&app, root).await;

    let own = app
        .get_with_token(routes::DASHBOARD_TOP_PERFORMERS, &north)
        .await;
    assert_eq!(own.status, 200, "Top performers failed: {}", own.text);
    assert_eq!(own.body, json!([]));

    let foreign = app
        .get_with_token(
            &format!("{}?campus_id={}", routes::DASHBOARD_TOP_PERFORMERS, school.campus_id),
            &north,
        )
        .await;
    assert_eq!(foreign.status, 403);
}

#[tokio::test]
async fn teachers_and_students_cannot_view_the_dashboard() {
    let app = TestApp::spawn().await;
    let school = app.school(&["MATH"]).await;
    app.create_user(
        &school.admin_token,
        "teacher@school.test",
        "teacher",
        Some(school.campus_id),
    )
    .await;

    for email in ["teacher@school.test", "student@school.test"] {
        let token = app.login(email).await;
        let res = app.get_with_token(routes::DASHBOARD_OVERVIEW, &token).await;
        assert_eq!(res.status, 403, "{email} was let in");
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }

    let res = app
        .get_with_token(&format!("{}?limit=0", routes::DASHBOARD_TOP_PERFORMERS), &school.admin_token)
        .await;
    assert_eq!(res.status, 400);
}
