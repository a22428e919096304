use serde_json::json;

use crate::common::{PASSWORD, SUPER_ADMIN_EMAIL, TestApp, TestResponse, routes};

mod login {
    use super::*;

    #[tokio::test]
    async fn bootstrapped_super_admin_can_login_and_receives_token() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::LOGIN,
                &json!({"email": SUPER_ADMIN_EMAIL, "password": PASSWORD}),
            )
            .await;

        assert_eq!(res.status, 200, "Login failed: {}", res.text);
        assert!(res.body["token"].is_string());
        assert_eq!(res.body["user"]["email"], SUPER_ADMIN_EMAIL);
        assert_eq!(res.body["user"]["role"], "super-admin");
        let permissions = res.body["permissions"]
            .as_array()
            .expect("permissions should be an array");
        assert!(permissions.contains(&json!("campus:manage")));
    }

    #[tokio::test]
    async fn email_is_matched_case_insensitively() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::LOGIN,
                &json!({"email": SUPER_ADMIN_EMAIL.to_uppercase(), "password": PASSWORD}),
            )
            .await;

        assert_eq!(res.status, 200, "Login failed: {}", res.text);
    }

    #[tokio::test]
    async fn cannot_login_with_wrong_password() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::LOGIN,
                &json!({"email": SUPER_ADMIN_EMAIL, "password": "wrongpass"}),
            )
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn cannot_login_with_unknown_email() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::LOGIN,
                &json!({"email": "nobody@school.test", "password": PASSWORD}),
            )
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn deactivated_account_cannot_login() {
        let app = TestApp::spawn().await;
        let school = app.school(&["MATH"]).await;

        let res = app
            .patch_with_token(
                &routes::user(school.student_id),
                &json!({"is_active": false}),
                &school.admin_token,
            )
            .await;
        assert_eq!(res.status, 200, "Deactivation failed: {}", res.text);

        let res = app
            .post_without_token(
                routes::LOGIN,
                &json!({"email": "student@school.test", "password": PASSWORD}),
            )
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "INVALID_CREDENTIALS");
    }
}

mod request_validation {
    use super::*;

    #[tokio::test]
    async fn malformed_json_body_returns_validation_error() {
        let app = TestApp::spawn().await;

        let res = app
            .client
            .post(format!("http://{}{}", app.addr, routes::LOGIN))
            .header("Content-Type", "application/json")
            .body("not valid json")
            .send()
            .await
            .expect("Failed to send request");

        let res = TestResponse::from_response(res).await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn missing_required_fields_returns_validation_error() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(routes::LOGIN, &json!({"email": SUPER_ADMIN_EMAIL}))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
}

mod authenticated_access {
    use super::*;

    #[tokio::test]
    async fn authenticated_user_can_retrieve_their_profile() {
        let app = TestApp::spawn().await;
        let token = app.super_admin_token().await;

        let res = app.get_with_token(routes::ME, &token).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["email"], SUPER_ADMIN_EMAIL);
        assert!(res.body["id"].is_number());
        assert_eq!(res.body["role"], "super-admin");
        assert!(res.body["permissions"].is_array());
    }

    #[tokio::test]
    async fn request_without_token_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(routes::ME).await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_MISSING");
    }

    #[tokio::test]
    async fn request_with_malformed_token_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app.get_with_token(routes::ME, "not-a-valid-jwt").await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_INVALID");
    }
}

mod account_creation {
    use super::*;

    #[tokio::test]
    async fn super_admin_cannot_create_another_super_admin() {
        let app = TestApp::spawn().await;
        let token = app.super_admin_token().await;

        let res = app
            .post_with_token(
                routes::USERS,
                &json!({
                    "name": "Second Root",
                    "email": "root2@school.test",
                    "password": PASSWORD,
                    "role": "super-admin",
                }),
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn teacher_requires_a_campus_when_created_by_super_admin() {
        let app = TestApp::spawn().await;
        let token = app.super_admin_token().await;

        let res = app
            .post_with_token(
                routes::USERS,
                &json!({
                    "name": "Teacher",
                    "email": "teacher@school.test",
                    "password": PASSWORD,
                    "role": "teacher",
                }),
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let app = TestApp::spawn().await;
        let school = app.school(&["MATH"]).await;

        let res = app
            .post_with_token(
                routes::USERS,
                &json!({
                    "name": "Copy",
                    "email": "Student@School.test",
                    "password": PASSWORD,
                    "role": "student",
                    "campus_id": school.campus_id,
                }),
                &school.admin_token,
            )
            .await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "EMAIL_TAKEN");
    }

    #[tokio::test]
    async fn campus_admin_creates_accounts_only_on_their_campus() {
        let app = TestApp::spawn().await;
        let root = app.super_admin_token().await;
        let admin_id = app
            .create_user(&root, "admin@school.test", "campus-admin", None)
            .await;
        let campus_id = app.create_campus(&root, "NORTH", Some(admin_id)).await;
        let other_campus = app.create_campus(&root, "SOUTH", None).await;
        let admin = app.login("admin@school.test").await;

        let res = app
            .post_with_token(
                routes::USERS,
                &json!({
                    "name": "Teacher",
                    "email": "teacher@school.test",
                    "password": PASSWORD,
                    "role": "teacher",
                }),
                &admin,
            )
            .await;
        assert_eq!(res.status, 201, "create failed: {}", res.text);
        assert_eq!(res.body["campus_id"], campus_id);

        let res = app
            .post_with_token(
                routes::USERS,
                &json!({
                    "name": "Elsewhere",
                    "email": "elsewhere@school.test",
                    "password": PASSWORD,
                    "role": "student",
                    "campus_id": other_campus,
                }),
                &admin,
            )
            .await;
        assert_eq!(res.status, 403);

        let res = app
            .post_with_token(
                routes::USERS,
                &json!({
                    "name": "Peer",
                    "email": "peer@school.test",
                    "password": PASSWORD,
                    "role": "campus-admin",
                }),
                &admin,
            )
            .await;
        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }

    #[tokio::test]
    async fn students_cannot_manage_users() {
        let app = TestApp::spawn().await;
        app.school(&["MATH"]).await;
        let student = app.login("student@school.test").await;

        let res = app.get_with_token(routes::USERS, &student).await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }
}
