use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/auth", auth_routes())
        .nest("/campuses", campus_routes())
        .nest("/subjects", subject_routes())
        .nest("/classes", class_routes())
        .nest("/enrollments", enrollment_routes())
        .nest("/assignments", assignment_routes())
        .nest("/exams", exam_routes())
        .nest("/scores", score_routes())
        .nest("/marksheets", marksheet_routes())
        .nest("/attendance", attendance_routes())
        .nest("/teacher-attendance", teacher_attendance_routes())
        .nest("/dashboard", dashboard_routes())
}

fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::auth::login))
        .routes(routes!(handlers::auth::me))
        .routes(routes!(
            handlers::auth::create_user,
            handlers::auth::list_users
        ))
        .routes(routes!(handlers::auth::update_user))
}

fn campus_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::campus::create_campus,
            handlers::campus::list_campuses
        ))
        .routes(routes!(
            handlers::campus::get_campus,
            handlers::campus::update_campus,
            handlers::campus::deactivate_campus
        ))
}

fn subject_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::subject::create_subject,
            handlers::subject::list_subjects
        ))
        .routes(routes!(
            handlers::subject::get_subject,
            handlers::subject::update_subject,
            handlers::subject::delete_subject
        ))
}

fn class_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::class::create_class,
            handlers::class::list_classes
        ))
        .routes(routes!(
            handlers::class::get_class,
            handlers::class::update_class,
            handlers::class::deactivate_class
        ))
}

fn enrollment_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::enrollment::create_enrollment,
            handlers::enrollment::list_enrollments
        ))
        .routes(routes!(
            handlers::enrollment::update_enrollment,
            handlers::enrollment::deactivate_enrollment
        ))
}

fn assignment_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::assignment::create_assignment,
            handlers::assignment::list_assignments
        ))
        .routes(routes!(handlers::assignment::deactivate_assignment))
}

fn exam_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::exam::create_exam,
            handlers::exam::list_exams
        ))
        .routes(routes!(
            handlers::exam::get_exam,
            handlers::exam::update_exam,
            handlers::exam::delete_exam
        ))
}

fn score_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::score::submit_scores,
            handlers::score::list_exam_scores
        ))
        .routes(routes!(
            handlers::score::update_score,
            handlers::score::delete_score
        ))
}

fn marksheet_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::marksheet::list_marksheets))
        .routes(routes!(handlers::marksheet::get_marksheet))
        .routes(routes!(handlers::marksheet::recompute_marksheet))
        .routes(routes!(handlers::marksheet::rank_marksheets))
}

fn attendance_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::attendance::mark_attendance,
            handlers::attendance::list_attendance
        ))
        .routes(routes!(
            handlers::attendance::update_attendance,
            handlers::attendance::delete_attendance
        ))
}

fn teacher_attendance_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::teacher_attendance::check_in))
        .routes(routes!(handlers::teacher_attendance::check_out))
        .routes(routes!(handlers::teacher_attendance::list_teacher_attendance))
        .routes(routes!(handlers::teacher_attendance::get_teacher_attendance))
        .routes(routes!(
            handlers::teacher_attendance::update_teacher_attendance,
            handlers::teacher_attendance::delete_teacher_attendance
        ))
}

fn dashboard_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::dashboard::overview))
        .routes(routes!(handlers::dashboard::top_performers))
}
