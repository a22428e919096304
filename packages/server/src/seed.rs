use chrono::Utc;
use common::Role;
use sea_orm::*;
use sea_orm::sea_query::{Index, IndexCreateStatement, PostgresQueryBuilder};
use tracing::{info, warn};

use crate::config::BootstrapConfig;
use crate::entity::{
    attendance, class, class_subject, enrollment, exam, marksheet, role_permission, score,
    teacher_assignment, teacher_attendance, user,
};
use crate::utils::hash::hash_password;

/// Default role-permission mappings seeded on startup.
const DEFAULT_MAPPINGS: &[(Role, &str)] = &[
    // Super-admin: everything
    (Role::SuperAdmin, "campus:manage"),
    (Role::SuperAdmin, "subject:manage"),
    (Role::SuperAdmin, "class:manage"),
    (Role::SuperAdmin, "class:view"),
    (Role::SuperAdmin, "user:manage"),
    (Role::SuperAdmin, "enrollment:manage"),
    (Role::SuperAdmin, "assignment:manage"),
    (Role::SuperAdmin, "exam:manage"),
    (Role::SuperAdmin, "score:write"),
    (Role::SuperAdmin, "score:delete"),
    (Role::SuperAdmin, "score:view"),
    (Role::SuperAdmin, "marksheet:view"),
    (Role::SuperAdmin, "marksheet:manage"),
    (Role::SuperAdmin, "attendance:mark"),
    (Role::SuperAdmin, "attendance:manage"),
    (Role::SuperAdmin, "teacher_attendance:mark"),
    (Role::SuperAdmin, "teacher_attendance:manage"),
    (Role::SuperAdmin, "dashboard:view"),
    // Campus-admin: own campus only, enforced per handler
    (Role::CampusAdmin, "class:manage"),
    (Role::CampusAdmin, "class:view"),
    (Role::CampusAdmin, "user:manage"),
    (Role::CampusAdmin, "enrollment:manage"),
    (Role::CampusAdmin, "assignment:manage"),
    (Role::CampusAdmin, "exam:manage"),
    (Role::CampusAdmin, "score:write"),
    (Role::CampusAdmin, "score:delete"),
    (Role::CampusAdmin, "score:view"),
    (Role::CampusAdmin, "marksheet:view"),
    (Role::CampusAdmin, "marksheet:manage"),
    (Role::CampusAdmin, "attendance:mark"),
    (Role::CampusAdmin, "attendance:manage"),
    (Role::CampusAdmin, "teacher_attendance:mark"),
    (Role::CampusAdmin, "teacher_attendance:manage"),
    (Role::CampusAdmin, "dashboard:view"),
    // Teacher
    (Role::Teacher, "class:view"),
    (Role::Teacher, "score:write"),
    (Role::Teacher, "score:view"),
    (Role::Teacher, "marksheet:view"),
    (Role::Teacher, "attendance:mark"),
    (Role::Teacher, "teacher_attendance:mark"),
    // Student
    (Role::Student, "marksheet:view"),
];

/// Seed the `role_permission` table with defaults.
pub async fn seed_role_permissions(db: &DatabaseConnection) -> Result<(), DbErr> {
    let mut perms_inserted = 0u32;
    for &(role, permission) in DEFAULT_MAPPINGS {
        let model = role_permission::ActiveModel {
            role: Set(role.as_str().to_string()),
            permission: Set(permission.to_string()),
        };

        let result = role_permission::Entity::insert(model)
            .on_conflict(
                sea_orm::sea_query::OnConflict::columns([
                    role_permission::Column::Role,
                    role_permission::Column::Permission,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(db)
            .await;

        match result {
            Ok(_) => perms_inserted += 1,
            Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    if perms_inserted > 0 {
        info!("Seeded {} new role-permission mappings", perms_inserted);
    }

    Ok(())
}

async fn create_unique_index(
    db: &DatabaseConnection,
    name: &str,
    stmt: &mut IndexCreateStatement,
) -> Result<(), DbErr> {
    let sql = stmt
        .if_not_exists()
        .unique()
        .name(name)
        .to_string(PostgresQueryBuilder);
    db.execute_unprepared(&sql).await?;
    info!("Ensured index {} exists", name);
    Ok(())
}

/// Ensure required database indexes exist.
///
/// SeaORM's schema-sync doesn't create composite unique indexes, so they are
/// created manually on startup. The marksheet and score indexes back the
/// `ON CONFLICT` upserts, so failing to create them aborts startup.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    create_unique_index(
        db,
        "idx_score_student_exam",
        Index::create()
            .table(score::Entity)
            .col(score::Column::StudentId)
            .col(score::Column::ExamId),
    )
    .await?;

    create_unique_index(
        db,
        "idx_marksheet_key",
        Index::create()
            .table(marksheet::Entity)
            .col(marksheet::Column::StudentId)
            .col(marksheet::Column::ClassId)
            .col(marksheet::Column::Term)
            .col(marksheet::Column::AcademicSession),
    )
    .await?;

    create_unique_index(
        db,
        "idx_exam_definition",
        Index::create()
            .table(exam::Entity)
            .col(exam::Column::Term)
            .col(exam::Column::AcademicSession)
            .col(exam::Column::ClassId)
            .col(exam::Column::SubjectId)
            .col(exam::Column::CampusId)
            .col(exam::Column::ExamType),
    )
    .await?;

    create_unique_index(
        db,
        "idx_class_campus_grade_section",
        Index::create()
            .table(class::Entity)
            .col(class::Column::CampusId)
            .col(class::Column::Grade)
            .col(class::Column::Section),
    )
    .await?;

    create_unique_index(
        db,
        "idx_class_subject_position",
        Index::create()
            .table(class_subject::Entity)
            .col(class_subject::Column::ClassId)
            .col(class_subject::Column::Position),
    )
    .await?;

    create_unique_index(
        db,
        "idx_enrollment_student_campus_class",
        Index::create()
            .table(enrollment::Entity)
            .col(enrollment::Column::StudentId)
            .col(enrollment::Column::CampusId)
            .col(enrollment::Column::ClassId),
    )
    .await?;

    create_unique_index(
        db,
        "idx_teacher_assignment_triple",
        Index::create()
            .table(teacher_assignment::Entity)
            .col(teacher_assignment::Column::TeacherId)
            .col(teacher_assignment::Column::CampusId)
            .col(teacher_assignment::Column::ClassId)
            .col(teacher_assignment::Column::SubjectId),
    )
    .await?;

    create_unique_index(
        db,
        "idx_attendance_enrollment_date",
        Index::create()
            .table(attendance::Entity)
            .col(attendance::Column::EnrollmentId)
            .col(attendance::Column::Date),
    )
    .await?;

    create_unique_index(
        db,
        "idx_teacher_attendance_teacher_date",
        Index::create()
            .table(teacher_attendance::Entity)
            .col(teacher_attendance::Column::TeacherId)
            .col(teacher_attendance::Column::Date),
    )
    .await?;

    // Completion checks look up a student's scores per class:
    // SELECT ... FROM score WHERE student_id = ? AND class_id = ?
    let stmt = Index::create()
        .if_not_exists()
        .name("idx_score_student_class")
        .table(score::Entity)
        .col(score::Column::StudentId)
        .col(score::Column::ClassId)
        .to_string(PostgresQueryBuilder);
    match db.execute_unprepared(&stmt).await {
        Ok(_) => info!("Ensured index idx_score_student_class exists"),
        Err(e) => warn!("Failed to create index idx_score_student_class: {}", e),
    }

    // Campus codes are only reserved while the campus is active.
    let result = db
        .execute_unprepared(
            r#"CREATE UNIQUE INDEX IF NOT EXISTS "idx_campus_code_active" ON "campus" ("code") WHERE "is_active""#,
        )
        .await;
    match result {
        Ok(_) => info!("Ensured index idx_campus_code_active exists"),
        Err(e) => warn!("Failed to create index idx_campus_code_active: {}", e),
    }

    Ok(())
}

/// Create the configured super-admin account if no user has that email yet.
pub async fn ensure_super_admin(
    db: &DatabaseConnection,
    bootstrap: &BootstrapConfig,
) -> Result<(), DbErr> {
    let (Some(name), Some(email), Some(password)) = (
        bootstrap.super_admin_name.as_deref(),
        bootstrap.super_admin_email.as_deref(),
        bootstrap.super_admin_password.as_deref(),
    ) else {
        return Ok(());
    };

    let email = email.trim().to_lowercase();
    let existing = user::Entity::find()
        .filter(user::Column::Email.eq(email.as_str()))
        .one(db)
        .await?;
    if existing.is_some() {
        return Ok(());
    }

    let password_hash = hash_password(password).map_err(|e| DbErr::Custom(e.to_string()))?;

    user::ActiveModel {
        name: Set(name.trim().to_string()),
        email: Set(email.clone()),
        password: Set(password_hash),
        role: Set(Role::SuperAdmin),
        campus_id: Set(None),
        is_active: Set(true),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(%email, "Created bootstrap super-admin");
    Ok(())
}
