use common::Role;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};

use crate::entity::{campus, class, exam, subject, teacher_assignment, user};
use crate::error::AppError;
use crate::extractors::auth::AuthUser;

/// Look up a campus by ID, returning 404 if not found.
pub async fn find_campus<C: ConnectionTrait>(db: &C, id: i32) -> Result<campus::Model, AppError> {
    campus::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Campus not found".into()))
}

/// Look up a class by ID, returning 404 if not found.
pub async fn find_class<C: ConnectionTrait>(db: &C, id: i32) -> Result<class::Model, AppError> {
    class::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Class not found".into()))
}

/// Look up a subject by ID, returning 404 if not found.
pub async fn find_subject<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<subject::Model, AppError> {
    subject::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Subject not found".into()))
}

/// Look up an exam by ID, returning 404 if not found.
pub async fn find_exam<C: ConnectionTrait>(db: &C, id: i32) -> Result<exam::Model, AppError> {
    exam::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Exam not found".into()))
}

/// Look up a user by ID, returning 404 if not found.
pub async fn find_user<C: ConnectionTrait>(db: &C, id: i32) -> Result<user::Model, AppError> {
    user::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

/// The active campus managed by a campus-admin.
pub async fn find_admin_campus<C: ConnectionTrait>(
    db: &C,
    admin_id: i32,
) -> Result<campus::Model, AppError> {
    campus::Entity::find()
        .filter(campus::Column::AdminId.eq(admin_id))
        .filter(campus::Column::IsActive.eq(true))
        .one(db)
        .await?
        .ok_or_else(|| {
            AppError::Forbidden("You are not assigned as campus admin to any campus".into())
        })
}

/// Restrict a campus-admin to their own campus. Super-admins pass; every
/// other role is denied.
pub async fn require_campus_admin_of<C: ConnectionTrait>(
    db: &C,
    auth_user: &AuthUser,
    campus_id: i32,
) -> Result<(), AppError> {
    match auth_user.role {
        Role::SuperAdmin => Ok(()),
        Role::CampusAdmin => {
            let own = find_admin_campus(db, auth_user.user_id).await?;
            if own.id == campus_id {
                Ok(())
            } else {
                Err(AppError::Forbidden(
                    "You can only manage records of your own campus".into(),
                ))
            }
        }
        Role::Teacher | Role::Student => Err(AppError::PermissionDenied),
    }
}

/// The campus filter an admin listing must apply: `None` for super-admins
/// (optionally narrowed by the caller's own filter), the managed campus for
/// campus-admins.
pub async fn admin_campus_filter<C: ConnectionTrait>(
    db: &C,
    auth_user: &AuthUser,
    requested: Option<i32>,
) -> Result<Option<i32>, AppError> {
    match auth_user.role {
        Role::SuperAdmin => Ok(requested),
        Role::CampusAdmin => {
            let own = find_admin_campus(db, auth_user.user_id).await?;
            if requested.is_some_and(|id| id != own.id) {
                return Err(AppError::Forbidden(
                    "You can only access records of your own campus".into(),
                ));
            }
            Ok(Some(own.id))
        }
        Role::Teacher | Role::Student => Err(AppError::PermissionDenied),
    }
}

/// What a teacher may grade or view: their class-teacher class (all subjects)
/// plus every active (campus, class, subject) assignment.
#[derive(Debug, Default)]
pub struct TeacherScope {
    pub class_teacher_of: Option<class::Model>,
    pub assignments: Vec<(i32, i32, i32)>,
}

impl TeacherScope {
    pub fn is_empty(&self) -> bool {
        self.class_teacher_of.is_none() && self.assignments.is_empty()
    }

    pub fn can_grade(&self, campus_id: i32, class_id: i32, subject_id: i32) -> bool {
        let as_class_teacher = self
            .class_teacher_of
            .as_ref()
            .is_some_and(|c| c.id == class_id && c.campus_id == campus_id);
        as_class_teacher
            || self
                .assignments
                .iter()
                .any(|&(cp, cl, sb)| cp == campus_id && cl == class_id && sb == subject_id)
    }

    /// Class IDs whose scores the teacher may read (any subject for the
    /// class-teacher class, assigned subjects otherwise).
    pub fn class_ids(&self) -> Vec<i32> {
        let mut ids: Vec<i32> = self.assignments.iter().map(|&(_, cl, _)| cl).collect();
        if let Some(c) = &self.class_teacher_of {
            ids.push(c.id);
        }
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

pub async fn load_teacher_scope<C: ConnectionTrait>(
    db: &C,
    teacher_id: i32,
) -> Result<TeacherScope, AppError> {
    let class_teacher_of = class::Entity::find()
        .filter(class::Column::ClassTeacherId.eq(teacher_id))
        .filter(class::Column::IsActive.eq(true))
        .one(db)
        .await?;

    let assignments = teacher_assignment::Entity::find()
        .filter(teacher_assignment::Column::TeacherId.eq(teacher_id))
        .filter(teacher_assignment::Column::IsActive.eq(true))
        .all(db)
        .await?
        .into_iter()
        .map(|a| (a.campus_id, a.class_id, a.subject_id))
        .collect();

    Ok(TeacherScope {
        class_teacher_of,
        assignments,
    })
}

/// Check the caller may write scores for a (campus, class, subject) triple.
pub async fn require_grading_access<C: ConnectionTrait>(
    db: &C,
    auth_user: &AuthUser,
    campus_id: i32,
    class_id: i32,
    subject_id: i32,
) -> Result<(), AppError> {
    match auth_user.role {
        Role::SuperAdmin | Role::CampusAdmin => {
            require_campus_admin_of(db, auth_user, campus_id).await
        }
        Role::Teacher => {
            let scope = load_teacher_scope(db, auth_user.user_id).await?;
            if scope.is_empty() {
                return Err(AppError::Forbidden(
                    "You don't have any active assignments or class".into(),
                ));
            }
            if scope.can_grade(campus_id, class_id, subject_id) {
                Ok(())
            } else {
                Err(AppError::Forbidden(
                    "You can only grade your assigned or class-teacher classes/subjects".into(),
                ))
            }
        }
        Role::Student => Err(AppError::PermissionDenied),
    }
}
