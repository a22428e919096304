use std::collections::HashMap;

use axum::Json;
use axum::extract::State;
use common::Role;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{campus, class, marksheet, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppQuery;
use crate::models::dashboard::*;
use crate::state::AppState;
use crate::utils::scope::admin_campus_filter;

async fn count_users(
    db: &DatabaseConnection,
    role: Role,
    campus_id: Option<i32>,
) -> Result<u64, DbErr> {
    let mut select = user::Entity::find()
        .filter(user::Column::Role.eq(role))
        .filter(user::Column::IsActive.eq(true));
    if let Some(campus_id) = campus_id {
        select = select.filter(user::Column::CampusId.eq(campus_id));
    }
    select.count(db).await
}

#[utoipa::path(
    get,
    path = "/overview",
    tag = "Dashboard",
    operation_id = "getOverviewStats",
    summary = "Headline counts",
    description = "Active campuses, classes, students and teachers. Campus-admins are scoped to their campus. Requires `dashboard:view`.",
    params(OverviewQuery),
    responses(
        (status = 200, description = "Overview counts", body = OverviewResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn overview(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<OverviewQuery>,
) -> Result<Json<OverviewResponse>, AppError> {
    auth_user.require_permission("dashboard:view")?;
    let scope = admin_campus_filter(&state.db, &auth_user, query.campus_id).await?;

    let mut campuses = campus::Entity::find().filter(campus::Column::IsActive.eq(true));
    let mut classes = class::Entity::find().filter(class::Column::IsActive.eq(true));
    if let Some(campus_id) = scope {
        campuses = campuses.filter(campus::Column::Id.eq(campus_id));
        classes = classes.filter(class::Column::CampusId.eq(campus_id));
    }

    Ok(Json(OverviewResponse {
        campus_count: campuses.count(&state.db).await?,
        class_count: classes.count(&state.db).await?,
        student_count: count_users(&state.db, Role::Student, scope).await?,
        teacher_count: count_users(&state.db, Role::Teacher, scope).await?,
    }))
}

#[utoipa::path(
    get,
    path = "/top-performers",
    tag = "Dashboard",
    operation_id = "getTopPerformers",
    summary = "Best students per campus",
    description = "Averages each student's marksheet percentage over the filtered marksheets and returns the best `limit` students of every campus. Campus-admins only see their campus. Requires `dashboard:view`.",
    params(TopPerformersQuery),
    responses(
        (status = 200, description = "Top students grouped by campus", body = Vec<CampusTopPerformers>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn top_performers(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<TopPerformersQuery>,
) -> Result<Json<Vec<CampusTopPerformers>>, AppError> {
    auth_user.require_permission("dashboard:view")?;
    let limit = validate_top_performers(&query)?;
    let scope = admin_campus_filter(&state.db, &auth_user, query.campus_id).await?;

    let mut select = marksheet::Entity::find()
        .select_only()
        .column(marksheet::Column::CampusId)
        .column(marksheet::Column::StudentId)
        .column(marksheet::Column::OverallPercentage);
    if let Some(campus_id) = scope {
        select = select.filter(marksheet::Column::CampusId.eq(campus_id));
    }
    if let Some(term) = query.term {
        select = select.filter(marksheet::Column::Term.eq(term));
    }
    if let Some(session) = &query.academic_session {
        select = select.filter(marksheet::Column::AcademicSession.eq(session.trim()));
    }
    let rows: Vec<(i32, i32, f64)> = select.into_tuple().all(&state.db).await?;

    let ranked = rank_top_performers(&rows, limit as usize);
    if ranked.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let student_ids: Vec<i32> = ranked.values().flatten().map(|s| s.0).collect();
    let names: HashMap<i32, String> = user::Entity::find()
        .filter(user::Column::Id.is_in(student_ids))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|u| (u.id, u.name))
        .collect();
    let campus_names: HashMap<i32, String> = campus::Entity::find()
        .filter(campus::Column::Id.is_in(ranked.keys().copied().collect::<Vec<_>>()))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect();

    let data = ranked
        .into_iter()
        .map(|(campus_id, students)| CampusTopPerformers {
            campus_id,
            campus_name: campus_names.get(&campus_id).cloned().unwrap_or_default(),
            performers: students
                .into_iter()
                .map(|(student_id, average_percentage, marksheet_count)| TopPerformer {
                    student_id,
                    student_name: names.get(&student_id).cloned().unwrap_or_default(),
                    average_percentage,
                    marksheet_count,
                })
                .collect(),
        })
        .collect();

    Ok(Json(data))
}
