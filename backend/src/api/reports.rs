use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use time::{Date, OffsetDateTime};

use crate::{
    auth::AuthUser,
    error::{AppError, Result},
    models::{common::WeekParams, report::WeeklyEmployeeHours},
    reports::{self, csv, hours},
    AppState,
};

/// Fetch the week's rows and run the reconciliation check over them. The
/// check only logs; rows are returned as stored.
async fn load_week(
    state: &AppState,
    auth: &AuthUser,
    params: &WeekParams,
) -> Result<(Date, Vec<WeeklyEmployeeHours>)> {
    if !auth.role.can_review_time() {
        return Err(AppError::Forbidden);
    }

    let week_start = match params.week_start {
        Some(date) => hours::week_start(date),
        None => {
            let timezone: String =
                sqlx::query_scalar("SELECT timezone FROM organizations WHERE id = $1")
                    .bind(auth.org_id)
                    .fetch_one(&state.pool)
                    .await?;
            hours::current_week_start(OffsetDateTime::now_utc(), &timezone)
        }
    };

    let rows = state.timesheets.weekly_hours(auth.org_id, week_start).await?;

    let mismatches =
        reports::reconcile_weekly_hours(state.timesheets.as_ref(), auth.org_id, week_start, &rows)
            .await;
    if !mismatches.is_empty() {
        tracing::warn!(
            org_id = %auth.org_id,
            %week_start,
            count = mismatches.len(),
            "Weekly hours report has inconsistent rows"
        );
    }

    Ok((week_start, rows))
}

pub async fn weekly_hours(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<WeekParams>,
) -> Result<Json<Vec<WeeklyEmployeeHours>>> {
    let (_, rows) = load_week(&state, &auth, &params).await?;
    Ok(Json(rows))
}

pub async fn export_weekly_hours(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<WeekParams>,
) -> Result<impl IntoResponse> {
    let (week_start, rows) = load_week(&state, &auth, &params).await?;

    let body = csv::to_csv(&rows)
        .map_err(|e| AppError::Internal(e.context("CSV export failed")))?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"weekly-hours-{}.csv\"", week_start),
            ),
        ],
        body,
    ))
}
