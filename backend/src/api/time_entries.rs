use axum::{
    extract::{Path, Query, State},
    Json,
};
use sqlx::PgPool;
use time::{Date, OffsetDateTime};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::AuthUser,
    error::{AppError, Result},
    models::{
        common::DateRangeParams,
        time_entry::{
            ApprovalStatus, ClockInRequest, ClockOutRequest, EmployeeTimeEntry,
            ReviewTimeEntryRequest,
        },
    },
    org_guard,
    reports::hours,
    store::postgres::TIME_ENTRY_SELECT,
};

async fn fetch_entry(pool: &PgPool, id: Uuid) -> Result<EmployeeTimeEntry> {
    let entry = sqlx::query_as::<_, EmployeeTimeEntry>(&format!(
        "{TIME_ENTRY_SELECT} WHERE te.id = $1"
    ))
    .bind(id)
    .fetch_one(pool)
    .await?;

    Ok(entry)
}

/// Recompute regular/OT for one employee-week from its non-rejected entries.
async fn refresh_weekly_summary(
    pool: &PgPool,
    org_id: Uuid,
    employee_id: Uuid,
    work_date: Date,
) -> Result<()> {
    let week_start = hours::week_start(work_date);

    let total: f64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(worked_hours), 0)::FLOAT8
        FROM time_entries
        WHERE org_id = $1 AND employee_id = $2
          AND work_date BETWEEN $3::date AND $3::date + 6
          AND status <> 'rejected'
        "#,
    )
    .bind(org_id)
    .bind(employee_id)
    .bind(week_start)
    .fetch_one(pool)
    .await?;

    let (regular, overtime) = hours::split_overtime(total);

    sqlx::query(
        r#"
        INSERT INTO weekly_summaries (org_id, employee_id, week_start, total_regular, total_ot)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (org_id, employee_id, week_start)
        DO UPDATE SET total_regular = EXCLUDED.total_regular,
                      total_ot      = EXCLUDED.total_ot,
                      updated_at    = NOW()
        "#,
    )
    .bind(org_id)
    .bind(employee_id)
    .bind(week_start)
    .bind(regular)
    .bind(overtime)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn clock_in(
    State(pool): State<PgPool>,
    auth: AuthUser,
    Json(req): Json<ClockInRequest>,
) -> Result<Json<EmployeeTimeEntry>> {
    req.validate()?;

    if let Some(location_id) = req.job_location_id {
        org_guard::verify_job_location(&pool, location_id, auth.org_id).await?;
    }

    let open: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM time_entries
                       WHERE org_id = $1 AND employee_id = $2 AND clock_out IS NULL)",
    )
    .bind(auth.org_id)
    .bind(auth.id)
    .fetch_one(&pool)
    .await?;

    if open {
        return Err(AppError::Conflict("You are already clocked in".into()));
    }

    let timezone: String = sqlx::query_scalar("SELECT timezone FROM organizations WHERE id = $1")
        .bind(auth.org_id)
        .fetch_one(&pool)
        .await?;

    let now = OffsetDateTime::now_utc();
    let id = Uuid::new_v4();

    // The partial unique index still catches a concurrent second clock-in (409).
    sqlx::query(
        r#"
        INSERT INTO time_entries (id, org_id, employee_id, work_date, clock_in, job_location_id, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(id)
    .bind(auth.org_id)
    .bind(auth.id)
    .bind(hours::local_work_date(now, &timezone))
    .bind(now)
    .bind(req.job_location_id)
    .bind(req.notes.as_deref())
    .execute(&pool)
    .await?;

    tracing::info!(entry_id = %id, user_id = %auth.id, "Clocked in");
    Ok(Json(fetch_entry(&pool, id).await?))
}

pub async fn clock_out(
    State(pool): State<PgPool>,
    auth: AuthUser,
    Json(req): Json<ClockOutRequest>,
) -> Result<Json<EmployeeTimeEntry>> {
    req.validate()?;

    let (id, clock_in, work_date): (Uuid, OffsetDateTime, Date) = sqlx::query_as(
        "SELECT id, clock_in, work_date FROM time_entries
         WHERE org_id = $1 AND employee_id = $2 AND clock_out IS NULL",
    )
    .bind(auth.org_id)
    .bind(auth.id)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| AppError::Conflict("You are not clocked in".into()))?;

    let now = OffsetDateTime::now_utc();
    let worked = hours::worked_hours(clock_in, now, req.lunch_minutes);

    sqlx::query(
        r#"
        UPDATE time_entries
        SET clock_out     = $2,
            lunch_minutes = $3,
            worked_hours  = $4,
            notes         = COALESCE($5, notes)
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(now)
    .bind(req.lunch_minutes)
    .bind(worked)
    .bind(req.notes.as_deref())
    .execute(&pool)
    .await?;

    refresh_weekly_summary(&pool, auth.org_id, auth.id, work_date).await?;

    tracing::info!(entry_id = %id, user_id = %auth.id, worked_hours = worked, "Clocked out");
    Ok(Json(fetch_entry(&pool, id).await?))
}

/// Own entries for employees; every member's entries for managers and admins.
pub async fn list(
    State(pool): State<PgPool>,
    auth: AuthUser,
    Query(params): Query<DateRangeParams>,
) -> Result<Json<Vec<EmployeeTimeEntry>>> {
    if let (Some(start), Some(end)) = (params.start_date, params.end_date) {
        if end < start {
            return Err(AppError::BadRequest("end_date must be >= start_date".into()));
        }
    }

    let see_all = auth.role.can_review_time();

    let rows = sqlx::query_as::<_, EmployeeTimeEntry>(&format!(
        "{TIME_ENTRY_SELECT}
         WHERE te.org_id = $1
           AND ($2 OR te.employee_id = $3)
           AND ($4::date IS NULL OR te.work_date >= $4)
           AND ($5::date IS NULL OR te.work_date <= $5)
         ORDER BY te.work_date DESC, te.clock_in DESC
         LIMIT $6 OFFSET $7"
    ))
    .bind(auth.org_id)
    .bind(see_all)
    .bind(auth.id)
    .bind(params.start_date)
    .bind(params.end_date)
    .bind(params.limit())
    .bind(params.offset())
    .fetch_all(&pool)
    .await?;

    Ok(Json(rows))
}

pub async fn review(
    State(pool): State<PgPool>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<ReviewTimeEntryRequest>,
) -> Result<Json<EmployeeTimeEntry>> {
    if !auth.role.can_review_time() {
        return Err(AppError::Forbidden);
    }

    if req.status == ApprovalStatus::Pending {
        return Err(AppError::BadRequest(
            "status must be 'approved' or 'rejected'".into(),
        ));
    }

    let (employee_id, work_date): (Uuid, Date) = sqlx::query_as(
        r#"
        UPDATE time_entries
        SET status = $2, reviewed_by = $3
        WHERE id = $1 AND org_id = $4 AND clock_out IS NOT NULL
        RETURNING employee_id, work_date
        "#,
    )
    .bind(id)
    .bind(req.status)
    .bind(auth.id)
    .bind(auth.org_id)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Time entry not found or still open".into()))?;

    refresh_weekly_summary(&pool, auth.org_id, employee_id, work_date).await?;

    tracing::info!(entry_id = %id, status = ?req.status, reviewer = %auth.id, "Time entry reviewed");
    Ok(Json(fetch_entry(&pool, id).await?))
}
