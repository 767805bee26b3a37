use axum::{
    extract::{Path, State},
    Json,
};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::AuthUser,
    error::{AppError, Result},
    models::job_location::{CreateJobLocationRequest, JobLocation, UpdateJobLocationRequest},
};

pub async fn list(State(pool): State<PgPool>, auth: AuthUser) -> Result<Json<Vec<JobLocation>>> {
    let rows = sqlx::query_as::<_, JobLocation>(
        r#"
        SELECT id, org_id, name, address, is_active, created_at
        FROM job_locations
        WHERE org_id = $1 AND is_active = true
        ORDER BY name
        "#,
    )
    .bind(auth.org_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(rows))
}

pub async fn create(
    State(pool): State<PgPool>,
    auth: AuthUser,
    Json(req): Json<CreateJobLocationRequest>,
) -> Result<Json<JobLocation>> {
    req.validate()?;

    if !auth.role.can_manage_org() {
        return Err(AppError::Forbidden);
    }

    let row = sqlx::query_as::<_, JobLocation>(
        r#"
        INSERT INTO job_locations (id, org_id, name, address)
        VALUES ($1, $2, $3, $4)
        RETURNING id, org_id, name, address, is_active, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(auth.org_id)
    .bind(req.name.trim())
    .bind(req.address.as_deref())
    .fetch_one(&pool)
    .await?;

    Ok(Json(row))
}

pub async fn update(
    State(pool): State<PgPool>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateJobLocationRequest>,
) -> Result<Json<JobLocation>> {
    req.validate()?;

    if !auth.role.can_manage_org() {
        return Err(AppError::Forbidden);
    }

    let row = sqlx::query_as::<_, JobLocation>(
        r#"
        UPDATE job_locations
        SET name      = COALESCE($2, name),
            address   = COALESCE($3, address),
            is_active = COALESCE($4, is_active)
        WHERE id = $1 AND org_id = $5
        RETURNING id, org_id, name, address, is_active, created_at
        "#,
    )
    .bind(id)
    .bind(req.name.as_deref().map(str::trim))
    .bind(req.address.as_deref())
    .bind(req.is_active)
    .bind(auth.org_id)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Job location not found".into()))?;

    Ok(Json(row))
}
