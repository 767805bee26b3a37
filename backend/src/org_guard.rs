//! Org-boundary validation helpers.
//!
//! Every function verifies that a given resource belongs to the caller's
//! organization and returns `AppError::NotFound` if it doesn't (we don't
//! reveal that the resource exists in another org).

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, Result};

pub async fn verify_member(pool: &PgPool, user_id: Uuid, org_id: Uuid) -> Result<()> {
    let ok: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM organization_members m
            JOIN users u ON u.id = m.user_id
            WHERE m.user_id = $1 AND m.org_id = $2 AND u.is_active = true
        )
        "#,
    )
    .bind(user_id)
    .bind(org_id)
    .fetch_one(pool)
    .await?;

    if !ok {
        return Err(AppError::NotFound("User not found".into()));
    }
    Ok(())
}

pub async fn verify_job_location(pool: &PgPool, location_id: Uuid, org_id: Uuid) -> Result<()> {
    let ok: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM job_locations WHERE id = $1 AND org_id = $2 AND is_active = true)",
    )
    .bind(location_id)
    .bind(org_id)
    .fetch_one(pool)
    .await?;

    if !ok {
        return Err(AppError::NotFound("Job location not found".into()));
    }
    Ok(())
}
