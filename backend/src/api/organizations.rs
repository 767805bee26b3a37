use axum::{extract::State, Json};
use sqlx::PgPool;

use crate::{
    auth::AuthUser,
    error::{AppError, Result},
    models::organization::Organization,
};

/// The caller's own organization.
pub async fn current(State(pool): State<PgPool>, auth: AuthUser) -> Result<Json<Organization>> {
    let org = sqlx::query_as::<_, Organization>(
        "SELECT id, name, slug, timezone, created_at, updated_at
         FROM organizations WHERE id = $1",
    )
    .bind(auth.org_id)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Organization {} not found", auth.org_id)))?;

    Ok(Json(org))
}
