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
    models::department::{CreateDepartmentRequest, Department, UpdateDepartmentRequest},
    org_guard,
};

const DEPARTMENT_COLUMNS: &str = "id, org_id, name, description, manager_id, is_active, created_at";

pub async fn list(State(pool): State<PgPool>, auth: AuthUser) -> Result<Json<Vec<Department>>> {
    let rows = sqlx::query_as::<_, Department>(&format!(
        "SELECT {DEPARTMENT_COLUMNS} FROM departments
         WHERE org_id = $1
         ORDER BY name"
    ))
    .bind(auth.org_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(rows))
}

pub async fn get_one(
    State(pool): State<PgPool>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Department>> {
    let row = sqlx::query_as::<_, Department>(&format!(
        "SELECT {DEPARTMENT_COLUMNS} FROM departments WHERE id = $1 AND org_id = $2"
    ))
    .bind(id)
    .bind(auth.org_id)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Department not found".into()))?;

    Ok(Json(row))
}

pub async fn create(
    State(pool): State<PgPool>,
    auth: AuthUser,
    Json(req): Json<CreateDepartmentRequest>,
) -> Result<Json<Department>> {
    let req = req.trimmed();
    req.validate()?;

    if !auth.role.can_manage_org() {
        return Err(AppError::Forbidden);
    }

    if let Some(manager_id) = req.manager_id {
        org_guard::verify_member(&pool, manager_id, auth.org_id).await?;
    }

    let row = sqlx::query_as::<_, Department>(&format!(
        "INSERT INTO departments (id, org_id, name, description, manager_id)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING {DEPARTMENT_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(auth.org_id)
    .bind(&req.name)
    .bind(req.description.as_deref())
    .bind(req.manager_id)
    .fetch_one(&pool)
    .await?;

    tracing::info!(department_id = %row.id, org_id = %auth.org_id, "Department created");
    Ok(Json(row))
}

pub async fn update(
    State(pool): State<PgPool>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateDepartmentRequest>,
) -> Result<Json<Department>> {
    let req = req.trimmed();
    req.validate()?;

    if !auth.role.can_manage_org() {
        return Err(AppError::Forbidden);
    }

    if let Some(manager_id) = req.manager_id {
        org_guard::verify_member(&pool, manager_id, auth.org_id).await?;
    }

    let row = sqlx::query_as::<_, Department>(&format!(
        "UPDATE departments
         SET name        = COALESCE($2, name),
             description = COALESCE($3, description),
             manager_id  = COALESCE($4, manager_id),
             is_active   = COALESCE($5, is_active)
         WHERE id = $1 AND org_id = $6
         RETURNING {DEPARTMENT_COLUMNS}"
    ))
    .bind(id)
    .bind(req.name.as_deref())
    .bind(req.description.as_deref())
    .bind(req.manager_id)
    .bind(req.is_active)
    .bind(auth.org_id)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Department not found".into()))?;

    Ok(Json(row))
}

/// Hard delete. Members still assigned to the department turn this into a
/// foreign key violation, reported as 409.
pub async fn delete(
    State(pool): State<PgPool>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    if !auth.role.can_manage_org() {
        return Err(AppError::Forbidden);
    }

    let rows = sqlx::query("DELETE FROM departments WHERE id = $1 AND org_id = $2")
        .bind(id)
        .bind(auth.org_id)
        .execute(&pool)
        .await?
        .rows_affected();

    if rows == 0 {
        return Err(AppError::NotFound("Department not found".into()));
    }

    tracing::info!(department_id = %id, org_id = %auth.org_id, "Department deleted");
    Ok(Json(serde_json::json!({ "ok": true })))
}
