use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{extract::State, Json};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    auth::{create_token, AuthUser},
    error::{AppError, Result},
    models::user::{LoginRequest, LoginResponse, LoginRow, UserProfile},
    AppState,
};

const PROFILE_SELECT: &str = r#"
    SELECT u.id, m.org_id, u.first_name, u.last_name, u.email,
           m.role, m.department_id, d.name AS department_name, u.is_active
    FROM organization_members m
    JOIN users u ON u.id = m.user_id
    LEFT JOIN departments d ON d.id = m.department_id
    WHERE u.id = $1 AND m.org_id = $2
"#;

pub(crate) async fn fetch_profile(pool: &PgPool, user_id: Uuid, org_id: Uuid) -> Result<UserProfile> {
    sqlx::query_as::<_, UserProfile>(PROFILE_SELECT)
        .bind(user_id)
        .bind(org_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    // A user in several organizations signs into the one they joined first.
    let user = sqlx::query_as::<_, LoginRow>(
        r#"
        SELECT u.id, m.org_id, m.role, u.password_hash
        FROM users u
        JOIN organization_members m ON m.user_id = u.id
        WHERE lower(u.email) = lower($1) AND u.is_active = true
        ORDER BY m.created_at
        LIMIT 1
        "#,
    )
    .bind(req.email.trim())
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AppError::Unauthorized)?;

    let parsed = PasswordHash::new(&user.password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid stored hash")))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed)
        .map_err(|_| AppError::Unauthorized)?;

    let token = create_token(
        user.id,
        user.org_id,
        user.role,
        &state.jwt_secret,
        state.jwt_expiry_hours,
    )
    .map_err(AppError::Internal)?;

    let profile = fetch_profile(&state.pool, user.id, user.org_id).await?;
    tracing::info!(user_id = %user.id, org_id = %user.org_id, "User logged in");

    Ok(Json(LoginResponse {
        token,
        user: profile,
    }))
}

pub async fn me(State(pool): State<PgPool>, auth: AuthUser) -> Result<Json<UserProfile>> {
    Ok(Json(fetch_profile(&pool, auth.id, auth.org_id).await?))
}
