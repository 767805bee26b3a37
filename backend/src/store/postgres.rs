use async_trait::async_trait;
use sqlx::PgPool;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::{InviteStore, StoreError, StoreResult, TimesheetStore};
use crate::models::{
    invite::{Invite, InviteStatus, NewInvite},
    organization::{Member, Organization},
    report::WeeklyEmployeeHours,
    time_entry::EmployeeTimeEntry,
};

const INVITE_COLUMNS: &str = "id, organization_id, email, role, status, invited_by, \
                              created_at, expires_at, accepted_at";

/// Column list shared with the time entry handlers.
pub const TIME_ENTRY_SELECT: &str = r#"
    SELECT te.id, te.org_id, te.employee_id, te.work_date, te.clock_in, te.clock_out,
           te.lunch_minutes, te.worked_hours, te.job_location_id,
           jl.name AS job_location_name,
           te.status, te.notes
    FROM time_entries te
    LEFT JOIN job_locations jl ON jl.id = te.job_location_id
"#;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InviteStore for PgStore {
    async fn find_organization(&self, org_id: Uuid) -> StoreResult<Option<Organization>> {
        let org = sqlx::query_as::<_, Organization>(
            "SELECT id, name, slug, timezone, created_at, updated_at
             FROM organizations WHERE id = $1",
        )
        .bind(org_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(org)
    }

    async fn find_member(&self, org_id: Uuid, user_id: Uuid) -> StoreResult<Option<Member>> {
        let member = sqlx::query_as::<_, Member>(
            r#"
            SELECT m.org_id, m.user_id, m.role, u.first_name, u.last_name, u.email
            FROM organization_members m
            JOIN users u ON u.id = m.user_id
            WHERE m.org_id = $1 AND m.user_id = $2 AND u.is_active = true
            "#,
        )
        .bind(org_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(member)
    }

    async fn find_pending_invite(
        &self,
        org_id: Uuid,
        email: &str,
    ) -> StoreResult<Option<Invite>> {
        let invite = sqlx::query_as::<_, Invite>(&format!(
            "SELECT {INVITE_COLUMNS} FROM organization_invites
             WHERE organization_id = $1 AND email = $2 AND status = 'pending'"
        ))
        .bind(org_id)
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(invite)
    }

    async fn insert_invite(&self, invite: NewInvite) -> StoreResult<Invite> {
        let row = sqlx::query_as::<_, Invite>(&format!(
            "INSERT INTO organization_invites
                 (id, organization_id, email, role, status, invited_by, expires_at)
             VALUES ($1, $2, $3, $4, 'pending', $5, $6)
             RETURNING {INVITE_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(invite.organization_id)
        .bind(&invite.email)
        .bind(invite.role)
        .bind(invite.invited_by)
        .bind(invite.expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn get_invite(&self, invite_id: Uuid) -> StoreResult<Option<Invite>> {
        let invite = sqlx::query_as::<_, Invite>(&format!(
            "SELECT {INVITE_COLUMNS} FROM organization_invites WHERE id = $1"
        ))
        .bind(invite_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(invite)
    }

    async fn set_invite_status(&self, invite_id: Uuid, status: InviteStatus) -> StoreResult<()> {
        let accepted_at = (status == InviteStatus::Accepted).then(OffsetDateTime::now_utc);

        let rows = sqlx::query(
            "UPDATE organization_invites
             SET status = $2, accepted_at = COALESCE($3, accepted_at)
             WHERE id = $1",
        )
        .bind(invite_id)
        .bind(status)
        .bind(accepted_at)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn revoke_invite(&self, invite_id: Uuid) -> StoreResult<bool> {
        let rows = sqlx::query(
            "UPDATE organization_invites
             SET status = 'revoked'
             WHERE id = $1 AND status IN ('pending', 'email_failed')",
        )
        .bind(invite_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows > 0)
    }

    async fn list_invites(&self, org_id: Uuid) -> StoreResult<Vec<Invite>> {
        let rows = sqlx::query_as::<_, Invite>(&format!(
            "SELECT {INVITE_COLUMNS} FROM organization_invites
             WHERE organization_id = $1
             ORDER BY created_at DESC"
        ))
        .bind(org_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[async_trait]
impl TimesheetStore for PgStore {
    async fn weekly_hours(
        &self,
        org_id: Uuid,
        week_start: Date,
    ) -> StoreResult<Vec<WeeklyEmployeeHours>> {
        // Rejected entries never count towards a week.
        let rows = sqlx::query_as::<_, WeeklyEmployeeHours>(
            r#"
            SELECT
                u.id AS employee_id,
                u.first_name,
                u.last_name,
                d.name AS department_name,
                COALESCE(SUM(te.worked_hours) FILTER (WHERE te.work_date = $2::date), 0)::FLOAT8     AS monday,
                COALESCE(SUM(te.worked_hours) FILTER (WHERE te.work_date = $2::date + 1), 0)::FLOAT8 AS tuesday,
                COALESCE(SUM(te.worked_hours) FILTER (WHERE te.work_date = $2::date + 2), 0)::FLOAT8 AS wednesday,
                COALESCE(SUM(te.worked_hours) FILTER (WHERE te.work_date = $2::date + 3), 0)::FLOAT8 AS thursday,
                COALESCE(SUM(te.worked_hours) FILTER (WHERE te.work_date = $2::date + 4), 0)::FLOAT8 AS friday,
                COALESCE(SUM(te.worked_hours) FILTER (WHERE te.work_date = $2::date + 5), 0)::FLOAT8 AS saturday,
                COALESCE(SUM(te.worked_hours) FILTER (WHERE te.work_date = $2::date + 6), 0)::FLOAT8 AS sunday,
                COALESCE(ws.total_regular, 0)::FLOAT8    AS total_regular,
                COALESCE(ws.total_ot, 0)::FLOAT8         AS total_ot,
                COALESCE(ws.vacation_hours, 0)::FLOAT8   AS vacation_hours,
                COALESCE(ws.sick_hours, 0)::FLOAT8       AS sick_hours,
                COALESCE(ws.vacation_balance, 0)::FLOAT8 AS vacation_balance,
                COALESCE(ws.sick_balance, 0)::FLOAT8     AS sick_balance
            FROM organization_members m
            JOIN users u ON u.id = m.user_id
            LEFT JOIN departments d ON d.id = m.department_id
            LEFT JOIN time_entries te
                   ON te.employee_id = u.id
                  AND te.org_id = m.org_id
                  AND te.work_date BETWEEN $2::date AND $2::date + 6
                  AND te.status <> 'rejected'
            LEFT JOIN weekly_summaries ws
                   ON ws.employee_id = u.id
                  AND ws.org_id = m.org_id
                  AND ws.week_start = $2::date
            WHERE m.org_id = $1 AND u.is_active = true
            GROUP BY u.id, u.first_name, u.last_name, d.name,
                     ws.total_regular, ws.total_ot, ws.vacation_hours, ws.sick_hours,
                     ws.vacation_balance, ws.sick_balance
            ORDER BY u.last_name, u.first_name
            "#,
        )
        .bind(org_id)
        .bind(week_start)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn employee_week_entries(
        &self,
        org_id: Uuid,
        employee_id: Uuid,
        week_start: Date,
    ) -> StoreResult<Vec<EmployeeTimeEntry>> {
        let rows = sqlx::query_as::<_, EmployeeTimeEntry>(&format!(
            "{TIME_ENTRY_SELECT}
             WHERE te.org_id = $1 AND te.employee_id = $2
               AND te.work_date BETWEEN $3::date AND $3::date + 6
             ORDER BY te.work_date, te.clock_in"
        ))
        .bind(org_id)
        .bind(employee_id)
        .bind(week_start)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
