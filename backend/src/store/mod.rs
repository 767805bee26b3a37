//! Typed repository interfaces over the row store.
//!
//! Business logic (invites, report reconciliation) talks to these traits
//! instead of issuing SQL directly. [`PgStore`] backs them with PostgreSQL;
//! [`MemoryStore`] keeps everything in process for tests and local runs.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use time::Date;
use uuid::Uuid;

use crate::models::{
    invite::{Invite, InviteStatus, NewInvite},
    organization::{Member, Organization},
    report::WeeklyEmployeeHours,
    time_entry::EmployeeTimeEntry,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Row-store failure, classified by the constraint codes callers care about.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("foreign key constraint violated: {0}")]
    ForeignKeyViolation(String),

    #[error("record not found")]
    NotFound,

    #[error("row store error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                Some("23505") => StoreError::UniqueViolation(db_err.message().to_string()),
                Some("23503") => StoreError::ForeignKeyViolation(db_err.message().to_string()),
                _ => StoreError::Backend(err.to_string()),
            },
            _ => StoreError::Backend(err.to_string()),
        }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Tables touched by the invite lifecycle: `organizations`,
/// `organization_members`, `users` and `organization_invites`.
#[async_trait]
pub trait InviteStore: Send + Sync {
    async fn find_organization(&self, org_id: Uuid) -> StoreResult<Option<Organization>>;

    async fn find_member(&self, org_id: Uuid, user_id: Uuid) -> StoreResult<Option<Member>>;

    /// `email` is expected already normalized (trimmed, lower-cased).
    async fn find_pending_invite(&self, org_id: Uuid, email: &str)
        -> StoreResult<Option<Invite>>;

    async fn insert_invite(&self, invite: NewInvite) -> StoreResult<Invite>;

    async fn get_invite(&self, invite_id: Uuid) -> StoreResult<Option<Invite>>;

    /// Fails with [`StoreError::NotFound`] when no row has that id.
    async fn set_invite_status(&self, invite_id: Uuid, status: InviteStatus) -> StoreResult<()>;

    /// Revoke a `pending` or `email_failed` invite. `false` when no such
    /// invite exists in one of those states.
    async fn revoke_invite(&self, invite_id: Uuid) -> StoreResult<bool>;

    /// Newest first.
    async fn list_invites(&self, org_id: Uuid) -> StoreResult<Vec<Invite>>;
}

/// Read side of time tracking used by the weekly report.
#[async_trait]
pub trait TimesheetStore: Send + Sync {
    /// One row per organization member for the week starting `week_start` (a Monday).
    async fn weekly_hours(
        &self,
        org_id: Uuid,
        week_start: Date,
    ) -> StoreResult<Vec<WeeklyEmployeeHours>>;

    /// Daily entries of one employee for the week starting `week_start`.
    async fn employee_week_entries(
        &self,
        org_id: Uuid,
        employee_id: Uuid,
        week_start: Date,
    ) -> StoreResult<Vec<EmployeeTimeEntry>>;
}
