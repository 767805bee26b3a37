use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "approval_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

/// A single day's clock-in/out record with the job location name joined in.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct EmployeeTimeEntry {
    pub id: Uuid,
    pub org_id: Uuid,
    pub employee_id: Uuid,
    pub work_date: time::Date,
    #[serde(with = "time::serde::rfc3339")]
    pub clock_in: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub clock_out: Option<OffsetDateTime>,
    pub lunch_minutes: i32,
    pub worked_hours: Option<f64>,
    pub job_location_id: Option<Uuid>,
    pub job_location_name: Option<String>,
    pub status: ApprovalStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct ClockInRequest {
    pub job_location_id: Option<Uuid>,
    #[validate(length(max = 500, message = "notes must be at most 500 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct ClockOutRequest {
    #[serde(default)]
    #[validate(range(min = 0, max = 480, message = "lunch_minutes must be between 0 and 480"))]
    pub lunch_minutes: i32,
    #[validate(length(max = 500, message = "notes must be at most 500 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewTimeEntryRequest {
    pub status: ApprovalStatus,
}
