pub mod csv;
pub mod hours;

use time::Date;
use uuid::Uuid;

use crate::{models::report::WeeklyEmployeeHours, store::TimesheetStore};

/// Largest gap between the daily buckets and the stored totals that still
/// counts as consistent.
pub const HOURS_TOLERANCE: f64 = 0.01;

/// A weekly row whose daily buckets disagree with its stored totals.
#[derive(Debug, Clone, PartialEq)]
pub struct HoursMismatch {
    pub employee_id: Uuid,
    pub daily_total: f64,
    pub reported_total: f64,
}

impl HoursMismatch {
    pub fn difference(&self) -> f64 {
        self.daily_total - self.reported_total
    }
}

pub fn find_mismatch(row: &WeeklyEmployeeHours) -> Option<HoursMismatch> {
    let daily_total = row.daily_total();
    let reported_total = row.reported_total();

    ((daily_total - reported_total).abs() > HOURS_TOLERANCE).then(|| HoursMismatch {
        employee_id: row.employee_id,
        daily_total,
        reported_total,
    })
}

/// Check every row and log diagnostic detail for the ones that don't add up.
///
/// Detection only: rows are not modified, and a failed detail fetch is
/// logged and skipped.
pub async fn reconcile_weekly_hours(
    store: &dyn TimesheetStore,
    org_id: Uuid,
    week_start: Date,
    rows: &[WeeklyEmployeeHours],
) -> Vec<HoursMismatch> {
    let mut mismatches = Vec::new();

    for row in rows {
        let Some(mismatch) = find_mismatch(row) else {
            continue;
        };

        tracing::warn!(
            employee_id = %mismatch.employee_id,
            %week_start,
            daily_total = mismatch.daily_total,
            reported_total = mismatch.reported_total,
            difference = mismatch.difference(),
            "Weekly hours do not match stored totals"
        );

        match store
            .employee_week_entries(org_id, row.employee_id, week_start)
            .await
        {
            Ok(entries) => {
                for entry in &entries {
                    tracing::warn!(
                        employee_id = %row.employee_id,
                        entry_id = %entry.id,
                        work_date = %entry.work_date,
                        worked_hours = ?entry.worked_hours,
                        lunch_minutes = entry.lunch_minutes,
                        status = ?entry.status,
                        "Time entry detail for mismatched week"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(
                    employee_id = %row.employee_id,
                    error = %e,
                    "Could not fetch time entry detail for mismatched week"
                );
            }
        }

        mismatches.push(mismatch);
    }

    mismatches
}
