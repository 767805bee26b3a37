use serde::Serialize;
use uuid::Uuid;

/// Per-employee hours for one Monday-Sunday week. Read-only projection:
/// daily buckets come from time entries, totals and balances from the
/// stored weekly summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, sqlx::FromRow)]
pub struct WeeklyEmployeeHours {
    pub employee_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub department_name: Option<String>,
    pub monday: f64,
    pub tuesday: f64,
    pub wednesday: f64,
    pub thursday: f64,
    pub friday: f64,
    pub saturday: f64,
    pub sunday: f64,
    pub total_regular: f64,
    pub total_ot: f64,
    pub vacation_hours: f64,
    pub sick_hours: f64,
    pub vacation_balance: f64,
    pub sick_balance: f64,
}

impl WeeklyEmployeeHours {
    pub fn daily_hours(&self) -> [f64; 7] {
        [
            self.monday,
            self.tuesday,
            self.wednesday,
            self.thursday,
            self.friday,
            self.saturday,
            self.sunday,
        ]
    }

    pub fn daily_total(&self) -> f64 {
        self.daily_hours().iter().sum()
    }

    pub fn reported_total(&self) -> f64 {
        self.total_regular + self.total_ot
    }
}
