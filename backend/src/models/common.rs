use serde::Deserialize;

/// Optional date-range filter for list endpoints.
/// `limit` defaults to 100, capped at 500. `offset` defaults to 0.
#[derive(Debug, Deserialize)]
pub struct DateRangeParams {
    pub start_date: Option<time::Date>,
    pub end_date: Option<time::Date>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl DateRangeParams {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(100).clamp(1, 500)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

/// Report week selector. Any date inside the week is accepted; it is
/// normalized to that week's Monday. Defaults to the current week.
#[derive(Debug, Deserialize)]
pub struct WeekParams {
    pub week_start: Option<time::Date>,
}
