pub mod auth;
pub mod departments;
pub mod invites;
pub mod job_locations;
pub mod organizations;
pub mod reports;
pub mod time_entries;

use axum::{Router, routing::{get, patch, post, put}};
use crate::AppState;

/// All authenticated routes. Login is mounted separately (see `main.rs`) so
/// that it can carry its own rate limiter.
pub fn router(state: AppState) -> Router {
    Router::new()
        // Auth
        .route("/api/auth/me", get(auth::me))
        // Organization
        .route("/api/organization", get(organizations::current))
        // Departments
        .route("/api/departments", get(departments::list).post(departments::create))
        .route(
            "/api/departments/:id",
            get(departments::get_one).put(departments::update).delete(departments::delete),
        )
        // Job locations
        .route("/api/job-locations", get(job_locations::list).post(job_locations::create))
        .route("/api/job-locations/:id", put(job_locations::update))
        // Time entries
        .route("/api/time-entries", get(time_entries::list))
        .route("/api/time-entries/clock-in", post(time_entries::clock_in))
        .route("/api/time-entries/clock-out", post(time_entries::clock_out))
        .route("/api/time-entries/:id/review", patch(time_entries::review))
        // Reports
        .route("/api/reports/weekly-hours", get(reports::weekly_hours))
        .route("/api/reports/weekly-hours/export", get(reports::export_weekly_hours))
        // Invites
        .route("/api/invites", get(invites::list).post(invites::create))
        .route("/api/invites/test-email", post(invites::test_email))
        .route("/api/invites/:id/revoke", post(invites::revoke))
        .route("/api/invites/:id/resend", post(invites::resend))
        .with_state(state)
}
