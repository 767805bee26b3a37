pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod invites;
pub mod mail;
pub mod models;
pub mod org_guard;
pub mod reports;
pub mod store;

use std::sync::Arc;

use sqlx::PgPool;

use crate::{invites::InviteService, mail::InviteMailer, store::TimesheetStore};

/// Shared application state available to all handlers via axum's State extractor.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub invites: InviteService,
    pub timesheets: Arc<dyn TimesheetStore>,
    pub mailer: Arc<dyn InviteMailer>,
}

impl axum::extract::FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}
