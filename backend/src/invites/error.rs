use serde::Serialize;

use crate::store::StoreError;

/// Machine-readable invite failure code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InviteErrorCode {
    InvalidEmail,
    InvalidRole,
    AuthError,
    DuplicateInvite,
    NotFound,
    InvalidState,
    DatabaseError,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum InviteError {
    #[error("Invalid email address: '{0}'")]
    InvalidEmail(String),

    #[error("Invalid role '{0}'. Must be one of: admin, manager, employee")]
    InvalidRole(String),

    #[error("{0}")]
    Auth(&'static str),

    #[error("An invitation has already been sent to this email address")]
    DuplicateInvite,

    #[error("Invite not found")]
    NotFound,

    #[error("Invite is {0} and cannot be resent")]
    InvalidState(&'static str),

    #[error("Database error: {0}")]
    Database(String),
}

impl InviteError {
    pub fn code(&self) -> InviteErrorCode {
        match self {
            InviteError::InvalidEmail(_) => InviteErrorCode::InvalidEmail,
            InviteError::InvalidRole(_) => InviteErrorCode::InvalidRole,
            InviteError::Auth(_) => InviteErrorCode::AuthError,
            InviteError::DuplicateInvite => InviteErrorCode::DuplicateInvite,
            InviteError::NotFound => InviteErrorCode::NotFound,
            InviteError::InvalidState(_) => InviteErrorCode::InvalidState,
            InviteError::Database(_) => InviteErrorCode::DatabaseError,
        }
    }
}

/// Single translation point from row-store failures to invite errors.
impl From<StoreError> for InviteError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(_) => InviteError::DuplicateInvite,
            StoreError::NotFound => InviteError::NotFound,
            other => {
                tracing::error!("Invite store error: {}", other);
                InviteError::Database(other.to_string())
            }
        }
    }
}
