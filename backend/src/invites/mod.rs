//! Organization invite lifecycle.
//!
//! An invite row is written first and the email is sent second. There is no
//! transaction spanning the two, so a failed send leaves the row behind with
//! status `email_failed`; callers get a [`InviteOutcome::EmailFailed`]
//! carrying the invite id and can retry just the email with
//! [`InviteService::resend_invite_email`].
//!
//! Validation and precondition failures are returned as [`InviteError`]
//! before anything is written.

mod error;

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Serialize;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

pub use error::{InviteError, InviteErrorCode};

use crate::{
    auth::Role,
    mail::{InviteEmail, InviteMailer},
    models::{
        invite::{Invite, InviteStatus, NewInvite},
        organization::{Member, Organization},
    },
    store::InviteStore,
};

pub const INVITE_TTL_DAYS: i64 = 7;

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

/// Trim, lower-case and check the address shape.
pub fn normalize_email(raw: &str) -> Result<String, InviteError> {
    let email = raw.trim().to_lowercase();
    if !EMAIL_PATTERN.is_match(&email) {
        return Err(InviteError::InvalidEmail(raw.trim().to_string()));
    }
    Ok(email)
}

pub fn parse_role(raw: &str) -> Result<Role, InviteError> {
    raw.parse()
        .map_err(|_| InviteError::InvalidRole(raw.trim().to_string()))
}

/// Result of an invite whose row was written.
#[derive(Debug, Clone, PartialEq)]
pub enum InviteOutcome {
    Sent { invite_id: Uuid },
    /// The row exists (status `email_failed`) but the email never went out.
    EmailFailed { invite_id: Uuid, error: String },
}

impl InviteOutcome {
    pub fn invite_id(&self) -> Uuid {
        match self {
            InviteOutcome::Sent { invite_id } | InviteOutcome::EmailFailed { invite_id, .. } => {
                *invite_id
            }
        }
    }
}

/// Tagged result handed to clients: `{success, invite_id?, error?, code?}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateInviteResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invite_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<InviteErrorCode>,
}

impl From<InviteOutcome> for CreateInviteResult {
    fn from(outcome: InviteOutcome) -> Self {
        match outcome {
            InviteOutcome::Sent { invite_id } => Self {
                success: true,
                invite_id: Some(invite_id),
                error: None,
                code: None,
            },
            InviteOutcome::EmailFailed { invite_id, error } => Self {
                success: false,
                invite_id: Some(invite_id),
                error: Some(error),
                code: None,
            },
        }
    }
}

impl From<InviteError> for CreateInviteResult {
    fn from(err: InviteError) -> Self {
        Self {
            success: false,
            invite_id: None,
            error: Some(err.to_string()),
            code: Some(err.code()),
        }
    }
}

impl From<Result<InviteOutcome, InviteError>> for CreateInviteResult {
    fn from(result: Result<InviteOutcome, InviteError>) -> Self {
        match result {
            Ok(outcome) => outcome.into(),
            Err(err) => err.into(),
        }
    }
}

#[derive(Clone)]
pub struct InviteService {
    store: Arc<dyn InviteStore>,
    mailer: Arc<dyn InviteMailer>,
    app_base_url: String,
}

impl InviteService {
    pub fn new(
        store: Arc<dyn InviteStore>,
        mailer: Arc<dyn InviteMailer>,
        app_base_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            mailer,
            app_base_url: app_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn accept_url(&self, invite_id: Uuid) -> String {
        format!("{}/accept-invite?invite={}", self.app_base_url, invite_id)
    }

    /// Validate, persist and email a new invite.
    ///
    /// `actor` is the signed-in user issuing the invite, if any.
    pub async fn create_invite(
        &self,
        actor: Option<Uuid>,
        email: &str,
        role: &str,
        org_id: Uuid,
    ) -> Result<InviteOutcome, InviteError> {
        let email = normalize_email(email)?;
        let role = parse_role(role)?;
        let actor = actor.ok_or(InviteError::Auth("You must be signed in to send invitations"))?;

        let org = self
            .store
            .find_organization(org_id)
            .await?
            .ok_or_else(|| InviteError::Database(format!("Organization {} not found", org_id)))?;

        let inviter = self
            .store
            .find_member(org_id, actor)
            .await?
            .ok_or(InviteError::Auth("You are not a member of this organization"))?;

        if role == Role::Admin && !inviter.role.is_admin() {
            return Err(InviteError::Auth("Only admins can invite admins"));
        }

        if self.store.find_pending_invite(org_id, &email).await?.is_some() {
            return Err(InviteError::DuplicateInvite);
        }

        let invite = self
            .store
            .insert_invite(NewInvite {
                organization_id: org_id,
                email,
                role,
                invited_by: actor,
                expires_at: OffsetDateTime::now_utc() + Duration::days(INVITE_TTL_DAYS),
            })
            .await?;

        tracing::info!(
            invite_id = %invite.id,
            org_id = %org_id,
            role = %role,
            "Invite created"
        );

        Ok(self.dispatch(&invite, &org, &inviter).await)
    }

    /// Retry the email step of a `pending` or `email_failed` invite.
    pub async fn resend_invite_email(
        &self,
        actor: Option<Uuid>,
        invite_id: Uuid,
    ) -> Result<InviteOutcome, InviteError> {
        let actor = actor.ok_or(InviteError::Auth("You must be signed in to send invitations"))?;

        let invite = self
            .store
            .get_invite(invite_id)
            .await?
            .ok_or(InviteError::NotFound)?;

        match invite.status {
            InviteStatus::Pending | InviteStatus::EmailFailed => {}
            InviteStatus::Accepted => return Err(InviteError::InvalidState("accepted")),
            InviteStatus::Revoked => return Err(InviteError::InvalidState("revoked")),
        }
        if invite.expires_at <= OffsetDateTime::now_utc() {
            return Err(InviteError::InvalidState("expired"));
        }

        let org = self
            .store
            .find_organization(invite.organization_id)
            .await?
            .ok_or_else(|| {
                InviteError::Database(format!(
                    "Organization {} not found",
                    invite.organization_id
                ))
            })?;

        let inviter = self
            .store
            .find_member(invite.organization_id, actor)
            .await?
            .ok_or(InviteError::Auth("You are not a member of this organization"))?;

        // Back to pending first: a newer pending invite for the same address
        // makes this a duplicate, and we find out before emailing anyone.
        if invite.status == InviteStatus::EmailFailed {
            self.store
                .set_invite_status(invite.id, InviteStatus::Pending)
                .await?;
        }

        Ok(self.dispatch(&invite, &org, &inviter).await)
    }

    async fn dispatch(&self, invite: &Invite, org: &Organization, inviter: &Member) -> InviteOutcome {
        let email = InviteEmail {
            to: invite.email.clone(),
            organization_name: org.name.clone(),
            inviter_name: inviter.display_name(),
            role: invite.role,
            accept_url: self.accept_url(invite.id),
            expires_at: invite.expires_at,
        };

        match self.mailer.send_invite(&email).await {
            Ok(()) => InviteOutcome::Sent {
                invite_id: invite.id,
            },
            Err(e) => {
                tracing::warn!(invite_id = %invite.id, error = %e, "Invitation email failed");

                if let Err(store_err) = self
                    .store
                    .set_invite_status(invite.id, InviteStatus::EmailFailed)
                    .await
                {
                    tracing::error!(
                        invite_id = %invite.id,
                        error = %store_err,
                        "Could not mark invite as email_failed"
                    );
                }

                InviteOutcome::EmailFailed {
                    invite_id: invite.id,
                    error: format!("Invite created but the email could not be sent: {}", e),
                }
            }
        }
    }

    pub async fn list_org_invites(&self, org_id: Uuid) -> Result<Vec<Invite>, InviteError> {
        Ok(self.store.list_invites(org_id).await?)
    }

    pub async fn get_invite(&self, invite_id: Uuid) -> Result<Invite, InviteError> {
        self.store
            .get_invite(invite_id)
            .await?
            .ok_or(InviteError::NotFound)
    }

    /// Mark a `pending` or `email_failed` invite revoked. Anything else,
    /// including a failed write, is reported as `false`, never as an error.
    pub async fn revoke_invite(&self, invite_id: Uuid) -> bool {
        match self.store.revoke_invite(invite_id).await {
            Ok(true) => {
                tracing::info!(invite_id = %invite_id, "Invite revoked");
                true
            }
            Ok(false) => {
                tracing::warn!(invite_id = %invite_id, "No revocable invite with that id");
                false
            }
            Err(e) => {
                tracing::warn!(invite_id = %invite_id, error = %e, "Invite revoke failed");
                false
            }
        }
    }
}
