mod common;

use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use timecard_backend::{
    auth::Role,
    invites::{CreateInviteResult, InviteError, InviteErrorCode, InviteOutcome, INVITE_TTL_DAYS},
    models::invite::{InviteStatus, NewInvite},
    store::{InviteStore, MemoryStore},
};

/// Org with one admin; returns (org_id, admin_user_id).
fn seed_org(store: &MemoryStore) -> (Uuid, Uuid) {
    let org = store.add_organization("Acme Builders");
    let admin = store.add_member(org.id, Role::Admin, "Dana", "dana@acme.test");
    (org.id, admin.user_id)
}

#[tokio::test]
async fn create_invite_with_healthy_mailer_succeeds() {
    let (store, mailer, invites) = common::memory_invites();
    let (org_id, admin) = seed_org(&store);

    let outcome = invites
        .create_invite(Some(admin), "a@b.com", "employee", org_id)
        .await
        .unwrap();

    let result = CreateInviteResult::from(outcome.clone());
    assert!(result.success);
    assert_eq!(result.invite_id, Some(outcome.invite_id()));
    assert_eq!(result.error, None);

    let invite = store.get_invite(outcome.invite_id()).await.unwrap().unwrap();
    assert_eq!(invite.status, InviteStatus::Pending);
    assert_eq!(invite.email, "a@b.com");
    assert_eq!(invite.role, Role::Employee);
    assert_eq!(invite.invited_by, admin);
    assert_eq!(invite.accepted_at, None);
    let ttl = invite.expires_at - invite.created_at;
    assert!(ttl <= Duration::days(INVITE_TTL_DAYS));
    assert!(ttl > Duration::days(INVITE_TTL_DAYS) - Duration::minutes(1));

    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "a@b.com");
    assert_eq!(sent[0].organization_name, "Acme Builders");
    assert_eq!(sent[0].inviter_name, "Dana Tester");
    assert_eq!(
        sent[0].accept_url,
        format!("{}/accept-invite?invite={}", common::APP_BASE_URL, invite.id)
    );
}

#[tokio::test]
async fn email_is_trimmed_and_lower_cased_before_storing() {
    let (store, _mailer, invites) = common::memory_invites();
    let (org_id, admin) = seed_org(&store);

    let outcome = invites
        .create_invite(Some(admin), "  New.Hire@Example.COM ", "manager", org_id)
        .await
        .unwrap();

    let invite = store.get_invite(outcome.invite_id()).await.unwrap().unwrap();
    assert_eq!(invite.email, "new.hire@example.com");
}

#[tokio::test]
async fn malformed_emails_are_rejected_without_a_write() {
    let (store, mailer, invites) = common::memory_invites();
    let (org_id, admin) = seed_org(&store);

    for email in ["", "plainaddress", "no-at.example.com", "a@b", "a b@c.com", "@c.com", "a@.com"] {
        let result: CreateInviteResult = invites
            .create_invite(Some(admin), email, "employee", org_id)
            .await
            .into();

        assert!(!result.success, "{email:?} should be rejected");
        assert_eq!(result.code, Some(InviteErrorCode::InvalidEmail));
        assert!(result.error.unwrap().contains("Invalid email"));
    }

    assert_eq!(store.invite_insert_count(), 0);
    assert_eq!(mailer.sent_count(), 0);
}

#[tokio::test]
async fn unknown_roles_are_rejected_without_a_write() {
    let (store, mailer, invites) = common::memory_invites();
    let (org_id, admin) = seed_org(&store);

    for role in ["owner", "supervisor", "", "superadmin"] {
        let err = invites
            .create_invite(Some(admin), "a@b.com", role, org_id)
            .await
            .unwrap_err();

        assert_eq!(err.code(), InviteErrorCode::InvalidRole);
        assert!(err.to_string().contains("Invalid role"));
    }

    assert_eq!(store.invite_insert_count(), 0);
    assert_eq!(mailer.sent_count(), 0);
}

#[tokio::test]
async fn missing_actor_is_an_auth_error() {
    let (store, _mailer, invites) = common::memory_invites();
    let (org_id, _admin) = seed_org(&store);

    let err = invites
        .create_invite(None, "a@b.com", "employee", org_id)
        .await
        .unwrap_err();

    assert_eq!(err.code(), InviteErrorCode::AuthError);
    assert_eq!(store.invite_insert_count(), 0);
}

#[tokio::test]
async fn unknown_organization_is_a_database_error() {
    let (store, _mailer, invites) = common::memory_invites();
    let (_org_id, admin) = seed_org(&store);

    let err = invites
        .create_invite(Some(admin), "a@b.com", "employee", Uuid::new_v4())
        .await
        .unwrap_err();

    assert_eq!(err.code(), InviteErrorCode::DatabaseError);
    assert_eq!(store.invite_insert_count(), 0);
}

#[tokio::test]
async fn non_member_cannot_invite() {
    let (store, _mailer, invites) = common::memory_invites();
    let (org_a, _admin_a) = seed_org(&store);
    let (_org_b, admin_b) = seed_org(&store);

    let err = invites
        .create_invite(Some(admin_b), "a@b.com", "employee", org_a)
        .await
        .unwrap_err();

    assert_eq!(err.code(), InviteErrorCode::AuthError);
    assert_eq!(store.invite_insert_count(), 0);
}

#[tokio::test]
async fn second_pending_invite_is_a_duplicate_and_sends_nothing() {
    let (store, mailer, invites) = common::memory_invites();
    let (org_id, admin) = seed_org(&store);

    invites
        .create_invite(Some(admin), "a@b.com", "employee", org_id)
        .await
        .unwrap();
    assert_eq!(mailer.sent_count(), 1);

    let result: CreateInviteResult = invites
        .create_invite(Some(admin), "A@B.com", "manager", org_id)
        .await
        .into();

    assert!(!result.success);
    assert_eq!(result.code, Some(InviteErrorCode::DuplicateInvite));
    assert!(result.error.unwrap().contains("already been sent"));
    assert_eq!(mailer.sent_count(), 1, "email sender must not be invoked again");
    assert_eq!(store.invite_insert_count(), 1);
}

#[tokio::test]
async fn same_email_can_be_invited_to_another_organization() {
    let (store, mailer, invites) = common::memory_invites();
    let (org_a, admin_a) = seed_org(&store);
    let (org_b, admin_b) = seed_org(&store);

    invites
        .create_invite(Some(admin_a), "a@b.com", "employee", org_a)
        .await
        .unwrap();
    invites
        .create_invite(Some(admin_b), "a@b.com", "employee", org_b)
        .await
        .unwrap();

    assert_eq!(mailer.sent_count(), 2);
}

#[tokio::test]
async fn store_unique_violation_translates_to_duplicate_invite() {
    // A concurrent request can win the race between the pending check and
    // the insert; the store's uniqueness error must surface as a duplicate.
    let store = MemoryStore::new();
    let (org_id, admin) = seed_org(&store);
    let new_invite = || NewInvite {
        organization_id: org_id,
        email: "a@b.com".into(),
        role: Role::Employee,
        invited_by: admin,
        expires_at: OffsetDateTime::now_utc() + Duration::days(7),
    };

    store.insert_invite(new_invite()).await.unwrap();
    let err: InviteError = store.insert_invite(new_invite()).await.unwrap_err().into();
    assert_eq!(err, InviteError::DuplicateInvite);
}

#[tokio::test]
async fn email_failure_keeps_the_row_as_email_failed() {
    let (store, mailer, invites) = common::memory_invites();
    let (org_id, admin) = seed_org(&store);
    mailer.set_failing(true);

    let outcome = invites
        .create_invite(Some(admin), "a@b.com", "employee", org_id)
        .await
        .expect("email failure is an outcome, not an error");

    let invite_id = match &outcome {
        InviteOutcome::EmailFailed { invite_id, error } => {
            assert!(error.contains("could not be sent"));
            *invite_id
        }
        other => panic!("expected EmailFailed, got {other:?}"),
    };

    let result = CreateInviteResult::from(outcome);
    assert!(!result.success);
    assert_eq!(result.invite_id, Some(invite_id));
    assert!(result.error.is_some());

    let invite = store.get_invite(invite_id).await.unwrap().unwrap();
    assert_eq!(invite.status, InviteStatus::EmailFailed);
}

#[tokio::test]
async fn email_failed_invite_does_not_block_a_new_invite() {
    let (store, mailer, invites) = common::memory_invites();
    let (org_id, admin) = seed_org(&store);

    mailer.set_failing(true);
    invites
        .create_invite(Some(admin), "a@b.com", "employee", org_id)
        .await
        .unwrap();

    mailer.set_failing(false);
    let outcome = invites
        .create_invite(Some(admin), "a@b.com", "employee", org_id)
        .await
        .unwrap();
    assert!(matches!(outcome, InviteOutcome::Sent { .. }));
}

#[tokio::test]
async fn resend_recovers_an_email_failed_invite() {
    let (store, mailer, invites) = common::memory_invites();
    let (org_id, admin) = seed_org(&store);

    mailer.set_failing(true);
    let invite_id = invites
        .create_invite(Some(admin), "a@b.com", "employee", org_id)
        .await
        .unwrap()
        .invite_id();

    mailer.set_failing(false);
    let outcome = invites
        .resend_invite_email(Some(admin), invite_id)
        .await
        .unwrap();

    assert_eq!(outcome, InviteOutcome::Sent { invite_id });
    assert_eq!(mailer.sent_count(), 1);
    let invite = store.get_invite(invite_id).await.unwrap().unwrap();
    assert_eq!(invite.status, InviteStatus::Pending);
}

#[tokio::test]
async fn failed_resend_leaves_invite_email_failed() {
    let (store, mailer, invites) = common::memory_invites();
    let (org_id, admin) = seed_org(&store);

    mailer.set_failing(true);
    let invite_id = invites
        .create_invite(Some(admin), "a@b.com", "employee", org_id)
        .await
        .unwrap()
        .invite_id();

    let outcome = invites
        .resend_invite_email(Some(admin), invite_id)
        .await
        .unwrap();

    assert!(matches!(outcome, InviteOutcome::EmailFailed { .. }));
    let invite = store.get_invite(invite_id).await.unwrap().unwrap();
    assert_eq!(invite.status, InviteStatus::EmailFailed);
}

#[tokio::test]
async fn resend_is_a_duplicate_when_a_newer_invite_is_pending() {
    let (store, mailer, invites) = common::memory_invites();
    let (org_id, admin) = seed_org(&store);

    mailer.set_failing(true);
    let failed_id = invites
        .create_invite(Some(admin), "a@b.com", "employee", org_id)
        .await
        .unwrap()
        .invite_id();

    mailer.set_failing(false);
    invites
        .create_invite(Some(admin), "a@b.com", "employee", org_id)
        .await
        .unwrap();

    let err = invites
        .resend_invite_email(Some(admin), failed_id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), InviteErrorCode::DuplicateInvite);
    assert_eq!(mailer.sent_count(), 1);
}

#[tokio::test]
async fn revoked_invites_cannot_be_resent() {
    let (store, _mailer, invites) = common::memory_invites();
    let (org_id, admin) = seed_org(&store);

    let invite_id = invites
        .create_invite(Some(admin), "a@b.com", "employee", org_id)
        .await
        .unwrap()
        .invite_id();
    assert!(invites.revoke_invite(invite_id).await);

    let err = invites
        .resend_invite_email(Some(admin), invite_id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), InviteErrorCode::InvalidState);

    let err = invites
        .resend_invite_email(Some(admin), Uuid::new_v4())
        .await
        .unwrap_err();
    assert_eq!(err.code(), InviteErrorCode::NotFound);
}

#[tokio::test]
async fn revoke_marks_invite_revoked_and_frees_the_address() {
    let (store, mailer, invites) = common::memory_invites();
    let (org_id, admin) = seed_org(&store);

    let invite_id = invites
        .create_invite(Some(admin), "a@b.com", "employee", org_id)
        .await
        .unwrap()
        .invite_id();

    assert!(invites.revoke_invite(invite_id).await);
    let invite = store.get_invite(invite_id).await.unwrap().unwrap();
    assert_eq!(invite.status, InviteStatus::Revoked);

    invites
        .create_invite(Some(admin), "a@b.com", "employee", org_id)
        .await
        .unwrap();
    assert_eq!(mailer.sent_count(), 2);
}

#[tokio::test]
async fn revoke_reports_failure_as_false() {
    let (store, _mailer, invites) = common::memory_invites();
    let (org_id, admin) = seed_org(&store);

    let invite_id = invites
        .create_invite(Some(admin), "a@b.com", "employee", org_id)
        .await
        .unwrap()
        .invite_id();

    store.set_fail_writes(true);
    assert!(!invites.revoke_invite(invite_id).await);
    store.set_fail_writes(false);

    let invite = store.get_invite(invite_id).await.unwrap().unwrap();
    assert_eq!(invite.status, InviteStatus::Pending);

    assert!(!invites.revoke_invite(Uuid::new_v4()).await);
}

#[tokio::test]
async fn list_returns_org_invites_newest_first() {
    let (store, _mailer, invites) = common::memory_invites();
    let (org_a, admin_a) = seed_org(&store);
    let (org_b, admin_b) = seed_org(&store);

    let first = invites
        .create_invite(Some(admin_a), "first@b.com", "employee", org_a)
        .await
        .unwrap()
        .invite_id();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = invites
        .create_invite(Some(admin_a), "second@b.com", "manager", org_a)
        .await
        .unwrap()
        .invite_id();
    invites
        .create_invite(Some(admin_b), "other@b.com", "employee", org_b)
        .await
        .unwrap();

    let listed: Vec<Uuid> = invites
        .list_org_invites(org_a)
        .await
        .unwrap()
        .into_iter()
        .map(|i| i.id)
        .collect();
    assert_eq!(listed, vec![second, first]);
}

#[tokio::test]
async fn manager_cannot_invite_an_admin() {
    let (store, mailer, invites) = common::memory_invites();
    let (org_id, _admin) = seed_org(&store);
    let manager = store.add_member(org_id, Role::Manager, "Max", "max@acme.test");

    let err = invites
        .create_invite(Some(manager.user_id), "boss@example.com", "admin", org_id)
        .await
        .unwrap_err();

    assert_eq!(err.code(), InviteErrorCode::AuthError);
    assert_eq!(store.invite_insert_count(), 0);
    assert_eq!(mailer.sent_count(), 0);

    for role in ["manager", "employee"] {
        invites
            .create_invite(Some(manager.user_id), &format!("{role}@example.com"), role, org_id)
            .await
            .unwrap();
    }
    assert_eq!(mailer.sent_count(), 2);
}

#[tokio::test]
async fn admin_can_invite_an_admin() {
    let (store, _mailer, invites) = common::memory_invites();
    let (org_id, admin) = seed_org(&store);

    let outcome = invites
        .create_invite(Some(admin), "second.admin@example.com", "admin", org_id)
        .await
        .unwrap();

    let invite = store.get_invite(outcome.invite_id()).await.unwrap().unwrap();
    assert_eq!(invite.role, Role::Admin);
}

#[tokio::test]
async fn accepted_invite_cannot_be_revoked() {
    let (store, _mailer, invites) = common::memory_invites();
    let (org_id, admin) = seed_org(&store);

    let invite_id = invites
        .create_invite(Some(admin), "a@b.com", "employee", org_id)
        .await
        .unwrap()
        .invite_id();
    store
        .set_invite_status(invite_id, InviteStatus::Accepted)
        .await
        .unwrap();

    assert!(!invites.revoke_invite(invite_id).await);

    let invite = store.get_invite(invite_id).await.unwrap().unwrap();
    assert_eq!(invite.status, InviteStatus::Accepted);
    assert!(invite.accepted_at.is_some());
}

#[tokio::test]
async fn email_failed_invite_can_be_revoked_once() {
    let (store, mailer, invites) = common::memory_invites();
    let (org_id, admin) = seed_org(&store);
    mailer.set_failing(true);

    let invite_id = invites
        .create_invite(Some(admin), "a@b.com", "employee", org_id)
        .await
        .unwrap()
        .invite_id();

    assert!(invites.revoke_invite(invite_id).await);
    assert!(!invites.revoke_invite(invite_id).await);

    let invite = store.get_invite(invite_id).await.unwrap().unwrap();
    assert_eq!(invite.status, InviteStatus::Revoked);
}
