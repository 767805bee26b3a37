use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex, MutexGuard,
    },
};

use async_trait::async_trait;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::{InviteStore, StoreError, StoreResult, TimesheetStore};
use crate::{
    auth::Role,
    models::{
        invite::{Invite, InviteStatus, NewInvite},
        organization::{Member, Organization},
        report::WeeklyEmployeeHours,
        time_entry::EmployeeTimeEntry,
    },
};

#[derive(Default)]
struct Tables {
    organizations: HashMap<Uuid, Organization>,
    members: Vec<Member>,
    invites: Vec<Invite>,
    weekly_hours: HashMap<(Uuid, Date), Vec<WeeklyEmployeeHours>>,
    entries: Vec<EmployeeTimeEntry>,
}

/// In-process row store. Enforces the same pending-invite uniqueness as the
/// database index, and can be told to fail writes so callers' failure paths
/// can be exercised.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_writes: AtomicBool,
    invite_inserts: AtomicUsize,
    entry_fetches: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        // A panic while holding the lock leaves plain data behind; keep serving it.
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_writable(&self) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("writes are disabled".into()));
        }
        Ok(())
    }

    pub fn add_organization(&self, name: &str) -> Organization {
        let now = OffsetDateTime::now_utc();
        let id = Uuid::new_v4();
        let org = Organization {
            id,
            name: name.to_string(),
            slug: format!("{}-{}", name.to_ascii_lowercase().replace(' ', "-"), &id.to_string()[..8]),
            timezone: "UTC".into(),
            created_at: now,
            updated_at: now,
        };
        self.tables().organizations.insert(id, org.clone());
        org
    }

    pub fn add_member(&self, org_id: Uuid, role: Role, first_name: &str, email: &str) -> Member {
        let member = Member {
            org_id,
            user_id: Uuid::new_v4(),
            role,
            first_name: first_name.to_string(),
            last_name: "Tester".into(),
            email: email.to_string(),
        };
        self.tables().members.push(member.clone());
        member
    }

    pub fn put_weekly_hours(&self, org_id: Uuid, week_start: Date, rows: Vec<WeeklyEmployeeHours>) {
        self.tables().weekly_hours.insert((org_id, week_start), rows);
    }

    pub fn put_time_entry(&self, entry: EmployeeTimeEntry) {
        self.tables().entries.push(entry);
    }

    /// Make every subsequent write fail with [`StoreError::Backend`].
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn invite_insert_count(&self) -> usize {
        self.invite_inserts.load(Ordering::SeqCst)
    }

    pub fn entry_fetch_count(&self) -> usize {
        self.entry_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InviteStore for MemoryStore {
    async fn find_organization(&self, org_id: Uuid) -> StoreResult<Option<Organization>> {
        Ok(self.tables().organizations.get(&org_id).cloned())
    }

    async fn find_member(&self, org_id: Uuid, user_id: Uuid) -> StoreResult<Option<Member>> {
        Ok(self
            .tables()
            .members
            .iter()
            .find(|m| m.org_id == org_id && m.user_id == user_id)
            .cloned())
    }

    async fn find_pending_invite(
        &self,
        org_id: Uuid,
        email: &str,
    ) -> StoreResult<Option<Invite>> {
        Ok(self
            .tables()
            .invites
            .iter()
            .find(|i| {
                i.organization_id == org_id && i.email == email && i.status == InviteStatus::Pending
            })
            .cloned())
    }

    async fn insert_invite(&self, invite: NewInvite) -> StoreResult<Invite> {
        self.check_writable()?;
        let mut tables = self.tables();

        let duplicate = tables.invites.iter().any(|i| {
            i.organization_id == invite.organization_id
                && i.email == invite.email
                && i.status == InviteStatus::Pending
        });
        if duplicate {
            return Err(StoreError::UniqueViolation(
                "organization_invites_one_pending".into(),
            ));
        }

        let row = Invite {
            id: Uuid::new_v4(),
            organization_id: invite.organization_id,
            email: invite.email,
            role: invite.role,
            status: InviteStatus::Pending,
            invited_by: invite.invited_by,
            created_at: OffsetDateTime::now_utc(),
            expires_at: invite.expires_at,
            accepted_at: None,
        };
        tables.invites.push(row.clone());
        self.invite_inserts.fetch_add(1, Ordering::SeqCst);
        Ok(row)
    }

    async fn get_invite(&self, invite_id: Uuid) -> StoreResult<Option<Invite>> {
        Ok(self.tables().invites.iter().find(|i| i.id == invite_id).cloned())
    }

    async fn set_invite_status(&self, invite_id: Uuid, status: InviteStatus) -> StoreResult<()> {
        self.check_writable()?;
        let mut tables = self.tables();

        if status == InviteStatus::Pending {
            let target = tables
                .invites
                .iter()
                .find(|i| i.id == invite_id)
                .map(|i| (i.organization_id, i.email.clone()));
            if let Some((org_id, email)) = target {
                let clash = tables.invites.iter().any(|i| {
                    i.id != invite_id
                        && i.organization_id == org_id
                        && i.email == email
                        && i.status == InviteStatus::Pending
                });
                if clash {
                    return Err(StoreError::UniqueViolation(
                        "organization_invites_one_pending".into(),
                    ));
                }
            }
        }

        let invite = tables
            .invites
            .iter_mut()
            .find(|i| i.id == invite_id)
            .ok_or(StoreError::NotFound)?;

        invite.status = status;
        if status == InviteStatus::Accepted {
            invite.accepted_at = Some(OffsetDateTime::now_utc());
        }
        Ok(())
    }

    async fn revoke_invite(&self, invite_id: Uuid) -> StoreResult<bool> {
        self.check_writable()?;
        let mut tables = self.tables();

        match tables.invites.iter_mut().find(|i| {
            i.id == invite_id
                && matches!(i.status, InviteStatus::Pending | InviteStatus::EmailFailed)
        }) {
            Some(invite) => {
                invite.status = InviteStatus::Revoked;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_invites(&self, org_id: Uuid) -> StoreResult<Vec<Invite>> {
        let mut rows: Vec<Invite> = self
            .tables()
            .invites
            .iter()
            .filter(|i| i.organization_id == org_id)
            .cloned()
            .collect();
        // Stable sort keeps insertion order for equal timestamps; reverse it too.
        rows.reverse();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }
}

#[async_trait]
impl TimesheetStore for MemoryStore {
    async fn weekly_hours(
        &self,
        org_id: Uuid,
        week_start: Date,
    ) -> StoreResult<Vec<WeeklyEmployeeHours>> {
        Ok(self
            .tables()
            .weekly_hours
            .get(&(org_id, week_start))
            .cloned()
            .unwrap_or_default())
    }

    async fn employee_week_entries(
        &self,
        org_id: Uuid,
        employee_id: Uuid,
        week_start: Date,
    ) -> StoreResult<Vec<EmployeeTimeEntry>> {
        self.entry_fetches.fetch_add(1, Ordering::SeqCst);
        let week_end = week_start + time::Duration::days(6);
        let mut rows: Vec<EmployeeTimeEntry> = self
            .tables()
            .entries
            .iter()
            .filter(|e| {
                e.org_id == org_id
                    && e.employee_id == employee_id
                    && e.work_date >= week_start
                    && e.work_date <= week_end
            })
            .cloned()
            .collect();
        rows.sort_by_key(|e| (e.work_date, e.clock_in));
        Ok(rows)
    }
}
