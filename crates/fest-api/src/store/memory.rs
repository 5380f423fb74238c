//! In-memory registration store.
//!
//! All operations are synchronous under a `parking_lot::RwLock` and never
//! hold the lock across an `.await`. The lock is non-poisoning.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use fest_core::{Credential, EmailAddress, RegistrationId, RollNumber, Timestamp};
use fest_state::{
    admit, CooldownPolicy, EntryDecision, LifecycleError, Registration, RejectOutcome,
};

use super::{AdminRecord, EntryOutcome, RegistrationRepository, RepositoryError};

#[derive(Debug, Default)]
struct Inner {
    by_id: HashMap<RegistrationId, Registration>,
    by_roll: HashMap<RollNumber, RegistrationId>,
    by_email: HashMap<EmailAddress, RegistrationId>,
    admin: Option<AdminRecord>,
}

/// Thread-safe, cloneable in-memory store. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored registrations.
    pub fn len(&self) -> usize {
        self.inner.read().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `f` on a record under the write guard.
    fn try_update<R>(
        &self,
        id: RegistrationId,
        f: impl FnOnce(&mut Registration) -> Result<R, RepositoryError>,
    ) -> Result<R, RepositoryError> {
        let mut guard = self.inner.write();
        let record = guard
            .by_id
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound(id))?;
        f(record)
    }
}

fn lifecycle_error(err: LifecycleError) -> RepositoryError {
    match err {
        LifecycleError::AlreadyApproved { id } => RepositoryError::AlreadyApproved(id),
        other => RepositoryError::Corrupt(other.to_string()),
    }
}

#[async_trait]
impl RegistrationRepository for MemoryRepository {
    async fn insert(&self, registration: Registration) -> Result<Registration, RepositoryError> {
        let mut guard = self.inner.write();
        if guard.by_roll.contains_key(&registration.roll_number) {
            return Err(RepositoryError::Duplicate {
                field: "roll_number",
            });
        }
        if guard.by_email.contains_key(&registration.email) {
            return Err(RepositoryError::Duplicate { field: "email" });
        }
        guard
            .by_roll
            .insert(registration.roll_number.clone(), registration.id);
        guard
            .by_email
            .insert(registration.email.clone(), registration.id);
        guard.by_id.insert(registration.id, registration.clone());
        Ok(registration)
    }

    async fn get(&self, id: RegistrationId) -> Result<Option<Registration>, RepositoryError> {
        Ok(self.inner.read().by_id.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Registration>, RepositoryError> {
        let mut all: Vec<Registration> = self.inner.read().by_id.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(all)
    }

    async fn approve(
        &self,
        id: RegistrationId,
        credential: Credential,
        now: Timestamp,
    ) -> Result<Registration, RepositoryError> {
        self.try_update(id, |record| {
            record.approve(credential, now).map_err(lifecycle_error)?;
            Ok(record.clone())
        })
    }

    async fn reject(
        &self,
        id: RegistrationId,
        now: Timestamp,
    ) -> Result<(Registration, RejectOutcome), RepositoryError> {
        self.try_update(id, |record| {
            let outcome = record.reject(now);
            Ok((record.clone(), outcome))
        })
    }

    async fn record_entry(
        &self,
        roll_number: &RollNumber,
        now: Timestamp,
        policy: &CooldownPolicy,
    ) -> Result<EntryOutcome, RepositoryError> {
        let mut guard = self.inner.write();
        let Some(id) = guard.by_roll.get(roll_number).copied() else {
            return Ok(EntryOutcome {
                decision: EntryDecision::NotFound {
                    code: roll_number.to_string(),
                },
                registration: None,
            });
        };
        let record = guard.by_id.get_mut(&id).ok_or_else(|| {
            RepositoryError::Corrupt(format!("roll number index points at missing {id}"))
        })?;
        let decision = admit(record, now, policy);
        Ok(EntryOutcome {
            decision,
            registration: Some(record.clone()),
        })
    }

    async fn admin(&self) -> Result<Option<AdminRecord>, RepositoryError> {
        Ok(self.inner.read().admin.clone())
    }

    async fn provision_admin(&self, record: AdminRecord) -> Result<bool, RepositoryError> {
        let mut guard = self.inner.write();
        if guard.admin.is_some() {
            return Ok(false);
        }
        guard.admin = Some(record);
        Ok(true)
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use fest_state::{ApprovalStatus, NewRegistration};

    fn t0() -> Timestamp {
        Timestamp::parse("2025-03-14T09:00:00Z").unwrap()
    }

    fn submission(roll: &str, email: &str) -> Registration {
        Registration::submit(
            NewRegistration {
                name: "Asha Rao".into(),
                roll_number: roll.into(),
                branch: "CSE".into(),
                email: email.into(),
                phone: "9876543210".into(),
                id_card_reference: "uploads/asha.png".into(),
            },
            t0(),
        )
        .unwrap()
    }

    fn credential() -> Credential {
        Credential::new("data:image/png;base64,AAAA").unwrap()
    }

    #[tokio::test]
    async fn insert_enforces_unique_roll_and_email() {
        let repo = MemoryRepository::new();
        repo.insert(submission("CS101", "a@college.edu")).await.unwrap();

        let err = repo
            .insert(submission("CS101", "b@college.edu"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Duplicate { field: "roll_number" }));

        let err = repo
            .insert(submission("CS102", "A@College.edu"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Duplicate { field: "email" }));
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let repo = MemoryRepository::new();
        let mut older = submission("CS101", "a@college.edu");
        older.created_at = t0();
        let mut newer = submission("CS102", "b@college.edu");
        newer.created_at = t0().checked_add(Duration::minutes(5)).unwrap();
        repo.insert(older).await.unwrap();
        repo.insert(newer).await.unwrap();

        let listed = repo.list().await.unwrap();
        assert_eq!(listed[0].roll_number.as_str(), "CS102");
        assert_eq!(listed[1].roll_number.as_str(), "CS101");
    }

    #[tokio::test]
    async fn approve_twice_is_already_approved() {
        let repo = MemoryRepository::new();
        let reg = repo.insert(submission("CS101", "a@college.edu")).await.unwrap();
        let approved = repo.approve(reg.id, credential(), t0()).await.unwrap();
        assert_eq!(approved.status, ApprovalStatus::Approved);

        let err = repo.approve(reg.id, credential(), t0()).await.unwrap_err();
        assert!(matches!(err, RepositoryError::AlreadyApproved(id) if id == reg.id));
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let repo = MemoryRepository::new();
        let id = RegistrationId::new();
        assert!(matches!(
            repo.reject(id, t0()).await,
            Err(RepositoryError::NotFound(missing)) if missing == id
        ));
    }

    #[tokio::test]
    async fn record_entry_unknown_roll_is_not_found_decision() {
        let repo = MemoryRepository::new();
        let roll = RollNumber::new("unknown-roll").unwrap();
        let outcome = repo
            .record_entry(&roll, t0(), &CooldownPolicy::default())
            .await
            .unwrap();
        assert_eq!(outcome.decision.outcome(), "not_found");
        assert!(outcome.registration.is_none());
    }

    #[tokio::test]
    async fn record_entry_persists_last_entry() {
        let repo = MemoryRepository::new();
        let reg = repo.insert(submission("CS101", "a@college.edu")).await.unwrap();
        repo.approve(reg.id, credential(), t0()).await.unwrap();

        let outcome = repo
            .record_entry(&reg.roll_number, t0(), &CooldownPolicy::default())
            .await
            .unwrap();
        assert!(outcome.decision.is_accepted());
        let stored = repo.get(reg.id).await.unwrap().unwrap();
        assert_eq!(stored.last_entry_at, Some(t0()));
    }

    #[tokio::test]
    async fn concurrent_first_scans_admit_exactly_once() {
        let repo = MemoryRepository::new();
        let reg = repo.insert(submission("CS101", "a@college.edu")).await.unwrap();
        repo.approve(reg.id, credential(), t0()).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..32 {
            let repo = repo.clone();
            let roll = reg.roll_number.clone();
            handles.push(tokio::spawn(async move {
                repo.record_entry(&roll, t0(), &CooldownPolicy::default())
                    .await
                    .unwrap()
                    .decision
            }));
        }
        let mut accepted = 0;
        for handle in handles {
            if handle.await.unwrap().is_accepted() {
                accepted += 1;
            }
        }
        assert_eq!(accepted, 1);
        assert_eq!(repo.get(reg.id).await.unwrap().unwrap().entry_count, 1);
    }

    #[tokio::test]
    async fn provision_admin_is_create_if_absent() {
        let repo = MemoryRepository::new();
        let first = AdminRecord {
            email: EmailAddress::new("admin@college.edu").unwrap(),
            password_hash: "$argon2id$first".into(),
            created_at: t0(),
        };
        let mut second = first.clone();
        second.password_hash = "$argon2id$second".into();

        assert!(repo.provision_admin(first.clone()).await.unwrap());
        assert!(!repo.provision_admin(second).await.unwrap());
        assert_eq!(repo.admin().await.unwrap(), Some(first));
    }
}
