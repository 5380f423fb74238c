//! # Registration Store
//!
//! The single shared mutable resource of the service. Two backends sit
//! behind [`RegistrationRepository`]:
//!
//! - [`MemoryRepository`]: one `parking_lot::RwLock` over the records and
//!   their unique indexes. Every read-check-write runs under one write
//!   guard.
//! - [`PgRepository`]: Postgres via `sqlx`. Every read-check-write runs in
//!   a transaction holding a `SELECT ... FOR UPDATE` row lock.
//!
//! Both apply the same `fest-state` transition functions, so approve and
//! entry semantics cannot drift between backends. Neither backend ever
//! awaits anything other than the database while a record is locked.

pub mod memory;
pub mod postgres;

pub use memory::MemoryRepository;
pub use postgres::PgRepository;

use async_trait::async_trait;
use thiserror::Error;

use fest_core::{Credential, EmailAddress, RegistrationId, RollNumber, Timestamp};
use fest_state::{CooldownPolicy, EntryDecision, Registration, RejectOutcome};

/// Errors raised by a repository backend.
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// No registration with this id.
    #[error("{0} not found")]
    NotFound(RegistrationId),

    /// A unique field collided with an existing registration.
    #[error("a registration with this {field} already exists")]
    Duplicate {
        /// `roll_number` or `email`.
        field: &'static str,
    },

    /// Approve on an already approved registration.
    #[error("{0} is already approved")]
    AlreadyApproved(RegistrationId),

    /// A stored row could not be turned back into a domain record.
    #[error("corrupt stored record: {0}")]
    Corrupt(String),

    /// Backend failure.
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

/// Result of applying an entry scan under the record lock.
#[derive(Debug, Clone)]
pub struct EntryOutcome {
    pub decision: EntryDecision,
    /// The record after the decision was applied, when one matched.
    pub registration: Option<Registration>,
}

/// The provisioned administrator.
#[derive(Clone, PartialEq, Eq)]
pub struct AdminRecord {
    pub email: EmailAddress,
    /// argon2 PHC string; the salt is embedded.
    pub password_hash: String,
    pub created_at: Timestamp,
}

impl std::fmt::Debug for AdminRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminRecord")
            .field("email", &self.email)
            .field("password_hash", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Storage contract for registrations and the admin record.
///
/// `approve`, `reject` and `record_entry` must be atomic per record: two
/// concurrent calls on the same record observe each other's effects.
#[async_trait]
pub trait RegistrationRepository: Send + Sync + std::fmt::Debug {
    /// Persist a new registration. Fails with `Duplicate` on roll number or
    /// email collision.
    async fn insert(&self, registration: Registration) -> Result<Registration, RepositoryError>;

    /// Fetch by id.
    async fn get(&self, id: RegistrationId) -> Result<Option<Registration>, RepositoryError>;

    /// All registrations, newest first.
    async fn list(&self) -> Result<Vec<Registration>, RepositoryError>;

    /// Atomically approve and store the credential.
    async fn approve(
        &self,
        id: RegistrationId,
        credential: Credential,
        now: Timestamp,
    ) -> Result<Registration, RepositoryError>;

    /// Atomically reject and clear the credential.
    async fn reject(
        &self,
        id: RegistrationId,
        now: Timestamp,
    ) -> Result<(Registration, RejectOutcome), RepositoryError>;

    /// Atomically apply an entry scan for the holder of `roll_number`.
    async fn record_entry(
        &self,
        roll_number: &RollNumber,
        now: Timestamp,
        policy: &CooldownPolicy,
    ) -> Result<EntryOutcome, RepositoryError>;

    /// The provisioned admin, if any.
    async fn admin(&self) -> Result<Option<AdminRecord>, RepositoryError>;

    /// Store the admin record unless one exists. Returns whether it was
    /// created; an existing record is never overwritten.
    async fn provision_admin(&self, record: AdminRecord) -> Result<bool, RepositoryError>;

    /// Cheap liveness check of the backend.
    async fn ping(&self) -> Result<(), RepositoryError>;
}
