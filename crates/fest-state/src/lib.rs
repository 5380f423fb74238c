//! # fest-state: Registration State Machines
//!
//! Pure state transitions over a [`Registration`]. Nothing here performs
//! I/O; the store in `fest-api` calls these functions while holding the
//! record's lock (in-memory write guard or Postgres row lock), which is what
//! makes each transition atomic.
//!
//! ## State Machines
//!
//! - **Approval lifecycle** (`registration.rs`):
//!
//!   ```text
//!   Pending ──approve──▶ Approved ──reject──▶ Rejected
//!      │                    ▲                    │
//!      └──────reject────────┼─────▶ Rejected     │
//!                           └──────approve───────┘
//!   ```
//!
//!   `approve` on an Approved record fails with `AlreadyApproved`.
//!   `reject` on a Rejected record is an idempotent no-op.
//!
//! - **Entry validation** (`entry.rs`): a decision function over the stored
//!   approval status and last entry instant. The four derived states are
//!   `Unapproved`, `NeverScanned`, `CooldownActive`, `CooldownExpired`.

pub mod entry;
pub mod registration;

pub use entry::{admit, CooldownPolicy, EntryDecision, EntryState, PolicyError, DEFAULT_COOLDOWN_HOURS};
pub use registration::{
    ApprovalStatus, LifecycleError, NewRegistration, Registration, RejectOutcome,
};
