//! # fest-core: Foundational Types for the Ticketing Stack
//!
//! Every other crate in the workspace depends on `fest-core`; it depends on
//! nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for domain identifiers.** `RegistrationId`,
//!    `RollNumber`, `EmailAddress` are newtypes with validated constructors.
//!    A roll number can never be passed where an email is expected.
//!
//! 2. **`Credential` is opaque.** The encoded ticket payload is carried as a
//!    non-empty newtype; only `fest-credential` knows how it is produced.
//!
//! 3. **UTC-only timestamps.** `Timestamp` is UTC with seconds precision, and
//!    all "now" reads go through a [`Clock`] so the entry cooldown can be
//!    exercised deterministically.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `fest-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod credential;
pub mod error;
pub mod identity;
pub mod temporal;

pub use credential::Credential;
pub use error::{FestError, ValidationError};
pub use identity::{EmailAddress, RegistrationId, RollNumber};
pub use temporal::{Clock, ManualClock, SystemClock, Timestamp};
