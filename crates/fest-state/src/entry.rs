//! # Entry Validation
//!
//! Decides whether a scanned credential admits its holder. The decision is a
//! pure function of the stored status, the last accepted entry instant, the
//! current instant and the cooldown window. [`admit`] mutates the record only
//! when the scan is accepted; callers run it under the record's lock so two
//! simultaneous scans cannot both be accepted.
//!
//! A clock that reads earlier than `last_entry_at` yields a duplicate with
//! the full window remaining. Entry is never granted on a backwards clock.

use chrono::Duration;
use thiserror::Error;

use fest_core::Timestamp;

use crate::registration::{ApprovalStatus, Registration};

/// Default re-entry cooldown.
pub const DEFAULT_COOLDOWN_HOURS: i64 = 12;

/// Invalid cooldown configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("cooldown window must be positive, got {0} seconds")]
    NonPositive(i64),

    #[error("cooldown window of {0} hours is out of range")]
    OutOfRange(i64),
}

/// Minimum interval between two accepted entries for the same holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownPolicy {
    window: Duration,
}

impl CooldownPolicy {
    pub fn from_hours(hours: i64) -> Result<Self, PolicyError> {
        let window = Duration::try_hours(hours).ok_or(PolicyError::OutOfRange(hours))?;
        Self::from_duration(window)
    }

    pub fn from_secs(secs: i64) -> Result<Self, PolicyError> {
        let window = Duration::try_seconds(secs).ok_or(PolicyError::NonPositive(secs))?;
        Self::from_duration(window)
    }

    pub fn from_duration(window: Duration) -> Result<Self, PolicyError> {
        if window <= Duration::zero() {
            return Err(PolicyError::NonPositive(window.num_seconds()));
        }
        Ok(Self { window })
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

impl Default for CooldownPolicy {
    fn default() -> Self {
        Self {
            window: Duration::hours(DEFAULT_COOLDOWN_HOURS),
        }
    }
}

/// Entry-relevant state derived from a registration at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// Status is not Approved.
    Unapproved,
    /// Approved, never admitted.
    NeverScanned,
    /// Admitted within the window.
    CooldownActive {
        /// Time until the next entry is allowed.
        remaining: Duration,
    },
    /// Admitted before, window has elapsed.
    CooldownExpired,
}

impl EntryState {
    pub fn of(reg: &Registration, now: Timestamp, policy: &CooldownPolicy) -> Self {
        if reg.status != ApprovalStatus::Approved {
            return Self::Unapproved;
        }
        let Some(last) = reg.last_entry_at else {
            return Self::NeverScanned;
        };
        let elapsed = now.signed_duration_since(last);
        if elapsed < Duration::zero() {
            return Self::CooldownActive {
                remaining: policy.window(),
            };
        }
        if elapsed >= policy.window() {
            Self::CooldownExpired
        } else {
            Self::CooldownActive {
                remaining: policy.window() - elapsed,
            }
        }
    }
}

/// Outcome of an entry scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryDecision {
    /// Entry granted; `last_entry_at` was set to `entered_at`.
    Accepted {
        entered_at: Timestamp,
        first_entry: bool,
    },
    /// Cooldown still active; nothing changed.
    Duplicate {
        last_entry_at: Timestamp,
        remaining: Duration,
    },
    /// Registration exists but is not approved.
    NotApproved { status: ApprovalStatus },
    /// No registration matches the scanned code.
    NotFound { code: String },
}

impl EntryDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    /// Stable machine-readable label.
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Accepted { .. } => "accepted",
            Self::Duplicate { .. } => "duplicate",
            Self::NotApproved { .. } => "not_approved",
            Self::NotFound { .. } => "not_found",
        }
    }
}

/// Apply an entry scan to a registration.
///
/// Sets `last_entry_at = now` and bumps `entry_count` only when accepted.
pub fn admit(reg: &mut Registration, now: Timestamp, policy: &CooldownPolicy) -> EntryDecision {
    match EntryState::of(reg, now, policy) {
        EntryState::Unapproved => EntryDecision::NotApproved { status: reg.status },
        EntryState::CooldownActive { remaining } => EntryDecision::Duplicate {
            // CooldownActive implies a prior entry.
            last_entry_at: reg.last_entry_at.unwrap_or(now),
            remaining,
        },
        state @ (EntryState::NeverScanned | EntryState::CooldownExpired) => {
            reg.last_entry_at = Some(now);
            reg.entry_count = reg.entry_count.saturating_add(1);
            reg.updated_at = now;
            EntryDecision::Accepted {
                entered_at: now,
                first_entry: state == EntryState::NeverScanned,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registration::NewRegistration;
    use fest_core::Credential;

    fn t0() -> Timestamp {
        Timestamp::parse("2025-03-14T09:00:00Z").unwrap()
    }

    fn at(offset: Duration) -> Timestamp {
        t0().checked_add(offset).unwrap()
    }

    fn pending() -> Registration {
        Registration::submit(
            NewRegistration {
                name: "Asha Rao".into(),
                roll_number: "CS101".into(),
                branch: "CSE".into(),
                email: "asha@college.edu".into(),
                phone: "9876543210".into(),
                id_card_reference: "uploads/asha.png".into(),
            },
            t0(),
        )
        .unwrap()
    }

    fn approved() -> Registration {
        let mut reg = pending();
        reg.approve(Credential::new("data:image/png;base64,AAAA").unwrap(), t0())
            .unwrap();
        reg
    }

    #[test]
    fn default_policy_is_twelve_hours() {
        assert_eq!(CooldownPolicy::default().window(), Duration::hours(12));
    }

    #[test]
    fn policy_rejects_non_positive() {
        assert!(CooldownPolicy::from_hours(0).is_err());
        assert!(CooldownPolicy::from_secs(-5).is_err());
        assert!(CooldownPolicy::from_secs(1).is_ok());
    }

    #[test]
    fn pending_is_not_approved() {
        let mut reg = pending();
        let decision = admit(&mut reg, t0(), &CooldownPolicy::default());
        assert_eq!(
            decision,
            EntryDecision::NotApproved {
                status: ApprovalStatus::Pending
            }
        );
        assert!(reg.last_entry_at.is_none());
    }

    #[test]
    fn rejected_is_not_approved_even_after_prior_entry() {
        let mut reg = approved();
        admit(&mut reg, t0(), &CooldownPolicy::default());
        reg.reject(at(Duration::hours(1)));
        let decision = admit(&mut reg, at(Duration::hours(20)), &CooldownPolicy::default());
        assert_eq!(decision.outcome(), "not_approved");
        assert_eq!(reg.last_entry_at, Some(t0()));
    }

    #[test]
    fn first_scan_accepted() {
        let mut reg = approved();
        let decision = admit(&mut reg, t0(), &CooldownPolicy::default());
        assert_eq!(
            decision,
            EntryDecision::Accepted {
                entered_at: t0(),
                first_entry: true
            }
        );
        assert_eq!(reg.last_entry_at, Some(t0()));
        assert_eq!(reg.entry_count, 1);
    }

    #[test]
    fn rescan_within_window_is_duplicate() {
        let policy = CooldownPolicy::default();
        let mut reg = approved();
        admit(&mut reg, t0(), &policy);
        let decision = admit(&mut reg, at(Duration::minutes(1)), &policy);
        assert_eq!(
            decision,
            EntryDecision::Duplicate {
                last_entry_at: t0(),
                remaining: Duration::hours(12) - Duration::minutes(1),
            }
        );
        assert_eq!(reg.last_entry_at, Some(t0()));
        assert_eq!(reg.entry_count, 1);
    }

    #[test]
    fn rescan_after_window_accepted() {
        let policy = CooldownPolicy::default();
        let mut reg = approved();
        admit(&mut reg, t0(), &policy);
        let later = at(Duration::hours(13));
        let decision = admit(&mut reg, later, &policy);
        assert_eq!(
            decision,
            EntryDecision::Accepted {
                entered_at: later,
                first_entry: false
            }
        );
        assert_eq!(reg.last_entry_at, Some(later));
        assert_eq!(reg.entry_count, 2);
    }

    #[test]
    fn exact_window_boundary_accepted() {
        let policy = CooldownPolicy::default();
        let mut reg = approved();
        admit(&mut reg, t0(), &policy);
        assert!(admit(&mut reg, at(Duration::hours(12)), &policy).is_accepted());
    }

    #[test]
    fn one_second_short_of_window_is_duplicate() {
        let policy = CooldownPolicy::default();
        let mut reg = approved();
        admit(&mut reg, t0(), &policy);
        let decision = admit(
            &mut reg,
            at(Duration::hours(12) - Duration::seconds(1)),
            &policy,
        );
        assert!(matches!(
            decision,
            EntryDecision::Duplicate { remaining, .. } if remaining == Duration::seconds(1)
        ));
    }

    #[test]
    fn backwards_clock_is_duplicate() {
        let policy = CooldownPolicy::default();
        let mut reg = approved();
        admit(&mut reg, at(Duration::hours(1)), &policy);
        let decision = admit(&mut reg, t0(), &policy);
        assert_eq!(decision.outcome(), "duplicate");
        assert_eq!(reg.last_entry_at, Some(at(Duration::hours(1))));
    }

    #[test]
    fn custom_window_is_honoured() {
        let policy = CooldownPolicy::from_secs(60).unwrap();
        let mut reg = approved();
        admit(&mut reg, t0(), &policy);
        assert!(!admit(&mut reg, at(Duration::seconds(59)), &policy).is_accepted());
        assert!(admit(&mut reg, at(Duration::seconds(60)), &policy).is_accepted());
    }

    #[test]
    fn entry_state_derivation() {
        let policy = CooldownPolicy::default();
        assert_eq!(EntryState::of(&pending(), t0(), &policy), EntryState::Unapproved);
        let mut reg = approved();
        assert_eq!(EntryState::of(&reg, t0(), &policy), EntryState::NeverScanned);
        admit(&mut reg, t0(), &policy);
        assert!(matches!(
            EntryState::of(&reg, at(Duration::hours(2)), &policy),
            EntryState::CooldownActive { .. }
        ));
        assert_eq!(
            EntryState::of(&reg, at(Duration::hours(12)), &policy),
            EntryState::CooldownExpired
        );
    }
}
