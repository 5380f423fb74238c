//! # Registration Approval Lifecycle
//!
//! One `Registration` per student. Created `Pending` by self-service
//! submission, then moved to `Approved` or `Rejected` by an administrator.
//!
//! ## Invariants
//!
//! - `credential.is_some()` if and only if `status == Approved`.
//! - `last_entry_at` only ever moves forward (see `entry.rs`).
//! - Identity attributes are immutable after submission.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use fest_core::{Credential, EmailAddress, RegistrationId, RollNumber, Timestamp, ValidationError};

const MAX_NAME_LEN: usize = 128;
const MAX_BRANCH_LEN: usize = 64;
const MAX_PHONE_LEN: usize = 20;
const MIN_PHONE_DIGITS: usize = 7;
const MAX_REFERENCE_LEN: usize = 512;

// ─── Approval Status ────────────────────────────────────────────────

/// Review status of a registration. Exactly one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalStatus {
    /// Submitted, awaiting administrator review.
    Pending,
    /// Approved; a credential has been issued.
    Approved,
    /// Rejected; no credential.
    Rejected,
}

impl ApprovalStatus {
    /// Return the string representation of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }

    /// Parse the stored representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "APPROVED" => Some(Self::Approved),
            "REJECTED" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl std::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors raised by lifecycle transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    /// Approve was called on a registration that is already approved.
    #[error("{id} is already approved")]
    AlreadyApproved {
        /// The registration.
        id: RegistrationId,
    },

    /// Stored record violates the credential/status invariant.
    #[error("{id} is {status} but credential presence is {has_credential}")]
    InvariantViolated {
        /// The registration.
        id: RegistrationId,
        /// Its status.
        status: ApprovalStatus,
        /// Whether a credential is stored.
        has_credential: bool,
    },
}

/// Result of a reject call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectOutcome {
    /// The status changed to Rejected.
    Rejected {
        /// Status before the transition.
        previous: ApprovalStatus,
    },
    /// Already rejected; nothing changed.
    AlreadyRejected,
}

impl RejectOutcome {
    /// Whether the call changed the record.
    pub fn changed(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

// ─── Submission ──────────────────────────────────────────────────────

/// Raw self-service registration input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRegistration {
    pub name: String,
    pub roll_number: String,
    pub branch: String,
    pub email: String,
    pub phone: String,
    /// Opaque reference to the uploaded ID-card image.
    pub id_card_reference: String,
}

// ─── Registration ────────────────────────────────────────────────────

/// A student's ticket application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub id: RegistrationId,
    pub name: String,
    pub roll_number: RollNumber,
    pub branch: String,
    pub email: EmailAddress,
    pub phone: String,
    pub id_card_reference: String,
    pub status: ApprovalStatus,
    /// Present iff `status == Approved`.
    pub credential: Option<Credential>,
    /// Set on each accepted entry scan.
    pub last_entry_at: Option<Timestamp>,
    /// Number of accepted entries.
    #[serde(default)]
    pub entry_count: u32,
    /// When an administrator last changed the status.
    pub reviewed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Registration {
    /// Validate a submission and create a `Pending` registration.
    ///
    /// Every field is required. Name, branch and phone are trimmed.
    pub fn submit(input: NewRegistration, now: Timestamp) -> Result<Self, ValidationError> {
        let name = required("name", &input.name, MAX_NAME_LEN)?;
        let roll_number = RollNumber::new(&input.roll_number)?;
        let branch = required("branch", &input.branch, MAX_BRANCH_LEN)?;
        let email = EmailAddress::new(&input.email)?;
        let phone = validate_phone(&input.phone)?;
        let id_card_reference =
            required("id_card_reference", &input.id_card_reference, MAX_REFERENCE_LEN)?;

        Ok(Self {
            id: RegistrationId::new(),
            name,
            roll_number,
            branch,
            email,
            phone,
            id_card_reference,
            status: ApprovalStatus::Pending,
            credential: None,
            last_entry_at: None,
            entry_count: 0,
            reviewed_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Approve and attach the issued credential.
    ///
    /// Allowed from `Pending` and `Rejected`. Re-approval is an error so
    /// that a second call never re-issues a credential or re-sends email.
    pub fn approve(&mut self, credential: Credential, now: Timestamp) -> Result<(), LifecycleError> {
        if self.status == ApprovalStatus::Approved {
            return Err(LifecycleError::AlreadyApproved { id: self.id });
        }
        self.status = ApprovalStatus::Approved;
        self.credential = Some(credential);
        self.reviewed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Reject and revoke any credential. Idempotent.
    pub fn reject(&mut self, now: Timestamp) -> RejectOutcome {
        if self.status == ApprovalStatus::Rejected {
            return RejectOutcome::AlreadyRejected;
        }
        let previous = self.status;
        self.status = ApprovalStatus::Rejected;
        self.credential = None;
        self.reviewed_at = Some(now);
        self.updated_at = now;
        RejectOutcome::Rejected { previous }
    }

    /// Whether the registration currently holds a valid ticket.
    pub fn is_approved(&self) -> bool {
        self.status == ApprovalStatus::Approved
    }

    /// Check the credential-iff-approved invariant.
    pub fn check_invariants(&self) -> Result<(), LifecycleError> {
        let has_credential = self.credential.is_some();
        if has_credential != self.is_approved() {
            return Err(LifecycleError::InvariantViolated {
                id: self.id,
                status: self.status,
                has_credential,
            });
        }
        Ok(())
    }
}

fn required(field: &'static str, raw: &str, max: usize) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField { field });
    }
    if trimmed.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(trimmed.to_string())
}

fn validate_phone(raw: &str) -> Result<String, ValidationError> {
    let phone = required("phone", raw, MAX_PHONE_LEN)?;
    let allowed = |c: char| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')');
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    if !phone.chars().all(allowed) || digits < MIN_PHONE_DIGITS {
        return Err(ValidationError::InvalidPhone(phone));
    }
    Ok(phone)
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> Timestamp {
        Timestamp::parse("2025-03-14T09:00:00Z").unwrap()
    }

    fn submission() -> NewRegistration {
        NewRegistration {
            name: "Asha Rao".to_string(),
            roll_number: "CS101".to_string(),
            branch: "CSE".to_string(),
            email: "asha@college.edu".to_string(),
            phone: "+91 98765 43210".to_string(),
            id_card_reference: "uploads/1710406800-asha.png".to_string(),
        }
    }

    fn credential() -> Credential {
        Credential::new("data:image/png;base64,iVBORw0KGgo=").unwrap()
    }

    #[test]
    fn submit_creates_pending_without_credential() {
        let reg = Registration::submit(submission(), now()).unwrap();
        assert_eq!(reg.status, ApprovalStatus::Pending);
        assert!(reg.credential.is_none());
        assert!(reg.last_entry_at.is_none());
        assert_eq!(reg.entry_count, 0);
        assert!(reg.check_invariants().is_ok());
    }

    #[test]
    fn submit_requires_every_field() {
        let cases: [(&str, fn(&mut NewRegistration)); 6] = [
            ("name", |s| s.name.clear()),
            ("roll_number", |s| s.roll_number = "  ".into()),
            ("branch", |s| s.branch.clear()),
            ("email", |s| s.email.clear()),
            ("phone", |s| s.phone.clear()),
            ("id_card_reference", |s| s.id_card_reference.clear()),
        ];
        for (field, blank) in cases {
            let mut input = submission();
            blank(&mut input);
            assert_eq!(
                Registration::submit(input, now()),
                Err(ValidationError::MissingField { field }),
                "field {field}"
            );
        }
    }

    #[test]
    fn submit_rejects_bad_phone() {
        let mut input = submission();
        input.phone = "call me".to_string();
        assert!(matches!(
            Registration::submit(input, now()),
            Err(ValidationError::InvalidPhone(_))
        ));
    }

    #[test]
    fn approve_pending_sets_credential() {
        let mut reg = Registration::submit(submission(), now()).unwrap();
        reg.approve(credential(), now()).unwrap();
        assert_eq!(reg.status, ApprovalStatus::Approved);
        assert!(reg.credential.is_some());
        assert_eq!(reg.reviewed_at, Some(now()));
        assert!(reg.check_invariants().is_ok());
    }

    #[test]
    fn second_approve_fails_and_leaves_state() {
        let mut reg = Registration::submit(submission(), now()).unwrap();
        reg.approve(credential(), now()).unwrap();
        let before = reg.clone();
        let other = Credential::new("data:image/png;base64,OTHER").unwrap();
        assert_eq!(
            reg.approve(other, now()),
            Err(LifecycleError::AlreadyApproved { id: reg.id })
        );
        assert_eq!(reg, before);
    }

    #[test]
    fn reject_clears_credential() {
        let mut reg = Registration::submit(submission(), now()).unwrap();
        reg.approve(credential(), now()).unwrap();
        let outcome = reg.reject(now());
        assert_eq!(
            outcome,
            RejectOutcome::Rejected {
                previous: ApprovalStatus::Approved
            }
        );
        assert_eq!(reg.status, ApprovalStatus::Rejected);
        assert!(reg.credential.is_none());
        assert!(reg.check_invariants().is_ok());
    }

    #[test]
    fn reject_is_idempotent() {
        let mut reg = Registration::submit(submission(), now()).unwrap();
        assert!(reg.reject(now()).changed());
        let before = reg.clone();
        assert_eq!(reg.reject(now()), RejectOutcome::AlreadyRejected);
        assert_eq!(reg, before);
    }

    #[test]
    fn rejected_can_be_approved_later() {
        let mut reg = Registration::submit(submission(), now()).unwrap();
        reg.reject(now());
        reg.approve(credential(), now()).unwrap();
        assert!(reg.is_approved());
        assert!(reg.check_invariants().is_ok());
    }

    #[test]
    fn invariant_check_detects_corruption() {
        let mut reg = Registration::submit(submission(), now()).unwrap();
        reg.credential = Some(credential());
        assert!(matches!(
            reg.check_invariants(),
            Err(LifecycleError::InvariantViolated {
                has_credential: true,
                ..
            })
        ));
    }

    #[test]
    fn status_display_and_parse_agree() {
        for status in [
            ApprovalStatus::Pending,
            ApprovalStatus::Approved,
            ApprovalStatus::Rejected,
        ] {
            assert_eq!(ApprovalStatus::parse(&status.to_string()), Some(status));
        }
        assert_eq!(ApprovalStatus::parse("approved"), None);
    }

    #[test]
    fn status_serializes_screaming_case() {
        assert_eq!(
            serde_json::to_string(&ApprovalStatus::Approved).unwrap(),
            "\"APPROVED\""
        );
    }
}
