//! # Approval Lifecycle & Entry Validation
//!
//! The operations behind the HTTP handlers. Each one is a short unit of
//! work against the registration store:
//!
//! 1. **register**: validate a submission and insert it `Pending`.
//! 2. **approve**: refuse early if already approved, render the QR
//!    credential outside any lock, then let the store apply the transition
//!    atomically (which re-checks the guard, so concurrent approvals have
//!    exactly one winner). Notify after commit.
//! 3. **reject**: atomic and idempotent. Notify only when the status
//!    actually changed.
//! 4. **validate_entry**: decode the scan and let the store apply the
//!    cooldown decision under the record lock.
//!
//! Notification failure never undoes a committed decision; it surfaces as
//! `notification_sent: false`.

use fest_core::RegistrationId;
use fest_credential::ScannedCode;
use fest_state::{EntryDecision, NewRegistration, Registration};

use crate::error::AppError;
use crate::notify::{dispatch, Notification, NotificationKind};
use crate::state::AppState;
use crate::store::EntryOutcome;

/// Result of an approve or reject call.
#[derive(Debug, Clone)]
pub struct ReviewResult {
    pub registration: Registration,
    /// Whether the student was notified.
    pub notification_sent: bool,
    /// False only for a repeated reject.
    pub changed: bool,
}

/// Self-service registration.
pub async fn register(state: &AppState, input: NewRegistration) -> Result<Registration, AppError> {
    let registration = Registration::submit(input, state.clock.now())?;
    let stored = state.repo.insert(registration).await?;
    tracing::info!(
        id = %stored.id,
        roll_number = %stored.roll_number,
        "registration submitted"
    );
    Ok(stored)
}

pub async fn approve(state: &AppState, id: RegistrationId) -> Result<ReviewResult, AppError> {
    let current = state
        .repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{id} not found")))?;
    if current.is_approved() {
        return Err(AppError::AlreadyApproved);
    }

    let roll_number = current.roll_number.clone();
    let credential = tokio::task::spawn_blocking(move || fest_credential::generate(&roll_number))
        .await
        .map_err(|e| AppError::Internal(format!("credential task failed: {e}")))??;

    let approved = state
        .repo
        .approve(id, credential.clone(), state.clock.now())
        .await?;
    tracing::info!(
        id = %approved.id,
        roll_number = %approved.roll_number,
        credential = %credential.fingerprint(),
        "registration approved"
    );

    let notification = Notification {
        recipient: approved.email.clone(),
        student_name: approved.name.clone(),
        event_name: state.config.event_name.clone(),
        kind: NotificationKind::Approval { credential },
    };
    let notification_sent =
        dispatch(state.notifier.as_ref(), &notification, state.config.notify_timeout).await;

    Ok(ReviewResult {
        registration: approved,
        notification_sent,
        changed: true,
    })
}

pub async fn reject(state: &AppState, id: RegistrationId) -> Result<ReviewResult, AppError> {
    let (rejected, outcome) = state.repo.reject(id, state.clock.now()).await?;
    if !outcome.changed() {
        tracing::info!(id = %rejected.id, "registration already rejected; nothing to do");
        return Ok(ReviewResult {
            registration: rejected,
            notification_sent: false,
            changed: false,
        });
    }
    tracing::info!(
        id = %rejected.id,
        roll_number = %rejected.roll_number,
        ?outcome,
        "registration rejected"
    );

    let notification = Notification {
        recipient: rejected.email.clone(),
        student_name: rejected.name.clone(),
        event_name: state.config.event_name.clone(),
        kind: NotificationKind::Rejection,
    };
    let notification_sent =
        dispatch(state.notifier.as_ref(), &notification, state.config.notify_timeout).await;

    Ok(ReviewResult {
        registration: rejected,
        notification_sent,
        changed: true,
    })
}

/// Decide whether a scanned credential admits its holder.
pub async fn validate_entry(state: &AppState, payload: &str) -> Result<EntryOutcome, AppError> {
    let roll_number = match fest_credential::decode_scan(payload)? {
        ScannedCode::Roll(roll) => roll,
        ScannedCode::Unrecognized(code) => {
            tracing::info!(code_len = code.chars().count(), "entry refused: not a roll number");
            return Ok(EntryOutcome {
                decision: EntryDecision::NotFound { code },
                registration: None,
            });
        }
    };
    let outcome = state
        .repo
        .record_entry(&roll_number, state.clock.now(), &state.config.cooldown)
        .await?;

    match &outcome.decision {
        EntryDecision::Accepted {
            entered_at,
            first_entry,
        } => tracing::info!(%roll_number, %entered_at, first_entry, "entry accepted"),
        EntryDecision::Duplicate {
            last_entry_at,
            remaining,
        } => tracing::info!(
            %roll_number,
            %last_entry_at,
            remaining_secs = remaining.num_seconds(),
            "duplicate scan within cooldown"
        ),
        EntryDecision::NotApproved { status } => {
            tracing::info!(%roll_number, %status, "entry refused: not approved")
        }
        EntryDecision::NotFound { .. } => tracing::info!(%roll_number, "entry refused: unknown"),
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Duration;
    use fest_core::{ManualClock, Timestamp};
    use fest_state::ApprovalStatus;

    use crate::notify::RecordingNotifier;

    fn t0() -> Timestamp {
        Timestamp::parse("2025-03-14T09:00:00Z").unwrap()
    }

    fn harness() -> (AppState, ManualClock, RecordingNotifier) {
        let clock = ManualClock::new(t0());
        let notifier = RecordingNotifier::new();
        let state = AppState::new()
            .with_clock(Arc::new(clock.clone()))
            .with_notifier(Arc::new(notifier.clone()));
        (state, clock, notifier)
    }

    fn cs101() -> NewRegistration {
        NewRegistration {
            name: "Asha Rao".into(),
            roll_number: "CS101".into(),
            branch: "CSE".into(),
            email: "asha@college.edu".into(),
            phone: "9876543210".into(),
            id_card_reference: "uploads/asha.png".into(),
        }
    }

    #[tokio::test]
    async fn approve_issues_credential_and_notifies() {
        let (state, _, notifier) = harness();
        let reg = register(&state, cs101()).await.unwrap();

        let result = approve(&state, reg.id).await.unwrap();
        assert_eq!(result.registration.status, ApprovalStatus::Approved);
        assert!(result.registration.credential.is_some());
        assert!(result.notification_sent);

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].is_approval());
        assert_eq!(sent[0].recipient.as_str(), "asha@college.edu");
    }

    #[tokio::test]
    async fn second_approve_fails_without_second_email() {
        let (state, _, notifier) = harness();
        let reg = register(&state, cs101()).await.unwrap();
        let first = approve(&state, reg.id).await.unwrap();

        assert!(matches!(
            approve(&state, reg.id).await,
            Err(AppError::AlreadyApproved)
        ));
        let stored = state.repo.get(reg.id).await.unwrap().unwrap();
        assert_eq!(stored.credential, first.registration.credential);
        assert_eq!(notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_approvals_have_one_winner() {
        let (state, _, notifier) = harness();
        let reg = register(&state, cs101()).await.unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let state = state.clone();
                tokio::spawn(async move { approve(&state, reg.id).await })
            })
            .collect();
        let mut winners = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => winners += 1,
                Err(AppError::AlreadyApproved) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn approve_unknown_is_not_found() {
        let (state, _, _) = harness();
        assert!(matches!(
            approve(&state, RegistrationId::new()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn failed_notification_keeps_approval() {
        let (state, _, notifier) = harness();
        notifier.set_failing(true);
        let reg = register(&state, cs101()).await.unwrap();

        let result = approve(&state, reg.id).await.unwrap();
        assert!(!result.notification_sent);
        let stored = state.repo.get(reg.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ApprovalStatus::Approved);
    }

    #[tokio::test]
    async fn reject_is_idempotent_and_notifies_once() {
        let (state, _, notifier) = harness();
        let reg = register(&state, cs101()).await.unwrap();
        approve(&state, reg.id).await.unwrap();

        let first = reject(&state, reg.id).await.unwrap();
        assert!(first.changed);
        assert!(first.registration.credential.is_none());
        assert_eq!(first.registration.status, ApprovalStatus::Rejected);

        let second = reject(&state, reg.id).await.unwrap();
        assert!(!second.changed);
        assert!(!second.notification_sent);

        let rejections = notifier.sent().iter().filter(|n| !n.is_approval()).count();
        assert_eq!(rejections, 1);
    }

    #[tokio::test]
    async fn entry_scenario_with_cooldown() {
        let (state, clock, _) = harness();
        let reg = register(&state, cs101()).await.unwrap();

        let before = validate_entry(&state, "CS101").await.unwrap();
        assert_eq!(before.decision.outcome(), "not_approved");

        approve(&state, reg.id).await.unwrap();
        let first = validate_entry(&state, "CS101").await.unwrap();
        assert_eq!(
            first.decision,
            EntryDecision::Accepted {
                entered_at: t0(),
                first_entry: true
            }
        );

        clock.advance(Duration::minutes(1));
        let again = validate_entry(&state, "CS101").await.unwrap();
        assert_eq!(again.decision.outcome(), "duplicate");

        clock.set(t0().checked_add(Duration::hours(13)).unwrap());
        let next_day = validate_entry(&state, "CS101").await.unwrap();
        assert!(next_day.decision.is_accepted());
        assert_eq!(
            next_day.registration.unwrap().last_entry_at,
            Some(t0().checked_add(Duration::hours(13)).unwrap())
        );
    }

    #[tokio::test]
    async fn unknown_roll_and_empty_scan() {
        let (state, _, _) = harness();
        let unknown = validate_entry(&state, "unknown-roll").await.unwrap();
        assert_eq!(unknown.decision.outcome(), "not_found");
        assert!(matches!(
            validate_entry(&state, "   ").await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn foreign_qr_code_is_not_found() {
        let (state, _, _) = harness();
        let url = format!("https://example.org/{}", "a".repeat(51));
        assert_eq!(url.len(), 70);
        let outcome = validate_entry(&state, &url).await.unwrap();
        assert_eq!(outcome.decision, EntryDecision::NotFound { code: url });
        assert!(outcome.registration.is_none());

        let outcome = validate_entry(&state, "CS\u{7}101").await.unwrap();
        assert_eq!(outcome.decision.outcome(), "not_found");
    }

    #[tokio::test]
    async fn duplicate_registration_rejected() {
        let (state, _, _) = harness();
        register(&state, cs101()).await.unwrap();
        let mut other = cs101();
        other.email = "other@college.edu".into();
        assert!(matches!(
            register(&state, other).await,
            Err(AppError::Duplicate {
                field: "roll_number"
            })
        ));
    }
}
