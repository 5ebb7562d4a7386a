//! Bulk-reset confirmation state machine.
//!
//! # Responsibility
//! - Track the confirmation dialog through request, commit and dismissal.
//! - Resolve the auto-dismiss timer as an explicit, caller-driven transition.
//!
//! # Invariants
//! - `Committing` is only left through `CommitSucceeded` or `CommitFailed`.
//! - The dismiss deadline lives inside `Confirmed`; leaving that state drops
//!   it, so a late `Tick` can never close a dialog opened afterwards.
//! - A rejected action leaves the state unchanged.

use log::debug;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{Duration, Instant};

/// Dialog state of the bulk reset flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetState {
    Idle,
    /// Dialog open, waiting for the user. `error` holds the last failed
    /// commit message, shown as a banner.
    ConfirmPending { error: Option<String> },
    Committing,
    /// Reset done; dialog shows `message` until `dismiss_at`.
    Confirmed { message: String, dismiss_at: Instant },
}

impl ResetState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::ConfirmPending { .. } => "confirm_pending",
            Self::Committing => "committing",
            Self::Confirmed { .. } => "confirmed",
        }
    }
}

/// Input to [`ResetFlow::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetAction {
    Request,
    Cancel,
    Confirm,
    CommitSucceeded { now: Instant },
    CommitFailed { error: String },
    /// User closed the success dialog before the timer fired.
    Dismiss,
    Tick { now: Instant },
}

impl ResetAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Cancel => "cancel",
            Self::Confirm => "confirm",
            Self::CommitSucceeded { .. } => "commit_succeeded",
            Self::CommitFailed { .. } => "commit_failed",
            Self::Dismiss => "dismiss",
            Self::Tick { .. } => "tick",
        }
    }
}

/// Action not accepted in the current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidTransition {
    pub state: &'static str,
    pub action: &'static str,
}

impl Display for InvalidTransition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "reset action `{}` is not allowed in state `{}`",
            self.action, self.state
        )
    }
}

impl Error for InvalidTransition {}

/// Owned reset-dialog state plus its timing settings.
#[derive(Debug, Clone)]
pub struct ResetFlow {
    state: ResetState,
    dismiss_after: Duration,
    message: String,
}

impl ResetFlow {
    pub fn new(dismiss_after: Duration, message: impl Into<String>) -> Self {
        Self {
            state: ResetState::Idle,
            dismiss_after,
            message: message.into(),
        }
    }

    pub fn state(&self) -> &ResetState {
        &self.state
    }

    /// Dialog is visible in every state except `Idle`.
    pub fn is_dialog_open(&self) -> bool {
        !matches!(self.state, ResetState::Idle)
    }

    /// Success message, present only while `Confirmed`.
    pub fn transient_message(&self) -> Option<&str> {
        match &self.state {
            ResetState::Confirmed { message, .. } => Some(message.as_str()),
            _ => None,
        }
    }

    /// Failure banner from the last rejected commit.
    pub fn error_message(&self) -> Option<&str> {
        match &self.state {
            ResetState::ConfirmPending { error } => error.as_deref(),
            _ => None,
        }
    }

    /// Deadline of the scheduled auto-dismiss, if one is pending.
    pub fn dismiss_deadline(&self) -> Option<Instant> {
        match &self.state {
            ResetState::Confirmed { dismiss_at, .. } => Some(*dismiss_at),
            _ => None,
        }
    }

    /// Applies one action to the current state.
    ///
    /// `Tick` is accepted in every state and only acts on an expired
    /// `Confirmed` deadline.
    pub fn apply(&mut self, action: ResetAction) -> Result<(), InvalidTransition> {
        let from = self.state.name();
        let action_name = action.name();
        let next = match (&self.state, action) {
            (ResetState::Idle, ResetAction::Request) => ResetState::ConfirmPending { error: None },
            (ResetState::ConfirmPending { .. }, ResetAction::Cancel) => ResetState::Idle,
            (ResetState::ConfirmPending { .. }, ResetAction::Confirm) => ResetState::Committing,
            (ResetState::Committing, ResetAction::CommitSucceeded { now }) => {
                ResetState::Confirmed {
                    message: self.message.clone(),
                    dismiss_at: now + self.dismiss_after,
                }
            }
            (ResetState::Committing, ResetAction::CommitFailed { error }) => {
                ResetState::ConfirmPending { error: Some(error) }
            }
            (ResetState::Confirmed { .. }, ResetAction::Dismiss) => ResetState::Idle,
            (ResetState::Confirmed { dismiss_at, .. }, ResetAction::Tick { now })
                if now >= *dismiss_at =>
            {
                ResetState::Idle
            }
            (_, ResetAction::Tick { .. }) => return Ok(()),
            _ => {
                return Err(InvalidTransition {
                    state: from,
                    action: action_name,
                })
            }
        };

        self.state = next;
        debug!(
            "event=reset_transition module=reset status=ok from={} action={} to={}",
            from,
            action_name,
            self.state.name()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{InvalidTransition, ResetAction, ResetFlow, ResetState};
    use std::time::{Duration, Instant};

    fn flow() -> ResetFlow {
        ResetFlow::new(Duration::from_secs(2), "done")
    }

    #[test]
    fn happy_path_auto_dismisses_after_deadline() {
        let mut flow = flow();
        let now = Instant::now();

        flow.apply(ResetAction::Request).unwrap();
        assert!(flow.is_dialog_open());
        flow.apply(ResetAction::Confirm).unwrap();
        assert_eq!(flow.state(), &ResetState::Committing);
        flow.apply(ResetAction::CommitSucceeded { now }).unwrap();
        assert_eq!(flow.transient_message(), Some("done"));
        assert_eq!(flow.dismiss_deadline(), Some(now + Duration::from_secs(2)));

        flow.apply(ResetAction::Tick {
            now: now + Duration::from_millis(1_999),
        })
        .unwrap();
        assert!(matches!(flow.state(), ResetState::Confirmed { .. }));

        flow.apply(ResetAction::Tick {
            now: now + Duration::from_secs(2),
        })
        .unwrap();
        assert_eq!(flow.state(), &ResetState::Idle);
        assert!(!flow.is_dialog_open());
        assert_eq!(flow.transient_message(), None);
    }

    #[test]
    fn cancel_returns_to_idle() {
        let mut flow = flow();
        flow.apply(ResetAction::Request).unwrap();
        flow.apply(ResetAction::Cancel).unwrap();
        assert_eq!(flow.state(), &ResetState::Idle);
    }

    #[test]
    fn failed_commit_reopens_confirmation_with_error() {
        let mut flow = flow();
        flow.apply(ResetAction::Request).unwrap();
        flow.apply(ResetAction::Confirm).unwrap();
        flow.apply(ResetAction::CommitFailed {
            error: "offline".to_string(),
        })
        .unwrap();

        assert_eq!(flow.error_message(), Some("offline"));
        assert_eq!(flow.transient_message(), None);

        // Retrying clears the banner once the dialog is committing again.
        flow.apply(ResetAction::Confirm).unwrap();
        assert_eq!(flow.error_message(), None);
    }

    #[test]
    fn dismiss_cancels_pending_deadline() {
        let mut flow = flow();
        let now = Instant::now();
        flow.apply(ResetAction::Request).unwrap();
        flow.apply(ResetAction::Confirm).unwrap();
        flow.apply(ResetAction::CommitSucceeded { now }).unwrap();
        flow.apply(ResetAction::Dismiss).unwrap();
        flow.apply(ResetAction::Request).unwrap();

        // The old timer fires while a new confirmation is pending.
        flow.apply(ResetAction::Tick {
            now: now + Duration::from_secs(5),
        })
        .unwrap();
        assert_eq!(flow.state(), &ResetState::ConfirmPending { error: None });
    }

    #[test]
    fn invalid_actions_leave_state_unchanged() {
        let mut flow = flow();
        let err = flow.apply(ResetAction::Confirm).unwrap_err();
        assert_eq!(
            err,
            InvalidTransition {
                state: "idle",
                action: "confirm",
            }
        );
        assert_eq!(flow.state(), &ResetState::Idle);

        flow.apply(ResetAction::Request).unwrap();
        assert!(flow.apply(ResetAction::Request).is_err());
        flow.apply(ResetAction::Confirm).unwrap();
        assert!(flow.apply(ResetAction::Cancel).is_err());
        assert_eq!(flow.state(), &ResetState::Committing);
    }
}
