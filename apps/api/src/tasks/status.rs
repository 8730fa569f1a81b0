//! Task State Machine, the single authority over `ContentTask.status`.
//!
//! Every status write in the service goes through [`TaskStatus::apply`]. The
//! transition table below is exhaustive: an event that is not listed for the
//! current status is rejected with a [`TransitionError`] and nothing is written.
//!
//! ```text
//! DRAFT/PLANNED ──content──▶ SCRIPT_READY
//! any but GENERATING ──dispatch──▶ GENERATING
//! GENERATING ──success──▶ REVIEW | VISUAL_READY
//! GENERATING ──failure──▶ DRAFT
//! REVIEW/VISUAL_READY ──approve frame──▶ MAIN_FRAME_APPROVED
//! MAIN_FRAME_APPROVED/VISUAL_READY ──request review──▶ REVIEW
//! any ──reset──▶ DRAFT
//! ```
//!
//! There is no lock column: two writers that both pass `apply` against the
//! same stale status will race, and the later commit wins.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Draft,
    Planned,
    ScriptReady,
    Generating,
    Review,
    VisualReady,
    MainFrameApproved,
}

/// Something that happened to a task and may move its status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskEvent {
    /// An idea or script was written, by a user or by the script generator.
    ContentWritten,
    /// An asset-generation job (or pipeline step) was started.
    GenerationDispatched,
    /// The asset exists. `review` selects REVIEW over VISUAL_READY.
    GenerationSucceeded { review: bool },
    /// The provider call or a write inside the generation step failed.
    GenerationFailed,
    /// A fashion frame was approved as the main frame.
    FrameApproved,
    /// An operator hands finished visuals over for review.
    ReviewRequested,
    /// Operator rollback, e.g. to unstick a task whose worker died.
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot move task from {from} to {to}")]
pub struct TransitionError {
    pub from: TaskStatus,
    pub to: TaskStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown task status '{0}'")]
pub struct ParseTaskStatusError(pub String);

impl TaskStatus {
    pub const ALL: [TaskStatus; 7] = [
        TaskStatus::Draft,
        TaskStatus::Planned,
        TaskStatus::ScriptReady,
        TaskStatus::Generating,
        TaskStatus::Review,
        TaskStatus::VisualReady,
        TaskStatus::MainFrameApproved,
    ];

    /// Canonical storage representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Draft => "DRAFT",
            TaskStatus::Planned => "PLANNED",
            TaskStatus::ScriptReady => "SCRIPT_READY",
            TaskStatus::Generating => "GENERATING",
            TaskStatus::Review => "REVIEW",
            TaskStatus::VisualReady => "VISUAL_READY",
            TaskStatus::MainFrameApproved => "MAIN_FRAME_APPROVED",
        }
    }

    /// Returns the status after `event`, or the rejected transition.
    ///
    /// `ContentWritten` never fails: outside DRAFT/PLANNED the content is
    /// saved and the status is left where it is.
    pub fn apply(self, event: TaskEvent) -> Result<TaskStatus, TransitionError> {
        use TaskEvent as E;
        use TaskStatus as S;

        let next = match (self, event) {
            (S::Draft | S::Planned, E::ContentWritten) => S::ScriptReady,
            (_, E::ContentWritten) => self,

            (S::Generating, E::GenerationDispatched) => return Err(self.rejects(event)),
            (_, E::GenerationDispatched) => S::Generating,

            (S::Generating, E::GenerationSucceeded { review: true }) => S::Review,
            (S::Generating, E::GenerationSucceeded { review: false }) => S::VisualReady,
            (S::Generating, E::GenerationFailed) => S::Draft,

            (S::Review | S::VisualReady, E::FrameApproved) => S::MainFrameApproved,
            (S::MainFrameApproved | S::VisualReady, E::ReviewRequested) => S::Review,

            (_, E::Reset) => S::Draft,

            (_, E::GenerationSucceeded { .. })
            | (_, E::GenerationFailed)
            | (_, E::FrameApproved)
            | (_, E::ReviewRequested) => return Err(self.rejects(event)),
        };

        Ok(next)
    }

    /// Maps an operator's requested status onto the event that reaches it.
    /// Statuses owned by an action (e.g. GENERATING) cannot be set by hand.
    pub fn manual_event(target: TaskStatus) -> Option<TaskEvent> {
        match target {
            TaskStatus::Draft => Some(TaskEvent::Reset),
            TaskStatus::Review => Some(TaskEvent::ReviewRequested),
            _ => None,
        }
    }

    fn rejects(self, event: TaskEvent) -> TransitionError {
        TransitionError {
            from: self,
            to: event.target(),
        }
    }
}

impl TaskEvent {
    /// The status this event aims for, used when reporting a rejection.
    pub fn target(self) -> TaskStatus {
        match self {
            TaskEvent::ContentWritten => TaskStatus::ScriptReady,
            TaskEvent::GenerationDispatched => TaskStatus::Generating,
            TaskEvent::GenerationSucceeded { review: true } => TaskStatus::Review,
            TaskEvent::GenerationSucceeded { review: false } => TaskStatus::VisualReady,
            TaskEvent::GenerationFailed | TaskEvent::Reset => TaskStatus::Draft,
            TaskEvent::FrameApproved => TaskStatus::MainFrameApproved,
            TaskEvent::ReviewRequested => TaskStatus::Review,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = ParseTaskStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_uppercase();
        TaskStatus::ALL
            .into_iter()
            .find(|s| s.as_str() == normalized)
            .ok_or_else(|| ParseTaskStatusError(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use TaskEvent as E;
    use TaskStatus as S;

    #[test]
    fn test_content_write_promotes_draft_and_planned() {
        assert_eq!(S::Draft.apply(E::ContentWritten), Ok(S::ScriptReady));
        assert_eq!(S::Planned.apply(E::ContentWritten), Ok(S::ScriptReady));
    }

    #[test]
    fn test_content_write_elsewhere_keeps_status() {
        for status in [S::ScriptReady, S::Generating, S::Review, S::VisualReady, S::MainFrameApproved] {
            assert_eq!(status.apply(E::ContentWritten), Ok(status));
        }
    }

    #[test]
    fn test_dispatch_rejected_while_generating() {
        let err = S::Generating.apply(E::GenerationDispatched).unwrap_err();
        assert_eq!(err.from, S::Generating);
        assert_eq!(err.to, S::Generating);
    }

    #[test]
    fn test_dispatch_allowed_from_every_resting_status() {
        for status in S::ALL.into_iter().filter(|s| *s != S::Generating) {
            assert_eq!(status.apply(E::GenerationDispatched), Ok(S::Generating));
        }
    }

    #[test]
    fn test_success_and_failure_only_leave_generating() {
        assert_eq!(
            S::Generating.apply(E::GenerationSucceeded { review: true }),
            Ok(S::Review)
        );
        assert_eq!(
            S::Generating.apply(E::GenerationSucceeded { review: false }),
            Ok(S::VisualReady)
        );
        assert_eq!(S::Generating.apply(E::GenerationFailed), Ok(S::Draft));

        for status in S::ALL.into_iter().filter(|s| *s != S::Generating) {
            assert!(status.apply(E::GenerationSucceeded { review: true }).is_err());
            assert!(status.apply(E::GenerationFailed).is_err());
        }
    }

    #[test]
    fn test_assets_never_skip_generating() {
        // No resting status reaches REVIEW or VISUAL_READY through a generation event.
        for status in [S::Draft, S::Planned, S::ScriptReady] {
            assert!(status.apply(E::GenerationSucceeded { review: false }).is_err());
        }
    }

    #[test]
    fn test_frame_approval_requires_review_or_visual_ready() {
        assert_eq!(S::Review.apply(E::FrameApproved), Ok(S::MainFrameApproved));
        assert_eq!(S::VisualReady.apply(E::FrameApproved), Ok(S::MainFrameApproved));
        for status in [S::Draft, S::Planned, S::ScriptReady, S::Generating, S::MainFrameApproved] {
            let err = status.apply(E::FrameApproved).unwrap_err();
            assert_eq!(err.to, S::MainFrameApproved);
        }
    }

    #[test]
    fn test_reset_always_lands_in_draft() {
        for status in S::ALL {
            assert_eq!(status.apply(E::Reset), Ok(S::Draft));
        }
    }

    #[test]
    fn test_manual_targets() {
        assert_eq!(S::manual_event(S::Draft), Some(E::Reset));
        assert_eq!(S::manual_event(S::Review), Some(E::ReviewRequested));
        assert_eq!(S::manual_event(S::Generating), None);
        assert_eq!(S::manual_event(S::MainFrameApproved), None);
    }

    #[test]
    fn test_parse_round_trips_storage_strings() {
        for status in S::ALL {
            assert_eq!(S::try_from(status.as_str()), Ok(status));
        }
        assert_eq!(S::try_from(" review "), Ok(S::Review));
        assert!(S::try_from("APPROVED").is_err());
    }

    #[test]
    fn test_serde_uses_storage_strings() {
        let json = serde_json::to_string(&S::MainFrameApproved).unwrap();
        assert_eq!(json, "\"MAIN_FRAME_APPROVED\"");
    }
}
