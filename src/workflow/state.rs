// WorkflowState - lifecycle of the single job a controller owns
use serde::Serialize;

use crate::error::ApiError;
use crate::models::subtitle::SubtitleStyle;
use crate::models::video::{FilterName, VideoJob};

/// A user trigger as it was given, kept on failure so it can be retried.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Intent {
    Submit { source_url: String },
    ApplyFilter { filter_name: String },
    ApplySubtitles { style: SubtitleStyle },
}

impl Intent {
    pub fn action(&self) -> &'static str {
        match self {
            Intent::Submit { .. } => "submit",
            Intent::ApplyFilter { .. } => "apply filter",
            Intent::ApplySubtitles { .. } => "apply subtitles",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WorkflowState {
    #[default]
    Idle,
    /// Conversion in flight.
    Submitting { source_url: String },
    Ready { job: VideoJob },
    FilterApplying { job: VideoJob, filter: FilterName },
    SubtitleApplying { job: VideoJob, style: SubtitleStyle },
    /// `previous` is always `Idle` or `Ready`.
    Failed {
        previous: Box<WorkflowState>,
        error: ApiError,
        intent: Intent,
    },
}

impl WorkflowState {
    pub fn label(&self) -> &'static str {
        match self {
            WorkflowState::Idle => "idle",
            WorkflowState::Submitting { .. } => "submitting",
            WorkflowState::Ready { .. } => "ready",
            WorkflowState::FilterApplying { .. } => "applying a filter",
            WorkflowState::SubtitleApplying { .. } => "applying subtitles",
            WorkflowState::Failed { .. } => "failed",
        }
    }

    /// The job held or being refined, if any.
    pub fn job(&self) -> Option<&VideoJob> {
        match self {
            WorkflowState::Ready { job }
            | WorkflowState::FilterApplying { job, .. }
            | WorkflowState::SubtitleApplying { job, .. } => Some(job),
            WorkflowState::Failed { previous, .. } => previous.job(),
            WorkflowState::Idle | WorkflowState::Submitting { .. } => None,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            WorkflowState::Submitting { .. }
                | WorkflowState::FilterApplying { .. }
                | WorkflowState::SubtitleApplying { .. }
        )
    }

    pub fn error(&self) -> Option<&ApiError> {
        match self {
            WorkflowState::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    /// The state a trigger is evaluated from: a failure is acknowledged
    /// implicitly by the next trigger.
    pub(crate) fn resting(&self) -> &WorkflowState {
        match self {
            WorkflowState::Failed { previous, .. } => previous,
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> VideoJob {
        serde_json::from_str(
            r#"{"id": 1, "youtube_url": "https://youtu.be/abc", "created_at": "2024-05-01T10:00:00Z"}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_failed_state_exposes_previous_job() {
        let state = WorkflowState::Failed {
            previous: Box::new(WorkflowState::Ready { job: job() }),
            error: ApiError::Network("reset".into()),
            intent: Intent::ApplyFilter {
                filter_name: "warm".into(),
            },
        };
        assert_eq!(state.job().map(|j| j.id.as_str()), Some("1"));
        assert_eq!(state.resting().label(), "ready");
        assert!(!state.is_in_flight());
        assert!(state.error().is_some());
    }

    #[test]
    fn test_serializes_with_state_tag() {
        let value = serde_json::to_value(WorkflowState::Submitting {
            source_url: "https://youtu.be/abc".into(),
        })
        .unwrap();
        assert_eq!(value["state"], "submitting");
        assert_eq!(value["source_url"], "https://youtu.be/abc");
    }
}
