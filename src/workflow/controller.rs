// Video workflow controller - drives one job through conversion, filtering
// and subtitle styling
use reqwest::Url;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::state::{Intent, WorkflowState};
use crate::api_client::VideoService;
use crate::error::{ApiError, WorkflowError};
use crate::models::subtitle::SubtitleStyle;
use crate::models::video::{FilterName, VideoJob};
use crate::session::SessionStore;

/// Identifies the call a response belongs to. A response is only applied
/// while the controller is still in the state the call was issued from.
#[derive(Debug, Clone)]
struct Ticket {
    generation: u64,
    job_id: Option<String>,
}

#[derive(Debug, Default)]
struct Inner {
    state: WorkflowState,
    generation: u64,
}

/// State machine owning a single `VideoJob`.
///
/// Methods take `&self`; the state lock is never held across a remote call,
/// so a trigger arriving while a call is pending sees the in-flight state
/// and is rejected with `WorkflowError::Busy` instead of being queued.
pub struct VideoWorkflowController {
    workflow_id: String,
    service: Arc<dyn VideoService>,
    session: Arc<SessionStore>,
    inner: Mutex<Inner>,
    published: watch::Sender<WorkflowState>,
}

impl VideoWorkflowController {
    pub fn new(service: Arc<dyn VideoService>, session: Arc<SessionStore>) -> Self {
        let (published, _) = watch::channel(WorkflowState::Idle);
        Self {
            workflow_id: Uuid::new_v4().to_string(),
            service,
            session,
            inner: Mutex::new(Inner::default()),
            published,
        }
    }

    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    pub fn state(&self) -> WorkflowState {
        self.lock().state.clone()
    }

    /// Receiver for renderers; sees every transition.
    pub fn subscribe(&self) -> watch::Receiver<WorkflowState> {
        self.published.subscribe()
    }

    /// Convert `source_url` into a new job, replacing any job held so far.
    pub async fn submit(&self, source_url: &str) -> Result<VideoJob, WorkflowError> {
        let intent = Intent::Submit {
            source_url: source_url.to_string(),
        };
        let (url, ticket) = self.begin_submit(source_url, &intent)?;

        let result = self.service.create_job(&url).await;
        self.settle(ticket, intent, WorkflowState::Idle, result)
    }

    /// Re-render the held job with `filter_name`. Filters replace each
    /// other; reapplying the same one re-issues the call.
    pub async fn apply_filter(&self, filter_name: &str) -> Result<VideoJob, WorkflowError> {
        let intent = Intent::ApplyFilter {
            filter_name: filter_name.to_string(),
        };
        let (job, filter, ticket) = self.begin_filter(filter_name, &intent)?;

        let result = self
            .service
            .apply_filter(&job.id, filter)
            .await
            .map(|updated| updated.settle_refinements(&job, Some(filter), None));
        self.settle(ticket, intent, WorkflowState::Ready { job }, result)
    }

    pub async fn apply_subtitles(&self, style: SubtitleStyle) -> Result<VideoJob, WorkflowError> {
        let intent = Intent::ApplySubtitles {
            style: style.clone(),
        };
        let (job, ticket) = self.begin_subtitles(&style, &intent)?;

        let result = self
            .service
            .apply_subtitle_style(&job.id, &style)
            .await
            .map(|updated| updated.settle_refinements(&job, None, Some(&style)));
        self.settle(ticket, intent, WorkflowState::Ready { job }, result)
    }

    /// Return to the state before the failure and re-issue the failed trigger.
    pub async fn retry(&self) -> Result<VideoJob, WorkflowError> {
        let intent = self.failed_intent()?;
        info!(workflow = %self.workflow_id, "🔁 Retrying {}", intent.action());

        match intent {
            Intent::Submit { source_url } => self.submit(&source_url).await,
            Intent::ApplyFilter { filter_name } => self.apply_filter(&filter_name).await,
            Intent::ApplySubtitles { style } => self.apply_subtitles(style).await,
        }
    }

    /// Dismiss a failure. Returns false when there was nothing to dismiss.
    pub fn acknowledge(&self) -> bool {
        let mut inner = self.lock();
        let previous = match &inner.state {
            WorkflowState::Failed { previous, .. } => (**previous).clone(),
            _ => return false,
        };
        self.publish(&mut inner, previous);
        true
    }

    /// Hold an existing job (e.g. one picked from the library) as `Ready`.
    /// Any pending call's result will be discarded.
    pub fn resume(&self, job: VideoJob) {
        let mut inner = self.lock();
        info!(workflow = %self.workflow_id, "📂 Resuming job {}", job.id);
        inner.generation += 1;
        self.publish(&mut inner, WorkflowState::Ready { job });
    }

    /// Drop the held job. Any pending call's result will be discarded.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.generation += 1;
        self.publish(&mut inner, WorkflowState::Idle);
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, inner: &mut Inner, next: WorkflowState) {
        debug!(
            workflow = %self.workflow_id,
            "Workflow {} -> {}",
            inner.state.label(),
            next.label()
        );
        inner.state = next.clone();
        self.published.send_replace(next);
    }

    /// Move into an in-flight state and hand out the ticket for its call.
    fn advance(&self, inner: &mut Inner, next: WorkflowState) -> Ticket {
        inner.generation += 1;
        let ticket = Ticket {
            generation: inner.generation,
            job_id: next.job().map(|job| job.id.clone()),
        };
        self.publish(inner, next);
        ticket
    }

    /// Local validation failure. Work already in flight is left alone.
    fn reject(&self, inner: &mut Inner, error: ApiError, intent: &Intent) -> WorkflowError {
        warn!(workflow = %self.workflow_id, "Rejected {}: {}", intent.action(), error);
        if !inner.state.is_in_flight() {
            let previous = inner.state.resting().clone();
            self.publish(
                inner,
                WorkflowState::Failed {
                    previous: Box::new(previous),
                    error: error.clone(),
                    intent: intent.clone(),
                },
            );
        }
        error.into()
    }

    fn begin_submit(&self, raw_url: &str, intent: &Intent) -> Result<(String, Ticket), WorkflowError> {
        let mut inner = self.lock();
        if let WorkflowState::Submitting { source_url } = &inner.state {
            warn!(workflow = %self.workflow_id, "⏳ Ignoring submit: {} is still converting", source_url);
            return Err(WorkflowError::Busy {
                action: intent.action(),
            });
        }

        let url = match validate_source_url(raw_url) {
            Ok(url) => url,
            Err(e) => return Err(self.reject(&mut inner, e, intent)),
        };

        if let Some(job) = inner.state.job() {
            info!(workflow = %self.workflow_id, "Discarding job {} for a new submission", job.id);
        }
        info!(workflow = %self.workflow_id, "🎬 Submitting {}", url);
        let ticket = self.advance(
            &mut inner,
            WorkflowState::Submitting {
                source_url: url.clone(),
            },
        );
        Ok((url, ticket))
    }

    fn begin_filter(
        &self,
        filter_name: &str,
        intent: &Intent,
    ) -> Result<(VideoJob, FilterName, Ticket), WorkflowError> {
        let mut inner = self.lock();
        let job = self.refinable_job(&inner, intent.action())?;
        let filter = match filter_name.parse::<FilterName>() {
            Ok(filter) => filter,
            Err(e) => return Err(self.reject(&mut inner, e, intent)),
        };

        let ticket = self.advance(
            &mut inner,
            WorkflowState::FilterApplying {
                job: job.clone(),
                filter,
            },
        );
        Ok((job, filter, ticket))
    }

    fn begin_subtitles(
        &self,
        style: &SubtitleStyle,
        intent: &Intent,
    ) -> Result<(VideoJob, Ticket), WorkflowError> {
        let mut inner = self.lock();
        let job = self.refinable_job(&inner, intent.action())?;
        if let Err(e) = style.validate() {
            return Err(self.reject(&mut inner, e, intent));
        }

        let ticket = self.advance(
            &mut inner,
            WorkflowState::SubtitleApplying {
                job: job.clone(),
                style: style.clone(),
            },
        );
        Ok((job, ticket))
    }

    /// Refinements need a `Ready` job (possibly behind a failure) and no
    /// call in flight.
    fn refinable_job(&self, inner: &Inner, action: &'static str) -> Result<VideoJob, WorkflowError> {
        match inner.state.resting() {
            WorkflowState::Ready { job } => Ok(job.clone()),
            state if state.is_in_flight() => {
                warn!(workflow = %self.workflow_id, "⏳ Ignoring {}: {}", action, state.label());
                Err(WorkflowError::Busy { action })
            }
            state => Err(WorkflowError::InvalidState {
                action,
                state: state.label(),
            }),
        }
    }

    fn failed_intent(&self) -> Result<Intent, WorkflowError> {
        let inner = self.lock();
        match &inner.state {
            WorkflowState::Failed { intent, .. } => Ok(intent.clone()),
            state => Err(WorkflowError::InvalidState {
                action: "retry",
                state: state.label(),
            }),
        }
    }

    fn settle(
        &self,
        ticket: Ticket,
        intent: Intent,
        fallback: WorkflowState,
        result: Result<VideoJob, ApiError>,
    ) -> Result<VideoJob, WorkflowError> {
        let mut inner = self.lock();
        let action = intent.action();

        // A rejected token invalidates the whole session, stale or not.
        if let Err(ApiError::Auth(message)) = &result {
            warn!(workflow = %self.workflow_id, "🔒 Session rejected during {}: logging out", action);
            self.session.clear();
            inner.generation += 1;
            self.publish(&mut inner, WorkflowState::Idle);
            return Err(ApiError::Auth(message.clone()).into());
        }

        let current = inner.generation == ticket.generation
            && inner.state.job().map(|job| &job.id) == ticket.job_id.as_ref();
        if !current {
            match &result {
                Ok(job) => warn!(workflow = %self.workflow_id, "Discarding stale {} result for job {}", action, job.id),
                Err(e) => warn!(workflow = %self.workflow_id, "Discarding stale {} failure: {}", action, e),
            }
            return Err(WorkflowError::Superseded {
                action,
                job_id: ticket.job_id,
            });
        }

        match result {
            Ok(job) => {
                info!(workflow = %self.workflow_id, "✅ {} finished for job {}", action, job.id);
                self.publish(&mut inner, WorkflowState::Ready { job: job.clone() });
                Ok(job)
            }
            Err(e) => {
                error!(workflow = %self.workflow_id, "❌ {} failed: {}", action, e);
                self.publish(
                    &mut inner,
                    WorkflowState::Failed {
                        previous: Box::new(fallback),
                        error: e.clone(),
                        intent,
                    },
                );
                Err(e.into())
            }
        }
    }
}

/// Trimmed absolute `http(s)` URL with a host.
pub fn validate_source_url(raw: &str) -> Result<String, ApiError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation("Source URL cannot be empty"));
    }

    let url = Url::parse(trimmed)
        .map_err(|e| ApiError::validation(format!("'{}' is not a valid URL: {}", trimmed, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ApiError::validation(format!(
            "'{}' must be an http or https URL",
            trimmed
        )));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(ApiError::validation(format!("'{}' has no host", trimmed)));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_url_validation() {
        assert_eq!(
            validate_source_url("  https://youtu.be/abc ").unwrap(),
            "https://youtu.be/abc"
        );
        assert!(validate_source_url("").is_err());
        assert!(validate_source_url("   ").is_err());
        assert!(validate_source_url("youtu.be/abc").is_err());
        assert!(validate_source_url("ftp://youtu.be/abc").is_err());
        assert!(validate_source_url("https://").is_err());
    }
}
