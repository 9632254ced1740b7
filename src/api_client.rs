// src/api_client.rs
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::config::ClientConfig;
use crate::error::{ApiError, ConfigError};
use crate::models::auth::{AuthResponse, Credentials, Registration};
use crate::models::subtitle::SubtitleStyle;
use crate::models::video::{FilterName, VideoJob};
use crate::session::SessionStore;

const MAX_ERROR_BODY: usize = 300;

/// The remote video service. Every method is one request/response round
/// trip; nothing is retried here.
#[async_trait]
pub trait VideoService: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError>;

    async fn register(&self, credentials: &Credentials) -> Result<Registration, ApiError>;

    async fn create_job(&self, source_url: &str) -> Result<VideoJob, ApiError>;

    async fn apply_filter(&self, job_id: &str, filter: FilterName) -> Result<VideoJob, ApiError>;

    async fn apply_subtitle_style(
        &self,
        job_id: &str,
        style: &SubtitleStyle,
    ) -> Result<VideoJob, ApiError>;

    /// Jobs owned by the session's user, most recent first.
    async fn list_jobs(&self) -> Result<Vec<VideoJob>, ApiError>;
}

#[derive(Serialize)]
struct ConvertRequest<'a> {
    youtube_url: &'a str,
}

#[derive(Serialize)]
struct FilterRequest {
    filter_name: FilterName,
}

#[derive(Debug, Clone)]
pub struct VideoServiceClient {
    client: Client,
    base_url: Url,
    session: Arc<SessionStore>,
}

impl VideoServiceClient {
    pub fn new(config: &ClientConfig, session: Arc<SessionStore>) -> Result<Self, ConfigError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            session,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::validation(format!("Invalid endpoint '{}': {}", path, e)))
    }

    fn with_bearer(&self, request: RequestBuilder) -> RequestBuilder {
        match self.session.access_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = self.with_bearer(request).send().await.map_err(|e| {
            error!("Video service request failed: {}", e);
            ApiError::from(e)
        })?;

        let status = response.status();
        let body = response.text().await?;
        debug!("Video service responded {} ({} bytes)", status, body.len());

        if !status.is_success() {
            let err = error_for_status(status, &body);
            error!("Video service error: {}", err);
            return Err(err);
        }

        serde_json::from_str(&body).map_err(|e| ApiError::RemoteService {
            status: Some(status.as_u16()),
            message: format!("Malformed response: {}", e),
        })
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        debug!("POST {}", url);
        self.send(self.client.post(url).json(body)).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.endpoint(path)?;
        debug!("GET {}", url);
        self.send(self.client.get(url)).await
    }
}

#[async_trait]
impl VideoService for VideoServiceClient {
    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError> {
        self.post("auth/login", credentials).await
    }

    async fn register(&self, credentials: &Credentials) -> Result<Registration, ApiError> {
        let response: AuthResponse = self.post("auth/register", credentials).await?;
        Ok(response.into())
    }

    async fn create_job(&self, source_url: &str) -> Result<VideoJob, ApiError> {
        info!("🎬 Requesting short for {}", source_url);
        let job: VideoJob = self
            .post("core/convert-video", &ConvertRequest { youtube_url: source_url })
            .await?;
        info!("✅ Created job {}", job.id);
        Ok(job)
    }

    async fn apply_filter(&self, job_id: &str, filter: FilterName) -> Result<VideoJob, ApiError> {
        info!("🎨 Applying filter '{}' to job {}", filter, job_id);
        let path = format!("core/videos/{}/apply-filter", urlencoding::encode(job_id));
        self.post(&path, &FilterRequest { filter_name: filter }).await
    }

    async fn apply_subtitle_style(
        &self,
        job_id: &str,
        style: &SubtitleStyle,
    ) -> Result<VideoJob, ApiError> {
        info!(
            "💬 Applying subtitles ({} {}px/{} {}) to job {}",
            style.font_family, style.font_size_px, style.font_weight, style.color_hex, job_id
        );
        let path = format!("core/videos/{}/apply-subtitles", urlencoding::encode(job_id));
        self.post(&path, style).await
    }

    async fn list_jobs(&self) -> Result<Vec<VideoJob>, ApiError> {
        let mut jobs: Vec<VideoJob> = self.get("core/my-videos").await?;
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        info!("📼 Found {} videos", jobs.len());
        Ok(jobs)
    }
}

fn error_for_status(status: StatusCode, body: &str) -> ApiError {
    let message = error_detail(body).unwrap_or_else(|| {
        if body.trim().is_empty() {
            status
                .canonical_reason()
                .unwrap_or("no details")
                .to_string()
        } else {
            truncate(body.trim(), MAX_ERROR_BODY)
        }
    });

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Auth(message),
        s if s.is_client_error() => ApiError::Validation(message),
        s => ApiError::RemoteService {
            status: Some(s.as_u16()),
            message,
        },
    }
}

/// `{"detail": "..."}` error bodies; list-shaped details are flattened.
fn error_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .map(|item| match item.get("msg").and_then(|m| m.as_str()) {
                    Some(msg) => msg.to_string(),
                    None => item.to_string(),
                })
                .collect();
            Some(parts.join("; "))
        }
        other => Some(other.to_string()),
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{}…", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            error_for_status(StatusCode::UNAUTHORIZED, r#"{"detail": "Unauthorized"}"#),
            ApiError::Auth("Unauthorized".into())
        );
        assert_eq!(
            error_for_status(StatusCode::BAD_REQUEST, r#"{"detail": "Invalid filter"}"#),
            ApiError::Validation("Invalid filter".into())
        );
        assert_eq!(
            error_for_status(StatusCode::INTERNAL_SERVER_ERROR, "boom"),
            ApiError::RemoteService {
                status: Some(500),
                message: "boom".into()
            }
        );
        assert_eq!(
            error_for_status(StatusCode::BAD_GATEWAY, ""),
            ApiError::RemoteService {
                status: Some(502),
                message: "Bad Gateway".into()
            }
        );
    }

    #[test]
    fn test_list_details_are_flattened() {
        let body = r#"{"detail": [{"loc": ["body", "youtube_url"], "msg": "field required"}]}"#;
        assert_eq!(error_detail(body).as_deref(), Some("field required"));
    }

    #[test]
    fn test_long_bodies_are_truncated() {
        let body = "x".repeat(1000);
        match error_for_status(StatusCode::SERVICE_UNAVAILABLE, &body) {
            ApiError::RemoteService { message, .. } => assert_eq!(message.chars().count(), 301),
            other => panic!("unexpected {:?}", other),
        }
    }
}
