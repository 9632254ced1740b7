// src/library.rs
//! Read-only listing of the signed-in user's finished shorts.

use std::sync::Arc;

use crate::api_client::VideoService;
use crate::error::ApiError;
use crate::models::video::VideoJob;
use crate::session::SessionStore;

pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please log in again.";
pub const UNAVAILABLE_MESSAGE: &str = "Unable to load your videos. Please try again later.";

#[derive(Debug, Clone, PartialEq)]
pub enum LibraryState {
    Loaded(Vec<VideoJob>),
    Empty,
    Unavailable(String),
}

pub struct VideoLibrary {
    service: Arc<dyn VideoService>,
    session: Arc<SessionStore>,
}

impl VideoLibrary {
    pub fn new(service: Arc<dyn VideoService>, session: Arc<SessionStore>) -> Self {
        Self { service, session }
    }

    pub async fn load(&self) -> LibraryState {
        match self.service.list_jobs().await {
            Ok(jobs) if jobs.is_empty() => LibraryState::Empty,
            Ok(jobs) => LibraryState::Loaded(jobs),
            Err(ApiError::Auth(message)) => {
                tracing::warn!("Library request rejected ({}): logging out", message);
                self.session.clear();
                LibraryState::Unavailable(SESSION_EXPIRED_MESSAGE.to_string())
            }
            Err(e) => {
                tracing::error!("Failed to fetch videos: {}", e);
                LibraryState::Unavailable(UNAVAILABLE_MESSAGE.to_string())
            }
        }
    }
}
