// lib.rs - Client-side orchestration for turning source videos into styled shorts
pub mod api_client;
pub mod auth;
pub mod config;
pub mod error;
pub mod guard;
pub mod library;
pub mod models;
pub mod session;
pub mod workflow;

// Re-export commonly used types for convenience
pub use api_client::{VideoService, VideoServiceClient};
pub use config::ClientConfig;
pub use error::{ApiError, ClientError, WorkflowError};
pub use guard::{AccessGuard, Navigation, Route};
pub use library::{LibraryState, VideoLibrary};
pub use models::{
    AuthResponse, Credentials, FilterName, FontFamily, JobStatus, Registration, Session,
    SubtitleStyle, SubtitleStyleEditor, UserIdentity, VideoJob,
};
pub use session::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore, SessionStore};
pub use workflow::{Intent, VideoWorkflowController, WorkflowState};
