// src/models/mod.rs
pub mod auth;
pub mod subtitle;
pub mod video;

pub use auth::{AuthResponse, Credentials, Registration, Session, UserIdentity};
pub use subtitle::{FontFamily, SubtitleStyle, SubtitleStyleEditor};
pub use video::{FilterName, JobStatus, VideoJob};
