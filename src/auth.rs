// src/auth.rs
//! Login/registration pass-through plus the session bookkeeping around it.

use crate::api_client::VideoService;
use crate::error::ClientError;
use crate::models::auth::{Credentials, Registration, Session};
use crate::session::SessionStore;

/// Log in and make the resulting session current.
pub async fn sign_in(
    service: &dyn VideoService,
    session: &SessionStore,
    username: &str,
    password: &str,
) -> Result<Session, ClientError> {
    let credentials = Credentials::new(username, password)?;
    let response = service.login(&credentials).await?;
    let new_session = Session::from(response);
    session.set_session(new_session.clone())?;
    Ok(new_session)
}

/// Create an account. Does not log in.
pub async fn sign_up(
    service: &dyn VideoService,
    username: &str,
    password: &str,
) -> Result<Registration, ClientError> {
    let credentials = Credentials::new(username, password)?;
    let registration = service.register(&credentials).await?;
    tracing::info!("👤 Registered {}", registration.username);
    Ok(registration)
}

pub fn sign_out(session: &SessionStore) {
    session.clear();
}
