use serde::{Deserialize, Serialize};

use crate::error::ApiError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub username: String,
}

/// Authenticated context held by the session store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserIdentity,
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: &str, password: &str) -> Result<Self, ApiError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(ApiError::validation("Username cannot be empty"));
        }
        if password.is_empty() {
            return Err(ApiError::validation("Password cannot be empty"));
        }
        Ok(Self {
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}

/// Body returned by `auth/login` and `auth/register`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access: String,
    pub refresh: String,
    pub username: String,
}

/// Confirmation that an account was created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub username: String,
}

impl From<AuthResponse> for Session {
    fn from(response: AuthResponse) -> Self {
        Session {
            access_token: response.access,
            refresh_token: response.refresh,
            user: UserIdentity {
                username: response.username,
            },
        }
    }
}

impl From<AuthResponse> for Registration {
    fn from(response: AuthResponse) -> Self {
        Registration {
            username: response.username,
        }
    }
}
