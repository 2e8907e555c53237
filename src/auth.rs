//! Auth gateway collaborators: credential check and session lifecycle.

use crate::error::AppError;
use async_trait::async_trait;
use axum::http::{header, HeaderMap, HeaderValue};
use serde::Deserialize;

pub const DEFAULT_SESSION_COOKIE: &str = "admin_session";

#[derive(Clone, Debug, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Proof of a successful login. The token is what the session layer hands back to the client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
    pub token: String,
}

impl Identity {
    pub fn issue(username: impl Into<String>) -> Self {
        Identity {
            username: username.into(),
            token: uuid::Uuid::new_v4().simple().to_string(),
        }
    }
}

#[async_trait]
pub trait Authorizer: Send + Sync {
    /// `AppError::Auth` when the credentials are rejected.
    async fn authorize(&self, credentials: &Credentials) -> Result<Identity, AppError>;
}

/// Single username/password pair.
#[derive(Clone)]
pub struct StaticAuthorizer {
    username: String,
    password: String,
}

impl StaticAuthorizer {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        StaticAuthorizer {
            username: username.into(),
            password: password.into(),
        }
    }
}

#[async_trait]
impl Authorizer for StaticAuthorizer {
    async fn authorize(&self, credentials: &Credentials) -> Result<Identity, AppError> {
        if credentials.username == self.username && credentials.password == self.password {
            Ok(Identity::issue(&credentials.username))
        } else {
            tracing::warn!(username = %credentials.username, "login rejected");
            Err(AppError::Auth("Access denied".into()))
        }
    }
}

/// Attaches or clears the session on an outgoing response.
pub trait SessionPolicy: Send + Sync {
    fn remember(&self, headers: &mut HeaderMap, identity: &Identity);

    fn forget(&self, headers: &mut HeaderMap);
}

/// HttpOnly cookie holding the identity token.
#[derive(Clone, Debug)]
pub struct CookieSession {
    name: String,
    path: String,
}

impl Default for CookieSession {
    fn default() -> Self {
        CookieSession::new(DEFAULT_SESSION_COOKIE)
    }
}

impl CookieSession {
    pub fn new(name: impl Into<String>) -> Self {
        CookieSession {
            name: name.into(),
            path: "/".into(),
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    fn set_cookie(&self, headers: &mut HeaderMap, cookie: String) {
        match HeaderValue::from_str(&cookie) {
            Ok(v) => {
                headers.append(header::SET_COOKIE, v);
            }
            Err(e) => tracing::error!(error = %e, cookie = %self.name, "unencodable session cookie"),
        }
    }
}

impl SessionPolicy for CookieSession {
    fn remember(&self, headers: &mut HeaderMap, identity: &Identity) {
        let cookie = format!(
            "{}={}; Path={}; HttpOnly; SameSite=Lax",
            self.name, identity.token, self.path
        );
        self.set_cookie(headers, cookie);
    }

    fn forget(&self, headers: &mut HeaderMap) {
        let cookie = format!("{}=; Path={}; HttpOnly; SameSite=Lax; Max-Age=0", self.name, self.path);
        self.set_cookie(headers, cookie);
    }
}
