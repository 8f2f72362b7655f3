//! # Session Collaborator
//!
//! Checkout never authenticates anyone itself. It asks a [`SessionProvider`]
//! who is checking out; `None` means a guest.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CheckoutResult;

/// The signed-in shopper, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SessionUser {
    pub id: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub user: Option<SessionUser>,
}

impl Session {
    pub fn guest() -> Self {
        Session { user: None }
    }

    pub fn for_user(id: impl Into<String>, email: Option<String>) -> Self {
        Session {
            user: Some(SessionUser {
                id: id.into(),
                email,
            }),
        }
    }

    /// Owner recorded on the order.
    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.id.as_str())
    }
}

/// Looks up the session of the current request.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn get_session(&self) -> CheckoutResult<Session>;
}

/// Every checkout is a guest checkout.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuestSession;

#[async_trait]
impl SessionProvider for GuestSession {
    async fn get_session(&self) -> CheckoutResult<Session> {
        Ok(Session::guest())
    }
}

/// Always returns the same session. Used by single-user tools and tests.
#[derive(Debug, Clone)]
pub struct StaticSession(Session);

impl StaticSession {
    pub fn new(session: Session) -> Self {
        StaticSession(session)
    }
}

#[async_trait]
impl SessionProvider for StaticSession {
    async fn get_session(&self) -> CheckoutResult<Session> {
        Ok(self.0.clone())
    }
}
