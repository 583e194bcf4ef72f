//! Read-only view of the signed-in user.
//!
//! The upload workflow never reaches for ambient auth state. A
//! [`SessionProvider`] is passed in at share time and read once; a
//! [`SessionSnapshot`] value is itself a provider, so tests and the CLI hand
//! in plain values.

use crate::types::{DEFAULT_AVATAR, FALLBACK_USERNAME};

/// The signed-in user at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub user_id: Option<String>,
    /// Email (or equivalent) verification flag.
    pub verified: bool,
    pub username: Option<String>,
    pub nickname: Option<String>,
    pub photo_url: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl SessionSnapshot {
    /// A verified session for `user_id`.
    pub fn signed_in(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            verified: true,
            ..Self::default()
        }
    }

    /// No one signed in.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_nickname(mut self, nickname: impl Into<String>) -> Self {
        self.nickname = Some(nickname.into());
        self
    }

    pub fn with_photo_url(mut self, url: impl Into<String>) -> Self {
        self.photo_url = Some(url.into());
        self
    }

    /// The user id, only when the session is verified and the id is non-empty.
    pub fn authenticated_user_id(&self) -> Option<&str> {
        if !self.verified {
            return None;
        }
        non_blank(&self.user_id)
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated_user_id().is_some()
    }

    /// Nickname, else username, else `user`.
    pub fn display_name(&self) -> &str {
        non_blank(&self.nickname)
            .or_else(|| non_blank(&self.username))
            .unwrap_or(FALLBACK_USERNAME)
    }

    /// Photo URL, or the default avatar when absent or blank.
    pub fn profile_image_url(&self) -> &str {
        non_blank(&self.photo_url).unwrap_or(DEFAULT_AVATAR)
    }
}

/// Source of the current session.
pub trait SessionProvider {
    fn current(&self) -> SessionSnapshot;
}

impl SessionProvider for SessionSnapshot {
    fn current(&self) -> SessionSnapshot {
        self.clone()
    }
}

impl<T: SessionProvider + ?Sized> SessionProvider for &T {
    fn current(&self) -> SessionSnapshot {
        (**self).current()
    }
}
