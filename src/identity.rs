//! Identity persistence: where a resumable session and an invite come from.
//!
//! The session state machine consults an [`IdentityStore`] exactly twice per
//! connection: for a resume token when the server sends `CONNECT_START`, and
//! for an invite group when the server sends `HELLO`. How the values are
//! stored (cookies, URL parameters, a config file) is up to the implementor.

/// Source of a resumable session token and an invite group id.
pub trait IdentityStore: Send {
    /// Token of a previous session to resume, if any.
    fn read_resume_token(&self) -> Option<String>;

    /// Group id the user was invited to, if any.
    fn read_invite_group(&self) -> Option<String>;
}

/// An [`IdentityStore`] holding fixed values, typically filled from
/// configuration or command-line arguments.
///
/// # Example
///
/// ```
/// use wordparty_client::identity::{IdentityStore, StoredIdentity};
///
/// let store = StoredIdentity::default().with_invite_group("room1");
/// assert_eq!(store.read_invite_group().as_deref(), Some("room1"));
/// assert!(store.read_resume_token().is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredIdentity {
    pub resume_token: Option<String>,
    pub invite_group: Option<String>,
}

impl StoredIdentity {
    /// Set the session token to resume.
    #[must_use]
    pub fn with_resume_token(mut self, token: impl Into<String>) -> Self {
        self.resume_token = Some(token.into());
        self
    }

    /// Set the group to join once the server has said hello.
    #[must_use]
    pub fn with_invite_group(mut self, group: impl Into<String>) -> Self {
        self.invite_group = Some(group.into());
        self
    }
}

impl IdentityStore for StoredIdentity {
    fn read_resume_token(&self) -> Option<String> {
        self.resume_token.clone()
    }

    fn read_invite_group(&self) -> Option<String> {
        self.invite_group.clone()
    }
}
