//! Authenticated principal attached to a request.

use serde::{Deserialize, Serialize};

/// Identity of the user that issued a request.
///
/// An empty `UserInfo` (the [`Default`]) stands for "no authenticated
/// principal"; it is omitted from serialized audit events.
///
/// # Examples
///
/// ```rust
/// use kaudit_core::UserInfo;
///
/// let user = UserInfo::new("admin").with_groups(["system"]);
/// assert_eq!(user.username, "admin");
/// assert!(!user.is_empty());
/// assert!(UserInfo::default().is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserInfo {
    /// Login name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,

    /// Stable unique identifier, when the authenticator provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,

    /// Groups the user belongs to, in authenticator order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
}

impl UserInfo {
    /// Creates a user with the given name and no groups.
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            uid: None,
            groups: Vec::new(),
        }
    }

    /// Sets the user's groups.
    #[must_use]
    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the user's uid.
    #[must_use]
    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    /// Returns true if no identity information is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.username.is_empty() && self.uid.is_none() && self.groups.is_empty()
    }
}
