//! Mock principal builders.
//!
//! ```rust
//! use kaudit_test::MockUser;
//!
//! let admin = MockUser::admin();
//! assert_eq!(admin.groups, vec!["system"]);
//!
//! let user = MockUser::new("alice")
//!     .with_groups(["developers"])
//!     .with_uid("3f2a")
//!     .build();
//! assert_eq!(user.uid.as_deref(), Some("3f2a"));
//! ```

use kaudit_core::UserInfo;

/// Builder for mock principals.
#[derive(Debug, Clone)]
pub struct MockUser {
    username: String,
    uid: Option<String>,
    groups: Vec<String>,
}

impl MockUser {
    /// Creates a builder for `username` with no groups.
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            uid: None,
            groups: Vec::new(),
        }
    }

    /// The platform administrator, `admin` in group `system`.
    #[must_use]
    pub fn admin() -> UserInfo {
        Self::new("admin").with_group("system").build()
    }

    /// An authenticated user in the `system:authenticated` group.
    #[must_use]
    pub fn regular(username: impl Into<String>) -> UserInfo {
        Self::new(username)
            .with_group("system:authenticated")
            .build()
    }

    /// The anonymous principal.
    #[must_use]
    pub fn anonymous() -> UserInfo {
        Self::new("system:anonymous")
            .with_group("system:unauthenticated")
            .build()
    }

    /// Adds a group.
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }

    /// Replaces the groups.
    #[must_use]
    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the uid.
    #[must_use]
    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    /// Builds the principal.
    #[must_use]
    pub fn build(self) -> UserInfo {
        let user = UserInfo::new(self.username).with_groups(self.groups);
        match self.uid {
            Some(uid) => user.with_uid(uid),
            None => user,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin() {
        let admin = MockUser::admin();
        assert_eq!(admin.username, "admin");
        assert_eq!(admin.groups, vec!["system"]);
        assert!(admin.uid.is_none());
    }

    #[test]
    fn test_builder() {
        let user = MockUser::new("alice")
            .with_group("a")
            .with_groups(["b", "c"])
            .with_uid("u-1")
            .build();

        assert_eq!(user.groups, vec!["b", "c"]);
        assert_eq!(user.uid.as_deref(), Some("u-1"));
    }

    #[test]
    fn test_anonymous_is_not_empty() {
        assert!(!MockUser::anonymous().is_empty());
        assert_eq!(MockUser::regular("bob").groups, vec!["system:authenticated"]);
    }
}
