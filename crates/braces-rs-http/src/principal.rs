//! The identity a request acts on behalf of.
//!
//! Guards only ever ask a [`Principal`] yes/no questions, so authentication
//! and session handling stay in the host framework. [`User`] and
//! [`AnonymousUser`] are the two stock implementations.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use braces_rs_core::ContextValue;

/// The capabilities a guard or injector may query about the current principal.
pub trait Principal: Send + Sync + fmt::Debug {
    /// Returns `true` if the principal has been authenticated.
    fn is_authenticated(&self) -> bool;

    /// Returns `true` for the anonymous principal.
    fn is_anonymous(&self) -> bool {
        !self.is_authenticated()
    }

    /// Returns `true` if the account is active.
    fn is_active(&self) -> bool;

    /// Returns `true` for staff members.
    fn is_staff(&self) -> bool;

    /// Returns `true` for superusers.
    fn is_superuser(&self) -> bool;

    /// Checks a single `app_label.codename` permission.
    fn has_perm(&self, perm: &str) -> bool;

    /// Checks that every permission is held.
    fn has_perms(&self, perms: &[String]) -> bool {
        perms.iter().all(|perm| self.has_perm(perm))
    }

    /// Returns the username, empty for anonymous principals.
    fn username(&self) -> &str;

    /// Returns the principal as a context value, for form kwargs and templates.
    fn to_context_value(&self) -> ContextValue {
        let mut map = BTreeMap::new();
        map.insert("username".to_string(), ContextValue::from(self.username()));
        map.insert(
            "is_authenticated".to_string(),
            ContextValue::Bool(self.is_authenticated()),
        );
        map.insert("is_staff".to_string(), ContextValue::Bool(self.is_staff()));
        map.insert(
            "is_superuser".to_string(),
            ContextValue::Bool(self.is_superuser()),
        );
        ContextValue::Dict(map)
    }
}

/// An authenticated user with directly-assigned permissions.
///
/// Inactive users have no permissions; active superusers have all of them.
///
/// # Examples
///
/// ```
/// use braces_rs_http::{Principal, User};
///
/// let user = User::new("alice").with_permission("blog.add_post");
/// assert!(user.has_perm("blog.add_post"));
/// assert!(!user.has_perm("blog.delete_post"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// The unique username.
    pub username: String,
    /// Whether the account is active.
    pub is_active: bool,
    /// Whether this user is a staff member.
    pub is_staff: bool,
    /// Whether this user has every permission.
    pub is_superuser: bool,
    /// Permissions in `app_label.codename` form.
    pub permissions: HashSet<String>,
}

impl User {
    /// Creates an active, unprivileged user.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
            permissions: HashSet::new(),
        }
    }

    /// Grants a permission.
    #[must_use]
    pub fn with_permission(mut self, perm: impl Into<String>) -> Self {
        self.permissions.insert(perm.into());
        self
    }

    /// Marks the user as staff.
    #[must_use]
    pub const fn staff(mut self) -> Self {
        self.is_staff = true;
        self
    }

    /// Marks the user as superuser.
    #[must_use]
    pub const fn superuser(mut self) -> Self {
        self.is_superuser = true;
        self
    }

    /// Marks the user as inactive.
    #[must_use]
    pub const fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}

impl Principal for User {
    fn is_authenticated(&self) -> bool {
        true
    }

    fn is_active(&self) -> bool {
        self.is_active
    }

    fn is_staff(&self) -> bool {
        self.is_staff
    }

    fn is_superuser(&self) -> bool {
        self.is_superuser
    }

    fn has_perm(&self, perm: &str) -> bool {
        if !self.is_active {
            return false;
        }
        if self.is_superuser {
            return true;
        }
        self.permissions.contains(perm)
    }

    fn username(&self) -> &str {
        &self.username
    }
}

/// The unauthenticated principal. Has no permissions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnonymousUser;

impl Principal for AnonymousUser {
    fn is_authenticated(&self) -> bool {
        false
    }

    fn is_active(&self) -> bool {
        false
    }

    fn is_staff(&self) -> bool {
        false
    }

    fn is_superuser(&self) -> bool {
        false
    }

    fn has_perm(&self, _perm: &str) -> bool {
        false
    }

    fn username(&self) -> &str {
        ""
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_user() {
        let anon = AnonymousUser;
        assert!(!anon.is_authenticated());
        assert!(anon.is_anonymous());
        assert!(!anon.has_perm("blog.add_post"));
        assert_eq!(anon.username(), "");
    }

    #[test]
    fn test_user_direct_permissions() {
        let user = User::new("bob").with_permission("blog.add_post");
        assert!(user.is_authenticated());
        assert!(!user.is_anonymous());
        assert!(user.has_perm("blog.add_post"));
        assert!(!user.has_perm("blog.change_post"));
    }

    #[test]
    fn test_superuser_has_all_perms() {
        let user = User::new("root").superuser();
        assert!(user.has_perm("anything.at_all"));
        assert!(user.has_perms(&["a.b".to_string(), "c.d".to_string()]));
    }

    #[test]
    fn test_inactive_user_has_no_perms() {
        let user = User::new("ghost")
            .superuser()
            .with_permission("blog.add_post")
            .inactive();
        assert!(!user.has_perm("blog.add_post"));
    }

    #[test]
    fn test_has_perms_requires_all() {
        let user = User::new("carol").with_permission("blog.add_post");
        assert!(!user.has_perms(&["blog.add_post".to_string(), "blog.view_post".to_string()]));
    }

    #[test]
    fn test_to_context_value() {
        let value = User::new("dave").staff().to_context_value();
        assert_eq!(value.get("username").and_then(ContextValue::as_str), Some("dave"));
        assert_eq!(value.get("is_staff").and_then(ContextValue::as_bool), Some(true));
    }
}
