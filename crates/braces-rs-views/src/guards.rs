//! Access guards.
//!
//! Each guard is a single predicate over the request's [`Principal`]. On
//! failure it either redirects to the login URL, carrying the current full
//! path in the redirect field, or rejects with 403 when `raise_exception` is
//! set. Defaults come from [`Settings::current`].
//!
//! [`Principal`]: braces_rs_http::Principal

use async_trait::async_trait;
use http::StatusCode;

use braces_rs_core::settings::Settings;
use braces_rs_core::BracesResult;
use braces_rs_http::querydict::{encode, encode_path_value};
use braces_rs_http::RequestContext;

use crate::hooks::{improperly_configured, Behavior, Guard, GuardDecision, HookPipelineBuilder};

/// Builds `login_url?next=/current/path`, percent-encoding the path but
/// leaving its `/` separators as they are.
///
/// # Examples
///
/// ```
/// use braces_rs_views::guards::redirect_to_login;
///
/// assert_eq!(
///     redirect_to_login("/accounts/login/", "next", "/tasks/?page=2"),
///     "/accounts/login/?next=/tasks/%3Fpage%3D2"
/// );
/// ```
pub fn redirect_to_login(login_url: &str, redirect_field_name: &str, next: &str) -> String {
    if redirect_field_name.is_empty() {
        return login_url.to_string();
    }
    let separator = if login_url.contains('?') { '&' } else { '?' };
    format!(
        "{login_url}{separator}{}={}",
        encode(redirect_field_name),
        encode_path_value(next)
    )
}

/// How a guard answers a refused request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denial {
    login_url: String,
    redirect_field_name: String,
    raise_exception: bool,
}

impl Default for Denial {
    fn default() -> Self {
        let settings = Settings::current();
        Self {
            login_url: settings.login_url,
            redirect_field_name: settings.redirect_field_name,
            raise_exception: false,
        }
    }
}

impl Denial {
    fn decide(&self, request: &RequestContext) -> GuardDecision {
        if self.raise_exception {
            GuardDecision::Reject(StatusCode::FORBIDDEN)
        } else {
            GuardDecision::Redirect(redirect_to_login(
                &self.login_url,
                &self.redirect_field_name,
                &request.get_full_path(),
            ))
        }
    }
}

macro_rules! denial_options {
    ($ty:ty) => {
        impl $ty {
            /// Overrides the login URL refused principals are sent to.
            #[must_use]
            pub fn login_url(mut self, url: impl Into<String>) -> Self {
                self.denial.login_url = url.into();
                self
            }

            /// Overrides the query parameter carrying the original path.
            /// An empty name drops the parameter.
            #[must_use]
            pub fn redirect_field_name(mut self, name: impl Into<String>) -> Self {
                self.denial.redirect_field_name = name.into();
                self
            }

            /// Answers refused requests with 403 instead of a redirect.
            #[must_use]
            pub const fn raise_exception(mut self, raise: bool) -> Self {
                self.denial.raise_exception = raise;
                self
            }
        }

        impl Behavior for $ty {
            fn register(self, hooks: HookPipelineBuilder) -> HookPipelineBuilder {
                hooks.guard(self)
            }
        }
    };
}

// ── LoginRequired ───────────────────────────────────────────────────

/// Requires an authenticated principal.
#[derive(Debug, Clone, Default)]
pub struct LoginRequired {
    denial: Denial,
}

impl LoginRequired {
    /// Creates the guard with settings defaults.
    pub fn new() -> Self {
        Self::default()
    }
}

denial_options!(LoginRequired);

#[async_trait]
impl Guard for LoginRequired {
    fn name(&self) -> &str {
        "login_required"
    }

    async fn check(&self, request: &RequestContext) -> GuardDecision {
        if request.principal().is_authenticated() {
            GuardDecision::Proceed
        } else {
            self.denial.decide(request)
        }
    }
}

// ── AnonymousRequired ───────────────────────────────────────────────

/// Requires an anonymous principal; authenticated ones are sent elsewhere.
#[derive(Debug, Clone)]
pub struct AnonymousRequired {
    redirect_url: String,
}

impl Default for AnonymousRequired {
    fn default() -> Self {
        Self {
            redirect_url: Settings::current().login_url,
        }
    }
}

impl AnonymousRequired {
    /// Creates the guard, redirecting to the settings login URL.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets where authenticated principals are redirected.
    #[must_use]
    pub fn redirect_url(mut self, url: impl Into<String>) -> Self {
        self.redirect_url = url.into();
        self
    }
}

impl Behavior for AnonymousRequired {
    fn register(self, hooks: HookPipelineBuilder) -> HookPipelineBuilder {
        hooks.guard(self)
    }
}

#[async_trait]
impl Guard for AnonymousRequired {
    fn name(&self) -> &str {
        "anonymous_required"
    }

    async fn check(&self, request: &RequestContext) -> GuardDecision {
        if request.principal().is_authenticated() {
            GuardDecision::Redirect(self.redirect_url.clone())
        } else {
            GuardDecision::Proceed
        }
    }
}

// ── PermissionRequired ──────────────────────────────────────────────

fn validate_permission(component: &str, perm: &str) -> BracesResult<()> {
    let well_formed = perm
        .split_once('.')
        .is_some_and(|(app, codename)| !app.is_empty() && !codename.is_empty());
    if well_formed {
        Ok(())
    } else {
        Err(improperly_configured(
            component,
            format!("permission '{perm}' must be in the form 'app_label.codename'"),
        ))
    }
}

/// Requires a single permission.
#[derive(Debug, Clone)]
pub struct PermissionRequired {
    permission: String,
    denial: Denial,
}

impl PermissionRequired {
    /// Creates the guard.
    ///
    /// # Errors
    ///
    /// Returns [`BracesError::ImproperlyConfigured`] unless `permission` is in
    /// `app_label.codename` form.
    ///
    /// [`BracesError::ImproperlyConfigured`]: braces_rs_core::BracesError::ImproperlyConfigured
    pub fn new(permission: impl Into<String>) -> BracesResult<Self> {
        let permission = permission.into();
        validate_permission("PermissionRequired", &permission)?;
        Ok(Self {
            permission,
            denial: Denial::default(),
        })
    }
}

denial_options!(PermissionRequired);

#[async_trait]
impl Guard for PermissionRequired {
    fn name(&self) -> &str {
        "permission_required"
    }

    async fn check(&self, request: &RequestContext) -> GuardDecision {
        if request.principal().has_perm(&self.permission) {
            GuardDecision::Proceed
        } else {
            self.denial.decide(request)
        }
    }
}

// ── MultiplePermissionsRequired ─────────────────────────────────────

/// Requires every permission in `all` and at least one in `any`.
#[derive(Debug, Clone)]
pub struct MultiplePermissionsRequired {
    all: Vec<String>,
    any: Vec<String>,
    denial: Denial,
}

impl MultiplePermissionsRequired {
    /// Creates the guard.
    ///
    /// # Errors
    ///
    /// Returns [`BracesError::ImproperlyConfigured`] if both lists are empty
    /// or any entry is not in `app_label.codename` form.
    ///
    /// [`BracesError::ImproperlyConfigured`]: braces_rs_core::BracesError::ImproperlyConfigured
    pub fn new(all: Vec<String>, any: Vec<String>) -> BracesResult<Self> {
        if all.is_empty() && any.is_empty() {
            return Err(improperly_configured(
                "MultiplePermissionsRequired",
                "at least one of 'all' or 'any' must list permissions",
            ));
        }
        for perm in all.iter().chain(&any) {
            validate_permission("MultiplePermissionsRequired", perm)?;
        }
        Ok(Self {
            all,
            any,
            denial: Denial::default(),
        })
    }
}

denial_options!(MultiplePermissionsRequired);

#[async_trait]
impl Guard for MultiplePermissionsRequired {
    fn name(&self) -> &str {
        "multiple_permissions_required"
    }

    async fn check(&self, request: &RequestContext) -> GuardDecision {
        let principal = request.principal();
        if !self.all.is_empty() && !principal.has_perms(&self.all) {
            return self.denial.decide(request);
        }
        if !self.any.is_empty() && !self.any.iter().any(|perm| principal.has_perm(perm)) {
            return self.denial.decide(request);
        }
        GuardDecision::Proceed
    }
}

// ── SuperuserRequired / StaffuserRequired ───────────────────────────

/// Requires a superuser.
#[derive(Debug, Clone, Default)]
pub struct SuperuserRequired {
    denial: Denial,
}

impl SuperuserRequired {
    /// Creates the guard with settings defaults.
    pub fn new() -> Self {
        Self::default()
    }
}

denial_options!(SuperuserRequired);

#[async_trait]
impl Guard for SuperuserRequired {
    fn name(&self) -> &str {
        "superuser_required"
    }

    async fn check(&self, request: &RequestContext) -> GuardDecision {
        if request.principal().is_superuser() {
            GuardDecision::Proceed
        } else {
            self.denial.decide(request)
        }
    }
}

/// Requires a staff member.
#[derive(Debug, Clone, Default)]
pub struct StaffuserRequired {
    denial: Denial,
}

impl StaffuserRequired {
    /// Creates the guard with settings defaults.
    pub fn new() -> Self {
        Self::default()
    }
}

denial_options!(StaffuserRequired);

#[async_trait]
impl Guard for StaffuserRequired {
    fn name(&self) -> &str {
        "staffuser_required"
    }

    async fn check(&self, request: &RequestContext) -> GuardDecision {
        if request.principal().is_staff() {
            GuardDecision::Proceed
        } else {
            self.denial.decide(request)
        }
    }
}
