//! # braces-rs
//!
//! Reusable view behaviors for Rust web services.
//!
//! This is the meta-crate that re-exports all sub-crates for convenient access.
//! You can depend on `braces-rs` to get everything, or depend on individual
//! crates for finer-grained control.
//!
//! ## Example
//!
//! ```rust
//! use braces_rs::prelude::*;
//!
//! let form_class =
//!     FieldsFormClass::new(vec![FormFieldDef::new("title", FormFieldType::text())]).unwrap();
//! let config = ListCreateConfig::new("tasks/list.html")
//!     .form_class(form_class)
//!     .paginate_by(20)
//!     .behavior(LoginRequired::new())
//!     .behavior(SetHeadline::new("Tasks").unwrap());
//! # let _ = config;
//! ```

/// Core types, settings, logging, and error types.
pub use braces_rs_core as core;

/// HTTP contracts: request context, query dicts, principals, responses.
pub use braces_rs_http as http;

/// Forms, form kwargs, and form state.
#[cfg(feature = "views")]
pub use braces_rs_forms as forms;

/// Hook pipeline, guards, injectors, workflows, and responders.
#[cfg(feature = "views")]
pub use braces_rs_views as views;

/// Testing utilities.
#[cfg(feature = "testing")]
pub use braces_rs_test as test;

// Third-party re-exports
pub use async_trait::async_trait;
pub use axum;
pub use chrono;
pub use serde;
pub use serde_json;
pub use tokio;
pub use tracing;
pub use tracing_subscriber;

/// The types most applications need, in one import.
pub mod prelude {
    pub use braces_rs_core::logging::setup_logging;
    pub use braces_rs_core::{BracesError, BracesResult, Context, ContextValue, Settings};
    pub use braces_rs_http::{
        AnonymousUser, Principal, QueryDict, RequestContext, ResponseEnvelope, User,
    };

    #[cfg(feature = "views")]
    pub use braces_rs_forms::{FieldsFormClass, Form, FormClass, FormFieldDef, FormFieldType};

    #[cfg(feature = "views")]
    pub use braces_rs_views::{
        AjaxDispatch, AnonymousRequired, Behavior, ContentResponder, DirectDeleteView,
        DownloadContent, ExportResponder, ExtendTemplateVariable, JsonResponder, ListCreateConfig,
        ListCreateWorkflow, LockedPolicy, LoginRequired, ModelStore,
        MultiplePermissionsRequired, ObjectStore, ParentLookup, ParentScopedListCreateWorkflow,
        PermissionRequired, ScopedStore, SetHeadline, StaffuserRequired, SuccessUrl,
        SuccessUrlResolver, SuperuserRequired, UserFormKwargs, View,
    };
}
