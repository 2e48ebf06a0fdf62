//! # braces-rs-views
//!
//! Composable view behaviors. Every behavior plugs into the [`HookPipeline`]
//! at one or more named phases (`guard`, `form_kwargs`, `context_data`,
//! `success_url`); the composite workflows run the phases in a fixed order
//! and never call a behavior by name.
//!
//! ## Modules
//!
//! - [`hooks`] - The hook pipeline and the traits behaviors implement
//! - [`guards`] - Access guards (login, anonymous, permissions, staff, superuser)
//! - [`injectors`] - Headline, extend-template, user and static injectors
//! - [`success_url`] - Success URL resolution and route reversing
//! - [`list_create`] - Paginated listing with an inline creation form
//! - [`parent_scoped`] - The list+create workflow scoped to a parent entity
//! - [`responder`] - Downloadable content responses
//! - [`json`] - JSON content and encoders
//! - [`export`] - Spreadsheet export preset
//! - [`direct_delete`] - Deletion without a confirmation page
//! - [`ajax`] - Alternative handlers for AJAX requests
//! - [`view`] - The `View` trait and handler conversion

pub mod ajax;
pub mod direct_delete;
pub mod export;
pub mod guards;
pub mod hooks;
pub mod injectors;
pub mod json;
pub mod list_create;
pub mod pagination;
pub mod parent_scoped;
mod placeholder;
pub mod render;
pub mod resource;
pub mod responder;
pub mod store;
pub mod success_url;
pub mod view;

pub use ajax::AjaxDispatch;
pub use direct_delete::DirectDeleteView;
pub use export::ExportResponder;
pub use guards::{
    AnonymousRequired, LoginRequired, MultiplePermissionsRequired, PermissionRequired,
    StaffuserRequired, SuperuserRequired,
};
pub use hooks::{
    Behavior, ContextInjector, FormKwargsInjector, Guard, GuardDecision, HookPipeline,
    HookPipelineBuilder, HookPoint, RedirectResolver,
};
pub use injectors::{
    ExtendTemplateVariable, SetHeadline, StaticContext, StaticFormKwargs, UserFormKwargs,
};
pub use json::{IsoJsonEncoder, JsonEncoder, JsonResponder};
pub use list_create::{ListCreateConfig, ListCreateWorkflow, LockedPolicy};
pub use pagination::PaginationState;
pub use parent_scoped::ParentScopedListCreateWorkflow;
pub use render::{DebugRenderer, TemplateRenderer};
pub use resource::{FileResource, ReaderResource, StreamingResource};
pub use responder::{ContentCloser, ContentProvider, ContentResponder, DownloadContent};
pub use store::{ListQuery, ModelStore, ObjectStore, ParentLookup, ScopedStore};
pub use success_url::{RouteMap, SuccessUrl, SuccessUrlResolver, UrlReverser};
pub use view::{Handler, View};
