//! # braces-rs-http
//!
//! The HTTP-facing contracts every braces-rs behavior consumes: the immutable
//! [`RequestContext`], the [`QueryDict`] holding query and form parameters,
//! the [`Principal`] the request acts on behalf of, and the
//! [`ResponseEnvelope`] every workflow produces.

pub mod principal;
pub mod querydict;
pub mod request;
pub mod response;

pub use principal::{AnonymousUser, Principal, User};
pub use querydict::QueryDict;
pub use request::{RequestContext, RequestContextBuilder, RequestMethod};
pub use response::{ResponseBody, ResponseEnvelope};
