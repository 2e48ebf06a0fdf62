//! Persistence contracts the workflows read and write through.
//!
//! Entities cross this boundary as `serde_json::Value`s so any ORM or
//! in-memory store can stand behind a workflow. Implementations should
//! honour [`ListQuery::offset`] and [`ListQuery::limit`] exactly; the
//! workflows never slice results themselves.

use async_trait::async_trait;
use serde_json::Value;

use braces_rs_core::BracesResult;
use braces_rs_forms::Form;
use braces_rs_http::RequestContext;

/// The slice of a listing a workflow asks for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// Number of items to skip.
    pub offset: usize,
    /// Maximum number of items to return; `None` returns everything after
    /// `offset`.
    pub limit: Option<usize>,
    /// Relation names the store may eager-load.
    pub select_related: Vec<String>,
}

/// An unscoped model listing with creation.
#[async_trait]
pub trait ModelStore: Send + Sync {
    /// Counts the items the listing would show for this request.
    async fn count(&self, request: &RequestContext) -> BracesResult<usize>;

    /// Fetches one page of items.
    async fn fetch(&self, request: &RequestContext, query: &ListQuery)
        -> BracesResult<Vec<Value>>;

    /// Persists a new entity from a validated form and returns it.
    async fn create(&self, request: &RequestContext, form: &dyn Form) -> BracesResult<Value>;
}

/// Resolves the parent entity of a scoped workflow from the request.
#[async_trait]
pub trait ParentLookup: Send + Sync {
    /// Returns the parent, or `None` if it does not exist.
    async fn get_parent_object(&self, request: &RequestContext) -> BracesResult<Option<Value>>;
}

/// A model listing restricted to the children of one parent.
#[async_trait]
pub trait ScopedStore: Send + Sync {
    /// Counts the parent's children.
    async fn count(&self, request: &RequestContext, parent: &Value) -> BracesResult<usize>;

    /// Fetches one page of the parent's children.
    async fn fetch(
        &self,
        request: &RequestContext,
        parent: &Value,
        query: &ListQuery,
    ) -> BracesResult<Vec<Value>>;

    /// Persists a new child of `parent` from a validated form.
    async fn create(
        &self,
        request: &RequestContext,
        parent: &Value,
        form: &dyn Form,
    ) -> BracesResult<Value>;
}

/// Single-object access for delete views.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Looks up the target of the request.
    async fn get_object(&self, request: &RequestContext) -> BracesResult<Option<Value>>;

    /// Deletes the object.
    async fn delete(&self, request: &RequestContext, object: &Value) -> BracesResult<()>;
}
