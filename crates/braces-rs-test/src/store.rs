//! An in-memory persistence layer that counts how it is used.
//!
//! [`InMemoryStore`] implements every store contract the workflows consume:
//! [`ModelStore`] over all items, [`ScopedStore`] over the items whose parent
//! key matches the parent's `pk`, [`ParentLookup`] over a separate parent
//! table, and [`ObjectStore`] for single-object access by route parameter.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value};

use braces_rs_core::{BracesError, BracesResult};
use braces_rs_forms::Form;
use braces_rs_http::RequestContext;
use braces_rs_views::store::{ListQuery, ModelStore, ObjectStore, ParentLookup, ScopedStore};

/// Items and parents kept in memory, with per-operation call counters.
#[derive(Debug)]
pub struct InMemoryStore {
    items: Mutex<Vec<Value>>,
    parents: Mutex<Vec<Value>>,
    queries: Mutex<Vec<ListQuery>>,
    parent_key: String,
    parent_param: String,
    object_param: String,
    counts: AtomicUsize,
    fetches: AtomicUsize,
    creates: AtomicUsize,
    deletes: AtomicUsize,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Creates an empty store. Children point at their parent through a
    /// `parent` field, the parent is looked up by the `parent_pk` route
    /// parameter and single objects by `pk`.
    pub fn new() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
            parents: Mutex::new(Vec::new()),
            queries: Mutex::new(Vec::new()),
            parent_key: "parent".to_string(),
            parent_param: "parent_pk".to_string(),
            object_param: "pk".to_string(),
            counts: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
            creates: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
        }
    }

    /// Seeds the items.
    #[must_use]
    pub fn with_items(self, items: impl IntoIterator<Item = Value>) -> Self {
        lock(&self.items).extend(items);
        self
    }

    /// Seeds the parent table.
    #[must_use]
    pub fn with_parents(self, parents: impl IntoIterator<Item = Value>) -> Self {
        lock(&self.parents).extend(parents);
        self
    }

    /// Overrides the field linking a child to its parent.
    #[must_use]
    pub fn parent_key(mut self, key: &str) -> Self {
        self.parent_key = key.to_string();
        self
    }

    /// Overrides the route parameter naming the parent.
    #[must_use]
    pub fn parent_param(mut self, name: &str) -> Self {
        self.parent_param = name.to_string();
        self
    }

    /// Returns a snapshot of the items.
    pub fn items(&self) -> Vec<Value> {
        lock(&self.items).clone()
    }

    /// Returns the number of items.
    pub fn len(&self) -> usize {
        lock(&self.items).len()
    }

    /// Returns `true` if there are no items.
    pub fn is_empty(&self) -> bool {
        lock(&self.items).is_empty()
    }

    /// Returns every query the listing was fetched with.
    pub fn queries(&self) -> Vec<ListQuery> {
        lock(&self.queries).clone()
    }

    /// Number of count and fetch calls, scoped or not.
    pub fn listing_calls(&self) -> usize {
        self.counts.load(Ordering::SeqCst) + self.fetches.load(Ordering::SeqCst)
    }

    /// Number of create calls.
    pub fn create_calls(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    /// Number of delete calls.
    pub fn delete_calls(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    fn scoped(&self, parent: Option<&Value>) -> Vec<Value> {
        lock(&self.items)
            .iter()
            .filter(|item| parent.map_or(true, |p| item[&self.parent_key] == p["pk"]))
            .cloned()
            .collect()
    }

    fn page(&self, parent: Option<&Value>, query: &ListQuery) -> Vec<Value> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        lock(&self.queries).push(query.clone());
        self.scoped(parent)
            .into_iter()
            .skip(query.offset)
            .take(query.limit.unwrap_or(usize::MAX))
            .collect()
    }

    fn insert(&self, parent: Option<&Value>, form: &dyn Form) -> Value {
        self.creates.fetch_add(1, Ordering::SeqCst);
        let mut items = lock(&self.items);
        let pk = items
            .iter()
            .filter_map(|item| item["pk"].as_u64())
            .max()
            .unwrap_or(0)
            + 1;

        let mut object: Map<String, Value> = form
            .cleaned_data()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        object.insert("pk".to_string(), Value::from(pk));
        if let Some(parent) = parent {
            object.insert(self.parent_key.clone(), parent["pk"].clone());
        }
        let object = Value::Object(object);
        items.push(object.clone());
        object
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Matches a `pk` against a route parameter, whether stored as a number or a
/// string.
fn pk_matches(pk: &Value, param: &str) -> bool {
    match pk {
        Value::String(s) => s == param,
        Value::Number(n) => n.to_string() == param,
        _ => false,
    }
}

#[async_trait]
impl ModelStore for InMemoryStore {
    async fn count(&self, _request: &RequestContext) -> BracesResult<usize> {
        self.counts.fetch_add(1, Ordering::SeqCst);
        Ok(self.len())
    }

    async fn fetch(&self, _request: &RequestContext, query: &ListQuery) -> BracesResult<Vec<Value>> {
        Ok(self.page(None, query))
    }

    async fn create(&self, _request: &RequestContext, form: &dyn Form) -> BracesResult<Value> {
        Ok(self.insert(None, form))
    }
}

#[async_trait]
impl ScopedStore for InMemoryStore {
    async fn count(&self, _request: &RequestContext, parent: &Value) -> BracesResult<usize> {
        self.counts.fetch_add(1, Ordering::SeqCst);
        Ok(self.scoped(Some(parent)).len())
    }

    async fn fetch(
        &self,
        _request: &RequestContext,
        parent: &Value,
        query: &ListQuery,
    ) -> BracesResult<Vec<Value>> {
        Ok(self.page(Some(parent), query))
    }

    async fn create(
        &self,
        _request: &RequestContext,
        parent: &Value,
        form: &dyn Form,
    ) -> BracesResult<Value> {
        Ok(self.insert(Some(parent), form))
    }
}

#[async_trait]
impl ParentLookup for InMemoryStore {
    async fn get_parent_object(&self, request: &RequestContext) -> BracesResult<Option<Value>> {
        let Some(param) = request.param(&self.parent_param) else {
            return Err(BracesError::ImproperlyConfigured(format!(
                "Route parameter '{}' is missing",
                self.parent_param
            )));
        };
        Ok(lock(&self.parents)
            .iter()
            .find(|parent| pk_matches(&parent["pk"], param))
            .cloned())
    }
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    async fn get_object(&self, request: &RequestContext) -> BracesResult<Option<Value>> {
        let Some(param) = request.param(&self.object_param) else {
            return Ok(None);
        };
        Ok(lock(&self.items)
            .iter()
            .find(|item| pk_matches(&item["pk"], param))
            .cloned())
    }

    async fn delete(&self, _request: &RequestContext, object: &Value) -> BracesResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        lock(&self.items).retain(|item| item["pk"] != object["pk"]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use braces_rs_forms::{BaseForm, FormFieldDef, FormFieldType, FormKwargs};
    use braces_rs_http::QueryDict;
    use serde_json::json;

    use super::*;

    fn store() -> InMemoryStore {
        InMemoryStore::new()
            .with_parents([json!({"pk": 1}), json!({"pk": "b"})])
            .with_items([
                json!({"pk": 1, "parent": 1}),
                json!({"pk": 2, "parent": "b"}),
                json!({"pk": 3, "parent": 1}),
            ])
    }

    #[tokio::test]
    async fn test_scoped_listing() {
        let store = store();
        let request = RequestContext::builder().param("parent_pk", "1").build();
        let parent = store.get_parent_object(&request).await.unwrap().unwrap();

        assert_eq!(ScopedStore::count(&store, &request, &parent).await.unwrap(), 2);
        let query = ListQuery {
            offset: 1,
            limit: Some(5),
            select_related: Vec::new(),
        };
        let page = ScopedStore::fetch(&store, &request, &parent, &query).await.unwrap();
        assert_eq!(page, vec![json!({"pk": 3, "parent": 1})]);
        assert_eq!(store.listing_calls(), 2);
    }

    #[tokio::test]
    async fn test_string_parent_pk() {
        let store = store();
        let request = RequestContext::builder().param("parent_pk", "b").build();
        assert!(store.get_parent_object(&request).await.unwrap().is_some());
        let missing = RequestContext::builder().param("parent_pk", "zz").build();
        assert!(store.get_parent_object(&missing).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_assigns_pk_and_parent() {
        let store = store();
        let mut form = BaseForm::new(
            vec![FormFieldDef::new("title", FormFieldType::text())],
            FormKwargs::new(),
        );
        form.bind(&QueryDict::from_pairs([("title", "Docs")]));
        assert!(form.is_valid().await);

        let request = RequestContext::builder().build();
        let created = ScopedStore::create(&store, &request, &json!({"pk": "b"}), &form)
            .await
            .unwrap();
        assert_eq!(created, json!({"pk": 4, "parent": "b", "title": "Docs"}));
        assert_eq!(store.create_calls(), 1);
        assert_eq!(store.len(), 4);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = store();
        let request = RequestContext::builder().param("pk", "2").build();
        let object = store.get_object(&request).await.unwrap().unwrap();
        store.delete(&request, &object).await.unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.delete_calls(), 1);
    }
}
