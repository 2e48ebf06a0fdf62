//! End-to-end tests for direct deletion.

use std::sync::Arc;

use braces_rs_http::User;
use braces_rs_test::{InMemoryStore, RequestFactory};
use braces_rs_views::success_url::{RouteMap, SuccessUrl, SuccessUrlResolver};
use braces_rs_views::{DirectDeleteView, PermissionRequired, View};
use http::StatusCode;
use serde_json::json;

fn store() -> Arc<InMemoryStore> {
    Arc::new(InMemoryStore::new().with_items([json!({"pk": 1}), json!({"pk": 2})]))
}

fn view(store: &Arc<InMemoryStore>) -> DirectDeleteView {
    let routes = Arc::new(RouteMap::new().route("note-list", "/notes/"));
    DirectDeleteView::builder(store.clone())
        .behavior(PermissionRequired::new("notes.delete_note").unwrap())
        .success_url(SuccessUrlResolver::new(SuccessUrl::Named("note-list".into()), Some(routes)).unwrap())
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_permitted_post_deletes() {
    let store = store();
    let factory = RequestFactory::new()
        .with_param("pk", "2")
        .with_user(User::new("ada").with_permission("notes.delete_note"));

    let response = view(&store).serve(&factory.post("/notes/2/delete/", &[])).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.header("location"), Some("/notes/"));
    assert_eq!(store.delete_calls(), 1);
    assert_eq!(store.items(), vec![json!({"pk": 1})]);
}

#[tokio::test]
async fn test_missing_permission_redirects_to_login() {
    let store = store();
    let factory = RequestFactory::new()
        .with_param("pk", "2")
        .with_user(User::new("bob"));

    let response = view(&store).serve(&factory.get("/notes/2/delete/")).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.header("location"),
        Some("/accounts/login/?next=/notes/2/delete/")
    );
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn test_missing_object_is_not_found() {
    let store = store();
    let factory = RequestFactory::new()
        .with_param("pk", "7")
        .with_user(User::new("root").superuser());

    let response = view(&store).serve(&factory.get("/notes/7/delete/")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(store.delete_calls(), 0);
}
