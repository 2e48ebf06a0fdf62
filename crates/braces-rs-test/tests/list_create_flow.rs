//! End-to-end tests for the list+create workflow.
//!
//! These drive a complete request through guards, kwargs and context
//! assembly, pagination, the form and the success redirect, using the
//! in-memory store and the recording renderer.

use std::sync::Arc;

use braces_rs_core::ContextValue;
use braces_rs_forms::{FieldsFormClass, FormFieldDef, FormFieldType};
use braces_rs_http::User;
use braces_rs_test::{InMemoryStore, RecordingRenderer, RequestFactory};
use braces_rs_views::list_create::{ListCreateConfig, ListCreateWorkflow, LockedPolicy};
use braces_rs_views::success_url::{RouteMap, SuccessUrl, SuccessUrlResolver};
use braces_rs_views::{
    AjaxDispatch, ExtendTemplateVariable, LoginRequired, SetHeadline, View,
};
use http::StatusCode;
use serde_json::json;

// ============================================================================
// Helpers
// ============================================================================

fn store(n: usize) -> Arc<InMemoryStore> {
    Arc::new(
        InMemoryStore::new()
            .with_items((1..=n).map(|i| json!({"pk": i, "title": format!("Item {i}")}))),
    )
}

fn form_class() -> FieldsFormClass {
    FieldsFormClass::new(vec![FormFieldDef::new(
        "title",
        FormFieldType::Char {
            min_length: Some(2),
            max_length: Some(40),
            strip: true,
        },
    )])
    .unwrap()
}

fn config(renderer: &RecordingRenderer) -> ListCreateConfig {
    ListCreateConfig::new("items/list.html")
        .form_class(form_class())
        .renderer(renderer.clone())
        .paginate_by(2)
}

fn titles(value: &ContextValue) -> Vec<String> {
    value
        .as_list()
        .unwrap_or_default()
        .iter()
        .filter_map(|item| item.get("title").and_then(ContextValue::as_str))
        .map(String::from)
        .collect()
}

// ============================================================================
// Reads
// ============================================================================

/// Page 3 of five items at two per page holds only the fifth item.
#[tokio::test]
async fn test_third_page_of_five() {
    let renderer = RecordingRenderer::new();
    let workflow = ListCreateWorkflow::new(config(&renderer), store(5)).unwrap();

    let response = workflow
        .serve(&RequestFactory::new().get("/items/?page=3"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let context = renderer.last_context().unwrap();
    assert_eq!(titles(context.get("object_list").unwrap()), vec!["Item 5"]);
    let page_obj = context.get("page_obj").unwrap();
    assert_eq!(page_obj.get("number"), Some(&ContextValue::Integer(3)));
    assert_eq!(page_obj.get("num_pages"), Some(&ContextValue::Integer(3)));
    assert_eq!(page_obj.get("has_next"), Some(&ContextValue::Bool(false)));
    assert_eq!(page_obj.get("has_previous"), Some(&ContextValue::Bool(true)));
    assert_eq!(context.get("is_paginated"), Some(&ContextValue::Bool(true)));
    assert_eq!(
        context.get("form").and_then(|f| f.get("is_bound")),
        Some(&ContextValue::Bool(false))
    );
}

#[tokio::test]
async fn test_last_page_keyword() {
    let renderer = RecordingRenderer::new();
    let workflow = ListCreateWorkflow::new(config(&renderer), store(5)).unwrap();
    workflow.serve(&RequestFactory::new().get("/items/?page=last")).await;

    let context = renderer.last_context().unwrap();
    assert_eq!(titles(context.get("object_list").unwrap()), vec!["Item 5"]);
}

#[tokio::test]
async fn test_unpaginated_listing() {
    let renderer = RecordingRenderer::new();
    let workflow = ListCreateWorkflow::new(
        ListCreateConfig::new("items/list.html")
            .form_class(form_class())
            .renderer(renderer.clone()),
        store(3),
    )
    .unwrap();
    workflow.serve(&RequestFactory::new().get("/items/")).await;

    let context = renderer.last_context().unwrap();
    assert_eq!(titles(context.get("object_list").unwrap()).len(), 3);
    assert_eq!(context.get("page_obj"), Some(&ContextValue::Null));
    assert_eq!(context.get("is_paginated"), Some(&ContextValue::Bool(false)));
}

#[tokio::test]
async fn test_injectors_feed_the_context() {
    let renderer = RecordingRenderer::new();
    let workflow = ListCreateWorkflow::new(
        config(&renderer)
            .behavior(SetHeadline::new("Inbox").unwrap())
            .behavior(ExtendTemplateVariable::new()),
        store(1),
    )
    .unwrap();

    workflow.serve(&RequestFactory::new().ajax().get("/items/")).await;
    let context = renderer.last_context().unwrap();
    assert_eq!(context.get("headline"), Some(&ContextValue::from("Inbox")));
    assert_eq!(
        context.get("template_extend"),
        Some(&ContextValue::from("base_modal.html"))
    );
}

// ============================================================================
// Mutations
// ============================================================================

/// A valid submission to a locked form changes nothing and renders 200.
#[tokio::test]
async fn test_locked_form_valid_submission() {
    let renderer = RecordingRenderer::new();
    let items = store(3);
    let workflow = ListCreateWorkflow::new(
        config(&renderer).locked_when(|_request| true),
        items.clone(),
    )
    .unwrap();

    let response = workflow
        .serve(&RequestFactory::new().post("/items/", &[("title", "Perfectly valid")]))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.header("location").is_none());
    assert_eq!(items.len(), 3);
    assert_eq!(items.create_calls(), 0);

    let form = renderer.last_context().unwrap().get("form").cloned().unwrap();
    assert_eq!(form.get("locked"), Some(&ContextValue::Bool(true)));
    assert_eq!(form.get("is_bound"), Some(&ContextValue::Bool(false)));
}

#[tokio::test]
async fn test_locked_form_forbid_policy() {
    let renderer = RecordingRenderer::new();
    let items = store(1);
    let workflow = ListCreateWorkflow::new(
        config(&renderer)
            .locked_when(|request| request.principal().username() == "readonly")
            .locked_policy(LockedPolicy::Forbid),
        items.clone(),
    )
    .unwrap();

    let locked = RequestFactory::new().with_user(User::new("readonly"));
    let response = workflow.serve(&locked.post("/items/", &[("title", "New")])).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(renderer.render_count(), 0);

    let open = RequestFactory::new().with_user(User::new("ada"));
    let response = workflow.serve(&open.post("/items/", &[("title", "New")])).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(items.len(), 2);
}

#[tokio::test]
async fn test_invalid_submission_rerenders_same_page() {
    let renderer = RecordingRenderer::new();
    let items = store(5);
    let workflow = ListCreateWorkflow::new(config(&renderer), items.clone()).unwrap();

    let response = workflow
        .serve(&RequestFactory::new().post("/items/?page=2", &[("title", "x")]))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(items.create_calls(), 0);

    let context = renderer.last_context().unwrap();
    assert_eq!(
        titles(context.get("object_list").unwrap()),
        vec!["Item 3", "Item 4"]
    );
    let form = context.get("form").unwrap();
    assert_eq!(form.get("is_bound"), Some(&ContextValue::Bool(true)));
    assert!(form.get("errors").and_then(|e| e.get("title")).is_some());
}

#[tokio::test]
async fn test_valid_submission_redirects_to_named_route() {
    let renderer = RecordingRenderer::new();
    let items = store(2);
    let routes = Arc::new(RouteMap::new().route("item-edit", "/items/{pk}/edit/"));
    let workflow = ListCreateWorkflow::new(
        config(&renderer).behavior(
            SuccessUrlResolver::new(SuccessUrl::NamedWithPk("item-edit".into()), Some(routes))
                .unwrap(),
        ),
        items.clone(),
    )
    .unwrap();

    let response = workflow
        .serve(&RequestFactory::new().put("/items/", &[("title", "  Third  ")]))
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.header("location"), Some("/items/3/edit/"));
    assert_eq!(items.items()[2]["title"], json!("Third"));
    assert_eq!(renderer.render_count(), 0);
}

// ============================================================================
// Guards and dispatch
// ============================================================================

#[tokio::test]
async fn test_login_required_redirects_before_listing() {
    let renderer = RecordingRenderer::new();
    let items = store(4);
    let workflow =
        ListCreateWorkflow::new(config(&renderer).behavior(LoginRequired::new()), items.clone())
            .unwrap();

    let response = workflow
        .serve(&RequestFactory::new().get("/items/?page=2"))
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.header("location"),
        Some("/accounts/login/?next=/items/%3Fpage%3D2")
    );
    assert_eq!(items.listing_calls(), 0);

    let signed_in = RequestFactory::new().with_user(User::new("ada"));
    let response = workflow.serve(&signed_in.get("/items/")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_handler_rejects_delete() {
    let renderer = RecordingRenderer::new();
    let handler = ListCreateWorkflow::new(config(&renderer), store(1))
        .unwrap()
        .as_handler();

    let response = handler(RequestFactory::new().delete("/items/")).await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.header("allow"), Some("GET, HEAD, POST, PUT"));
}

// ============================================================================
// AJAX dispatch
// ============================================================================

/// AJAX PUT and DELETE fall back to the listing read; nothing is created.
#[tokio::test]
async fn test_ajax_put_and_delete_render_the_listing() {
    let store = store(3);
    let renderer = RecordingRenderer::new();
    let workflow = ListCreateWorkflow::new(config(&renderer), store.clone()).unwrap();
    let view = AjaxDispatch::new(workflow);
    let factory = RequestFactory::new().ajax();

    let response = view.serve(&factory.put("/items/?page=2", &[("title", "Sneaky")])).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(store.create_calls(), 0);
    let context = renderer.last_context().unwrap();
    assert_eq!(titles(context.get("object_list").unwrap()), ["Item 3"]);

    let response = view.serve(&factory.delete("/items/")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(renderer.render_count(), 2);
    assert_eq!(store.len(), 3);

    let response = view
        .serve(&RequestFactory::new().put("/items/", &[("title", "Plain")]))
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(store.create_calls(), 1);
}
