//! End-to-end list and mutation flows against a mocked CMS API.
//!
//! Each test starts its own wiremock server and drives the real
//! `ApiClient` through `ListView` and `MutationCoordinator`.

use newsdesk::api::ApiClient;
use newsdesk::collection::{
    ListView, LocalCollection, MutationCoordinator, MutationError, MutationState, PagingStrategy,
    Reconcile, SortKey, Target,
};
use newsdesk::forms::{ArticleForm, CategoryForm, Thumbnail};
use newsdesk::models::{Article, Category};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> ApiClient {
    ApiClient::new(&server.uri(), Duration::from_secs(5)).unwrap()
}

fn article_json(id: usize, title: &str, category: &str) -> Value {
    json!({
        "id": id.to_string(),
        "title": title,
        "content": format!("<p>About {title}</p>"),
        "categoryId": format!("cat-{category}"),
        "category": { "id": format!("cat-{category}"), "name": category },
        "imageUrl": "https://cdn.example.com/a.png",
        "createdAt": format!("2025-01-{:02}T00:00:00Z", id + 1),
    })
}

fn category_json(id: &str, name: &str) -> Value {
    json!({ "id": id, "name": name, "createdAt": "2025-01-01T00:00:00Z" })
}

async fn serve_articles(server: &MockServer, items: Vec<Value>) {
    Mock::given(method("GET"))
        .and(path("/articles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": items })))
        .mount(server)
        .await;
}

// ============================================================================
// Listing
// ============================================================================

#[tokio::test]
async fn test_reader_list_pages_twelve_by_nine() {
    let server = MockServer::start().await;
    let items = (0..12)
        .map(|i| article_json(i, &format!("Post {i:02}"), "Tech"))
        .collect();
    serve_articles(&server, items).await;

    let client = client_for(&server);
    let mut view = ListView::<Article>::new(9, PagingStrategy::ClientSide).unwrap();
    view.load(&client).await.unwrap();

    let first = view.current_page();
    assert_eq!(first.items.len(), 9);
    assert_eq!(first.total_pages, 2);
    assert_eq!(first.items[0].title, "Post 11");

    assert!(view.next_page());
    let second = view.current_page();
    assert_eq!(second.items.len(), 3);
    assert_eq!(second.range_label(), "items 10-12 of 12");
}

#[tokio::test]
async fn test_query_and_category_narrow_the_list() {
    let server = MockServer::start().await;
    serve_articles(
        &server,
        vec![
            article_json(0, "Intro to Rust", "Tech"),
            article_json(1, "React hooks", "Tech"),
            article_json(2, "Match report", "Sports"),
            article_json(3, "Why REACT won", "Opinion"),
        ],
    )
    .await;

    let client = client_for(&server);
    let mut view = ListView::<Article>::new(10, PagingStrategy::ClientSide).unwrap();
    view.load(&client).await.unwrap();

    view.set_query("react");
    view.set_sort(SortKey::Title);
    let titles: Vec<&str> = view.current_page().items.iter().map(|a| a.title.as_str()).collect();
    assert_eq!(titles, vec!["React hooks", "Why REACT won"]);

    view.set_category(Some("Tech".into()));
    let titles: Vec<&str> = view.current_page().items.iter().map(|a| a.title.as_str()).collect();
    assert_eq!(titles, vec!["React hooks"]);

    view.set_query("");
    view.set_category(None);
    assert_eq!(view.category_options(), vec!["Tech", "Sports", "Opinion"]);
}

#[tokio::test]
async fn test_server_paged_categories_use_server_counts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/categories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [category_json("11", "Tech"), category_json("12", "Travel")],
            "totalData": 12,
            "currentPage": 2,
            "totalPages": 2
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut view = ListView::<Category>::new(10, PagingStrategy::ServerSide).unwrap();
    view.request_page(2);
    view.load(&client).await.unwrap();

    let page = view.current_page();
    assert_eq!(page.number, 2);
    assert_eq!(page.total_items, 12);
    assert_eq!(page.items.len(), 2);
    assert!(page.has_previous());
    assert!(!page.has_next());
}

// ============================================================================
// Mutations
// ============================================================================

#[tokio::test]
async fn test_delete_confirmed_shrinks_list() {
    let server = MockServer::start().await;
    let categories: Vec<Value> = ["40", "41", "42", "43", "44"]
        .iter()
        .map(|id| category_json(id, &format!("c{id}")))
        .collect();
    Mock::given(method("GET"))
        .and(path("/categories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": categories })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/categories/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "deleted" })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut view = ListView::<Category>::new(10, PagingStrategy::ClientSide).unwrap();
    view.load(&client).await.unwrap();
    assert_eq!(view.cache().len(), 5);

    let mut coordinator = MutationCoordinator::new(&client, Reconcile::Refetch);
    coordinator.request_delete::<Category>("42").unwrap();
    assert_eq!(coordinator.pending_delete(), Some("42"));

    let deleted = coordinator.confirm_delete::<Category>(view.cache_mut()).await.unwrap();
    assert_eq!(deleted, "42");
    assert_eq!(view.cache().len(), 4);
    assert!(!view.cache().contains("42"));
    assert_eq!(coordinator.state(), &MutationState::Success);
}

#[tokio::test]
async fn test_delete_failure_leaves_list_and_confirmation() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/categories/42"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "message": "in use" })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut cache = LocalCollection::from_items(vec![serde_json::from_value::<Category>(
        category_json("42", "Tech"),
    )
    .unwrap()]);

    let mut coordinator = MutationCoordinator::new(&client, Reconcile::Refetch);
    coordinator.request_delete::<Category>("42").unwrap();
    let err = coordinator.confirm_delete::<Category>(&mut cache).await.unwrap_err();

    assert!(err.to_string().contains("in use"));
    assert_eq!(cache.len(), 1);
    assert_eq!(coordinator.pending_delete(), Some("42"));
    assert!(matches!(coordinator.state(), MutationState::Failed(_)));
}

#[tokio::test]
async fn test_empty_title_is_never_posted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/articles"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut cache = LocalCollection::new();
    let form = ArticleForm {
        title: "   ".into(),
        content: "<p>body</p>".into(),
        category_id: Some("c1".into()),
        thumbnail: Thumbnail::Uploaded("https://cdn.example.com/a.png".into()),
    };

    let mut coordinator = MutationCoordinator::new(&client, Reconcile::Refetch);
    let err = coordinator
        .submit_article(&mut cache, &Target::Create, &form)
        .await
        .unwrap_err();
    match err {
        MutationError::Validation(errors) => {
            assert_eq!(errors.get("title").map(String::as_str), Some("Enter title"));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert_eq!(coordinator.state(), &MutationState::Idle);
}

#[tokio::test]
async fn test_create_then_refetch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/articles"))
        .and(body_json(json!({
            "title": "Fresh",
            "content": "<p>new</p>",
            "categoryId": "cat-Tech",
            "imageUrl": "https://cdn.example.com/a.png"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(article_json(7, "Fresh", "Tech")))
        .expect(1)
        .mount(&server)
        .await;
    serve_articles(
        &server,
        vec![article_json(0, "Old", "Tech"), article_json(7, "Fresh", "Tech")],
    )
    .await;

    let client = client_for(&server);
    let mut cache = LocalCollection::new();
    let form = ArticleForm {
        title: "  Fresh ".into(),
        content: "<p>new</p>".into(),
        category_id: Some("cat-Tech".into()),
        thumbnail: Thumbnail::Uploaded("https://cdn.example.com/a.png".into()),
    };

    let mut coordinator = MutationCoordinator::new(&client, Reconcile::Refetch);
    let saved = coordinator
        .submit_article(&mut cache, &Target::Create, &form)
        .await
        .unwrap();
    assert_eq!(saved.id, "7");
    assert_eq!(cache.len(), 2);
}

#[tokio::test]
async fn test_rename_category_merges_locally() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/categories/c1"))
        .and(body_json(json!({ "name": "Technology" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(category_json("c1", "Technology")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/categories"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut cache = LocalCollection::from_items(vec![
        serde_json::from_value::<Category>(category_json("c1", "Tech")).unwrap(),
        serde_json::from_value::<Category>(category_json("c2", "Travel")).unwrap(),
    ]);

    let mut coordinator = MutationCoordinator::new(&client, Reconcile::Merge);
    let form = CategoryForm {
        name: "Technology".into(),
    };
    coordinator
        .submit_category(&mut cache, &Target::Update("c1".into()), &form, None)
        .await
        .unwrap();

    let names: Vec<&str> = cache.items().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Technology", "Travel"]);
}
