//! Integration tests for the tree model talking HTTP to a mock service.
//!
//! Each test starts its own `wiremock` server. Mocks with `expect(n)` are
//! verified when the server drops.

use knowtree::api::{ApiError, HttpClient, NodeId};
use knowtree::config::Config;
use knowtree::progress::summarize;
use knowtree::tree::{TreeError, TreeSession};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer, config: &Config) -> Arc<HttpClient> {
    Arc::new(HttpClient::new(&server.uri(), config).unwrap())
}

async fn mount_get(server: &MockServer, route: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_roots(server: &MockServer) {
    mount_get(
        server,
        "/api/knowledge-tree/roots",
        json!([
            {"id": 1, "name": "Computer Science", "childIds": [2]},
            {"id": 13, "name": "Mathematics"}
        ]),
    )
    .await;
}

#[tokio::test]
async fn test_expand_twice_hits_children_endpoint_once() {
    let server = MockServer::start().await;
    mount_roots(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/knowledge-tree/children/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 2, "name": "Systems", "childIds": [3]}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = TreeSession::new(client(&server, &Config::default()));
    session.load_roots().await.unwrap();
    session.expand(NodeId(1)).await.unwrap();
    session.collapse(NodeId(1));
    session.expand(NodeId(1)).await.unwrap();

    let rows = session.model().rows();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[1].name, "Systems");
    assert_eq!(rows[1].depth, 1);
}

#[tokio::test]
async fn test_search_reveals_path_fetched_by_id() {
    let server = MockServer::start().await;
    mount_roots(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/knowledge-tree/search"))
        .and(query_param("query", "network"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 4, "name": "Network Protocols", "parentId": 3}
        ])))
        .expect(1)
        .mount(&server)
        .await;
    mount_get(&server, "/api/knowledge-tree/3", json!({"id": 3, "name": "Data Communication", "parentId": 2})).await;
    mount_get(&server, "/api/knowledge-tree/2", json!({"id": 2, "name": "Systems", "parentId": 1})).await;
    mount_get(&server, "/api/knowledge-tree/children/1", json!([{"id": 2, "name": "Systems", "childIds": [3]}])).await;
    mount_get(&server, "/api/knowledge-tree/children/2", json!([{"id": 3, "name": "Data Communication", "childIds": [4]}])).await;
    mount_get(&server, "/api/knowledge-tree/children/3", json!([{"id": 4, "name": "Network Protocols"}])).await;

    let mut session = TreeSession::new(client(&server, &Config::default()));
    session.load_roots().await.unwrap();
    assert_eq!(session.search("network").await.unwrap(), Some(NodeId(4)));

    let crumbs: Vec<String> = session
        .model()
        .breadcrumbs()
        .into_iter()
        .map(|n| n.name)
        .collect();
    assert_eq!(
        crumbs,
        vec!["Computer Science", "Systems", "Data Communication", "Network Protocols"]
    );
    let row = session
        .model()
        .rows()
        .into_iter()
        .find(|r| r.id == NodeId(4))
        .unwrap();
    assert_eq!(row.depth, 3);
}

#[tokio::test]
async fn test_reveal_stops_at_deleted_ancestor() {
    let server = MockServer::start().await;
    mount_roots(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/knowledge-tree/9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 9, "name": "Orphan", "parentId": 8
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/knowledge-tree/8"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Node 8 not found"})))
        .mount(&server)
        .await;

    let mut session = TreeSession::new(client(&server, &Config::default()));
    assert_eq!(session.restore(NodeId(9)).await.unwrap(), NodeId(9));

    let crumbs = session.model().breadcrumbs();
    assert_eq!(crumbs.len(), 1);
    assert_eq!(crumbs[0].name, "Orphan");
    // Roots were missing and came along with the reveal
    assert_eq!(session.model().state().roots.len(), 2);
}

#[tokio::test]
async fn test_slow_children_time_out_without_mutation() {
    let server = MockServer::start().await;
    mount_roots(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/knowledge-tree/children/1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let config = Config {
        request_timeout_secs: 1,
        ..Config::default()
    };
    let mut session = TreeSession::new(client(&server, &config));
    session.load_roots().await.unwrap();

    let err = session.expand(NodeId(1)).await.unwrap_err();
    assert!(matches!(err, TreeError::Fetch(ApiError::Timeout)));
    assert!(!session.model().state().is_expanded(NodeId(1)));
    assert!(session.model().state().children.is_empty());
}

#[tokio::test]
async fn test_save_replaces_cached_node() {
    let server = MockServer::start().await;
    mount_roots(&server).await;
    Mock::given(method("PUT"))
        .and(path("/api/knowledge-tree/13"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 13, "name": "Maths", "description": "Numbers and shapes"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = TreeSession::new(client(&server, &Config::default()));
    session.load_roots().await.unwrap();
    let draft = session.model_mut().begin_edit(NodeId(13)).unwrap();
    draft.fields.name = "Maths".to_string();
    draft.fields.description = "Numbers and shapes".to_string();
    session.save().await.unwrap();

    let math = session.model().find(NodeId(13)).unwrap();
    assert_eq!(math.name, "Maths");
    assert_eq!(math.description.as_deref(), Some("Numbers and shapes"));
    assert!(session.model().draft().is_none());
}

#[tokio::test]
async fn test_history_summarized_per_topic() {
    let server = MockServer::start().await;
    mount_get(
        &server,
        "/api/evaluate/history",
        json!([
            {"id": 3, "topic": "Rust", "score": 90.0, "createdAt": "2026-03-03T10:00:00"},
            {"id": 2, "topic": "Algebra", "score": 40.0, "createdAt": "2026-03-02T10:00:00"},
            {"id": 1, "topic": "Rust", "score": 60.0, "createdAt": "2026-03-01T10:00:00"}
        ]),
    )
    .await;

    let history = client(&server, &Config::default()).history().await.unwrap();
    let summaries = summarize(&history);
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].topic, "Rust");
    assert_eq!(summaries[0].attempts, 2);
    assert_eq!(summaries[0].latest, 90.0);
    assert_eq!(summaries[0].trend, Some(30.0));
}
