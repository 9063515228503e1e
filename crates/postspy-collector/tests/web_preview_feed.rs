//! Integration tests for `WebPreviewFeed` against a local `wiremock` server.

use futures::StreamExt;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use postspy_collector::{resolve, Entity, FeedError, FeedSource, RawMessage, WebPreviewFeed};
use postspy_core::ChannelRef;

fn test_feed(server: &MockServer) -> WebPreviewFeed {
    WebPreviewFeed::new(5, "postspy-test/0.1", 0, 0, 0)
        .expect("failed to build test WebPreviewFeed")
        .with_base_url(server.uri())
}

/// Preview page with posts in the order given (the site renders oldest first).
fn preview_page(handle: &str, ids: &[i64]) -> String {
    let mut html = format!(
        r#"<html><body><div class="tgme_channel_info"><div class="tgme_channel_info_header_title"><span>{handle} channel</span></div></div>"#
    );
    for id in ids {
        html.push_str(&format!(
            r#"<div class="tgme_widget_message_wrap"><div class="tgme_widget_message" data-post="{handle}/{id}">
<div class="tgme_widget_message_text" dir="auto">post {id}</div>
<span class="tgme_widget_message_views">{id}00</span>
<time datetime="2025-01-{id:02}T12:00:00+00:00" class="time">12:00</time>
</div></div>"#
        ));
    }
    html.push_str("</body></html>");
    html
}

fn entity(handle: &str) -> Entity {
    Entity {
        handle: handle.to_string(),
        title: None,
    }
}

async fn drain(feed: &WebPreviewFeed, entity: &Entity, limit: Option<usize>) -> Vec<Result<RawMessage, FeedError>> {
    feed.iterate_messages(entity, limit).collect().await
}

#[tokio::test]
async fn resolve_entity_reads_channel_title() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/s/nightday"))
        .respond_with(ResponseTemplate::new(200).set_body_string(preview_page("nightday", &[1])))
        .mount(&server)
        .await;

    let entity = test_feed(&server).resolve_entity("nightday").await.unwrap();
    assert_eq!(entity.handle, "nightday");
    assert_eq!(entity.title.as_deref(), Some("nightday channel"));
}

#[tokio::test]
async fn resolve_entity_without_channel_header_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/s/someone"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>profile</html>"))
        .mount(&server)
        .await;

    let result = test_feed(&server).resolve_entity("someone").await;
    assert!(matches!(result, Err(FeedError::NotFound { .. })), "got: {result:?}");
}

#[tokio::test]
async fn resolve_entity_maps_404_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/s/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let result = test_feed(&server).resolve_entity("missing").await;
    assert!(matches!(result, Err(FeedError::NotFound { .. })), "got: {result:?}");
}

#[tokio::test]
async fn resolver_falls_back_to_bare_handle() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/s/nightday"))
        .respond_with(ResponseTemplate::new(200).set_body_string(preview_page("nightday", &[1])))
        .expect(1)
        .mount(&server)
        .await;

    let feed = test_feed(&server);
    let channel = ChannelRef::new("https://t.me/nightday").unwrap();
    let resolved = resolve(&feed, &channel).await.unwrap();
    assert!(resolved.used_alternate);
    assert_eq!(resolved.identifier, "nightday");
}

#[tokio::test]
async fn iterates_pages_newest_first() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/s/nightday"))
        .and(query_param_is_missing("before"))
        .respond_with(ResponseTemplate::new(200).set_body_string(preview_page("nightday", &[3, 4, 5])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/s/nightday"))
        .and(query_param("before", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_string(preview_page("nightday", &[1, 2])))
        .expect(1)
        .mount(&server)
        .await;

    let feed = test_feed(&server);
    let ids: Vec<i64> = drain(&feed, &entity("nightday"), None)
        .await
        .into_iter()
        .map(|m| m.unwrap().id)
        .collect();
    assert_eq!(ids, [5, 4, 3, 2, 1]);
}

#[tokio::test]
async fn empty_page_ends_traversal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/s/nightday"))
        .and(query_param_is_missing("before"))
        .respond_with(ResponseTemplate::new(200).set_body_string(preview_page("nightday", &[7, 8])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/s/nightday"))
        .and(query_param("before", "7"))
        .respond_with(ResponseTemplate::new(200).set_body_string(preview_page("nightday", &[])))
        .expect(1)
        .mount(&server)
        .await;

    let feed = test_feed(&server);
    let messages = drain(&feed, &entity("nightday"), None).await;
    assert_eq!(messages.len(), 2);
    let first = messages[0].as_ref().unwrap();
    assert_eq!(first.id, 8);
    assert_eq!(first.views, Some(800));
    assert_eq!(first.text(), "post 8");
}

#[tokio::test]
async fn page_limit_stops_before_next_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/s/nightday"))
        .and(query_param_is_missing("before"))
        .respond_with(ResponseTemplate::new(200).set_body_string(preview_page("nightday", &[3, 4, 5])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/s/nightday"))
        .and(query_param("before", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_string(preview_page("nightday", &[1, 2])))
        .expect(0)
        .mount(&server)
        .await;

    let feed = test_feed(&server);
    let ids: Vec<i64> = drain(&feed, &entity("nightday"), Some(2))
        .await
        .into_iter()
        .map(|m| m.unwrap().id)
        .collect();
    assert_eq!(ids, [5, 4]);
}

#[tokio::test]
async fn server_error_mid_traversal_yields_partial_then_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/s/nightday"))
        .and(query_param_is_missing("before"))
        .respond_with(ResponseTemplate::new(200).set_body_string(preview_page("nightday", &[4, 5])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/s/nightday"))
        .and(query_param("before", "4"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let feed = test_feed(&server);
    let messages = drain(&feed, &entity("nightday"), None).await;
    assert_eq!(messages.len(), 3);
    assert!(messages[0].is_ok());
    assert!(messages[1].is_ok());
    assert!(matches!(
        messages[2],
        Err(FeedError::UnexpectedStatus { status: 500, .. })
    ));
}

#[tokio::test]
async fn rate_limit_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/s/nightday"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/s/nightday"))
        .respond_with(ResponseTemplate::new(200).set_body_string(preview_page("nightday", &[1])))
        .expect(1)
        .mount(&server)
        .await;

    let feed = WebPreviewFeed::new(5, "postspy-test/0.1", 2, 0, 0)
        .unwrap()
        .with_base_url(server.uri());
    assert!(feed.resolve_entity("nightday").await.is_ok());
}
