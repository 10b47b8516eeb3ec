//! Integration tests for the session event loop: search ordering, debounce,
//! AI chat and status polling, topics, and identity injection.
//!
//! Tasks run against a wiremock backend on real time; the session's event
//! receiver is drained by hand the same way the shell loop does it.

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::time::Duration;
use telepulse::api::{ApiClient, ClientOptions, HostIdentity, ItemId};
use telepulse::config::{Config, ENV_INIT_DATA, ENV_USER_ID};
use telepulse::nav::{BackOutcome, OverlayKind, Section};
use telepulse::session::{Session, SessionEvent, SessionOptions};
use telepulse::store::chat::ERROR_NOTICE;
use telepulse::store::{likes, AiStatusPoller, Author, ChatSession, TopicStore};
use tokio::sync::mpsc;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> ApiClient {
    ApiClient::new(ClientOptions::new(server.uri())).unwrap()
}

fn post(id: i64) -> Value {
    json!({"id": id, "channel": {"name": "Tech"}, "title": "t", "content": "c"})
}

async fn next_event(events: &mut mpsc::Receiver<SessionEvent>) -> SessionEvent {
    tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("timed out waiting for a session event")
        .expect("event channel closed")
}

async fn mount_search(server: &MockServer, query: &str, ids: &[i64], delay: Duration) {
    let posts: Vec<Value> = ids.iter().map(|id| post(*id)).collect();
    Mock::given(method("POST"))
        .and(path("/search"))
        .and(body_partial_json(json!({"query": query})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"posts": posts}))
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

// ============================================================================
// Search
// ============================================================================

#[tokio::test]
async fn test_slow_earlier_search_does_not_overwrite_later_one() {
    let server = MockServer::start().await;
    mount_search(&server, "ru", &[1], Duration::from_millis(300)).await;
    mount_search(&server, "rust", &[2, 3], Duration::ZERO).await;

    let (mut session, mut events) = Session::new(client_for(&server), SessionOptions::default());
    session.spawn_search("ru");
    session.spawn_search("rust");

    // The fast response lands first, the stale one afterwards
    for _ in 0..2 {
        let event = next_event(&mut events).await;
        session.handle_event(event);
    }

    let ids: Vec<ItemId> = session.search.results().iter().map(|p| p.id.clone()).collect();
    assert_eq!(ids, vec![ItemId::Int(2), ItemId::Int(3)]);
    assert_eq!(session.search.query(), "rust");
    assert!(!session.search.is_loading());
}

#[tokio::test]
async fn test_blank_search_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"posts": [post(1)]})))
        .expect(0)
        .mount(&server)
        .await;

    let api = client_for(&server);
    let mut store = telepulse::store::SearchStore::new();
    store.search(&api, "").await;
    store.search(&api, "   ").await;
    assert!(store.results().is_empty());
    assert!(!store.is_loading());
}

#[tokio::test]
async fn test_typing_burst_sends_one_search() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .and(body_partial_json(json!({"query": "rust"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"posts": [post(1)]})))
        .expect(1)
        .mount(&server)
        .await;

    let options = SessionOptions {
        search_debounce: Duration::from_millis(50),
        ..SessionOptions::default()
    };
    let (mut session, mut events) = Session::new(client_for(&server), options);
    for query in ["r", "ru", "rus", "rust"] {
        session.set_search_query(query);
    }
    assert!(!session.poll_search());
    assert!(session.search_deadline().is_some());

    tokio::time::sleep(Duration::from_millis(120)).await;
    assert!(session.poll_search());
    assert!(!session.poll_search());

    let event = next_event(&mut events).await;
    session.handle_event(event);
    assert_eq!(session.displayed_posts().len(), 1);
}

#[tokio::test]
async fn test_back_clears_search_before_exit() {
    let server = MockServer::start().await;
    let (mut session, _events) = Session::new(client_for(&server), SessionOptions::default());
    session.set_search_query("rust");

    assert_eq!(session.back(), BackOutcome::ClearedSearch);
    assert_eq!(session.nav().search_query(), "");
    assert_eq!(session.back(), BackOutcome::Exit);
}

// ============================================================================
// AI chat
// ============================================================================

async fn mount_ai(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/ai/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": {"is_loaded": true, "loading": false, "load_progress": 100.0}
        })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/ai/suggestions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"suggestions": ["What's new in tech?"]})),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_chat_round_trip_through_session() {
    let server = MockServer::start().await;
    mount_ai(&server).await;
    Mock::given(method("POST"))
        .and(path("/ai/chat"))
        .and(body_partial_json(json!({"message": "hello", "user_id": 12345})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"response": "Hi there"}))
                .set_delay(Duration::from_millis(50)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (mut session, mut events) = Session::new(client_for(&server), SessionOptions::default());
    session.select_section(Section::Ai);
    assert_eq!(session.nav().overlay_kind(), Some(OverlayKind::AiChat));

    assert!(session.spawn_chat_send("hello"));
    assert!(!session.spawn_chat_send("again"));

    while session.chat.as_ref().is_some_and(|c| c.is_sending()) {
        let event = next_event(&mut events).await;
        session.handle_event(event);
    }

    let chat = session.chat.as_ref().unwrap();
    let transcript: Vec<(Author, &str)> = chat
        .messages()
        .iter()
        .map(|m| (m.author, m.content.as_str()))
        .collect();
    assert_eq!(transcript.len(), 3);
    assert_eq!(transcript[1], (Author::User, "hello"));
    assert_eq!(transcript[2], (Author::Assistant, "Hi there"));
    // Suggestions are hidden once the conversation has started
    assert!(chat.visible_suggestions().is_empty());
}

#[tokio::test]
async fn test_failed_chat_appends_notice() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ai/chat"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let api = client_for(&server);
    let mut chat = ChatSession::new();
    assert!(chat.send(&api, "anyone?").await);

    let last = chat.messages().last().unwrap();
    assert_eq!(last.author, Author::Assistant);
    assert_eq!(last.content, ERROR_NOTICE);
    assert!(!chat.is_sending());
}

#[tokio::test]
async fn test_status_poller_stops_when_dropped() {
    let server = MockServer::start().await;
    mount_ai(&server).await;

    let poller = AiStatusPoller::spawn(client_for(&server), Duration::from_millis(40));
    let mut status = poller.subscribe();
    tokio::time::timeout(Duration::from_secs(5), status.wait_for(Option::is_some))
        .await
        .expect("no status published")
        .unwrap();
    assert!(poller.latest().is_some_and(|s| s.is_loaded));

    drop(poller);
    // Let an in-flight request settle before counting
    tokio::time::sleep(Duration::from_millis(50)).await;
    let polls = server.received_requests().await.unwrap().len();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(server.received_requests().await.unwrap().len(), polls);
}

#[tokio::test]
async fn test_leaving_chat_stops_polling() {
    let server = MockServer::start().await;
    mount_ai(&server).await;

    let options = SessionOptions {
        ai_status_interval: Duration::from_millis(40),
        ..SessionOptions::default()
    };
    let (mut session, _events) = Session::new(client_for(&server), options);
    session.open_overlay(telepulse::nav::Overlay::AiChat);
    assert!(session.ai_poller_active());

    tokio::time::sleep(Duration::from_millis(150)).await;
    session.sync_ai_status();
    assert!(session.chat.as_ref().is_some_and(|c| c.status().is_loaded));

    session.close_overlay();
    assert!(!session.ai_poller_active());
    assert_eq!(session.nav().section(), Section::Feed);
}

// ============================================================================
// Topics
// ============================================================================

#[tokio::test]
async fn test_topic_edits_saved_as_new_baseline() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/topics/get"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"topics": ["news"]})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/topics/save"))
        .and(body_partial_json(json!({"topics": ["news", "tech"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    let api = client_for(&server);
    let mut store = TopicStore::new();
    store.load(&api).await;
    assert!(store.is_selected("news"));

    store.toggle("tech");
    assert!(store.has_changes());
    store.save(&api).await.unwrap();
    assert!(!store.has_changes());
}

#[tokio::test]
async fn test_rejected_topic_save_keeps_edits() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/topics/save"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": false, "message": "Too many topics"})),
        )
        .mount(&server)
        .await;

    let (mut session, mut events) = Session::new(client_for(&server), SessionOptions::default());
    session.topics.select_all();
    assert!(session.spawn_topics_save());
    assert!(session.topics.is_saving());

    let event = next_event(&mut events).await;
    session.handle_event(event);
    assert_eq!(
        session.take_status().as_deref(),
        Some("Failed to save topics: Too many topics")
    );
    assert!(session.topics.has_changes());
    assert!(!session.topics.is_saving());
}

// ============================================================================
// Identity
// ============================================================================

#[tokio::test]
async fn test_like_carries_configured_identity() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/like"))
        .and(body_partial_json(json!({"user_id": 777, "post_url": "https://t.me/tech/5"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = Config {
        api_base_url: server.uri(),
        ..Config::default()
    };
    config
        .apply_env_from(|key| (key == ENV_USER_ID).then(|| "777".to_string()))
        .unwrap();
    let api = ApiClient::new(config.client_options()).unwrap();
    likes::like(&api, "https://t.me/tech/5").await.unwrap();
}

#[tokio::test]
async fn test_init_data_takes_precedence_over_user_id() {
    let mut config = Config::default();
    config
        .apply_env_from(|key| match key {
            k if k == ENV_USER_ID => Some("777".to_string()),
            k if k == ENV_INIT_DATA => Some("user=%7B%22id%22%3A4242%7D&hash=abc".to_string()),
            _ => None,
        })
        .unwrap();

    let identity = config.host_identity();
    assert!(matches!(identity, HostIdentity::InitData(_)));
    assert_eq!(identity.resolve(12345), 4242);
}
