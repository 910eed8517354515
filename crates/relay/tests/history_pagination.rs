mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chat_relay::models::{HistoryPage, InboundPayload};
use chat_relay::store::ListStore;
use common::*;
use serde_json::json;
use tower::ServiceExt;

async fn get_page(state: &chat_relay::config::AppState, uri: &str) -> HistoryPage {
    let response = chat_relay::app(state.clone())
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn post(state: &chat_relay::config::AppState, n: usize) {
    for i in 0..n {
        let payload = InboundPayload::from_value(json!({ "user": "A", "content": format!("m{}", i) }));
        state.service.process_new_message(&payload).unwrap();
    }
}

async fn wait_for_len(list: &chat_relay::store::MemoryListStore, n: usize) {
    for _ in 0..200 {
        if list.len(KEY) == n {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("durable list never reached {} entries", n);
}

#[tokio::test]
async fn test_first_page_converges_with_buffer() {
    let (state, _list) = test_state().await;
    post(&state, 23).await;

    let buffered = state.service.get_in_memory_history();
    let mut page = get_page(&state, "/history?page=1&limit=10").await;
    for _ in 0..200 {
        if page.messages == buffered {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        page = get_page(&state, "/history?page=1&limit=10").await;
    }
    assert_eq!(page.messages, buffered);
    assert_eq!(page.page, 1);
    assert_eq!(page.limit, 10);
}

#[tokio::test]
async fn test_exactly_ten_messages() {
    let (state, list) = test_state().await;
    post(&state, 10).await;
    wait_for_len(&list, 10).await;

    let page1 = get_page(&state, "/history?page=1&limit=10").await;
    let contents: Vec<_> = page1.messages.iter().map(|m| m.content.clone()).collect();
    let expected: Vec<_> = (0..10).map(|i| format!("m{}", i)).collect();
    assert_eq!(contents, expected);

    let page2 = get_page(&state, "/history?page=2&limit=10").await;
    assert!(page2.messages.is_empty());
}

#[tokio::test]
async fn test_bad_params_fall_back_and_clamp() {
    let (state, list) = test_state().await;
    post(&state, 60).await;
    wait_for_len(&list, 60).await;

    let page = get_page(&state, "/history?page=abc&limit=xyz").await;
    assert_eq!((page.page, page.limit), (1, 10));
    assert_eq!(page.messages.len(), 10);

    let page = get_page(&state, "/history?limit=500").await;
    assert_eq!((page.page, page.limit), (1, 50));
    assert_eq!(page.messages.len(), 50);
    assert_eq!(page.messages.last().unwrap().content, "m59");

    let page = get_page(&state, "/history").await;
    assert_eq!((page.page, page.limit), (1, 10));
}

#[tokio::test]
async fn test_store_outage_yields_empty_page() {
    let list = Arc::new(chat_relay::store::RedisListStore::new("redis://127.0.0.1:1").unwrap());
    let (state, _worker) = chat_relay::build_state(test_config(), list).await;

    let page = get_page(&state, "/history?page=1&limit=10").await;
    assert!(page.messages.is_empty());
}

/// Wait until the newest durable entry has `content`.
async fn wait_for_newest(list: &chat_relay::store::MemoryListStore, content: &str) {
    for _ in 0..500 {
        let newest = list.range(KEY, -1, -1).await.unwrap();
        if newest.first().is_some_and(|raw| raw.contains(content)) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("durable list never caught up to {}", content);
}

#[tokio::test]
async fn test_durable_history_is_capped() {
    let (state, list) = test_state().await;
    post(&state, 1005).await;
    wait_for_newest(&list, "\"m1004\"").await;
    assert_eq!(list.len(KEY), 1000);

    let page = get_page(&state, "/history?page=20&limit=50").await;
    assert_eq!(page.messages.first().unwrap().content, "m5");
}
