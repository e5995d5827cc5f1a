//! 通知派发集成测试
//!
//! 在 127.0.0.1 上启动一个模拟编排器，按需让前 N 次请求失败，
//! 验证重试、放弃、禁用时跳过，以及后台 worker 回写派发结果。

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::post;
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{Value, json};

use common::{TestEnv, customer, order_request};
use market_server::ServerState;
use market_server::lifecycle::DispatchJob;
use market_server::notify::{USER_AGENT, WebhookConfig, WebhookDispatcher, WebhookPayload};
use shared::order::{LifecycleEventType, Order};

/// 模拟 n8n 编排器
#[derive(Default)]
struct MockHook {
    hits: AtomicUsize,
    fail_first: usize,
    bodies: Mutex<Vec<Value>>,
    user_agents: Mutex<Vec<String>>,
}

async fn receive(
    State(mock): State<Arc<MockHook>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let hit = mock.hits.fetch_add(1, Ordering::SeqCst) + 1;
    if let Some(agent) = headers.get(header::USER_AGENT).and_then(|v| v.to_str().ok()) {
        mock.user_agents.lock().push(agent.to_string());
    }
    mock.bodies.lock().push(body);
    if hit <= mock.fail_first {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": "boom" })))
    } else {
        (StatusCode::OK, Json(json!({ "accepted": true })))
    }
}

/// 启动模拟编排器，返回 webhook 地址
async fn spawn_hook(fail_first: usize) -> (Arc<MockHook>, String) {
    let mock = Arc::new(MockHook {
        fail_first,
        ..Default::default()
    });
    let app = Router::new()
        .route("/webhook", post(receive))
        .with_state(mock.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (mock, format!("http://{addr}/webhook"))
}

fn webhook_config(url: Option<String>) -> WebhookConfig {
    WebhookConfig {
        enabled: url.is_some(),
        url,
        timeout: Duration::from_secs(5),
        retry_attempts: 3,
        retry_delay: Duration::from_millis(10),
    }
}

fn seeded_env() -> TestEnv {
    let env = TestEnv::new();
    env.seed_product("p-1", 60.0);
    env.seed_merchant("m-1");
    env.seed_stock("m-1", "p-1", 50.0, 10);
    env
}

/// 下单并构造 order_created 派发任务
fn created_job(env: &TestEnv) -> DispatchJob {
    let order: Order = env
        .orders()
        .create_order(&customer("c-1"), order_request("c-1", &[("p-1", 2)]))
        .unwrap();
    let event = order.lifecycle[0].clone();
    DispatchJob {
        order,
        event,
        item_id: None,
        assignment: None,
    }
}

#[tokio::test]
async fn test_retry_succeeds_on_third_attempt() {
    let (mock, url) = spawn_hook(2).await;
    let env = seeded_env();
    let dispatcher = WebhookDispatcher::new(webhook_config(Some(url))).unwrap();

    let payload = WebhookPayload::from_job(&created_job(&env));
    let outcome = dispatcher.dispatch(&payload).await;

    assert!(outcome.sent);
    assert_eq!(outcome.attempts, 3);
    assert!(outcome.error.is_none());
    assert_eq!(outcome.response, Some(json!({ "accepted": true })));
    assert_eq!(mock.hits.load(Ordering::SeqCst), 3);

    let bodies = mock.bodies.lock();
    assert_eq!(bodies[0]["eventType"], "order_created");
    assert_eq!(bodies[0]["orderData"]["customer"]["name"], "Customer c-1");
}

#[tokio::test]
async fn test_exhausted_retries_report_failure() {
    let (mock, url) = spawn_hook(usize::MAX).await;
    let env = seeded_env();
    let dispatcher = WebhookDispatcher::new(webhook_config(Some(url))).unwrap();

    let outcome = dispatcher
        .dispatch(&WebhookPayload::from_job(&created_job(&env)))
        .await;

    assert!(!outcome.sent);
    assert_eq!(outcome.attempts, 3);
    assert!(outcome.error.unwrap().contains("500"));
    assert_eq!(mock.hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_disabled_webhook_sends_nothing() {
    let (mock, url) = spawn_hook(0).await;
    let env = seeded_env();
    let mut config = webhook_config(Some(url));
    config.enabled = false;
    let dispatcher = WebhookDispatcher::new(config).unwrap();

    let outcome = dispatcher
        .dispatch(&WebhookPayload::from_job(&created_job(&env)))
        .await;

    assert!(!outcome.sent);
    assert_eq!(outcome.attempts, 0);
    assert_eq!(mock.hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_requests_carry_user_agent() {
    let (mock, url) = spawn_hook(0).await;
    let env = seeded_env();
    let dispatcher = WebhookDispatcher::new(webhook_config(Some(url))).unwrap();

    let outcome = dispatcher
        .dispatch(&WebhookPayload::from_job(&created_job(&env)))
        .await;
    assert!(outcome.sent);
    assert_eq!(mock.user_agents.lock().as_slice(), [USER_AGENT.to_string()]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_worker_attaches_outcome_and_fans_out() {
    let (mock, url) = spawn_hook(0).await;
    let env = TestEnv::with_config(|config| {
        config.webhook = webhook_config(Some(url));
    });
    env.seed_product("p-1", 60.0);
    env.seed_merchant("m-1");
    env.seed_merchant("m-2");
    env.seed_stock("m-1", "p-1", 50.0, 10);
    env.seed_stock("m-2", "p-1", 52.0, 4);

    let tasks = env.state.start_background_tasks().unwrap();
    assert!(env.state.start_background_tasks().is_err());

    let orders = env.orders();
    let order = tokio::task::spawn_blocking(move || {
        orders.create_order(&customer("c-1"), order_request("c-1", &[("p-1", 2)]))
    })
    .await
    .unwrap()
    .unwrap();

    // 等待 worker 回写派发结果
    let mut stored = None;
    for _ in 0..100 {
        let current = env.orders().get_order(&order.order_id).unwrap();
        if current.lifecycle[0].notification_sent.n8n.is_some() {
            stored = Some(current);
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    let stored = stored.expect("notification outcome should be attached");
    let outcome = stored.lifecycle[0].notification_sent.n8n.clone().unwrap();
    assert!(outcome.sent);
    assert_eq!(outcome.attempts, 1);
    assert_eq!(stored.lifecycle[0].event_type, LifecycleEventType::OrderCreated);

    // 每个候选商户一条带 smartData 的通知，外加一条通用通知
    let bodies = mock.bodies.lock().clone();
    let candidates: Vec<_> = bodies
        .iter()
        .filter(|b| b.get("smartData").is_some())
        .collect();
    assert_eq!(candidates.len(), 2);
    for body in &candidates {
        assert_eq!(body["itemId"], order.items[0].item_id.as_str());
        assert!(body["smartData"]["distance"].as_f64().unwrap() < 15.0);
        assert!(body["merchantData"]["merchantId"].is_string());
    }
    assert_eq!(bodies.len(), 3);

    tasks.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_events_without_outcome_are_redelivered_on_start() {
    let (mock, url) = spawn_hook(0).await;
    let env = TestEnv::with_config(|config| {
        config.webhook = webhook_config(Some(url));
    });
    env.seed_product("p-1", 60.0);
    env.seed_merchant("m-1");
    env.seed_stock("m-1", "p-1", 50.0, 10);

    // 首个进程在 worker 启动前退出，发件箱中的任务丢失
    let orders = env.orders();
    let order = tokio::task::spawn_blocking(move || {
        orders.create_order(&customer("c-1"), order_request("c-1", &[("p-1", 1)]))
    })
    .await
    .unwrap()
    .unwrap();
    assert!(!env.orders().get_order(&order.order_id).unwrap().lifecycle[0].is_notified());

    // 同一数据库上重新启动
    let restarted = ServerState::with_storage(env.state.config.clone(), env.storage().clone());
    let tasks = restarted.start_background_tasks().unwrap();

    let mut attached = None;
    for _ in 0..100 {
        let current = env.orders().get_order(&order.order_id).unwrap();
        if let Some(outcome) = current.lifecycle[0].notification_sent.n8n.clone() {
            attached = Some(outcome);
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    let outcome = attached.expect("outcome should be attached after restart");
    assert!(outcome.sent);

    let generic: Vec<Value> = mock
        .bodies
        .lock()
        .iter()
        .filter(|b| b.get("smartData").is_none())
        .cloned()
        .collect();
    assert!(!generic.is_empty());
    assert!(generic.iter().all(|b| b["orderId"] == order.order_id.as_str()));

    tasks.shutdown().await;
}
