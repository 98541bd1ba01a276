//! End-to-end checkout flow over the HTTP API
//!
//! 覆盖访客从加购到支付成功的完整路径，以及
//! 地址校验阻塞与空车拦截两条失败路径。

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use tower::ServiceExt;

use storefront_server::api;
use storefront_server::core::{Config, ServerState};
use storefront_server::db::DbService;
use storefront_server::notify::NoopNotifier;
use storefront_server::payments::{PaymentError, PaymentGateway, PaymentHandle, to_minor_units};

/// 桩支付网关
struct StubGateway {
    calls: AtomicUsize,
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn create_intent(
        &self,
        amount: f64,
        currency: &str,
        order_id: &str,
        _email: Option<&str>,
    ) -> Result<PaymentHandle, PaymentError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(PaymentHandle {
            intent_id: format!("pi_test_{n}_{order_id}"),
            client_secret: "cs_test".to_string(),
            amount_minor: to_minor_units(amount),
            currency: currency.to_string(),
        })
    }
}

async fn make_app() -> (Router, ServerState) {
    let db = DbService::new_in_memory().await.unwrap();
    let state = ServerState::with_services(
        Config::with_overrides("/tmp/storefront-test", 0),
        db.db,
        Arc::new(StubGateway { calls: AtomicUsize::new(0) }),
        Arc::new(NoopNotifier),
    );
    let app = api::build_app(&state).with_state(state.clone());
    (app, state)
}

/// 带访客身份头的 JSON 请求
fn guest_request(method: &str, uri: &str, body: Option<serde_json::Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-guest-session", "g1")
        .header(header::CONTENT_TYPE, "application/json");
    match body {
        Some(json) => builder.body(Body::from(json.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };
    (status, json)
}

/// 造一个分类 + 菜单项，返回菜单项 id
async fn seed_menu(app: &Router) -> String {
    let (status, category) = send(
        app,
        guest_request(
            "POST",
            "/api/categories",
            Some(serde_json::json!({ "name": "Pizzas" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let category_id = category["id"].as_str().unwrap().to_string();

    let (status, item) = send(
        app,
        guest_request(
            "POST",
            "/api/menu-items",
            Some(serde_json::json!({
                "name": "Margherita Pizza",
                "category": category_id,
                "price": 450.0
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    item["id"].as_str().unwrap().to_string()
}

fn manual_address() -> serde_json::Value {
    serde_json::json!({
        "mode": "manual",
        "form": {
            "full_name": "Ana García",
            "line1": "Calle Mayor 1",
            "city": "Madrid",
            "region": "Madrid",
            "postal_code": "28013",
            "country": "ES",
            "phone": "+34 600 000 000"
        }
    })
}

#[tokio::test]
async fn test_guest_checkout_happy_path() {
    let (app, _state) = make_app().await;
    let item_id = seed_menu(&app).await;

    // 加购 2 份
    let (status, cart) = send(
        &app,
        guest_request(
            "POST",
            "/api/cart/lines",
            Some(serde_json::json!({
                "product_ref": { "kind": "menu_item", "id": item_id },
                "quantity": 2
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    // 默认设置: 阈值 500, 配送费 50, 税率 8%
    assert_eq!(cart["totals"]["subtotal"], 900.0);
    assert_eq!(cart["totals"]["delivery_fee"], 0.0);
    assert_eq!(cart["totals"]["tax"], 72.0);
    assert_eq!(cart["totals"]["grand_total"], 972.0);

    // 打开会话
    let (status, session) = send(&app, guest_request("POST", "/api/checkout/session", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["phase"], "IDLE");

    // 选择手工地址
    let (status, _) = send(
        &app,
        guest_request("POST", "/api/checkout/address", Some(manual_address())),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // 下单
    let (status, placed) = send(
        &app,
        guest_request(
            "POST",
            "/api/checkout/place",
            Some(serde_json::json!({ "contact_email": "ana@example.com" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(placed["order"]["payment_state"], "UNPAID");
    assert_eq!(placed["order"]["totals"]["grand_total"], 972.0);
    assert_eq!(placed["payment"]["amount_minor"], 97200);
    let order_id = placed["order"]["id"].as_str().unwrap().to_string();

    // 支付表单已展示
    let (status, session) = send(&app, guest_request("GET", "/api/checkout/session", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["phase"], "AWAITING_PAYMENT");

    // 处理器客户端回调：成功
    let (status, session) = send(
        &app,
        guest_request(
            "POST",
            "/api/checkout/payment/confirm",
            Some(serde_json::json!({ "success": true })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["phase"], "SUCCEEDED");
    // 成功态下空车不再是 "放弃结账" 信号
    assert_eq!(session["cart_empty_means_abandoned"], false);

    // 购物车已清空
    let (status, cart) = send(&app, guest_request("GET", "/api/cart", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["lines"].as_array().unwrap().len(), 0);

    // 订单历史：一单，已支付
    let (status, orders) = send(&app, guest_request("GET", "/api/orders", None)).await;
    assert_eq!(status, StatusCode::OK);
    let orders = orders.as_array().unwrap().clone();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["id"], serde_json::json!(order_id));
    assert_eq!(orders[0]["payment_state"], "PAID");
}

#[tokio::test]
async fn test_manual_address_missing_phone_blocks_placement() {
    let (app, _state) = make_app().await;
    let item_id = seed_menu(&app).await;

    let (_, _) = send(
        &app,
        guest_request(
            "POST",
            "/api/cart/lines",
            Some(serde_json::json!({
                "product_ref": { "kind": "menu_item", "id": item_id },
                "quantity": 1
            })),
        ),
    )
    .await;

    let mut address = manual_address();
    address["form"].as_object_mut().unwrap().remove("phone");

    let (status, body) = send(
        &app,
        guest_request("POST", "/api/checkout/address", Some(address)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    // 字段级缺失列表
    assert_eq!(body["details"], serde_json::json!(["phone"]));
}

#[tokio::test]
async fn test_empty_cart_blocks_placement() {
    let (app, _state) = make_app().await;
    seed_menu(&app).await;

    let (status, _) = send(
        &app,
        guest_request("POST", "/api/checkout/address", Some(manual_address())),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        guest_request(
            "POST",
            "/api/checkout/place",
            Some(serde_json::json!({ "contact_email": "ana@example.com" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_identity_headers_rejected() {
    let (app, _state) = make_app().await;

    let request = Request::builder()
        .method("GET")
        .uri("/api/cart")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
