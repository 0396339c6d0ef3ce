use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use engine::{AccountType, Customer, QrGenerator, Shop, store::MemoryStore};
use http_body_util::BodyExt;
use reqwest::Url;
use server::{ServerState, router};
use telegram_bot::{Delivery, Messenger, SECRET_TOKEN_HEADER, ShopBot};
use teloxide::types::{ChatId, InlineKeyboardMarkup, MessageId};
use tokio::sync::Mutex;
use tower::ServiceExt;

#[derive(Default)]
struct CountingMessenger {
    texts: Mutex<Vec<(i64, String)>>,
}

#[async_trait]
impl Messenger for CountingMessenger {
    async fn send_text(
        &self,
        chat: ChatId,
        text: String,
        _keyboard: Option<InlineKeyboardMarkup>,
    ) -> Delivery {
        self.texts.lock().await.push((chat.0, text));
        Delivery::Delivered
    }

    async fn edit_text(
        &self,
        chat: ChatId,
        _message: MessageId,
        text: String,
        _keyboard: Option<InlineKeyboardMarkup>,
    ) -> Delivery {
        self.texts.lock().await.push((chat.0, text));
        Delivery::Delivered
    }

    async fn send_photo(&self, _chat: ChatId, _url: Url, _caption: String) -> Delivery {
        Delivery::Delivered
    }

    async fn answer_callback(&self, _callback_id: &str) -> Delivery {
        Delivery::Delivered
    }
}

struct TestApp {
    router: Router,
    shop: Arc<Shop>,
    messenger: Arc<CountingMessenger>,
}

fn app() -> TestApp {
    app_with_secret(None)
}

fn app_with_secret(secret: Option<&str>) -> TestApp {
    let shop = Arc::new(
        Shop::builder()
            .store(Arc::new(MemoryStore::default()))
            .qr(QrGenerator::new("970436", "0123456789"))
            .build()
            .unwrap(),
    );
    let messenger = Arc::new(CountingMessenger::default());
    let bot = ShopBot::builder()
        .shop(shop.clone())
        .messenger(messenger.clone())
        .admin_chat(999)
        .bot_username("vietqr_shop_bot")
        .build()
        .unwrap();

    let router = router(ServerState {
        bot: Arc::new(bot),
        webhook_url: Some("https://shop.example.run.app/webhook".to_string()),
        webhook_secret: secret.map(str::to_string),
    });
    TestApp {
        router,
        shop,
        messenger,
    }
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(res: axum::response::Response) -> serde_json::Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_webhook() {
    let app = app();
    let res = app
        .router
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["status"], "running");
    assert_eq!(json["webhook_path"], "/webhook");
    assert_eq!(json["webhook_url"], "https://shop.example.run.app/webhook");
}

#[tokio::test]
async fn webhook_acknowledges_garbage() {
    let app = app();
    let res = app
        .router
        .oneshot(post_json("/webhook", "{not json"))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"OK");
}

#[tokio::test]
async fn webhook_start_sends_menu() {
    let app = app();
    let update = r#"{
        "update_id": 1,
        "message": {
            "message_id": 3,
            "date": 1700000000,
            "chat": {"id": 42, "type": "private", "first_name": "An"},
            "from": {"id": 42, "is_bot": false, "first_name": "An"},
            "text": "/start"
        }
    }"#;
    let res = app
        .router
        .oneshot(post_json("/webhook", update))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let texts = app.messenger.texts.lock().await;
    assert_eq!(texts.len(), 1);
    assert_eq!(texts[0].0, 42);
    assert_eq!(app.shop.user_count().await.unwrap(), 1);
}

const START_UPDATE: &str = r#"{
    "update_id": 2,
    "message": {
        "message_id": 4,
        "date": 1700000000,
        "chat": {"id": 43, "type": "private", "first_name": "Binh"},
        "from": {"id": 43, "is_bot": false, "first_name": "Binh"},
        "text": "/start"
    }
}"#;

#[tokio::test]
async fn webhook_refuses_calls_without_the_secret() {
    let app = app_with_secret(Some("s3cret-token"));

    let missing = app
        .router
        .clone()
        .oneshot(post_json("/webhook", START_UPDATE))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let mut wrong = post_json("/webhook", START_UPDATE);
    wrong
        .headers_mut()
        .insert(SECRET_TOKEN_HEADER, "guess".parse().unwrap());
    let wrong = app.router.clone().oneshot(wrong).await.unwrap();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    assert!(app.messenger.texts.lock().await.is_empty());
    assert_eq!(app.shop.user_count().await.unwrap(), 0);
}

#[tokio::test]
async fn webhook_accepts_the_registered_secret() {
    let app = app_with_secret(Some("s3cret-token"));
    let mut req = post_json("/webhook", START_UPDATE);
    req.headers_mut()
        .insert(SECRET_TOKEN_HEADER, "s3cret-token".parse().unwrap());

    let res = app.router.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let texts = app.messenger.texts.lock().await;
    assert_eq!(texts.len(), 1);
    assert_eq!(texts[0].0, 43);
}

#[tokio::test]
async fn payment_for_unknown_code_is_404() {
    let app = app();
    let res = app
        .router
        .oneshot(post_json(
            "/payment",
            r#"{"code": "GO-own-ghost", "amount": 50000}"#,
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let json = body_json(res).await;
    assert_eq!(json["error"], "order_not_found");
}

#[tokio::test]
async fn payment_without_amount_is_422() {
    let app = app();
    let res = app
        .router
        .oneshot(post_json("/payment", r#"{"code": "GO-own-ghost"}"#))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(res).await["error"], "missing_amount");
}

#[tokio::test]
async fn malformed_payment_is_400() {
    let app = app();
    let res = app
        .router
        .oneshot(post_json("/payment", r#"{"amount": 50000}"#))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(res).await["error"], "bad_request");
}

#[tokio::test]
async fn overpayment_is_fulfilled_and_reported() {
    let app = app();
    let customer = Customer {
        user_id: 7,
        chat_id: 7,
        username: Some("binh".to_string()),
    };
    app.shop
        .start_checkout(&customer, "PLUS", AccountType::Own)
        .await
        .unwrap();

    let res = app
        .router
        .oneshot(post_json(
            "/payment",
            r#"{"code": "PLUS-own-binh", "amount": 150000}"#,
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["match"], "over");
    assert_eq!(json["fulfilled"], true);
    assert_eq!(json["expected"], 100_000);
    assert_eq!(json["overage"], 50_000);
    assert_eq!(json["credential_issued"], false);
    assert_eq!(json["notifications"]["customer"], "delivered");
    assert!(app.shop.pending_order("PLUS-own-binh").await.unwrap().is_none());
}
