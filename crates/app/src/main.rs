use std::sync::Arc;

use engine::{
    Catalog, QrGenerator, Shop,
    store::{DocumentStore, GistStore, MemoryStore},
};
use server::ServerState;
use settings::{Settings, StoreKind};
use telegram_bot::{ShopBot, TelegramMessenger};
use teloxide::prelude::*;

mod settings;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let settings = Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "vietqr_shop={level},telegram_bot={level},server={level},engine={level}",
            level = settings.log_level
        ))
        .init();

    let store = document_store(&settings)?;

    let qr = QrGenerator::new(&settings.bank_id, &settings.bank_account)
        .account_name(settings.bank_account_name.as_deref());
    let mut builder = Shop::builder().store(store).qr(qr);
    if !settings.prices.is_empty() {
        builder = builder.catalog(Catalog::from_entries(settings.prices.clone()));
    }
    let shop = builder.build()?;

    let bot = Bot::new(&settings.bot_token);
    let me = bot.get_me().await?;
    let bot_username = me.username.clone().unwrap_or_default();
    tracing::info!("Running as @{bot_username}");

    let webhook_url = settings.webhook_url();
    match (&webhook_url, settings.register_webhook) {
        (Some(url), true) => {
            let url = reqwest::Url::parse(url)?;
            let secret = settings.webhook_secret.as_deref();
            if let Err(err) = telegram_bot::register_webhook(&bot, url, secret).await {
                tracing::error!("failed to register webhook: {err}");
            }
        }
        (None, true) => {
            tracing::warn!("CLOUD_RUN_SERVICE_URL not set, webhook not registered")
        }
        (_, false) => {}
    }

    let shop_bot = ShopBot::builder()
        .shop(Arc::new(shop))
        .messenger(Arc::new(TelegramMessenger::new(bot)))
        .admin_chat(settings.admin_chat_id)
        .bot_username(&bot_username)
        .free_packages(settings.free_packages.clone())
        .build()?;

    let addr = format!("{}:{}", settings.bind, settings.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let state = ServerState {
        bot: Arc::new(shop_bot),
        webhook_url,
        webhook_secret: settings.webhook_secret.clone(),
    };
    server::run_with_listener(state, listener).await?;

    Ok(())
}

fn document_store(settings: &Settings) -> Result<Arc<dyn DocumentStore>, BoxError> {
    match settings.store {
        StoreKind::Memory => {
            tracing::warn!("Using the in-memory store, data is lost on restart");
            Ok(Arc::new(MemoryStore::default()))
        }
        StoreKind::Gist => {
            let (Some(gist_id), Some(token)) = (&settings.gist_id, &settings.gist_token) else {
                return Err("GIST_ID and GIST_TOKEN are required with the gist store".into());
            };
            tracing::info!("Using gist {gist_id}");
            Ok(Arc::new(GistStore::new(gist_id, token)?))
        }
    }
}
