use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};

use crate::{
    api::handler::AppState,
    cases::CaseRepository,
    config::Config,
    error::AppResult,
    notifications::{
        transports::{EmailTransport, MessageTransport},
        NotificationDispatcher, NotificationPolicy, ResendEmailClient, TwilioMessageClient,
    },
    settlement::{
        executor::PaymentExecutor, outstanding::OutstandingAggregator,
        validator::SettlementValidator, SettlementService,
    },
    wallet::WalletRepository,
};

pub async fn initialize_app_state(config: &Config) -> AppResult<AppState> {
    info!("Initializing application components ...");

    let sentinels = config.sentinels()?;
    info!(
        wallet_account_id = sentinels.wallet(),
        no_notify_account_id = ?sentinels.no_notify(),
        "✓ Sentinel accounts configured"
    );

    let pool = initialize_database(&config.database_url, config.database_max_connections).await?;

    let cases = Arc::new(CaseRepository::new(pool.clone()));
    let wallet = Arc::new(WalletRepository::new(pool));
    info!("✅ Case and wallet repositories initialized");

    let email = email_transport(config);
    let messages = message_transport(config);
    if config.admin_notification_email.is_none() {
        warn!("⚠️  ADMIN_NOTIFICATION_EMAIL not set - admin notifications disabled");
    }

    let dispatcher =
        NotificationDispatcher::new(email, messages, config.notification_timeout());
    let policy = NotificationPolicy::new(sentinels, config.admin_notification_email.clone());

    let executor = PaymentExecutor::new(wallet.clone(), cases.clone(), cases.clone(), sentinels);

    let settlement = SettlementService::new(
        cases.clone(),
        wallet,
        cases.clone(),
        OutstandingAggregator::new(cases),
        SettlementValidator::new(sentinels),
        executor,
        policy,
        dispatcher,
    );
    info!("✅ Settlement service initialized");

    Ok(AppState {
        settlement: Arc::new(settlement),
    })
}

fn email_transport(config: &Config) -> Option<Arc<dyn EmailTransport>> {
    match &config.resend_api_key {
        Some(key) => {
            info!("✅ Resend email transport registered");
            Some(Arc::new(ResendEmailClient::new(
                key.clone(),
                config.resend_from_email.clone(),
            )))
        }
        None => {
            warn!("⚠️  RESEND_API_KEY not set - email notifications disabled");
            None
        }
    }
}

fn message_transport(config: &Config) -> Option<Arc<dyn MessageTransport>> {
    match (
        &config.twilio_account_sid,
        &config.twilio_auth_token,
        &config.twilio_from_number,
        &config.twilio_content_sid,
    ) {
        (Some(sid), Some(token), Some(from), Some(content_sid)) => {
            info!("✅ Twilio message transport registered");
            Some(Arc::new(TwilioMessageClient::new(
                sid.clone(),
                token.clone(),
                from.clone(),
                content_sid.clone(),
            )))
        }
        _ => {
            warn!("⚠️  Twilio settings incomplete - customer messaging disabled");
            None
        }
    }
}

async fn initialize_database(database_url: &str, max_connections: u32) -> AppResult<PgPool> {
    info!("📊 Connecting to database...");

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(database_url)
        .await?;

    info!("✓ Database pool configured: {} max connections", max_connections);

    info!("🔄 Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;

    info!("✓ Database initialized");
    Ok(pool)
}
