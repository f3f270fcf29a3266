use std::sync::Arc;

use anyhow::Context;
use poem::{Server, listener::TcpListener};
use sqlx::postgres::PgPoolOptions;
use tokio::main;

use message_dispatcher::{
    application::{
        handlers::message_dispatcher::MessageDispatcher,
        scheduler::Scheduler,
        usecases::{
            create_message::CreateMessageUseCase, get_cached_sent_at::GetCachedSentAtUseCase,
            list_sent_messages::ListSentMessagesUseCase,
        },
    },
    config::Config,
    infrastructure::{
        cache::redis::RedisSentMessageCache,
        delivery::webhook::{HttpWebhookTransport, RetryPolicy, WebhookClient},
        repositories::postgres::PostgresMessageRepository,
    },
    presentation::http::{build_app, endpoints::root::ApiState},
    telemetry,
};

#[main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();
    telemetry::init();
    config.validate()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await
        .context("failed to connect to postgres")?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("failed to run migrations")?;

    let repo = PostgresMessageRepository::new(pool);
    if config.database.seed_sample_data {
        let seeded = repo.seed_sample_messages().await?;
        if seeded > 0 {
            tracing::info!(count = seeded, "seeded sample messages");
        }
    }

    let cache = RedisSentMessageCache::connect(&config.redis.url()).await?;

    let transport = HttpWebhookTransport::new(
        config.webhook.url.clone(),
        config.webhook.auth_key.clone(),
        config.webhook.timeout,
    )?;
    let delivery = WebhookClient::new(
        Arc::new(transport),
        RetryPolicy {
            max_retries: config.webhook.max_retries,
            retry_delay: config.webhook.retry_delay,
        },
    );

    let dispatcher =
        MessageDispatcher::new(repo.clone(), Arc::new(delivery)).with_cache(cache.clone());
    let scheduler = Arc::new(Scheduler::new(
        Arc::new(dispatcher),
        config.scheduler.interval,
        config.scheduler.batch_size,
    ));

    if config.scheduler.auto_start {
        scheduler.start();
    }

    let state = Arc::new(ApiState {
        scheduler: scheduler.clone(),
        create_message_usecase: Arc::new(CreateMessageUseCase::new(repo.clone())),
        list_sent_messages_usecase: Arc::new(ListSentMessagesUseCase::new(repo)),
        get_cached_sent_at_usecase: Arc::new(GetCachedSentAtUseCase::new(cache)),
    });

    let address = format!("{}:{}", config.server.host, config.server.port);
    let app = build_app(state, format!("http://{address}"));

    tracing::info!(%address, "starting server");

    Server::new(TcpListener::bind(address))
        .run_with_graceful_shutdown(
            app,
            shutdown_signal(),
            Some(config.server.shutdown_timeout),
        )
        .await?;

    scheduler.stop().await;
    tracing::info!("shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
