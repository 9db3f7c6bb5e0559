use std::sync::Arc;

use donorlink_common::config::AppConfig;
use donorlink_common::db;
use donorlink_common::redis_pool::create_redis_pool;
use donorlink_engine::dispatcher::NotificationDispatcher;
use donorlink_engine::guard::RedisDispatchGuard;
use donorlink_engine::pruner::TokenPruner;
use donorlink_engine::store::{NotificationStore, PgNotificationStore};
use donorlink_trigger::gateway::build_gateway;
use donorlink_trigger::poller::NotificationPoller;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "donorlink_trigger=info,donorlink_engine=info,donorlink_notifier=info".into()
            }),
        )
        .json()
        .init();

    tracing::info!("DonorLink notification trigger starting...");

    let config = AppConfig::from_env()?;

    let pool = db::create_pool(&config.database_url, config.db_max_connections).await?;
    db::run_migrations(&pool).await?;

    let gateway = build_gateway(&config)?;

    let store: Arc<dyn NotificationStore> = Arc::new(PgNotificationStore::new(pool.clone()));
    let (pruner, prune_worker) = TokenPruner::new(store.clone());
    let prune_task = tokio::spawn(prune_worker.run());

    let mut dispatcher = NotificationDispatcher::new(store, gateway, pruner);
    if config.dedup_enabled() {
        let redis = create_redis_pool(&config.redis_url).await?;
        tracing::info!(
            ttl_seconds = config.dispatch_dedup_ttl_seconds,
            "Dispatch dedup guard enabled"
        );
        dispatcher = dispatcher.with_guard(Arc::new(RedisDispatchGuard::new(
            redis,
            config.dispatch_dedup_ttl_seconds,
        )));
    }

    let poller = NotificationPoller::new(
        pool,
        dispatcher,
        config.trigger_poll_interval_ms,
        config.trigger_batch_size,
        config.trigger_claim_lease_secs,
    );

    // Run with graceful shutdown on Ctrl+C
    let result = tokio::select! {
        result = poller.run() => {
            if let Err(e) = &result {
                tracing::error!(error = %e, "Notification poller exited with error");
            }
            result
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received shutdown signal, stopping gracefully...");
            Ok(())
        }
    };

    // Dropping the poller releases the last pruner handle so the worker can
    // drain what is still queued.
    drop(poller);
    match prune_task.await {
        Ok(stats) => tracing::info!(
            removed = stats.removed,
            failed = stats.failed,
            "Token pruner drained"
        ),
        Err(e) => tracing::error!(error = %e, "Token pruner task failed"),
    }

    tracing::info!("DonorLink notification trigger stopped.");
    result
}
