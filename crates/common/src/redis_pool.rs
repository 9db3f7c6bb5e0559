use redis::Client;
use redis::aio::ConnectionManager;

/// Open a Redis connection manager and verify it with a `PING`.
///
/// Only the dispatch dedup guard talks to Redis, so callers skip this
/// entirely when dedup is disabled.
pub async fn create_redis_pool(redis_url: &str) -> anyhow::Result<ConnectionManager> {
    let client = Client::open(redis_url)?;
    let mut manager = ConnectionManager::new(client).await?;

    let pong: String = redis::cmd("PING").query_async(&mut manager).await?;
    tracing::info!(reply = %pong, "Connected to Redis");
    Ok(manager)
}
