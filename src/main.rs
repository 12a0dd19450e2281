//! Resilient RPC - demo run against a live node
//!
//! Probes health and the current slot, reads the latest block, then looks up
//! the first account key found in it or, failing that, in its transactions.

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use resilient_rpc::models::{lamports_to_sol, Block, BlockOptions};
use resilient_rpc::{spawn_cleanup_task, Config, ResilientClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" for this crate, can be overridden with RUST_LOG
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "resilient_rpc=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!(
        rpc_url = %config.rpc_url,
        commitment = %config.commitment,
        cache_ttl_ms = config.cache_ttl.as_millis() as u64,
        retry_attempts = config.retry_attempts,
        "Configuration loaded"
    );

    let client = ResilientClient::connect(&config).context("failed to build client")?;
    let cleanup_handle = spawn_cleanup_task(client.cache(), config.cleanup_interval);

    let result = run(&client).await;

    cleanup_handle.abort();
    let stats = client.cache_stats();
    info!(
        hits = stats.hits,
        misses = stats.misses,
        hit_rate = stats.hit_rate(),
        "Cache statistics"
    );
    result
}

async fn run(client: &ResilientClient) -> anyhow::Result<()> {
    let health = client.get_health().await.context("health probe failed")?;
    info!(%health, "Node health");

    let slot = client.get_slot().await.context("failed to read current slot")?;
    info!(slot, "Current slot");

    let Some(block) = client
        .get_block(slot, BlockOptions::default())
        .await
        .with_context(|| format!("failed to read block {slot}"))?
    else {
        warn!(slot, "No block produced at current slot");
        return Ok(());
    };
    info!(
        slot,
        blockhash = %block.blockhash,
        transactions = block.transaction_count(),
        block_time = ?block.block_time_utc(),
        "Fetched block"
    );

    let Some(address) = find_account_key(client, &block).await? else {
        warn!(slot, "No account key found in block or its transactions");
        return Ok(());
    };

    match client.get_account_info(&address).await? {
        Some(account) => info!(
            %address,
            owner = %account.owner,
            executable = account.executable,
            data_len = account.encoded_data_len(),
            "Account info"
        ),
        None => warn!(%address, "Account not found"),
    }

    let lamports = client.get_balance(&address).await?;
    info!(%address, lamports, sol = lamports_to_sol(lamports), "Balance");

    // Served from the cache
    client.get_balance(&address).await?;

    Ok(())
}

/// First account key in `block`, or failing that, in the detailed form of
/// its transactions.
async fn find_account_key(client: &ResilientClient, block: &Block) -> anyhow::Result<Option<String>> {
    if let Some(key) = block.first_account_key() {
        return Ok(Some(key));
    }

    for signature in block.signatures() {
        let tx = client
            .get_transaction(&signature)
            .await
            .with_context(|| format!("failed to read transaction {signature}"))?;
        if let Some(key) = tx.and_then(|tx| tx.first_account_key()) {
            return Ok(Some(key));
        }
    }
    Ok(None)
}
