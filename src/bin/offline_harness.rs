//! Walks the sync layer through an offline session against the in-memory
//! remote service: create while offline, inspect the queue, reconnect, and
//! watch the drain rekey the record.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tracing::info;

use billsync::domain::entities::NewClient;
use billsync::domain::value_objects::{ActorId, ConnectivityState, TenantId};
use billsync::infrastructure::MemoryRemoteStore;
use billsync::{AppConfig, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let config = AppConfig::in_memory();
    let remote = Arc::new(MemoryRemoteStore::new());
    let state = AppState::new(&config, remote, ConnectivityState::Offline).await;
    info!(status = ?state.store_status().await, "Store opened");

    let company = TenantId::parse("acme").map_err(anyhow::Error::msg)?;
    let actor = ActorId::parse("demo-seller").map_err(anyhow::Error::msg)?;
    let now = Utc::now();
    let draft = NewClient {
        company_id: company.clone(),
        name: "Globex Trading".to_string(),
        email: "billing@globex.example".to_string(),
        phone: "+248 2 555 0147".to_string(),
        address: "12 Harbor Road, Victoria".to_string(),
        tax_id: None,
        created_at: now,
        updated_at: now,
    };

    let local_id = state.clients.create(&draft, &actor).await?;
    info!(id = %local_id, "Created while offline, cached under a temporary id");
    info!(
        pending = state.monitor.status().pending_changes,
        "Mutations waiting for connectivity"
    );

    state.monitor.handle_online().await;
    let status = state.monitor.status();
    info!(
        pending = status.pending_changes,
        online = status.is_online,
        "Reconnected and drained"
    );

    for client in state.clients.list(&company).await? {
        info!(id = %client.id, name = %client.name, "Synced client");
    }

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "billsync=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
