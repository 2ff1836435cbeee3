use std::sync::Arc;

use crate::application::ports::{LocalStore, RemoteStore, StoreStatus};
use crate::application::services::{
    AdminService, ClientService, CompanyService, DataService, InvoiceService, NetworkMonitor,
    QuotationService, ReceiptService, SyncQueue, UserService,
};
use crate::domain::schema::StoreSchema;
use crate::domain::value_objects::ConnectivityState;
use crate::infrastructure::SqliteLocalStore;
use crate::shared::config::AppConfig;
use crate::shared::error::Result;

/// Everything the host application holds onto, wired once at startup.
pub struct AppState {
    pub data: Arc<DataService>,
    pub monitor: Arc<NetworkMonitor>,
    pub users: UserService,
    pub admins: AdminService,
    pub companies: CompanyService,
    pub clients: ClientService,
    pub invoices: InvoiceService,
    pub receipts: ReceiptService,
    pub quotations: QuotationService,
    local: Arc<dyn LocalStore>,
}

impl AppState {
    /// Opens the local store and wires the sync layer around the given
    /// remote service. A broken local database does not fail startup; the
    /// store opens inert and `store_status` reports why.
    pub async fn new(
        config: &AppConfig,
        remote: Arc<dyn RemoteStore>,
        initial: ConnectivityState,
    ) -> Self {
        let schema = StoreSchema::invoicing();
        let local: Arc<dyn LocalStore> =
            Arc::new(SqliteLocalStore::open(config.database.clone(), schema.clone()).await);
        let queue = Arc::new(SyncQueue::new(local.clone(), remote.clone()));
        let monitor = Arc::new(NetworkMonitor::new(
            queue.clone(),
            initial,
            config.sync.drain_on_reconnect,
        ));
        // Entries can survive from the previous run; show them right away.
        monitor.refresh_pending().await;
        let data = Arc::new(DataService::new(
            local.clone(),
            remote,
            queue,
            monitor.clone(),
            schema,
        ));

        Self {
            users: UserService::new(data.clone()),
            admins: AdminService::new(data.clone()),
            companies: CompanyService::new(data.clone()),
            clients: ClientService::new(data.clone()),
            invoices: InvoiceService::new(data.clone()),
            receipts: ReceiptService::new(data.clone()),
            quotations: QuotationService::new(data.clone()),
            data,
            monitor,
            local,
        }
    }

    pub async fn store_status(&self) -> StoreStatus {
        self.local.status().await
    }

    /// Destructive recovery for a store that opened inert: deletes the
    /// database and recreates it empty. Unsynced data is lost, so this only
    /// ever runs on an explicit user action.
    pub async fn force_upgrade(&self) -> Result<()> {
        self.local.reset().await
    }

    /// Empties the cache and queue, keeping the database itself.
    pub async fn clear_local_data(&self) -> Result<()> {
        self.local.clear().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::NewClient;
    use crate::domain::value_objects::{ActorId, TenantId};
    use crate::infrastructure::MemoryRemoteStore;
    use chrono::Utc;

    fn draft() -> NewClient {
        NewClient {
            company_id: TenantId::parse("acme").expect("tenant"),
            name: "Globex".to_string(),
            email: "billing@globex.example".to_string(),
            phone: "+248 2 555 0147".to_string(),
            address: "12 Harbor Road".to_string(),
            tax_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn wired_state_syncs_offline_work_on_reconnect() {
        let config = AppConfig::in_memory();
        let remote = Arc::new(MemoryRemoteStore::new());
        let state = AppState::new(&config, remote.clone(), ConnectivityState::Offline).await;
        assert!(state.store_status().await.is_available());

        let actor = ActorId::parse("seller-1").expect("actor");
        let local_id = state.clients.create(&draft(), &actor).await.expect("create");
        assert_eq!(state.monitor.status().pending_changes, 1);

        state.monitor.handle_online().await;
        assert_eq!(state.monitor.status().pending_changes, 0);

        let clients = state
            .clients
            .list(&TenantId::parse("acme").expect("tenant"))
            .await
            .expect("list");
        assert_eq!(clients.len(), 1);
        assert_ne!(clients[0].id, local_id);

        state.clear_local_data().await.expect("clear");
        state.monitor.handle_offline();
        let cached = state
            .clients
            .list(&TenantId::parse("acme").expect("tenant"))
            .await
            .expect("list");
        assert!(cached.is_empty());
    }
}
