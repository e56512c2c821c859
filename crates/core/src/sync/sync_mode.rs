//! Branch selection for entity synchronization.

use std::sync::Arc;

use log::info;
use serde::{Deserialize, Serialize};

use crate::store::RemoteStoreGateway;

/// Store tables backing each synchronized entity kind.
pub const SYNC_TABLES: [&str; 9] = [
    "crm_companies",
    "crm_contacts",
    "pipeline_stages",
    "pipeline_deals",
    "crm_activities",
    "email_campaigns",
    "outreach_assets",
    "opportunities",
    "watchlist_items",
];

/// Entity kinds handled by the synchronizers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncEntity {
    Company,
    Contact,
    Stage,
    Deal,
    Activity,
    Campaign,
    Document,
    Opportunity,
    WatchlistItem,
}

impl SyncEntity {
    pub fn table_name(&self) -> &'static str {
        match self {
            SyncEntity::Company => SYNC_TABLES[0],
            SyncEntity::Contact => SYNC_TABLES[1],
            SyncEntity::Stage => SYNC_TABLES[2],
            SyncEntity::Deal => SYNC_TABLES[3],
            SyncEntity::Activity => SYNC_TABLES[4],
            SyncEntity::Campaign => SYNC_TABLES[5],
            SyncEntity::Document => SYNC_TABLES[6],
            SyncEntity::Opportunity => SYNC_TABLES[7],
            SyncEntity::WatchlistItem => SYNC_TABLES[8],
        }
    }
}

/// Intent kinds, used in log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOperation {
    Create,
    Update,
    Delete,
    Move,
}

/// Which branch every intent takes for the lifetime of a synchronizer.
#[derive(Clone)]
pub enum SyncMode {
    Remote(Arc<dyn RemoteStoreGateway>),
    LocalOnly,
}

impl SyncMode {
    /// Decide the branch once, from whether the gateway is configured.
    pub fn select(gateway: Option<Arc<dyn RemoteStoreGateway>>) -> Self {
        match gateway {
            Some(gateway) if gateway.is_configured() => {
                info!("Remote store configured; entities are remote-backed");
                SyncMode::Remote(gateway)
            }
            _ => {
                info!("Remote store not configured; entities stay in memory for this session");
                SyncMode::LocalOnly
            }
        }
    }

    pub fn gateway(&self) -> Option<&Arc<dyn RemoteStoreGateway>> {
        match self {
            SyncMode::Remote(gateway) => Some(gateway),
            SyncMode::LocalOnly => None,
        }
    }

    /// Gateway for an entity that may be written remotely. Entities minted
    /// locally (after a failed remote create) never reach the store.
    pub fn gateway_for(&self, id: &str) -> Option<&Arc<dyn RemoteStoreGateway>> {
        self.gateway().filter(|_| !crate::ids::is_local_id(id))
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, SyncMode::Remote(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            SyncMode::Remote(_) => "remote",
            SyncMode::LocalOnly => "local",
        }
    }
}

impl std::fmt::Debug for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
