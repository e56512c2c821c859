//! Discovered opportunities and the saved-lead watchlist.

use log::{debug, warn};

use super::sync_mode::{SyncEntity, SyncMode, SyncOperation};
use super::log_intent;
use crate::generation::GroundingSource;
use crate::opportunities::Opportunity;
use crate::views::merge_opportunities;

pub struct OpportunitySynchronizer {
    mode: SyncMode,
    found: Vec<Opportunity>,
    sources: Vec<GroundingSource>,
    watchlist: Vec<Opportunity>,
}

impl OpportunitySynchronizer {
    pub fn new(mode: SyncMode) -> Self {
        Self {
            mode,
            found: Vec::new(),
            sources: Vec::new(),
            watchlist: Vec::new(),
        }
    }

    pub fn mode(&self) -> &SyncMode {
        &self.mode
    }

    /// Results of the latest search (or, after a remote load, every stored lead).
    pub fn found(&self) -> &[Opportunity] {
        &self.found
    }

    pub fn sources(&self) -> &[GroundingSource] {
        &self.sources
    }

    pub fn watchlist(&self) -> &[Opportunity] {
        &self.watchlist
    }

    pub fn is_watched(&self, id: &str) -> bool {
        self.watchlist.iter().any(|o| o.id == id)
    }

    /// Found and watched leads, deduplicated by id.
    pub fn all_opportunities(&self) -> Vec<Opportunity> {
        merge_opportunities(&self.found, &self.watchlist)
    }

    pub fn opportunity(&self, id: &str) -> Option<Opportunity> {
        self.found
            .iter()
            .chain(self.watchlist.iter())
            .rev()
            .find(|o| o.id == id)
            .cloned()
    }

    pub async fn load(&mut self) {
        if let Some(gateway) = self.mode.gateway() {
            let (found, watchlist) =
                futures::join!(gateway.list_opportunities(), gateway.list_watchlist());
            debug!(
                "Loaded {} opportunities, {} watched",
                found.len(),
                watchlist.len()
            );
            self.found = found;
            self.watchlist = watchlist;
        }
    }

    /// Replace the search results and persist them.
    pub async fn record_search(
        &mut self,
        opportunities: Vec<Opportunity>,
        sources: Vec<GroundingSource>,
    ) {
        if let Some(gateway) = self.mode.gateway() {
            if !opportunities.is_empty() && !gateway.save_opportunities(&opportunities).await {
                warn!("Saving {} opportunities failed", opportunities.len());
            }
        }
        self.found = opportunities;
        self.sources = sources;
    }

    /// Add or remove a lead from the watchlist. Returns whether it is now watched.
    pub async fn toggle_watchlist(&mut self, opportunity: Opportunity) -> bool {
        let watched = self.is_watched(&opportunity.id);
        if let Some(gateway) = self.mode.gateway() {
            let ok = if watched {
                gateway.remove_from_watchlist(&opportunity.id).await
            } else {
                gateway
                    .save_opportunities(std::slice::from_ref(&opportunity))
                    .await
                    && gateway.add_to_watchlist(&opportunity.id).await
            };
            if !ok {
                warn!("Watchlist update for {} failed; applying locally", opportunity.id);
            }
        }

        if watched {
            log_intent(&self.mode, SyncEntity::WatchlistItem, SyncOperation::Delete, &opportunity.id);
            self.watchlist.retain(|o| o.id != opportunity.id);
            false
        } else {
            log_intent(&self.mode, SyncEntity::WatchlistItem, SyncOperation::Create, &opportunity.id);
            self.watchlist.push(opportunity);
            true
        }
    }
}
