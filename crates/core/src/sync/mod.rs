//! Entity synchronization: keeps the in-memory collections consistent with an
//! optional remote store.

mod campaign_synchronizer;
mod crm_synchronizer;
mod document_synchronizer;
mod opportunity_synchronizer;
mod sync_mode;

pub use campaign_synchronizer::*;
pub use crm_synchronizer::*;
pub use document_synchronizer::*;
pub use opportunity_synchronizer::*;
pub use sync_mode::*;

use log::{debug, warn};

use crate::ids::IdentityGenerator;

/// Local id and timestamp for a new record. In remote mode this means the
/// store returned nothing, and the record is kept optimistically.
pub(crate) fn local_identity(
    mode: &SyncMode,
    ids: &IdentityGenerator,
    entity: SyncEntity,
) -> (String, String) {
    if mode.is_remote() {
        warn!(
            "Remote create in {} returned no row; keeping a local record",
            entity.table_name()
        );
    }
    ids.mint()
}

pub(crate) fn log_intent(mode: &SyncMode, entity: SyncEntity, operation: SyncOperation, id: &str) {
    debug!("[{:?}] {:?} {:?} {}", mode, operation, entity, id);
}

#[cfg(test)]
mod tests;
