//! Core of the QS Leads backend: domain models, identity generation, the
//! remote store contract, entity synchronizers and derived views.

pub mod campaigns;
pub mod crm;
pub mod documents;
pub mod errors;
pub mod generation;
pub mod ids;
pub mod opportunities;
pub mod store;
pub mod sync;
pub mod utils;
pub mod views;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

pub use errors::{Error, Result};
