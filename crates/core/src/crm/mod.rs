//! CRM domain: companies, contacts, pipeline and activity log.

mod crm_model;

pub use crm_model::*;
