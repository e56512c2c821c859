//! Email campaign domain models.

mod campaign_model;

pub use campaign_model::*;
