//! Construction opportunities discovered by the generation service.

mod opportunity_model;

pub use opportunity_model::*;
