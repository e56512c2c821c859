//! Generated outreach documents (email sequences, proposals, one-pagers).

mod document_model;

pub use document_model::*;
