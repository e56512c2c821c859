//! Hosted store access for QS Leads.
//!
//! [`SupabaseGateway`] implements the core gateway contract over the store's
//! PostgREST interface. Every failure is logged and degraded; nothing here
//! returns an error to the synchronizers.

mod client;
mod config;
mod error;
mod gateway;
mod rows;

pub use client::{Order, PostgrestClient, Query};
pub use config::{RemoteStoreConfig, ANON_KEY_ENV, URL_ENV};
pub use error::{RemoteStoreError, Result};
pub use gateway::SupabaseGateway;
