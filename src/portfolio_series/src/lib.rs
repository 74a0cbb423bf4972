//! Portfolio performance series for a brokerage client.
//!
//! Data flows one way:
//!
//! 1. [`providers::BrokerageApi`] fetches positions, bars, and the cash ledger.
//! 2. [`series::timestamp`] and [`series::ledger`] normalize them.
//! 3. [`series::align`] puts everything on one reference axis.
//! 4. [`series::compose`] produces a [`series::compose::SeriesDescriptor`].
//!
//! [`loader::PerformanceChart`] runs that pipeline as a cancellable load cycle.

pub mod auth;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod errors;
pub mod loader;
pub mod models;
pub mod onboarding;
pub mod providers;
pub mod regions;
pub mod series;

pub use errors::{Error, Result};
