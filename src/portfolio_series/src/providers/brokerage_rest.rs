//! REST client for the brokerage backend.
//!
//! All endpoints live under `/api` and are bearer-authenticated. Response
//! bodies are decoded into the wire types in [`response`] and normalized into
//! crate models before they leave [`provider::RestProvider`].

pub mod params;
pub mod provider;
pub mod response;

pub use provider::RestProvider;
