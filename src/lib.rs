//! Mail intake — correlation and specification autofill for workshop orders.

pub mod artifacts;
pub mod classify;
pub mod config;
pub mod correlate;
pub mod engine;
pub mod error;
pub mod extract;
pub mod ingest;
pub mod model;
pub mod schema;
pub mod specs;
pub mod store;
pub mod suggest;
