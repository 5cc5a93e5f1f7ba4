//! Thin typed client for the external hosted table store.
//!
//! The store is the only durable state this service touches. The client is
//! deliberately dumb: filtered queries with pagination draining, point gets,
//! creates, and field-level patches. It never retries; only callers know
//! which of their operations are idempotent.

pub mod client;
pub mod fields;
pub mod formula;

pub use client::{Record, StoreClient};
