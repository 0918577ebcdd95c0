//! Persistence: graph snapshot cache and the durable change ledger.

pub mod cache;
pub mod ledger;
