//! Reqwest-backed client for the multi-tenant cloud document store,
//! implementing the sync engine's `RemoteStore` contract.

mod client;
mod error;
mod types;

pub use client::*;
pub use error::*;
pub use types::*;
