//! Core orchestration functionality
//!
//! This module contains the transaction orchestration core: registry,
//! validator resolution, smart-account sessions, the transfer and bridge
//! engines, the balance/history aggregators, and the wallet store.

pub mod balances;
pub mod bridge;
pub mod history;
pub mod registry;
pub mod session;
pub mod store;
pub mod transfer;
pub mod validator;

#[cfg(test)]
pub(crate) mod testkit;
