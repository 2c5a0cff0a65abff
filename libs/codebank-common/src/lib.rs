//! Shared building blocks for the codebank services: the data model, the
//! error taxonomy, configuration, persistence and problem maintenance.

pub mod catalog;
pub mod config;
pub mod error;
pub mod redis;
pub mod store;
pub mod types;
pub mod validation;

pub use error::{BankError, BankResult, StoreError};
