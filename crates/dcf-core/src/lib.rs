//! Core domain + query logic for the Discord channel fetcher.
//!
//! This crate is intentionally SDK-agnostic. The Discord gateway lives behind
//! the [`ports::ChannelHost`] trait implemented in the adapter crate, so the
//! query facade can be exercised against a fake host in tests.

pub mod config;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod ports;
pub mod queries;
pub mod session;

pub use errors::{Error, Result};
