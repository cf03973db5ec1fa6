//! Discord adapter (serenity).
//!
//! Connects to the Discord gateway over a persistent WebSocket managed by
//! serenity and implements the `dcf-core` [`dcf_core::ports::ChannelHost`]
//! port on top of serenity's HTTP client and entity cache. Reconnects,
//! heartbeats, and rate limits are serenity's problem, not ours.

pub mod gateway;
pub mod handler;
mod host;

pub use gateway::GatewayConnection;
