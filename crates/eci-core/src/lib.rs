//! Streaming parse-and-dispatch engine and session layer for a line-oriented
//! alarm panel protocol.
//!
//! The engine is organized bottom-up: [`flow`] defines the outcome type
//! every parse step produces, [`transformers`] is the reusable step library,
//! [`consumer`] adapts a transformer pipeline into one of three sink shapes,
//! and [`session`] wires a [`transport::Transport`] through the registry,
//! the reconnect worker, and authentication into a single connected handle.

pub mod auth;
pub mod commands;
pub mod consumer;
pub mod error;
pub mod event;
pub mod flow;
pub mod message;
pub mod panel;
pub mod reconnect;
pub mod registry;
pub mod request;
pub mod session;
pub mod transformers;
pub mod transport;
pub mod version;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use error::EciError;
pub use flow::{Flow, FlowResult};
pub use request::Request;
pub use session::{Credentials, Session, SessionConfig};
pub use transport::Transport;
