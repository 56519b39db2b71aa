//! Sequenced request/response transport to the fitting service.

mod client;
pub mod types;

pub use client::{Endpoint, SessionClient, DEFAULT_PATH};
pub use types::{pretty, Exchange, RequestEnvelope, ResponseEnvelope};
