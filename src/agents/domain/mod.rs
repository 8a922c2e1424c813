//! Domain types for the agent pipeline
//!
//! Core abstractions shared by the agents, the LLM client and the HTTP layer.

mod message;
mod query;
mod response;
mod stream;

pub use message::*;
pub use query::{preview, Query};
pub use response::*;
pub use stream::*;
