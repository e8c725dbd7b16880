//! pppos - PPP over a raw frame transport
//!
//! Brings up an IPv4 link with LCP, PAP and IPCP on top of a generic
//! RFC 1661 option negotiation automaton. The link engine is sans-IO; a
//! tokio driver connects it to a [`transport::Transport`].

pub mod config;
pub mod error;
pub mod link;
pub mod protocol;
pub mod telemetry;
pub mod transport;

pub use error::{Error, Result};
