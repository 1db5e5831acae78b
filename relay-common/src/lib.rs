//! Relay Common Types
//!
//! Wire types shared by the gateway's proxy endpoints, its router, and any
//! client that talks to them.

pub mod proxy;
pub mod router;

pub use proxy::{ErrorBody, ProxyRequest, ProxyResponse};
pub use router::{ExchangeRecord, RouterRequest, RouterResponse, SHUTDOWN_MESSAGE};
