//! Adapters Layer
//!
//! Inbound: the row files a batch is read from and written back to.
//! Outbound: cache stores and the remote lookup service.

pub mod inbound;
pub mod outbound;
