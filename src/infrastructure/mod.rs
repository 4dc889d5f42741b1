//! Infrastructure Layer
//!
//! Cross-cutting concerns and infrastructure components.

pub mod call_pacer;
pub mod cancellation;
pub mod key_locks;

pub use call_pacer::{CallPacer, PacerConfig, PacerPermit};
pub use cancellation::{cancel_on_signal, CancelToken};
pub use key_locks::{KeyGuard, KeyLocks};
