//! Application Layer
//!
//! Use cases that orchestrate the domain ports.

mod batch_resolver;

pub use batch_resolver::BatchResolver;
