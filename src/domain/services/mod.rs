mod result_projector;

pub use result_projector::{Projection, ResultProjector};
