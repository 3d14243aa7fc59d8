//! Inference logic: artifact loading, the trained pipeline and explanations

pub mod artifact;
pub mod context;
pub mod explain;
pub mod model;
pub mod pipeline;

pub use context::ModelContext;
