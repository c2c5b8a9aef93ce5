//! Shader Graph System
//!
//! An ordered queue of image-processing tasks executed in two phases. Tasks
//! inherit their output config from the graph or an upstream task, draw into
//! pooled surfaces, and hand their output straight to a downstream task when
//! both share a config.

pub mod config;
pub mod context;
pub mod graph;
pub mod manager;
pub mod material;
pub mod pool;
pub mod slot;
pub mod task;
pub mod tasks;

pub use config::*;
pub use context::*;
pub use graph::*;
pub use manager::*;
pub use material::*;
pub use pool::*;
pub use slot::*;
pub use task::*;
pub use tasks::*;
