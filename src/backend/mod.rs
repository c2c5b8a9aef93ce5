//! Backend abstraction layer
//!
//! Provides the trait a host renderer implements plus the value types passed
//! across it. [`dummy::DummyBackend`] is a recording implementation for tests
//! and headless use.

pub mod dummy;
pub mod traits;
pub mod types;

pub use dummy::{DummyBackend, DummyCommand};
pub use traits::*;
pub use types::*;
