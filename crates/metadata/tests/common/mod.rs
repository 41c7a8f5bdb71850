//! Common test utilities and fixtures.

pub mod fixtures;
pub mod memory;
pub mod metadata;

#[allow(unused_imports)]
pub use fixtures::*;
#[allow(unused_imports)]
pub use memory::*;
#[allow(unused_imports)]
pub use metadata::*;
