//! Domain types for the report service.
//!
//! Identifiers and the small value objects shared by the collaborators.

mod did;
mod visibility;

pub use did::*;
pub use visibility::*;
