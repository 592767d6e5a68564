//! Domain layer types and invariants.

pub mod error;
pub mod lookup;
pub mod posts;
pub mod slug;
