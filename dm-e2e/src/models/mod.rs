//! Data models exchanged with the message store
//!
//! These types are serialized with camelCase field names.

mod types;

pub use types::*;
