//! Persistent response cache
//!
//! Stores response bodies content-addressed by request identity, grouped
//! into generations. Exactly one generation is current; activation deletes
//! the rest.
//!
//! # Generation States
//!
//! | State | Description |
//! |-------|-------------|
//! | Building | Created, install running or interrupted |
//! | Complete | All required resources stored, usable offline |

pub mod generation;
pub mod store;

pub use generation::{format_bytes, GenerationId, GenerationInfo, GenerationState};
pub use store::{CacheHandle, CacheStore, CachedEntry, EntryHeader, GenerationStats};
