//! Durable state for proposals, signals, application events and counters.
//!
//! Two implementations share one `StateStore` trait: an in-memory one for
//! tests and dry runs, and a filesystem one backed by `.evolution/` under a
//! workspace directory.

#![deny(unsafe_code)]

mod error;
mod fs;
mod lockfile;
mod memory;
mod traits;

pub use error::StoreError;
pub use fs::FsStateStore;
pub use lockfile::LockGuard;
pub use memory::InMemoryStateStore;
pub use traits::{StateStore, StoreSnapshot};
