//! Reference persistence backend.
//!
//! [`MemRepository`] is a concurrent in-memory node store (DashMap). It comes
//! with the pieces a [`PersistingConsumer`](crate::persist::PersistingConsumer)
//! needs to write into it:
//!
//! - [`RepositoryResolver`]: subject → node path, with an existence check
//! - [`PropertyAdder`]: hooks that add properties and mixins
//! - [`PropertyRemover`]: hooks that remove them

pub mod mem;

pub use mem::{MemRepository, NodeRecord, PropertyAdder, PropertyRemover, RepositoryResolver};

use crate::error::StoreError;

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
