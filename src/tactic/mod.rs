//! Update tactics: pure functions from a statement stream to the stream a
//! resource's properties should become.
//!
//! - [`AddTactic`]: append fixed statements
//! - [`SparqlUpdateTactic`]: run a SPARQL Update script against the
//!   materialized statements

mod add;
mod sparql;

pub use add::AddTactic;
pub use sparql::SparqlUpdateTactic;

use crate::error::TacticError;
use crate::stream::RdfStream;

/// Result type for tactic application.
pub type TacticResult<T> = std::result::Result<T, TacticError>;

/// One declarative way of producing an updated property set.
///
/// Implementations hold only their configuration and never mutate anything
/// but the stream they are handed.
pub trait UpdateTactic {
    fn apply(&self, input: RdfStream) -> TacticResult<RdfStream>;
}

impl<T: UpdateTactic + ?Sized> UpdateTactic for Box<T> {
    fn apply(&self, input: RdfStream) -> TacticResult<RdfStream> {
        (**self).apply(input)
    }
}
