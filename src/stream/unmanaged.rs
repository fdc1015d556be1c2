//! Fail-fast guard that admits only unmanaged statements.
//!
//! Managed statements are never silently dropped: the first one raises
//! [`StreamError::IllegalInput`] naming the statement.

use std::sync::Arc;

use crate::error::StreamError;
use crate::term::Statement;
use crate::vocab::ManagedVocabulary;

use super::{RdfStream, StreamResult};

/// Iterator adapter that turns managed statements into errors.
pub struct Unmanaged<I> {
    inner: I,
    vocabulary: Arc<ManagedVocabulary>,
}

impl<I> Unmanaged<I> {
    pub fn new(inner: I, vocabulary: Arc<ManagedVocabulary>) -> Self {
        Self { inner, vocabulary }
    }
}

impl<I> Iterator for Unmanaged<I>
where
    I: Iterator<Item = StreamResult<Statement>>,
{
    type Item = StreamResult<Statement>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.inner.next()? {
            Ok(statement) if self.vocabulary.is_managed(&statement) => {
                tracing::warn!(%statement, "rejecting managed statement");
                Some(Err(StreamError::IllegalInput {
                    statement: statement.to_string(),
                }))
            }
            other => Some(other),
        }
    }
}

impl RdfStream {
    /// Guard this stream so that any managed statement fails iteration.
    pub fn unmanaged(self, vocabulary: Arc<ManagedVocabulary>) -> RdfStream {
        self.map_source(|source| Box::new(Unmanaged::new(source, vocabulary)))
    }
}
