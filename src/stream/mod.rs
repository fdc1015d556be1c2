//! Statement streams: the common currency of the update pipeline.
//!
//! An [`RdfStream`] is an ordered, single-pass sequence of statements plus a
//! topic (the resource the statements describe) and a namespace-prefix table.
//! Items are `Result`s so a source can fail part way through.
//!
//! - [`unmanaged`]: fail-fast guard against managed vocabulary
//! - [`differencing`]: lazy set difference against a baseline
//!
//! Streams have value semantics: [`RdfStream::concat`] consumes the stream and
//! returns a new one. To replay a stream, buffer it into a [`Snapshot`].

pub mod differencing;
pub mod unmanaged;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::StreamError;
use crate::term::{Statement, Term};

/// Result type for stream operations.
pub type StreamResult<T> = std::result::Result<T, StreamError>;

/// Prefix → namespace URI.
pub type Namespaces = BTreeMap<String, String>;

/// Boxed statement source.
pub type StatementSource = Box<dyn Iterator<Item = StreamResult<Statement>> + Send>;

/// An ordered sequence of statements about a topic.
pub struct RdfStream {
    topic: Option<Term>,
    namespaces: Namespaces,
    source: StatementSource,
}

impl RdfStream {
    /// An empty stream with no topic.
    pub fn new() -> Self {
        Self {
            topic: None,
            namespaces: Namespaces::new(),
            source: Box::new(std::iter::empty()),
        }
    }

    /// A stream over already-known statements.
    pub fn from_statements<I>(statements: I) -> Self
    where
        I: IntoIterator<Item = Statement>,
        I::IntoIter: Send + 'static,
    {
        Self::from_results(statements.into_iter().map(Ok))
    }

    /// A stream over a source that may fail mid-iteration.
    pub fn from_results<I>(results: I) -> Self
    where
        I: IntoIterator<Item = StreamResult<Statement>>,
        I::IntoIter: Send + 'static,
    {
        Self {
            topic: None,
            namespaces: Namespaces::new(),
            source: Box::new(results.into_iter()),
        }
    }

    pub fn with_topic(mut self, topic: Term) -> Self {
        self.topic = Some(topic);
        self
    }

    /// Replace the namespace table.
    pub fn with_namespaces(mut self, namespaces: Namespaces) -> Self {
        self.namespaces = namespaces;
        self
    }

    /// Bind one prefix, replacing any previous binding.
    pub fn with_namespace(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.namespaces.insert(prefix.into(), uri.into());
        self
    }

    pub fn topic(&self) -> Option<&Term> {
        self.topic.as_ref()
    }

    pub fn namespaces(&self) -> &Namespaces {
        &self.namespaces
    }

    /// This stream followed by `more`.
    pub fn concat<I>(self, more: I) -> Self
    where
        I: IntoIterator<Item = Statement>,
        I::IntoIter: Send + 'static,
    {
        let source = self.source.chain(more.into_iter().map(Ok));
        Self {
            topic: self.topic,
            namespaces: self.namespaces,
            source: Box::new(source),
        }
    }

    /// This stream followed by another stream. Prefixes already bound here win.
    pub fn concat_stream(self, other: RdfStream) -> Self {
        let RdfStream {
            topic,
            mut namespaces,
            source,
        } = self;
        for (prefix, uri) in other.namespaces {
            namespaces.entry(prefix).or_insert(uri);
        }
        Self {
            topic: topic.or(other.topic),
            namespaces,
            source: Box::new(source.chain(other.source)),
        }
    }

    /// Rewrap the statement source, keeping topic and namespaces.
    pub(crate) fn map_source(self, wrap: impl FnOnce(StatementSource) -> StatementSource) -> Self {
        Self {
            topic: self.topic,
            namespaces: self.namespaces,
            source: wrap(self.source),
        }
    }

    /// Drain the stream, stopping at the first error.
    pub fn try_collect_vec(self) -> StreamResult<Vec<Statement>> {
        self.source.collect()
    }

    /// Drain the stream into a replayable buffer.
    pub fn snapshot(self) -> StreamResult<Snapshot> {
        let topic = self.topic.clone();
        let namespaces = self.namespaces.clone();
        let statements: Vec<Statement> = self.try_collect_vec()?;
        Ok(Snapshot {
            topic,
            namespaces,
            statements: statements.into(),
        })
    }
}

impl Default for RdfStream {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for RdfStream {
    type Item = StreamResult<Statement>;

    fn next(&mut self) -> Option<Self::Item> {
        self.source.next()
    }
}

impl fmt::Debug for RdfStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RdfStream")
            .field("topic", &self.topic)
            .field("namespaces", &self.namespaces)
            .finish_non_exhaustive()
    }
}

/// A fully buffered stream that can be replayed any number of times.
#[derive(Debug, Clone)]
pub struct Snapshot {
    topic: Option<Term>,
    namespaces: Namespaces,
    statements: Arc<[Statement]>,
}

impl Snapshot {
    pub fn topic(&self) -> Option<&Term> {
        self.topic.as_ref()
    }

    pub fn namespaces(&self) -> &Namespaces {
        &self.namespaces
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// A fresh stream over the buffered statements.
    pub fn stream(&self) -> RdfStream {
        let statements = Arc::clone(&self.statements);
        let replay = (0..statements.len()).map(move |i| statements[i].clone());
        let stream = RdfStream::from_statements(replay).with_namespaces(self.namespaces.clone());
        match &self.topic {
            Some(topic) => stream.with_topic(topic.clone()),
            None => stream,
        }
    }
}
