//! Persisting consumer: drains a statement stream into a backend.
//!
//! A [`PersistingConsumer`] owns one stream and runs it exactly once, either
//! on the calling thread ([`consume`](PersistingConsumer::consume)) or on an
//! [`Executor`] ([`consume_async`](PersistingConsumer::consume_async)).
//! Every statement passes through the managed-vocabulary guard, then its
//! subject is checked and resolved:
//!
//! - subjects the resolver does not own are skipped without resolution
//! - owned subjects the resolver maps to `Ok(None)` are skipped too
//! - `rdf:type` statements go to [`PersistenceHooks::operate_on_mixin`]
//! - everything else goes to [`PersistenceHooks::operate_on_property`]
//!
//! Processing is strictly sequential in stream order. The first error from
//! the stream, the resolver, or a hook aborts the run.

pub mod executor;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{PersistError, ResolveError, StoreError};
use crate::stream::RdfStream;
use crate::term::{Statement, Term};
use crate::vocab::ManagedVocabulary;

pub use executor::{AnyExecutor, CompletionHandle, Executor, PoolExecutor, ThreadExecutor};

/// Result type for persistence operations.
pub type PersistResult<T> = std::result::Result<T, PersistError>;

/// Maps statement subjects to backend nodes.
pub trait SubjectResolver {
    /// Internal node reference handed to the hooks.
    type Node: Send + 'static;

    /// Whether `subject` lies inside this repository's namespace.
    fn is_owned_subject(&self, subject: &Term) -> bool;

    /// Resolve an owned `subject`. `Ok(None)` skips the statement.
    fn resolve_to_node(&self, subject: &Term) -> Result<Option<Self::Node>, ResolveError>;
}

/// Backend operations a consumer delegates to.
pub trait PersistenceHooks<N> {
    fn operate_on_property(&mut self, statement: &Statement, node: &N) -> Result<(), StoreError>;

    fn operate_on_mixin(&mut self, statement: &Statement, node: &N) -> Result<(), StoreError>;
}

/// Lifecycle of a consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Idle,
    Consuming,
    Completed,
    Failed,
}

/// Counts from a completed consumption.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumeReport {
    /// Statements handed to `operate_on_property`.
    pub properties: usize,
    /// Statements handed to `operate_on_mixin`.
    pub mixins: usize,
    /// Statements about foreign subjects.
    pub skipped: usize,
}

impl ConsumeReport {
    pub fn persisted(&self) -> usize {
        self.properties + self.mixins
    }
}

/// Drains one statement stream through a resolver and persistence hooks.
pub struct PersistingConsumer<R, H> {
    resolver: R,
    hooks: H,
    stream: Option<RdfStream>,
    vocabulary: Arc<ManagedVocabulary>,
    state: ConsumerState,
}

impl<R, H> PersistingConsumer<R, H>
where
    R: SubjectResolver,
    H: PersistenceHooks<R::Node>,
{
    /// A consumer guarding against the built-in managed vocabulary.
    pub fn new(resolver: R, hooks: H, stream: RdfStream) -> Self {
        Self::with_vocabulary(resolver, hooks, stream, Arc::new(ManagedVocabulary::repository()))
    }

    pub fn with_vocabulary(
        resolver: R,
        hooks: H,
        stream: RdfStream,
        vocabulary: Arc<ManagedVocabulary>,
    ) -> Self {
        Self {
            resolver,
            hooks,
            stream: Some(stream),
            vocabulary,
            state: ConsumerState::Idle,
        }
    }

    pub fn state(&self) -> ConsumerState {
        self.state
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    /// Give back the resolver and hooks, e.g. to inspect a recording backend.
    pub fn into_parts(self) -> (R, H) {
        (self.resolver, self.hooks)
    }

    /// Run the stream to completion on this thread.
    ///
    /// Returns [`PersistError::AlreadyConsumed`] if called a second time.
    pub fn consume(&mut self) -> PersistResult<ConsumeReport> {
        let stream = match (self.state, self.stream.take()) {
            (ConsumerState::Idle, Some(stream)) => stream,
            _ => return Err(PersistError::AlreadyConsumed),
        };
        self.state = ConsumerState::Consuming;
        let topic = stream.topic().map(ToString::to_string);
        tracing::debug!(topic = ?topic, "consuming statement stream");

        match self.drain(stream) {
            Ok(report) => {
                self.state = ConsumerState::Completed;
                tracing::info!(
                    topic = ?topic,
                    properties = report.properties,
                    mixins = report.mixins,
                    skipped = report.skipped,
                    "stream consumed"
                );
                Ok(report)
            }
            Err(e) => {
                self.state = ConsumerState::Failed;
                tracing::warn!(topic = ?topic, error = %e, "consumption aborted");
                Err(e)
            }
        }
    }

    fn drain(&mut self, stream: RdfStream) -> PersistResult<ConsumeReport> {
        let mut report = ConsumeReport::default();
        for statement in stream.unmanaged(Arc::clone(&self.vocabulary)) {
            let statement = statement?;
            if !self.resolver.is_owned_subject(&statement.subject) {
                tracing::debug!(subject = %statement.subject, "skipping foreign subject");
                report.skipped += 1;
                continue;
            }
            let Some(node) = self.resolver.resolve_to_node(&statement.subject)? else {
                tracing::debug!(subject = %statement.subject, "subject resolved to no node");
                report.skipped += 1;
                continue;
            };
            if statement.is_type_assertion() {
                self.hooks.operate_on_mixin(&statement, &node)?;
                report.mixins += 1;
            } else {
                self.hooks.operate_on_property(&statement, &node)?;
                report.properties += 1;
            }
        }
        Ok(report)
    }
}

impl<R, H> PersistingConsumer<R, H>
where
    R: SubjectResolver + Send + 'static,
    H: PersistenceHooks<R::Node> + Send + 'static,
{
    /// Run the stream on `executor` and return a handle to the outcome.
    ///
    /// Waiting on the handle yields the first error wrapped in
    /// [`PersistError::ExecutionFailed`].
    pub fn consume_async<E: Executor>(mut self, executor: &E) -> CompletionHandle<ConsumeReport> {
        executor.execute(move || self.consume())
    }
}

impl<R, H> std::fmt::Debug for PersistingConsumer<R, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistingConsumer")
            .field("state", &self.state)
            .field("stream", &self.stream)
            .finish_non_exhaustive()
    }
}
