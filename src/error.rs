//! Rich diagnostic error types for the property-update kernel.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text. [`KernelError`] wraps them all so the
//! CLI (or any host) has one type to report.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the kernel.
#[derive(Debug, Error, Diagnostic)]
pub enum KernelError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Stream(#[from] StreamError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Tactic(#[from] TacticError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Persist(#[from] PersistError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Identifier(#[from] IdentifierError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Stream errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StreamError {
    #[error("statement source failed: {message}")]
    #[diagnostic(
        code(kernel::stream::source),
        help(
            "The iterator feeding this statement stream raised an error part way \
             through. No statements after the failure were processed."
        )
    )]
    Source { message: String },

    #[error("discovered statement with managed predicate or type: {statement}")]
    #[diagnostic(
        code(kernel::stream::illegal_input),
        help(
            "Repository-managed vocabulary cannot be written by callers. \
             Remove the statement from the request; the repository maintains it."
        )
    )]
    IllegalInput { statement: String },
}

// ---------------------------------------------------------------------------
// Graph errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    #[error("graph storage error: {message}")]
    #[diagnostic(
        code(kernel::graph::storage),
        help("The in-memory oxigraph store rejected an operation.")
    )]
    Storage { message: String },

    #[error("term {term} cannot be used as {position}: {message}")]
    #[diagnostic(
        code(kernel::graph::invalid_term),
        help(
            "Subjects must be IRIs or blank nodes, predicates must be IRIs, \
             and every IRI must be absolute."
        )
    )]
    InvalidTerm {
        term: String,
        position: &'static str,
        message: String,
    },

    #[error("failed to parse RDF input: {message}")]
    #[diagnostic(
        code(kernel::graph::parse),
        help("Check that the input is valid Turtle or N-Triples.")
    )]
    Parse { message: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Stream(#[from] StreamError),
}

// ---------------------------------------------------------------------------
// Tactic errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum TacticError {
    #[error("malformed SPARQL update: {message}")]
    #[diagnostic(
        code(kernel::tactic::malformed_update),
        help(
            "The update script failed to parse or failed during execution. \
             Retrying the same script will not help; fix the script text."
        )
    )]
    MalformedUpdate { script: String, message: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),
}

// ---------------------------------------------------------------------------
// Store (persistence hook) errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("store rejected {statement}: {message}")]
    #[diagnostic(
        code(kernel::store::rejected),
        help("The persistence backend refused this value. The update was aborted at this statement.")
    )]
    Rejected { statement: String, message: String },
}

// ---------------------------------------------------------------------------
// Resolver errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ResolveError {
    #[error("no repository node at {path} for subject {subject}")]
    #[diagnostic(
        code(kernel::resolve::no_such_node),
        help("The subject lies inside the repository namespace but no node exists at that path. Create it first.")
    )]
    NoSuchNode { subject: String, path: String },

    #[error("failed to resolve subject {subject}: {message}")]
    #[diagnostic(code(kernel::resolve::failed))]
    Failed { subject: String, message: String },
}

// ---------------------------------------------------------------------------
// Persistence errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum PersistError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Stream(#[from] StreamError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Resolve(#[from] ResolveError),

    #[error("consumer already ran: statement streams can be consumed exactly once")]
    #[diagnostic(
        code(kernel::persist::already_consumed),
        help("Build a new PersistingConsumer for every stream you want to persist.")
    )]
    AlreadyConsumed,

    #[error("execution failed: {source}")]
    #[diagnostic(
        code(kernel::persist::execution_failed),
        help("The asynchronous consumption stopped at its first error, shown as the cause.")
    )]
    ExecutionFailed {
        #[source]
        source: Box<PersistError>,
    },

    #[error("worker lost before reporting a result: {message}")]
    #[diagnostic(
        code(kernel::persist::worker_lost),
        help("The unit of work panicked or its execution context shut down.")
    )]
    WorkerLost { message: String },
}

impl PersistError {
    /// The first error raised during consumption, looking through the
    /// asynchronous completion envelope.
    pub fn root(&self) -> &PersistError {
        match self {
            PersistError::ExecutionFailed { source } => source.root(),
            other => other,
        }
    }
}

// ---------------------------------------------------------------------------
// Identifier errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum IdentifierError {
    #[error("invalid repository path: {path}")]
    #[diagnostic(
        code(kernel::identifier::invalid_path),
        help("Repository paths are absolute and start with '/'.")
    )]
    InvalidPath { path: String },

    #[error("invalid base URI: {uri}")]
    #[diagnostic(
        code(kernel::identifier::invalid_base),
        help("The base URI must be a non-empty absolute URI such as info:fedora.")
    )]
    InvalidBase { uri: String },
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(kernel::config::read),
        help("Ensure the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {message}")]
    #[diagnostic(
        code(kernel::config::parse),
        help("Check the TOML syntax in the config file.")
    )]
    Parse { path: String, message: String },

    #[error("failed to write config: {path}")]
    #[diagnostic(
        code(kernel::config::write),
        help("Ensure you have write permissions to the config directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {message}")]
    #[diagnostic(code(kernel::config::invalid), help("Check the KernelConfig fields. {message}"))]
    Invalid { message: String },
}

/// Convenience alias for functions returning kernel results.
pub type KernelResult<T> = std::result::Result<T, KernelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_error_converts_to_kernel_error() {
        let err = StreamError::Source {
            message: "boom".into(),
        };
        let kernel: KernelError = err.into();
        assert!(matches!(kernel, KernelError::Stream(StreamError::Source { .. })));
    }

    #[test]
    fn persist_error_wraps_store_error() {
        let err: PersistError = StoreError::Rejected {
            statement: "<a> <b> <c> .".into(),
            message: "closed".into(),
        }
        .into();
        assert!(matches!(err, PersistError::Store(StoreError::Rejected { .. })));
    }

    #[test]
    fn root_sees_through_execution_envelope() {
        let inner = PersistError::Stream(StreamError::Source {
            message: "Expected.".into(),
        });
        let wrapped = PersistError::ExecutionFailed {
            source: Box::new(inner),
        };
        assert!(matches!(
            wrapped.root(),
            PersistError::Stream(StreamError::Source { .. })
        ));
        assert!(wrapped.to_string().contains("Expected."));
    }

    #[test]
    fn illegal_input_names_the_statement() {
        let err = StreamError::IllegalInput {
            statement: "<a> <b> <c> .".into(),
        };
        assert!(format!("{err}").contains("<a> <b> <c> ."));
    }
}
