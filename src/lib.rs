// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # rdf-kernel
//!
//! The property-update pipeline of an RDF content repository: compute the
//! difference between a resource's current statements and a proposed set,
//! produce that proposed set with a pluggable update tactic, keep
//! repository-managed vocabulary out of it, and persist what remains.
//!
//! ## Architecture
//!
//! - **Statement streams** (`stream`): ordered, fallible statement sequences
//!   with a topic and a prefix table; the unmanaged guard and the
//!   differencing engine are stream adapters
//! - **Managed vocabulary** (`vocab`): which predicates and types callers may not write
//! - **Graphs** (`graph`): oxigraph-backed materialization and SPARQL Update
//! - **Update tactics** (`tactic`): add statements, or run a SPARQL Update script
//! - **Persistence** (`persist`): the persisting consumer and its execution contexts
//! - **Reference backend** (`store`, `identifier`): an in-memory repository
//! - **Orchestration** (`update`): plan and apply a properties update
//!
//! ## Library usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use rdf_kernel::identifier::IdentifierTranslator;
//! use rdf_kernel::store::MemRepository;
//! use rdf_kernel::tactic::SparqlUpdateTactic;
//! use rdf_kernel::term::{Statement, Term};
//! use rdf_kernel::update::PropertiesUpdate;
//!
//! let repo = Arc::new(MemRepository::new(IdentifierTranslator::new("info:fedora").unwrap()));
//! repo.seed(vec![Statement::new(
//!     Term::iri("info:fedora/a"),
//!     Term::iri("http://purl.org/dc/terms/title"),
//!     Term::literal("old"),
//! )])
//! .unwrap();
//! let tactic = SparqlUpdateTactic::new(
//!     "DELETE DATA { <> <http://purl.org/dc/terms/title> \"old\" } ; \
//!      INSERT DATA { <> <http://purl.org/dc/terms/title> \"new\" }",
//! );
//! let report = PropertiesUpdate::default().update_node(&repo, "/a", &tactic).unwrap();
//! assert_eq!(report.added, 1);
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod identifier;
pub mod persist;
pub mod store;
pub mod stream;
pub mod tactic;
pub mod term;
pub mod update;
pub mod vocab;
