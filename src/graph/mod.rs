//! In-memory RDF graph backed by oxigraph.
//!
//! A [`Graph`] is the materialized form of an [`RdfStream`]: the statements
//! live in the default graph of an in-memory oxigraph [`Store`], and the
//! stream's topic and namespace table travel alongside. [`Graph::into_stream`]
//! re-derives a stream with the same topic.
//!
//! An RDF graph is a set, so duplicate statements collapse on insert. The
//! graph remembers the order and multiplicity in which statements arrived
//! and replays surviving statements that way, which makes
//! `from_stream(s).into_stream()` preserve the statement multiset. Statements
//! created by an update follow in sorted order.

pub mod update;

use std::collections::{BTreeSet, HashSet};
use std::io::Read;

use oxigraph::io::RdfFormat;
use oxigraph::model::{
    BlankNode, GraphName, GraphNameRef, Literal as OxLiteral, NamedNode, Quad, Term as OxTerm,
};
use oxigraph::store::Store;

use crate::error::GraphError;
use crate::stream::{Namespaces, RdfStream};
use crate::term::{Literal, Statement, Term};

/// Result type for graph operations.
pub type GraphResult<T> = std::result::Result<T, GraphError>;

/// Input syntaxes accepted by [`Graph::load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Turtle,
    NTriples,
}

impl InputFormat {
    /// Guess from a file extension, defaulting to Turtle.
    pub fn from_extension(ext: Option<&str>) -> Self {
        match ext {
            Some("nt") => InputFormat::NTriples,
            _ => InputFormat::Turtle,
        }
    }

    fn rdf_format(self) -> RdfFormat {
        match self {
            InputFormat::Turtle => RdfFormat::Turtle,
            InputFormat::NTriples => RdfFormat::NTriples,
        }
    }
}

/// A materialized statement set with its topic and prefixes.
pub struct Graph {
    store: Store,
    topic: Option<Term>,
    namespaces: Namespaces,
    arrivals: Vec<Statement>,
}

impl Graph {
    /// An empty graph.
    pub fn new() -> GraphResult<Self> {
        let store = Store::new().map_err(|e| GraphError::Storage {
            message: format!("failed to create oxigraph store: {e}"),
        })?;
        Ok(Self {
            store,
            topic: None,
            namespaces: Namespaces::new(),
            arrivals: Vec::new(),
        })
    }

    /// Drain `stream` into a new graph, keeping its topic and prefixes.
    ///
    /// The first stream error aborts materialization.
    pub fn from_stream(stream: RdfStream) -> GraphResult<Self> {
        let mut graph = Self::new()?;
        graph.topic = stream.topic().cloned();
        graph.namespaces = stream.namespaces().clone();
        for statement in stream {
            graph.insert(statement?)?;
        }
        tracing::debug!(
            statements = graph.arrivals.len(),
            topic = ?graph.topic,
            "materialized stream into graph"
        );
        Ok(graph)
    }

    /// Parse Turtle or N-Triples into a new graph.
    pub fn load(reader: impl Read, format: InputFormat) -> GraphResult<Self> {
        let graph = Self::new()?;
        graph
            .store
            .load_from_reader(format.rdf_format(), reader)
            .map_err(|e| GraphError::Parse {
                message: e.to_string(),
            })?;
        Ok(graph)
    }

    /// Insert one statement.
    pub fn insert(&mut self, statement: Statement) -> GraphResult<()> {
        let quad = to_quad(&statement)?;
        self.store.insert(&quad).map_err(|e| GraphError::Storage {
            message: format!("insert failed: {e}"),
        })?;
        self.arrivals.push(statement);
        Ok(())
    }

    pub fn topic(&self) -> Option<&Term> {
        self.topic.as_ref()
    }

    pub fn namespaces(&self) -> &Namespaces {
        &self.namespaces
    }

    /// Bind a prefix on the graph. Existing bindings are replaced.
    pub fn bind_namespace(&mut self, prefix: impl Into<String>, uri: impl Into<String>) {
        self.namespaces.insert(prefix.into(), uri.into());
    }

    pub(crate) fn store(&self) -> &Store {
        &self.store
    }

    /// Number of distinct statements in the graph.
    pub fn len(&self) -> GraphResult<usize> {
        self.store.len().map_err(|e| GraphError::Storage {
            message: format!("failed to count statements: {e}"),
        })
    }

    pub fn is_empty(&self) -> GraphResult<bool> {
        self.len().map(|n| n == 0)
    }

    /// Every distinct statement in the default graph.
    pub fn statements(&self) -> GraphResult<Vec<Statement>> {
        let mut statements = Vec::new();
        for quad in self
            .store
            .quads_for_pattern(None, None, None, Some(GraphNameRef::DefaultGraph))
        {
            let quad = quad.map_err(|e| GraphError::Storage {
                message: format!("failed to read quads: {e}"),
            })?;
            statements.push(from_quad(quad)?);
        }
        Ok(statements)
    }

    /// Name of the first graph other than the default one that holds
    /// statements. Those statements are not part of [`statements`](Self::statements).
    pub fn named_graph_in_use(&self) -> GraphResult<Option<String>> {
        for quad in self.store.iter() {
            let quad = quad.map_err(|e| GraphError::Storage {
                message: format!("failed to read quads: {e}"),
            })?;
            if !quad.graph_name.is_default_graph() {
                return Ok(Some(quad.graph_name.to_string()));
            }
        }
        Ok(None)
    }

    /// Re-derive a statement stream from the current graph contents.
    pub fn into_stream(self) -> GraphResult<RdfStream> {
        let current: HashSet<Statement> = self.statements()?.into_iter().collect();
        let arrived: HashSet<&Statement> = self.arrivals.iter().collect();
        let created: BTreeSet<&Statement> =
            current.iter().filter(|s| !arrived.contains(s)).collect();

        let mut ordered: Vec<Statement> = self
            .arrivals
            .iter()
            .filter(|s| current.contains(*s))
            .cloned()
            .collect();
        ordered.extend(created.into_iter().cloned());

        let stream = RdfStream::from_statements(ordered).with_namespaces(self.namespaces);
        Ok(match self.topic {
            Some(topic) => stream.with_topic(topic),
            None => stream,
        })
    }
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("topic", &self.topic)
            .field("namespaces", &self.namespaces)
            .field("arrivals", &self.arrivals.len())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Term conversion
// ---------------------------------------------------------------------------

fn named_node(iri: &str, position: &'static str) -> GraphResult<NamedNode> {
    NamedNode::new(iri).map_err(|e| GraphError::InvalidTerm {
        term: format!("<{iri}>"),
        position,
        message: e.to_string(),
    })
}

fn blank_node(id: &str, position: &'static str) -> GraphResult<BlankNode> {
    BlankNode::new(id).map_err(|e| GraphError::InvalidTerm {
        term: format!("_:{id}"),
        position,
        message: e.to_string(),
    })
}

fn to_literal(literal: &Literal) -> GraphResult<OxLiteral> {
    if let Some(language) = literal.language() {
        OxLiteral::new_language_tagged_literal(literal.value(), language).map_err(|e| {
            GraphError::InvalidTerm {
                term: literal.to_string(),
                position: "object",
                message: e.to_string(),
            }
        })
    } else if let Some(datatype) = literal.datatype() {
        Ok(OxLiteral::new_typed_literal(
            literal.value(),
            named_node(datatype, "datatype")?,
        ))
    } else {
        Ok(OxLiteral::new_simple_literal(literal.value()))
    }
}

fn to_object(term: &Term) -> GraphResult<OxTerm> {
    Ok(match term {
        Term::Iri { iri } => named_node(iri, "object")?.into(),
        Term::Blank { id } => blank_node(id, "object")?.into(),
        Term::Literal(literal) => to_literal(literal)?.into(),
    })
}

fn to_quad(statement: &Statement) -> GraphResult<Quad> {
    let predicate = match &statement.predicate {
        Term::Iri { iri } => named_node(iri, "predicate")?,
        other => {
            return Err(GraphError::InvalidTerm {
                term: other.to_string(),
                position: "predicate",
                message: "predicates must be IRIs".into(),
            });
        }
    };
    let object = to_object(&statement.object)?;
    Ok(match &statement.subject {
        Term::Iri { iri } => Quad::new(
            named_node(iri, "subject")?,
            predicate,
            object,
            GraphName::DefaultGraph,
        ),
        Term::Blank { id } => Quad::new(
            blank_node(id, "subject")?,
            predicate,
            object,
            GraphName::DefaultGraph,
        ),
        Term::Literal(_) => {
            return Err(GraphError::InvalidTerm {
                term: statement.subject.to_string(),
                position: "subject",
                message: "literals cannot be subjects".into(),
            });
        }
    })
}

fn from_term(term: OxTerm) -> GraphResult<Term> {
    match term {
        OxTerm::NamedNode(node) => Ok(Term::iri(node.into_string())),
        OxTerm::BlankNode(node) => Ok(Term::blank(node.into_string())),
        OxTerm::Literal(literal) => {
            let converted = if let Some(language) = literal.language() {
                Literal::lang(literal.value(), language)
            } else {
                Literal::typed(literal.value(), literal.datatype().as_str())
            };
            Ok(Term::Literal(converted))
        }
        #[allow(unreachable_patterns)]
        other => Err(GraphError::InvalidTerm {
            term: other.to_string(),
            position: "object",
            message: "quoted triples are not supported".into(),
        }),
    }
}

fn from_quad(quad: Quad) -> GraphResult<Statement> {
    Ok(Statement::new(
        from_term(OxTerm::from(quad.subject))?,
        Term::iri(quad.predicate.into_string()),
        from_term(quad.object)?,
    ))
}
