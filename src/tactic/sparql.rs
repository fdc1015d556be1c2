use crate::error::TacticError;
use crate::graph::Graph;
use crate::graph::update::{SparqlUpdater, UpdateExecutor};
use crate::stream::RdfStream;

use super::{TacticResult, UpdateTactic};

/// Runs a SPARQL Update script against the materialized input.
///
/// The input is loaded into a fresh [`Graph`] with the stream topic as base
/// IRI, the script's prefixes are bound on the graph, and the mutated graph
/// is turned back into a stream. A script that fails to parse or to execute
/// yields [`TacticError::MalformedUpdate`]; no partial result escapes.
#[derive(Debug, Clone)]
pub struct SparqlUpdateTactic<E = SparqlUpdater> {
    script: String,
    executor: E,
}

impl SparqlUpdateTactic {
    pub fn new(script: impl Into<String>) -> Self {
        Self::with_executor(script, SparqlUpdater)
    }
}

impl<E> SparqlUpdateTactic<E> {
    pub fn with_executor(script: impl Into<String>, executor: E) -> Self {
        Self {
            script: script.into(),
            executor,
        }
    }

    pub fn script(&self) -> &str {
        &self.script
    }

    fn malformed(&self, message: String) -> TacticError {
        TacticError::MalformedUpdate {
            script: self.script.clone(),
            message,
        }
    }
}

impl<E: UpdateExecutor> UpdateTactic for SparqlUpdateTactic<E> {
    fn apply(&self, input: RdfStream) -> TacticResult<RdfStream> {
        let mut graph = Graph::from_stream(input)?;

        let program = self
            .executor
            .parse(&self.script, graph.topic())
            .map_err(|message| self.malformed(message))?;

        for (prefix, uri) in self.executor.prefixes(&program) {
            graph.bind_namespace(prefix, uri);
        }

        self.executor.execute(&program, &mut graph).map_err(|message| {
            tracing::warn!(error = %message, "update script failed during execution");
            self.malformed(message)
        })?;

        Ok(graph.into_stream()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GraphError, StreamError};
    use crate::stream::Namespaces;
    use crate::term::{Statement, Term};

    const TOPIC: &str = "http://ex.org/a";

    fn stmt(p: &str, o: &str) -> Statement {
        Statement::new(Term::iri(TOPIC), Term::iri(p), Term::literal(o))
    }

    fn input() -> RdfStream {
        RdfStream::from_statements(vec![
            stmt("http://ex.org/title", "old"),
            stmt("http://ex.org/note", "keep"),
        ])
        .with_topic(Term::iri(TOPIC))
    }

    #[test]
    fn no_op_script_round_trips() {
        let script = "INSERT DATA { <http://ex.org/a> <http://ex.org/x> \"tmp\" } ;\n\
                      DELETE DATA { <http://ex.org/a> <http://ex.org/x> \"tmp\" }";
        let out = SparqlUpdateTactic::new(script).apply(input()).unwrap();
        assert_eq!(out.topic(), Some(&Term::iri(TOPIC)));
        assert_eq!(out.try_collect_vec().unwrap(), input().try_collect_vec().unwrap());
    }

    #[test]
    fn replaces_a_value_and_binds_prefixes() {
        let script = "PREFIX ex: <http://ex.org/>\n\
                      DELETE { <> ex:title ?t } INSERT { <> ex:title \"new\" } WHERE { <> ex:title ?t }";
        let out = SparqlUpdateTactic::new(script).apply(input()).unwrap();
        assert_eq!(out.namespaces()["ex"], "http://ex.org/");
        let statements = out.try_collect_vec().unwrap();
        assert_eq!(
            statements,
            vec![stmt("http://ex.org/note", "keep"), stmt("http://ex.org/title", "new")]
        );
    }

    #[test]
    fn parse_failure_is_malformed_update_with_script() {
        let script = "DELETE {{ broken";
        let err = SparqlUpdateTactic::new(script).apply(input()).unwrap_err();
        match err {
            TacticError::MalformedUpdate { script: s, message } => {
                assert_eq!(s, script);
                assert!(!message.is_empty());
            }
            other => panic!("expected MalformedUpdate, got {other:?}"),
        }
    }

    #[test]
    fn prefix_text_inside_a_literal_binds_nothing() {
        let script = "INSERT DATA { <http://ex.org/a> <http://ex.org/note> \
                      \"see PREFIX evil: <urn:evil:> here\" }";
        let out = SparqlUpdateTactic::new(script).apply(input()).unwrap();
        assert!(out.namespaces().is_empty());
    }

    #[test]
    fn named_graph_insert_is_malformed_update() {
        let script = "INSERT DATA { GRAPH <http://ex.org/g> { <http://ex.org/a> <http://ex.org/x> \"1\" } }";
        assert!(matches!(
            SparqlUpdateTactic::new(script).apply(input()),
            Err(TacticError::MalformedUpdate { message, .. }) if message.contains("named graph")
        ));
    }

    struct FailingExecutor;

    impl UpdateExecutor for FailingExecutor {
        type Program = ();

        fn parse(&self, _: &str, _: Option<&Term>) -> Result<(), String> {
            Ok(())
        }

        fn prefixes(&self, _: &()) -> Namespaces {
            Namespaces::new()
        }

        fn execute(&self, _: &(), _: &mut Graph) -> Result<(), String> {
            Err("store went away".into())
        }
    }

    #[test]
    fn execution_failure_is_malformed_update() {
        let tactic = SparqlUpdateTactic::with_executor("anything", FailingExecutor);
        assert!(matches!(
            tactic.apply(input()),
            Err(TacticError::MalformedUpdate { message, .. }) if message == "store went away"
        ));
    }

    #[test]
    fn input_stream_failure_propagates() {
        let broken = RdfStream::from_results(vec![Err(StreamError::Source {
            message: "Expected.".into(),
        })]);
        assert!(matches!(
            SparqlUpdateTactic::new("INSERT DATA {}").apply(broken),
            Err(TacticError::Graph(GraphError::Stream(StreamError::Source { .. })))
        ));
    }
}
