use crate::stream::RdfStream;
use crate::term::Statement;

use super::{TacticResult, UpdateTactic};

/// Appends a fixed list of statements. No validation, no deduplication.
#[derive(Debug, Clone, Default)]
pub struct AddTactic {
    statements: Vec<Statement>,
}

impl AddTactic {
    pub fn new(statements: impl IntoIterator<Item = Statement>) -> Self {
        Self {
            statements: statements.into_iter().collect(),
        }
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }
}

impl UpdateTactic for AddTactic {
    fn apply(&self, input: RdfStream) -> TacticResult<RdfStream> {
        tracing::debug!(count = self.statements.len(), "appending statements");
        Ok(input.concat(self.statements.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Term;

    fn stmt(o: &str) -> Statement {
        Statement::new(
            Term::iri("http://ex.org/a"),
            Term::iri("http://ex.org/p"),
            Term::literal(o),
        )
    }

    #[test]
    fn appends_after_input_and_keeps_topic() {
        let tactic = AddTactic::new(vec![stmt("2"), stmt("1")]);
        let input = RdfStream::from_statements(vec![stmt("1")]).with_topic(Term::iri("http://ex.org/a"));
        let out = tactic.apply(input).unwrap();
        assert_eq!(out.topic(), Some(&Term::iri("http://ex.org/a")));
        assert_eq!(out.try_collect_vec().unwrap(), vec![stmt("1"), stmt("2"), stmt("1")]);
    }

    #[test]
    fn reusable_across_applications() {
        let tactic = AddTactic::new(vec![stmt("x")]);
        let first = tactic.apply(RdfStream::new()).unwrap().try_collect_vec().unwrap();
        let second = tactic.apply(RdfStream::new()).unwrap().try_collect_vec().unwrap();
        assert_eq!(first, second);
        assert_eq!(tactic.statements().len(), 1);
    }
}
