//! Properties update: tactic → difference → persist.
//!
//! [`PropertiesUpdate::plan`] applies a tactic to a resource's baseline and
//! differences the candidate against it in one pass, giving the statements
//! to add and the ones to remove. [`PropertiesUpdate::apply`] then persists
//! the removals and additions through two guarded
//! [`PersistingConsumer`]s, removals first.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{KernelError, KernelResult, PersistError};
use crate::persist::{
    CompletionHandle, ConsumeReport, Executor, PersistResult, PersistenceHooks, PersistingConsumer,
    SubjectResolver,
};
use crate::store::{MemRepository, PropertyAdder, PropertyRemover, RepositoryResolver};
use crate::stream::differencing::DifferencingIterator;
use crate::stream::{RdfStream, Snapshot};
use crate::tactic::UpdateTactic;
use crate::term::{Statement, Term};
use crate::vocab::ManagedVocabulary;

/// What an update will change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatePlan {
    pub topic: Option<Term>,
    /// New statements, in candidate order.
    pub additions: Vec<Statement>,
    /// Baseline statements missing from the candidate, in baseline order.
    pub removals: Vec<Statement>,
    /// Statements in both, sorted.
    pub retained: Vec<Statement>,
}

impl UpdatePlan {
    /// Whether applying the plan would change nothing.
    pub fn is_noop(&self) -> bool {
        self.additions.is_empty() && self.removals.is_empty()
    }
}

/// Outcome of applying an [`UpdatePlan`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateReport {
    pub topic: Option<String>,
    pub added: usize,
    pub removed: usize,
    pub retained: usize,
    pub skipped: usize,
}

/// Orchestrates one properties update.
#[derive(Debug, Clone)]
pub struct PropertiesUpdate {
    vocabulary: Arc<ManagedVocabulary>,
}

impl Default for PropertiesUpdate {
    fn default() -> Self {
        Self::new(Arc::new(ManagedVocabulary::repository()))
    }
}

impl PropertiesUpdate {
    pub fn new(vocabulary: Arc<ManagedVocabulary>) -> Self {
        Self { vocabulary }
    }

    pub fn vocabulary(&self) -> &Arc<ManagedVocabulary> {
        &self.vocabulary
    }

    /// Apply `tactic` to `baseline` and difference the result against it.
    pub fn plan<T: UpdateTactic + ?Sized>(
        &self,
        baseline: &Snapshot,
        tactic: &T,
    ) -> KernelResult<UpdatePlan> {
        let candidate = tactic.apply(baseline.stream())?;
        let topic = candidate.topic().cloned().or_else(|| baseline.topic().cloned());

        let mut diff = DifferencingIterator::new(baseline.statements().iter().cloned(), candidate);
        let mut additions = Vec::new();
        for statement in diff.by_ref() {
            additions.push(statement.map_err(KernelError::from)?);
        }

        let common = diff.common().cloned().unwrap_or_default();
        let not_common = diff.not_common().cloned().unwrap_or_default();

        let mut seen = HashSet::new();
        let removals: Vec<Statement> = baseline
            .statements()
            .iter()
            .filter(|s| not_common.contains(*s) && seen.insert(*s))
            .cloned()
            .collect();

        let mut retained: Vec<Statement> = common.into_iter().collect();
        retained.sort();

        tracing::debug!(
            additions = additions.len(),
            removals = removals.len(),
            retained = retained.len(),
            "planned properties update"
        );
        Ok(UpdatePlan {
            topic,
            additions,
            removals,
            retained,
        })
    }

    /// Persist `plan`: removals through `remover`, then additions through `adder`.
    pub fn apply<R, A, D>(
        &self,
        plan: UpdatePlan,
        resolver: R,
        adder: A,
        remover: D,
    ) -> PersistResult<UpdateReport>
    where
        R: SubjectResolver + Clone,
        A: PersistenceHooks<R::Node>,
        D: PersistenceHooks<R::Node>,
    {
        let UpdatePlan {
            topic,
            additions,
            removals,
            retained,
        } = plan;

        let removed = self.persist(resolver.clone(), remover, removals, topic.as_ref())?;
        let added = self.persist(resolver, adder, additions, topic.as_ref())?;

        Ok(UpdateReport {
            topic: topic.map(|t| t.to_string()),
            added: added.persisted(),
            removed: removed.persisted(),
            retained: retained.len(),
            skipped: added.skipped + removed.skipped,
        })
    }

    fn persist<R, H>(
        &self,
        resolver: R,
        hooks: H,
        statements: Vec<Statement>,
        topic: Option<&Term>,
    ) -> PersistResult<ConsumeReport>
    where
        R: SubjectResolver,
        H: PersistenceHooks<R::Node>,
    {
        let mut stream = RdfStream::from_statements(statements);
        if let Some(topic) = topic {
            stream = stream.with_topic(topic.clone());
        }
        PersistingConsumer::with_vocabulary(resolver, hooks, stream, Arc::clone(&self.vocabulary))
            .consume()
    }

    /// [`apply`](Self::apply) on an execution context.
    pub fn apply_async<R, A, D, E>(
        &self,
        plan: UpdatePlan,
        resolver: R,
        adder: A,
        remover: D,
        executor: &E,
    ) -> CompletionHandle<UpdateReport>
    where
        R: SubjectResolver + Clone + Send + 'static,
        A: PersistenceHooks<R::Node> + Send + 'static,
        D: PersistenceHooks<R::Node> + Send + 'static,
        E: Executor,
    {
        let update = self.clone();
        executor.execute(move || update.apply(plan, resolver, adder, remover))
    }

    /// Plan and apply `tactic` against the node at `path` of `repo`.
    pub fn update_node<T: UpdateTactic + ?Sized>(
        &self,
        repo: &Arc<MemRepository>,
        path: &str,
        tactic: &T,
    ) -> KernelResult<UpdateReport> {
        let baseline = repo
            .baseline(path)
            .map_err(|e| KernelError::from(PersistError::from(e)))?
            .snapshot()?;
        let plan = self.plan(&baseline, tactic)?;
        let report = self.apply(
            plan,
            RepositoryResolver::new(Arc::clone(repo)),
            PropertyAdder::new(Arc::clone(repo)),
            PropertyRemover::new(Arc::clone(repo)),
        )?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::IdentifierTranslator;
    use crate::tactic::{AddTactic, SparqlUpdateTactic};
    use crate::term::RDF_TYPE;

    const A: &str = "info:fedora/a";

    fn type_foo() -> Statement {
        Statement::new(Term::iri(A), Term::iri(RDF_TYPE), Term::iri("http://ex.org/Foo"))
    }

    fn label(v: &str) -> Statement {
        Statement::new(Term::iri(A), Term::iri("http://ex.org/label"), Term::literal(v))
    }

    fn snapshot(statements: Vec<Statement>) -> Snapshot {
        RdfStream::from_statements(statements)
            .with_topic(Term::iri(A))
            .snapshot()
            .unwrap()
    }

    #[test]
    fn add_plan_yields_only_new_statements() {
        let plan = PropertiesUpdate::default()
            .plan(&snapshot(vec![type_foo()]), &AddTactic::new(vec![type_foo(), label("x")]))
            .unwrap();
        assert_eq!(plan.additions, vec![label("x")]);
        assert!(plan.removals.is_empty());
        assert_eq!(plan.retained, vec![type_foo()]);
        assert_eq!(plan.topic, Some(Term::iri(A)));
    }

    #[test]
    fn adding_twice_plans_the_same_additions() {
        let base = snapshot(vec![type_foo()]);
        let add = AddTactic::new(vec![label("x")]);
        let update = PropertiesUpdate::default();
        let once = update.plan(&base, &add).unwrap();
        let twice = update.plan(&base, &Twice(&add)).unwrap();
        assert_eq!(once.additions, vec![label("x")]);
        // The second copy is new relative to the baseline too, so it is yielded.
        assert_eq!(twice.additions, vec![label("x"), label("x")]);
        let rebased = snapshot(vec![type_foo(), label("x")]);
        assert!(update.plan(&rebased, &Twice(&add)).unwrap().additions.is_empty());
    }

    struct Twice<'a>(&'a AddTactic);

    impl UpdateTactic for Twice<'_> {
        fn apply(&self, input: RdfStream) -> crate::tactic::TacticResult<RdfStream> {
            self.0.apply(self.0.apply(input)?)
        }
    }

    #[test]
    fn sparql_plan_computes_removals() {
        let base = snapshot(vec![type_foo(), label("old")]);
        let script = "DELETE { <> <http://ex.org/label> ?v } \
                      INSERT { <> <http://ex.org/label> \"new\" } \
                      WHERE { <> <http://ex.org/label> ?v }";
        let plan = PropertiesUpdate::default()
            .plan(&base, &SparqlUpdateTactic::new(script))
            .unwrap();
        assert_eq!(plan.additions, vec![label("new")]);
        assert_eq!(plan.removals, vec![label("old")]);
        assert!(!plan.is_noop());
    }

    #[test]
    fn update_node_writes_through_repository() {
        let repo = Arc::new(MemRepository::new(IdentifierTranslator::new("info:fedora").unwrap()));
        repo.seed(vec![type_foo(), label("old")]).unwrap();
        let script = "DELETE DATA { <> <http://ex.org/label> \"old\" } ; \
                      INSERT DATA { <> <http://ex.org/label> \"new\" }";
        let report = PropertiesUpdate::default()
            .update_node(&repo, "/a", &SparqlUpdateTactic::new(script))
            .unwrap();
        assert_eq!(report.added, 1);
        assert_eq!(report.removed, 1);
        assert_eq!(report.retained, 1);
        assert_eq!(repo.statements("/a").unwrap(), vec![type_foo(), label("new")]);
    }
}
