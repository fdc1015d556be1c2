//! In-memory repository backed by DashMap.
//!
//! Nodes are keyed by absolute repository path. Each node carries a set of
//! mixin type IRIs and an ordered, duplicate-free list of property values.
//! All data is lost on process exit.

use std::collections::BTreeSet;
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::{ResolveError, StoreError};
use crate::identifier::{IdentifierTranslator, RequestScope};
use crate::persist::{PersistenceHooks, SubjectResolver};
use crate::stream::RdfStream;
use crate::term::{RDF_TYPE, Statement, Term};

use super::StoreResult;

/// Contents of one repository node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub mixins: BTreeSet<String>,
    pub properties: Vec<(Term, Term)>,
}

impl NodeRecord {
    fn add_property(&mut self, predicate: &Term, object: &Term) -> bool {
        if self
            .properties
            .iter()
            .any(|(p, o)| p == predicate && o == object)
        {
            return false;
        }
        self.properties.push((predicate.clone(), object.clone()));
        true
    }

    fn remove_property(&mut self, predicate: &Term, object: &Term) -> bool {
        let before = self.properties.len();
        self.properties
            .retain(|(p, o)| !(p == predicate && o == object));
        self.properties.len() != before
    }
}

/// Concurrent in-memory repository.
#[derive(Debug)]
pub struct MemRepository {
    nodes: DashMap<String, NodeRecord>,
    translator: IdentifierTranslator,
}

impl MemRepository {
    pub fn new(translator: IdentifierTranslator) -> Self {
        Self {
            nodes: DashMap::new(),
            translator,
        }
    }

    pub fn translator(&self) -> &IdentifierTranslator {
        &self.translator
    }

    /// Create an empty node. Returns `false` if it already existed.
    pub fn create_node(&self, path: &str) -> bool {
        let mut created = false;
        self.nodes.entry(path.to_string()).or_insert_with(|| {
            created = true;
            NodeRecord::default()
        });
        created
    }

    pub fn contains(&self, path: &str) -> bool {
        self.nodes.contains_key(path)
    }

    /// A copy of the node at `path`.
    pub fn node(&self, path: &str) -> Option<NodeRecord> {
        self.nodes.get(path).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All node paths, sorted (snapshot, not a consistent view under concurrent writes).
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.nodes.iter().map(|e| e.key().clone()).collect();
        paths.sort();
        paths
    }

    fn with_node<T>(
        &self,
        path: &str,
        statement: &Statement,
        f: impl FnOnce(&mut NodeRecord) -> T,
    ) -> StoreResult<T> {
        match self.nodes.get_mut(path) {
            Some(mut entry) => Ok(f(entry.value_mut())),
            None => Err(StoreError::Rejected {
                statement: statement.to_string(),
                message: format!("no node at {path}"),
            }),
        }
    }

    /// Current statements of the node at `path`: mixins first, then
    /// properties in the order they were written.
    pub fn statements(&self, path: &str) -> Result<Vec<Statement>, ResolveError> {
        let subject = self
            .translator
            .to_subject(path)
            .map_err(|e| ResolveError::Failed {
                subject: path.to_string(),
                message: e.to_string(),
            })?;
        let Some(record) = self.node(path) else {
            return Err(ResolveError::NoSuchNode {
                subject: subject.to_string(),
                path: path.to_string(),
            });
        };
        let mixins = record
            .mixins
            .into_iter()
            .map(|ty| Statement::new(subject.clone(), Term::iri(RDF_TYPE), Term::iri(ty)));
        let properties = record
            .properties
            .into_iter()
            .map(|(p, o)| Statement::new(subject.clone(), p, o));
        Ok(mixins.chain(properties).collect())
    }

    /// The node's statements as a stream whose topic is the node's subject.
    pub fn baseline(&self, path: &str) -> Result<RdfStream, ResolveError> {
        let statements = self.statements(path)?;
        let stream = RdfStream::from_statements(statements);
        Ok(match self.translator.to_subject(path) {
            Ok(subject) => stream.with_topic(subject),
            Err(_) => stream,
        })
    }

    /// Write statements straight into the repository, creating nodes for
    /// owned subjects and ignoring foreign ones. No vocabulary guard.
    pub fn seed(&self, statements: impl IntoIterator<Item = Statement>) -> StoreResult<usize> {
        let mut written = 0;
        for statement in statements {
            let Some(path) = self.translator.to_path(&statement.subject) else {
                continue;
            };
            self.create_node(&path);
            if statement.is_type_assertion() {
                self.add_mixin(&path, &statement)?;
            } else {
                self.add_property(&path, &statement)?;
            }
            written += 1;
        }
        tracing::debug!(written, nodes = self.len(), "seeded repository");
        Ok(written)
    }

    fn mixin_iri(statement: &Statement) -> StoreResult<&str> {
        statement.object.as_iri().ok_or_else(|| StoreError::Rejected {
            statement: statement.to_string(),
            message: "mixin types must be IRIs".into(),
        })
    }

    pub fn add_property(&self, path: &str, statement: &Statement) -> StoreResult<bool> {
        self.with_node(path, statement, |node| {
            node.add_property(&statement.predicate, &statement.object)
        })
    }

    pub fn remove_property(&self, path: &str, statement: &Statement) -> StoreResult<bool> {
        self.with_node(path, statement, |node| {
            node.remove_property(&statement.predicate, &statement.object)
        })
    }

    pub fn add_mixin(&self, path: &str, statement: &Statement) -> StoreResult<bool> {
        let ty = Self::mixin_iri(statement)?;
        self.with_node(path, statement, |node| node.mixins.insert(ty.to_string()))
    }

    pub fn remove_mixin(&self, path: &str, statement: &Statement) -> StoreResult<bool> {
        let ty = Self::mixin_iri(statement)?;
        self.with_node(path, statement, |node| node.mixins.remove(ty))
    }
}

/// Resolves owned subjects to existing node paths.
///
/// Foreign subjects resolve to `None`; an owned subject with no node is
/// [`ResolveError::NoSuchNode`].
#[derive(Debug, Clone)]
pub struct RepositoryResolver {
    repo: Arc<MemRepository>,
    translator: IdentifierTranslator,
}

impl RepositoryResolver {
    pub fn new(repo: Arc<MemRepository>) -> Self {
        let translator = repo.translator().clone();
        Self { repo, translator }
    }

    /// Resolve against a transaction or workspace scope.
    pub fn with_scope(mut self, scope: RequestScope) -> Self {
        self.translator = self.translator.scoped(scope);
        self
    }
}

impl SubjectResolver for RepositoryResolver {
    type Node = String;

    fn is_owned_subject(&self, subject: &Term) -> bool {
        self.translator.is_owned(subject)
    }

    fn resolve_to_node(&self, subject: &Term) -> Result<Option<String>, ResolveError> {
        let Some(path) = self.translator.to_path(subject) else {
            return Ok(None);
        };
        if !self.repo.contains(&path) {
            return Err(ResolveError::NoSuchNode {
                subject: subject.to_string(),
                path,
            });
        }
        Ok(Some(path))
    }
}

/// Hooks that write statements into a [`MemRepository`].
#[derive(Debug, Clone)]
pub struct PropertyAdder {
    repo: Arc<MemRepository>,
}

impl PropertyAdder {
    pub fn new(repo: Arc<MemRepository>) -> Self {
        Self { repo }
    }
}

impl PersistenceHooks<String> for PropertyAdder {
    fn operate_on_property(&mut self, statement: &Statement, node: &String) -> StoreResult<()> {
        if !self.repo.add_property(node, statement)? {
            tracing::debug!(%statement, "property already present");
        }
        Ok(())
    }

    fn operate_on_mixin(&mut self, statement: &Statement, node: &String) -> StoreResult<()> {
        self.repo.add_mixin(node, statement).map(|_| ())
    }
}

/// Hooks that delete statements from a [`MemRepository`].
#[derive(Debug, Clone)]
pub struct PropertyRemover {
    repo: Arc<MemRepository>,
}

impl PropertyRemover {
    pub fn new(repo: Arc<MemRepository>) -> Self {
        Self { repo }
    }
}

impl PersistenceHooks<String> for PropertyRemover {
    fn operate_on_property(&mut self, statement: &Statement, node: &String) -> StoreResult<()> {
        if !self.repo.remove_property(node, statement)? {
            tracing::debug!(%statement, "property to remove was absent");
        }
        Ok(())
    }

    fn operate_on_mixin(&mut self, statement: &Statement, node: &String) -> StoreResult<()> {
        self.repo.remove_mixin(node, statement).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> Arc<MemRepository> {
        let translator = IdentifierTranslator::new("info:fedora").unwrap();
        Arc::new(MemRepository::new(translator))
    }

    fn title(o: &str) -> Statement {
        Statement::new(
            Term::iri("info:fedora/a"),
            Term::iri("http://purl.org/dc/terms/title"),
            Term::literal(o),
        )
    }

    #[test]
    fn create_and_query() {
        let repo = repo();
        assert!(repo.create_node("/a"));
        assert!(!repo.create_node("/a"));
        assert!(repo.contains("/a"));
        assert_eq!(repo.len(), 1);
        assert!(repo.statements("/a").unwrap().is_empty());
    }

    #[test]
    fn properties_are_duplicate_free_and_ordered() {
        let repo = repo();
        repo.create_node("/a");
        assert!(repo.add_property("/a", &title("2")).unwrap());
        assert!(repo.add_property("/a", &title("1")).unwrap());
        assert!(!repo.add_property("/a", &title("2")).unwrap());
        assert_eq!(repo.statements("/a").unwrap(), vec![title("2"), title("1")]);
        assert!(repo.remove_property("/a", &title("2")).unwrap());
        assert!(!repo.remove_property("/a", &title("2")).unwrap());
        assert_eq!(repo.statements("/a").unwrap(), vec![title("1")]);
    }

    #[test]
    fn mixins_come_first_and_must_be_iris() {
        let repo = repo();
        repo.create_node("/a");
        repo.add_property("/a", &title("x")).unwrap();
        let mixin = Statement::new(Term::iri("info:fedora/a"), Term::iri(RDF_TYPE), Term::iri("myNS:mymixin"));
        repo.add_mixin("/a", &mixin).unwrap();
        assert_eq!(repo.statements("/a").unwrap(), vec![mixin, title("x")]);

        let bad = Statement::new(Term::iri("info:fedora/a"), Term::iri(RDF_TYPE), Term::literal("x"));
        assert!(matches!(repo.add_mixin("/a", &bad), Err(StoreError::Rejected { .. })));
    }

    #[test]
    fn missing_node_is_rejected() {
        let repo = repo();
        assert!(matches!(
            repo.add_property("/nope", &title("x")),
            Err(StoreError::Rejected { .. })
        ));
        assert!(matches!(
            repo.statements("/nope"),
            Err(ResolveError::NoSuchNode { .. })
        ));
    }

    #[test]
    fn resolver_distinguishes_foreign_and_missing() {
        let repo = repo();
        repo.create_node("/a");
        let resolver = RepositoryResolver::new(Arc::clone(&repo));
        assert_eq!(resolver.resolve_to_node(&Term::iri("info:fedora/a")).unwrap().as_deref(), Some("/a"));
        assert_eq!(resolver.resolve_to_node(&Term::iri("http://x.org/a")).unwrap(), None);
        assert!(matches!(
            resolver.resolve_to_node(&Term::iri("info:fedora/b")),
            Err(ResolveError::NoSuchNode { .. })
        ));
    }

    #[test]
    fn seed_and_baseline() {
        let repo = repo();
        let foreign = Statement::new(Term::iri("urn:x"), Term::iri("urn:p"), Term::literal("y"));
        assert_eq!(repo.seed(vec![title("x"), foreign]).unwrap(), 1);
        let baseline = repo.baseline("/a").unwrap();
        assert_eq!(baseline.topic(), Some(&Term::iri("info:fedora/a")));
        assert_eq!(baseline.try_collect_vec().unwrap(), vec![title("x")]);
    }

    #[test]
    fn hooks_add_and_remove() {
        let repo = repo();
        repo.create_node("/a");
        let mut adder = PropertyAdder::new(Arc::clone(&repo));
        let mut remover = PropertyRemover::new(Arc::clone(&repo));
        let node = "/a".to_string();
        adder.operate_on_property(&title("x"), &node).unwrap();
        adder.operate_on_property(&title("x"), &node).unwrap();
        assert_eq!(repo.node("/a").unwrap().properties.len(), 1);
        remover.operate_on_property(&title("x"), &node).unwrap();
        assert!(repo.node("/a").unwrap().properties.is_empty());
    }

    #[test]
    fn concurrent_writers() {
        let repo = repo();
        let handles: Vec<_> = (0..50)
            .map(|i| {
                let repo = Arc::clone(&repo);
                std::thread::spawn(move || {
                    repo.create_node(&format!("/n{i}"));
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(repo.len(), 50);
        assert_eq!(repo.paths().len(), 50);
    }
}
