//! Managed vocabulary: predicates and types reserved for repository bookkeeping.
//!
//! A statement is *managed* when its predicate lies in a managed namespace or
//! is one of the individually managed properties, or when it is an `rdf:type`
//! assertion whose object lies in a managed namespace. Callers may never write
//! managed statements; see [`crate::stream::unmanaged`].

use crate::term::Statement;

/// Namespace of repository-internal properties and types.
pub const REPOSITORY_NAMESPACE: &str = "http://fedora.info/definitions/v4/repository#";
/// Namespace of the REST API's own types.
pub const RESTAPI_NAMESPACE: &str = "http://fedora.info/definitions/v4/rest-api#";
/// Namespace used by the underlying hierarchical content store.
pub const JCR_NAMESPACE: &str = "http://www.jcp.org/jcr/1.0";
/// Linked Data Platform namespace.
pub const LDP_NAMESPACE: &str = "http://www.w3.org/ns/ldp#";

/// LDP paging and membership properties the repository computes itself.
pub const LDP_MANAGED_PROPERTIES: &[&str] = &[
    "http://www.w3.org/ns/ldp#page",
    "http://www.w3.org/ns/ldp#pageOf",
    "http://www.w3.org/ns/ldp#firstPage",
    "http://www.w3.org/ns/ldp#nextPage",
    "http://www.w3.org/ns/ldp#membersInlined",
    "http://www.w3.org/ns/ldp#inlinedResource",
    "http://www.w3.org/ns/ldp#membershipSubject",
    "http://www.w3.org/ns/ldp#membershipPredicate",
    "http://www.w3.org/ns/ldp#membershipObject",
];

/// Closed table of managed namespaces and properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedVocabulary {
    namespaces: Vec<String>,
    properties: Vec<String>,
}

impl ManagedVocabulary {
    /// An empty table: nothing is managed.
    pub fn empty() -> Self {
        Self {
            namespaces: Vec::new(),
            properties: Vec::new(),
        }
    }

    /// The repository's built-in table.
    pub fn repository() -> Self {
        Self {
            namespaces: [REPOSITORY_NAMESPACE, RESTAPI_NAMESPACE, JCR_NAMESPACE]
                .into_iter()
                .map(String::from)
                .collect(),
            properties: LDP_MANAGED_PROPERTIES.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Add a managed namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        if !self.namespaces.contains(&namespace) {
            self.namespaces.push(namespace);
        }
        self
    }

    /// Add an individually managed property.
    pub fn with_property(mut self, property: impl Into<String>) -> Self {
        let property = property.into();
        if !self.properties.contains(&property) {
            self.properties.push(property);
        }
        self
    }

    pub fn namespaces(&self) -> &[String] {
        &self.namespaces
    }

    pub fn properties(&self) -> &[String] {
        &self.properties
    }

    fn in_managed_namespace(&self, iri: &str) -> bool {
        self.namespaces.iter().any(|ns| iri.starts_with(ns.as_str()))
    }

    /// Whether `iri` is a managed predicate.
    pub fn is_managed_predicate(&self, iri: &str) -> bool {
        self.in_managed_namespace(iri) || self.properties.iter().any(|p| p == iri)
    }

    /// Whether the statement touches managed vocabulary.
    pub fn is_managed(&self, statement: &Statement) -> bool {
        let Some(predicate) = statement.predicate.as_iri() else {
            return false;
        };
        if self.is_managed_predicate(predicate) {
            return true;
        }
        statement.is_type_assertion()
            && statement
                .object
                .as_iri()
                .is_some_and(|ty| self.in_managed_namespace(ty))
    }
}

impl Default for ManagedVocabulary {
    fn default() -> Self {
        Self::repository()
    }
}
