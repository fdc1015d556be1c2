//! Repository path ⇄ subject IRI translation.
//!
//! Subjects are `base_uri + path`, optionally scoped to a transaction
//! (`/tx:<id>`) or a non-default workspace (`/workspace:<name>`). The
//! content child `jcr:content` is exposed as `fcr:content`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{IdentifierError, ResolveError};
use crate::persist::SubjectResolver;
use crate::term::Term;

/// Internal name of a binary's content child.
pub const JCR_CONTENT: &str = "jcr:content";
/// Public name of a binary's content child.
pub const FCR_CONTENT: &str = "fcr:content";

const TX_PREFIX: &str = "tx:";
const WORKSPACE_PREFIX: &str = "workspace:";

/// Which session a request runs in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestScope {
    #[default]
    Default,
    Transaction(String),
    Workspace(String),
}

impl RequestScope {
    /// Split a request path into its embedded scope and the remaining path.
    ///
    /// `/tx:abc/foo` → `(Transaction("abc"), "/foo")`. The `default`
    /// workspace is the same as no scope.
    pub fn split(request_path: &str) -> (RequestScope, String) {
        let trimmed = request_path.strip_prefix('/').unwrap_or(request_path);
        let (first, rest) = match trimmed.split_once('/') {
            Some((first, rest)) => (first, format!("/{rest}")),
            None => (trimmed, "/".to_string()),
        };
        if let Some(id) = first.strip_prefix(TX_PREFIX) {
            (RequestScope::Transaction(id.to_string()), rest)
        } else if let Some(name) = first.strip_prefix(WORKSPACE_PREFIX) {
            let scope = if name == "default" {
                RequestScope::Default
            } else {
                RequestScope::Workspace(name.to_string())
            };
            (scope, rest)
        } else {
            let path = if request_path.starts_with('/') {
                request_path.to_string()
            } else {
                format!("/{request_path}")
            };
            (RequestScope::Default, path)
        }
    }

    fn suffix(&self) -> String {
        match self {
            RequestScope::Default => String::new(),
            RequestScope::Transaction(id) => format!("/{TX_PREFIX}{id}"),
            RequestScope::Workspace(name) if name == "default" => String::new(),
            RequestScope::Workspace(name) => format!("/{WORKSPACE_PREFIX}{name}"),
        }
    }
}

impl fmt::Display for RequestScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestScope::Default => f.write_str("default"),
            RequestScope::Transaction(id) => write!(f, "{TX_PREFIX}{id}"),
            RequestScope::Workspace(name) => write!(f, "{WORKSPACE_PREFIX}{name}"),
        }
    }
}

/// Maps repository paths to subject IRIs and back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierTranslator {
    base: String,
    scope: RequestScope,
}

impl IdentifierTranslator {
    /// A translator for `base_uri`. Trailing slashes are dropped.
    pub fn new(base_uri: impl Into<String>) -> Result<Self, IdentifierError> {
        let uri = base_uri.into();
        let base = uri.trim_end_matches('/');
        if base.is_empty() || !base.contains(':') {
            return Err(IdentifierError::InvalidBase { uri });
        }
        Ok(Self {
            base: base.to_string(),
            scope: RequestScope::Default,
        })
    }

    /// The same translator bound to another session scope.
    pub fn scoped(&self, scope: RequestScope) -> Self {
        Self {
            base: self.base.clone(),
            scope,
        }
    }

    pub fn scope(&self) -> &RequestScope {
        &self.scope
    }

    /// Base URI including the scope segment.
    pub fn base_uri(&self) -> String {
        format!("{}{}", self.base, self.scope.suffix())
    }

    /// Subject IRI for an absolute repository path.
    pub fn to_subject(&self, path: &str) -> Result<Term, IdentifierError> {
        if !path.starts_with('/') {
            return Err(IdentifierError::InvalidPath {
                path: path.to_string(),
            });
        }
        let public = match path.strip_suffix(JCR_CONTENT) {
            Some(parent) if parent.ends_with('/') => format!("{parent}{FCR_CONTENT}"),
            _ => path.to_string(),
        };
        let base = self.base_uri();
        if public == "/" {
            Ok(Term::iri(base))
        } else {
            Ok(Term::iri(format!("{base}{public}")))
        }
    }

    /// Repository path for a subject, or `None` if the subject is foreign.
    pub fn to_path(&self, subject: &Term) -> Option<String> {
        let iri = subject.as_iri()?;
        let rest = iri.strip_prefix(self.base_uri().as_str())?;
        if rest.is_empty() {
            return Some("/".to_string());
        }
        if !rest.starts_with('/') {
            return None;
        }
        Some(match rest.strip_suffix(FCR_CONTENT) {
            Some(parent) if parent.ends_with('/') => format!("{parent}{JCR_CONTENT}"),
            _ => rest.to_string(),
        })
    }

    /// Whether `subject` is an IRI inside this repository's (scoped) namespace.
    pub fn is_owned(&self, subject: &Term) -> bool {
        self.to_path(subject).is_some()
    }
}

impl SubjectResolver for IdentifierTranslator {
    type Node = String;

    fn is_owned_subject(&self, subject: &Term) -> bool {
        self.is_owned(subject)
    }

    fn resolve_to_node(&self, subject: &Term) -> Result<Option<String>, ResolveError> {
        Ok(self.to_path(subject))
    }
}
