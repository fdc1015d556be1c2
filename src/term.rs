//! RDF data model: terms and statements.
//!
//! A [`Statement`] is an immutable (subject, predicate, object) triple of
//! [`Term`]s. Equality and hashing are structural, which is what the
//! differencing engine keys its sets on.

use std::fmt;

use serde::{Deserialize, Serialize};

/// `rdf:type`, the type-assertion predicate.
pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
/// `xsd:string`, the implicit datatype of simple literals.
pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
/// `rdf:langString`, the datatype of language-tagged literals.
pub const RDF_LANG_STRING: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";

/// A literal value with an optional datatype or language tag.
///
/// `xsd:string` is normalized away (stored as `datatype: None`) so that
/// `"x"` and `"x"^^xsd:string` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Literal {
    value: String,
    datatype: Option<String>,
    language: Option<String>,
}

impl Literal {
    /// A plain (`xsd:string`) literal.
    pub fn simple(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            datatype: None,
            language: None,
        }
    }

    /// A typed literal.
    pub fn typed(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        let datatype = datatype.into();
        Self {
            value: value.into(),
            datatype: (datatype != XSD_STRING).then_some(datatype),
            language: None,
        }
    }

    /// A language-tagged literal. Tags compare case-insensitively, so they are lowercased.
    pub fn lang(value: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            datatype: None,
            language: Some(language.into().to_ascii_lowercase()),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Explicit datatype IRI, `None` for simple and language-tagged literals.
    pub fn datatype(&self) -> Option<&str> {
        self.datatype.as_deref()
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }
}

/// A node reference: IRI, blank node, or literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Term {
    Iri { iri: String },
    Blank { id: String },
    Literal(Literal),
}

impl Term {
    pub fn iri(iri: impl Into<String>) -> Self {
        Term::Iri { iri: iri.into() }
    }

    pub fn blank(id: impl Into<String>) -> Self {
        Term::Blank { id: id.into() }
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Term::Literal(Literal::simple(value))
    }

    /// The IRI string, if this term is an IRI.
    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Term::Iri { iri } => Some(iri),
            _ => None,
        }
    }
}

impl From<Literal> for Term {
    fn from(literal: Literal) -> Self {
        Term::Literal(literal)
    }
}

/// An immutable subject–predicate–object triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Statement {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
}

impl Statement {
    pub fn new(subject: Term, predicate: Term, object: Term) -> Self {
        Self {
            subject,
            predicate,
            object,
        }
    }

    /// Whether the predicate is `rdf:type`, i.e. this declares a type/mixin.
    pub fn is_type_assertion(&self) -> bool {
        self.predicate.as_iri() == Some(RDF_TYPE)
    }
}

// ---------------------------------------------------------------------------
// N-Triples rendering
// ---------------------------------------------------------------------------

fn write_escaped(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    for c in value.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c => write!(f, "{c}")?,
        }
    }
    Ok(())
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("\"")?;
        write_escaped(f, &self.value)?;
        f.write_str("\"")?;
        if let Some(language) = &self.language {
            write!(f, "@{language}")
        } else if let Some(datatype) = &self.datatype {
            write!(f, "^^<{datatype}>")
        } else {
            Ok(())
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri { iri } => write!(f, "<{iri}>"),
            Term::Blank { id } => write!(f, "_:{id}"),
            Term::Literal(literal) => literal.fmt(f),
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} .", self.subject, self.predicate, self.object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xsd_string_is_normalized() {
        assert_eq!(Literal::typed("x", XSD_STRING), Literal::simple("x"));
        assert_ne!(
            Literal::typed("1", "http://www.w3.org/2001/XMLSchema#integer"),
            Literal::simple("1")
        );
    }

    #[test]
    fn type_assertion_detection() {
        let typed = Statement::new(Term::iri("a"), Term::iri(RDF_TYPE), Term::iri("Foo"));
        let label = Statement::new(Term::iri("a"), Term::iri("label"), Term::literal("x"));
        assert!(typed.is_type_assertion());
        assert!(!label.is_type_assertion());
    }

    #[test]
    fn ntriples_rendering_escapes_literals() {
        let s = Statement::new(
            Term::iri("http://ex.org/a"),
            Term::iri("http://ex.org/p"),
            Term::literal("say \"hi\"\n"),
        );
        assert_eq!(
            s.to_string(),
            r#"<http://ex.org/a> <http://ex.org/p> "say \"hi\"\n" ."#
        );
        assert_eq!(Term::blank("b0").to_string(), "_:b0");
        assert_eq!(Literal::lang("chat", "FR").to_string(), "\"chat\"@fr");
    }

    #[test]
    fn structural_equality_and_hashing() {
        use std::collections::HashSet;
        let a = Statement::new(Term::iri("s"), Term::iri("p"), Term::literal("o"));
        let b = Statement::new(Term::iri("s"), Term::iri("p"), Term::literal("o"));
        let set: HashSet<_> = [a.clone()].into_iter().collect();
        assert!(set.contains(&b));
    }
}
