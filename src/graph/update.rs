//! SPARQL Update execution against a [`Graph`].
//!
//! [`UpdateExecutor`] separates parsing from execution so a caller can read
//! the program's prefix declarations before anything is mutated.
//! [`SparqlUpdater`] is the oxigraph-backed implementation.

use std::sync::LazyLock;

use oxigraph::sparql::SparqlEvaluator;
use regex::Regex;

use crate::stream::Namespaces;
use crate::term::Term;

use super::Graph;

/// Parses and runs textual update programs.
pub trait UpdateExecutor {
    /// A parsed, ready-to-run program.
    type Program;

    /// Parse `script`, resolving relative IRIs against `default_graph`.
    fn parse(&self, script: &str, default_graph: Option<&Term>) -> Result<Self::Program, String>;

    /// Prefix bindings the program declares.
    fn prefixes(&self, program: &Self::Program) -> Namespaces;

    /// Run the program, mutating `graph` in place. Writes outside the
    /// default graph are an error.
    fn execute(&self, program: &Self::Program, graph: &mut Graph) -> Result<(), String>;
}

static PREFIX_DECL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bPREFIX\s+([A-Za-z][\w.-]*)?:\s*<([^>]*)>").unwrap());

/// A run of PREFIX/BASE declarations opening the request or an operation.
static PROLOGUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:^|;)\s*((?:(?:PREFIX\s+(?:[A-Za-z][\w.-]*)?:\s*<[^>]*>|BASE\s*<[^>]*>)\s*)+)",
    )
    .unwrap()
});

/// Blank out comments and string literals, keeping IRI references intact.
fn mask_comments_and_strings(script: &str) -> String {
    let chars: Vec<char> = script.chars().collect();
    let mut out = String::with_capacity(script.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '#' => {
                while i < chars.len() && chars[i] != '\n' {
                    out.push(' ');
                    i += 1;
                }
            }
            '"' | '\'' => {
                let long = chars.get(i + 1) == Some(&c) && chars.get(i + 2) == Some(&c);
                let delimiter = if long { 3 } else { 1 };
                out.extend(std::iter::repeat_n(' ', delimiter));
                i += delimiter;
                while i < chars.len() {
                    if chars[i] == '\\' {
                        out.push(' ');
                        i += 1;
                        if i < chars.len() {
                            out.push(' ');
                            i += 1;
                        }
                        continue;
                    }
                    if chars[i] == c
                        && (!long || (chars.get(i + 1) == Some(&c) && chars.get(i + 2) == Some(&c)))
                    {
                        out.extend(std::iter::repeat_n(' ', delimiter));
                        i += delimiter;
                        break;
                    }
                    out.push(if chars[i] == '\n' { '\n' } else { ' ' });
                    i += 1;
                }
            }
            '<' => {
                let end = chars[i + 1..].iter().position(|&ch| {
                    ch == '>' || ch.is_whitespace() || matches!(ch, '<' | '"' | '{' | '}' | '|' | '`')
                });
                match end {
                    Some(offset) if chars[i + 1 + offset] == '>' => {
                        out.extend(&chars[i..i + offset + 2]);
                        i += offset + 2;
                    }
                    _ => {
                        out.push(c);
                        i += 1;
                    }
                }
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

/// Prefixes declared in the prologues of `script`, later bindings winning.
fn declared_prefixes(script: &str) -> Namespaces {
    let masked = mask_comments_and_strings(script);
    PROLOGUE
        .captures_iter(&masked)
        .flat_map(|prologue| {
            PREFIX_DECL
                .captures_iter(prologue.get(1).map_or("", |m| m.as_str()))
                .map(|cap| {
                    let prefix = cap.get(1).map_or("", |m| m.as_str()).to_string();
                    (prefix, cap[2].to_string())
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

/// A SPARQL Update request validated by oxigraph's parser.
#[derive(Debug, Clone)]
pub struct SparqlProgram {
    text: String,
    base_iri: Option<String>,
    prefixes: Namespaces,
}

impl SparqlProgram {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn base_iri(&self) -> Option<&str> {
        self.base_iri.as_deref()
    }
}

/// oxigraph SPARQL 1.1 Update.
#[derive(Debug, Clone, Copy, Default)]
pub struct SparqlUpdater;

impl SparqlUpdater {
    fn evaluator(base_iri: Option<&str>) -> Result<SparqlEvaluator, String> {
        let evaluator = SparqlEvaluator::new();
        match base_iri {
            Some(base) => evaluator
                .with_base_iri(base)
                .map_err(|e| format!("invalid base IRI <{base}>: {e}")),
            None => Ok(evaluator),
        }
    }
}

impl UpdateExecutor for SparqlUpdater {
    type Program = SparqlProgram;

    fn parse(&self, script: &str, default_graph: Option<&Term>) -> Result<SparqlProgram, String> {
        let base_iri = default_graph.and_then(Term::as_iri).map(str::to_string);
        Self::evaluator(base_iri.as_deref())?
            .parse_update(script)
            .map_err(|e| e.to_string())?;

        Ok(SparqlProgram {
            text: script.to_string(),
            base_iri,
            prefixes: declared_prefixes(script),
        })
    }

    fn prefixes(&self, program: &SparqlProgram) -> Namespaces {
        program.prefixes.clone()
    }

    fn execute(&self, program: &SparqlProgram, graph: &mut Graph) -> Result<(), String> {
        Self::evaluator(program.base_iri())?
            .parse_update(&program.text)
            .map_err(|e| e.to_string())?
            .on_store(graph.store())
            .execute()
            .map_err(|e| e.to_string())?;

        // Statements are read back from the default graph only.
        match graph.named_graph_in_use().map_err(|e| e.to_string())? {
            Some(name) => Err(format!(
                "update wrote to named graph {name}; only the default graph is supported"
            )),
            None => Ok(()),
        }
    }
}
