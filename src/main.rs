//! rdf-kernel CLI: difference, update, check, and persist RDF property sets.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use rdf_kernel::config::KernelConfig;
use rdf_kernel::graph::{Graph, InputFormat};
use rdf_kernel::store::{MemRepository, PropertyAdder, PropertyRemover, RepositoryResolver};
use rdf_kernel::stream::RdfStream;
use rdf_kernel::stream::differencing::DifferencingIterator;
use rdf_kernel::tactic::{AddTactic, SparqlUpdateTactic, UpdateTactic};
use rdf_kernel::term::{Statement, Term};
use rdf_kernel::update::PropertiesUpdate;

#[derive(Parser)]
#[command(name = "rdf-kernel", version, about = "RDF property-update pipeline")]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show which statements a candidate adds to and removes from a baseline.
    Diff {
        /// Baseline statements (Turtle, or N-Triples with a .nt extension).
        #[arg(long)]
        baseline: PathBuf,

        /// Candidate statements.
        #[arg(long)]
        candidate: PathBuf,

        /// Print JSON instead of N-Triples.
        #[arg(long)]
        json: bool,
    },

    /// Apply an update tactic and print the resulting statements.
    Update {
        #[arg(long)]
        input: PathBuf,

        /// IRI of the resource the input describes.
        #[arg(long)]
        topic: String,

        /// SPARQL Update script to run.
        #[arg(long, conflicts_with = "add", required_unless_present = "add")]
        sparql: Option<PathBuf>,

        /// Statements to append.
        #[arg(long)]
        add: Option<PathBuf>,
    },

    /// List statements that touch managed vocabulary.
    Check {
        #[arg(long)]
        input: PathBuf,
    },

    /// Seed an in-memory repository, run a SPARQL update on one node, and
    /// print the update report.
    Apply {
        #[arg(long)]
        input: PathBuf,

        /// IRI of the resource to update, e.g. info:fedora/objects/a.
        #[arg(long)]
        topic: String,

        #[arg(long)]
        sparql: PathBuf,

        /// Persist on the configured executor instead of this thread.
        #[arg(long = "async")]
        run_async: bool,
    },

    /// Manage configuration files.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a default config file.
    Init {
        /// Destination path.
        path: PathBuf,
    },
}

fn load_statements(path: &Path) -> Result<Vec<Statement>> {
    let format = InputFormat::from_extension(path.extension().and_then(|e| e.to_str()));
    let file = File::open(path).into_diagnostic()?;
    Ok(Graph::load(file, format)?.into_stream()?.try_collect_vec()?)
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).into_diagnostic()?);
    Ok(())
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => KernelConfig::load(path)?,
        None => KernelConfig::default(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Diff {
            baseline,
            candidate,
            json,
        } => {
            let baseline = load_statements(&baseline)?;
            let candidate = load_statements(&candidate)?;
            let mut diff = DifferencingIterator::new(
                baseline.iter().cloned(),
                RdfStream::from_statements(candidate),
            );
            let additions = diff.by_ref().collect::<Result<Vec<_>, _>>()?;
            let removals: Vec<Statement> = match diff.not_common() {
                Some(not_common) => baseline
                    .iter()
                    .filter(|s| not_common.contains(*s))
                    .cloned()
                    .collect(),
                None => Vec::new(),
            };

            if json {
                print_json(&serde_json::json!({
                    "additions": additions,
                    "removals": removals,
                }))?;
            } else {
                for statement in &additions {
                    println!("+ {statement}");
                }
                for statement in &removals {
                    println!("- {statement}");
                }
            }
        }

        Commands::Update {
            input,
            topic,
            sparql,
            add,
        } => {
            let tactic: Box<dyn UpdateTactic> = match (sparql, add) {
                (Some(script), _) => Box::new(SparqlUpdateTactic::new(
                    std::fs::read_to_string(&script).into_diagnostic()?,
                )),
                (None, Some(statements)) => Box::new(AddTactic::new(load_statements(&statements)?)),
                (None, None) => miette::bail!("one of --sparql or --add is required"),
            };
            let stream = RdfStream::from_statements(load_statements(&input)?).with_topic(Term::iri(topic));
            for statement in tactic.apply(stream)? {
                println!("{}", statement?);
            }
        }

        Commands::Check { input } => {
            let vocabulary = config.vocabulary();
            let managed: Vec<Statement> = load_statements(&input)?
                .into_iter()
                .filter(|s| vocabulary.is_managed(s))
                .collect();
            for statement in &managed {
                println!("{statement}");
            }
            if !managed.is_empty() {
                eprintln!("{} managed statement(s) found", managed.len());
                std::process::exit(1);
            }
        }

        Commands::Apply {
            input,
            topic,
            sparql,
            run_async,
        } => {
            let translator = config.translator()?;
            let topic = Term::iri(topic);
            let Some(path) = translator.to_path(&topic) else {
                miette::bail!("{topic} is outside base URI {}", translator.base_uri());
            };
            let repo = Arc::new(MemRepository::new(translator));
            repo.seed(load_statements(&input)?)?;
            repo.create_node(&path);

            let update = PropertiesUpdate::new(Arc::new(config.vocabulary()));
            let baseline = repo.baseline(&path)?.snapshot()?;
            let tactic = SparqlUpdateTactic::new(std::fs::read_to_string(&sparql).into_diagnostic()?);
            let plan = update.plan(&baseline, &tactic)?;

            let resolver = RepositoryResolver::new(Arc::clone(&repo));
            let adder = PropertyAdder::new(Arc::clone(&repo));
            let remover = PropertyRemover::new(Arc::clone(&repo));
            let report = if run_async {
                let executor = config.executor()?;
                update
                    .apply_async(plan, resolver, adder, remover, &executor)
                    .wait()?
            } else {
                update.apply(plan, resolver, adder, remover)?
            };
            print_json(&report)?;
        }

        Commands::Config { action } => match action {
            ConfigAction::Init { path } => {
                KernelConfig::default().save(&path)?;
                println!("Wrote default config to {}", path.display());
            }
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn apply_addresses_the_node_by_topic() {
        let cli = Cli::try_parse_from([
            "rdf-kernel", "apply", "--input", "in.ttl", "--topic", "info:fedora/a", "--sparql",
            "update.ru", "--config", "kernel.toml", "--async",
        ])
        .unwrap();
        assert!(cli.config.is_some());
        assert!(matches!(
            cli.command,
            Commands::Apply { ref topic, run_async: true, .. } if topic == "info:fedora/a"
        ));

        let by_path = Cli::try_parse_from([
            "rdf-kernel", "apply", "--input", "in.ttl", "--path", "/a", "--sparql", "update.ru",
        ]);
        assert!(by_path.is_err());
    }
}
