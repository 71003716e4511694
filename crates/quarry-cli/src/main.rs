#![forbid(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

use quarry_address::{Address, Spec};
use quarry_buildfile::TargetKind;
use quarry_config::WorkspaceConfig;
use quarry_engine::{
    default_registry, run_tests, DependencyGraph, Target, TestOptions, Workspace,
};
use quarry_source::Filespec;

type CliResult = Result<(), Box<dyn Error>>;

#[derive(Debug, Parser)]
#[command(name = "quarry", about = "A BUILD-file target toolkit")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum KindFilter {
    Library,
    Tests,
}

impl KindFilter {
    fn matches(self, kind: TargetKind) -> bool {
        match self {
            Self::Library => kind == TargetKind::Library,
            Self::Tests => kind == TargetKind::Tests,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the targets matching the given specs
    List {
        /// Target specs (`src/java:lib`, `src/java:`, `src/java::`, `::`)
        #[arg(required = true)]
        specs: Vec<String>,
        /// Only list targets of this kind
        #[arg(long)]
        kind: Option<KindFilter>,
        /// Only list targets carrying this tag
        #[arg(long)]
        tag: Option<String>,
        /// Emit JSON records instead of plain addresses
        #[arg(long)]
        json: bool,
    },
    /// Print the dependencies of the matching targets
    Dependencies {
        /// Target specs
        #[arg(required = true)]
        specs: Vec<String>,
        /// Follow dependencies transitively
        #[arg(long)]
        transitive: bool,
    },
    /// Print the targets that depend on the matching targets
    Dependees {
        /// Target specs
        #[arg(required = true)]
        specs: Vec<String>,
        /// Follow dependees transitively
        #[arg(long)]
        transitive: bool,
    },
    /// Print the source files the matching targets cover
    Filedeps {
        /// Target specs
        #[arg(required = true)]
        specs: Vec<String>,
    },
    /// Check every BUILD file and the dependency graph
    Validate,
    /// Run the tests targets among the matching specs
    Test {
        /// Target specs
        #[arg(required = true)]
        specs: Vec<String>,
        /// Override declared timeouts, in seconds (still clamped to the
        /// configured maximum)
        #[arg(long)]
        timeout: Option<u64>,
        /// Skip tests targets carrying this tag (repeatable)
        #[arg(long = "skip-tag")]
        skip_tags: Vec<String>,
    },
    /// List all registered goals
    Goals,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::List {
            specs,
            kind,
            tag,
            json,
        } => cmd_list(&specs, kind, tag.as_deref(), json),
        Command::Dependencies { specs, transitive } => cmd_dependencies(&specs, transitive),
        Command::Dependees { specs, transitive } => cmd_dependees(&specs, transitive),
        Command::Filedeps { specs } => cmd_filedeps(&specs),
        Command::Validate => cmd_validate(),
        Command::Test {
            specs,
            timeout,
            skip_tags,
        } => cmd_test(&specs, timeout, skip_tags),
        Command::Goals => cmd_goals(),
    };

    if let Err(msg) = result {
        eprintln!("error: {msg}");
        process::exit(1);
    }
}

/// Find the build root by walking up from the current directory.
fn build_root() -> Result<PathBuf, Box<dyn Error>> {
    let cwd = std::env::current_dir()?;
    find_build_root(&cwd).ok_or_else(|| {
        format!(
            "no quarry.toml or BUILD file found in {} or any parent directory",
            cwd.display()
        )
        .into()
    })
}

/// The nearest ancestor of `start` holding a `quarry.toml`, or, for a
/// workspace with no manifest, the nearest holding a `BUILD` file.
fn find_build_root(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(d) = dir {
        if d.join("quarry.toml").is_file() {
            return Some(d.to_path_buf());
        }
        dir = d.parent();
    }
    let mut dir = Some(start);
    while let Some(d) = dir {
        if d.join("BUILD").is_file() {
            return Some(d.to_path_buf());
        }
        dir = d.parent();
    }
    None
}

fn open_workspace() -> Result<Workspace, Box<dyn Error>> {
    let root = build_root()?;
    let config = WorkspaceConfig::load_or_default(&root)?;
    Ok(Workspace::scan(&root, config)?)
}

/// Union of the targets the given specs select, in address order.
fn select<'a>(
    workspace: &'a Workspace,
    specs: &[String],
) -> Result<Vec<&'a Target>, Box<dyn Error>> {
    let mut selected: BTreeMap<&Address, &Target> = BTreeMap::new();
    for raw in specs {
        let spec: Spec = raw.parse()?;
        for target in workspace.matching(&spec)? {
            selected.insert(&target.address, target);
        }
    }
    Ok(selected.into_values().collect())
}

fn cmd_list(
    specs: &[String],
    kind: Option<KindFilter>,
    tag: Option<&str>,
    json: bool,
) -> CliResult {
    let workspace = open_workspace()?;
    let targets: Vec<&Target> = select(&workspace, specs)?
        .into_iter()
        .filter(|t| kind.is_none_or(|k| k.matches(t.kind())))
        .filter(|t| tag.is_none_or(|tag| t.decl.has_tag(tag)))
        .collect();

    if json {
        let records: Vec<serde_json::Value> = targets
            .iter()
            .map(|t| {
                serde_json::json!({
                    "address": t.address.to_string(),
                    "kind": t.kind().as_str(),
                    "sources": t.decl.sources,
                    "dependencies": t.decl.dependencies,
                    "tags": t.decl.tags,
                    "timeout": t.decl.timeout,
                    "build_file": t.build_file,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        for target in targets {
            println!("{}", target.address);
        }
    }
    Ok(())
}

fn cmd_dependencies(specs: &[String], transitive: bool) -> CliResult {
    let workspace = open_workspace()?;
    let graph = DependencyGraph::build(&workspace)?;
    let roots: Vec<Address> = select(&workspace, specs)?
        .into_iter()
        .map(|t| t.address.clone())
        .collect();

    let mut output: BTreeSet<Address> = BTreeSet::new();
    if transitive {
        output.extend(graph.transitive_closure(&roots)?);
    } else {
        for root in &roots {
            output.extend(graph.dependencies(root).iter().cloned());
        }
    }
    for root in &roots {
        output.remove(root);
    }

    for address in output {
        println!("{address}");
    }
    Ok(())
}

fn cmd_dependees(specs: &[String], transitive: bool) -> CliResult {
    let workspace = open_workspace()?;
    let graph = DependencyGraph::build(&workspace)?;
    let roots: Vec<Address> = select(&workspace, specs)?
        .into_iter()
        .map(|t| t.address.clone())
        .collect();

    let mut output: BTreeSet<Address> = BTreeSet::new();
    if transitive {
        output.extend(graph.transitive_dependees(&roots)?);
    } else {
        for root in &roots {
            output.extend(graph.dependees(root).iter().cloned());
        }
    }
    for root in &roots {
        output.remove(root);
    }

    for address in output {
        println!("{address}");
    }
    Ok(())
}

fn cmd_filedeps(specs: &[String]) -> CliResult {
    let workspace = open_workspace()?;
    let mut files: BTreeSet<String> = BTreeSet::new();
    for target in select(&workspace, specs)? {
        let filespec = Filespec::from_sources(&target.address.spec_path, &target.decl.sources)?;
        files.extend(filespec.expand(workspace.root())?.files);
    }
    for file in files {
        println!("{file}");
    }
    Ok(())
}

fn cmd_validate() -> CliResult {
    let workspace = open_workspace()?;
    let graph = DependencyGraph::build(&workspace)?;
    graph.check_acyclic()?;

    let mut build_files: BTreeSet<&str> = BTreeSet::new();
    for target in workspace.targets() {
        // Surface bad glob patterns even when nothing expands them yet.
        Filespec::from_sources(&target.address.spec_path, &target.decl.sources)?;
        build_files.insert(&target.build_file);
    }

    eprintln!(
        "    Validated {} target(s) in {} BUILD file(s); no issues found",
        workspace.len(),
        build_files.len()
    );
    Ok(())
}

fn cmd_test(specs: &[String], timeout: Option<u64>, skip_tags: Vec<String>) -> CliResult {
    let workspace = open_workspace()?;
    let graph = DependencyGraph::build(&workspace)?;
    let roots: Vec<Address> = select(&workspace, specs)?
        .into_iter()
        .map(|t| t.address.clone())
        .collect();

    let options = TestOptions {
        timeout_override: timeout,
        skip_tags,
    };
    let reports = run_tests(&workspace, &graph, &roots, &options)?;
    if reports.is_empty() {
        return Err("no tests targets in the selection".into());
    }

    let mut failed = 0u32;
    let mut passed = 0u32;
    let mut skipped = 0u32;
    for report in &reports {
        eprintln!(
            "    {} {} in {:.2}s",
            report.address,
            report.outcome,
            report.duration.as_secs_f64()
        );
        if report.outcome.is_failure() {
            failed = failed.saturating_add(1);
            if !report.stdout.is_empty() {
                eprintln!("{}", report.stdout);
            }
            if !report.stderr.is_empty() {
                eprintln!("{}", report.stderr);
            }
        } else if matches!(report.outcome, quarry_engine::TestOutcome::Skipped { .. }) {
            skipped = skipped.saturating_add(1);
        } else {
            passed = passed.saturating_add(1);
        }
    }

    eprintln!();
    eprintln!("    {passed} passed, {failed} failed, {skipped} skipped");
    if failed > 0 {
        return Err(format!("{failed} tests target(s) failed").into());
    }
    Ok(())
}

fn cmd_goals() -> CliResult {
    let registry = default_registry()?;
    for goal in registry.all() {
        println!("{goal}");
    }
    Ok(())
}
