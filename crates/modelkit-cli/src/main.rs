//! # modelkit
//!
//! Command line front end for modelkit workspaces: validate projects,
//! inspect type hierarchies and override candidates, and rewrite component
//! type documents in canonical form.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use modelkit_core::{
    DocumentScope, ExtensionPropertyRegistry, PartContainer, ProjectContext, Severity,
};
use modelkit_types::{ComponentType, ContextLookup, TypeHierarchy, TypeMember, component};
use modelkit_workspace::{
    Document, FileResource, ObjectKind, ObjectKindRegistry, ProjectView, Workspace,
};
use serde::Serialize;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "modelkit")]
#[command(about = "Validate and inspect model object workspaces")]
#[command(version)]
struct Cli {
    /// Log debug output (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate every document of a workspace or one project
    Validate {
        /// Workspace configuration file (YAML or JSON)
        #[arg(short, long)]
        workspace: PathBuf,

        /// Only validate this project
        #[arg(short, long)]
        project: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Print the supertype chain or the subtype tree of a type
    Hierarchy {
        /// Workspace configuration file (YAML or JSON)
        #[arg(short, long)]
        workspace: PathBuf,

        /// Project the type is looked up from
        #[arg(short, long)]
        project: String,

        /// Qualified name of the type
        type_name: String,

        /// Print subtypes instead of supertypes
        #[arg(long)]
        subtypes: bool,
    },

    /// List inherited members a type may override
    Candidates {
        /// Workspace configuration file (YAML or JSON)
        #[arg(short, long)]
        workspace: PathBuf,

        /// Project the type is looked up from
        #[arg(short, long)]
        project: String,

        /// Qualified name of the type
        type_name: String,

        /// Only abstract methods
        #[arg(long)]
        abstract_only: bool,
    },

    /// Rewrite a component type file in canonical form
    Fmt {
        /// Component type file
        file: PathBuf,

        /// Report whether the file is canonical without rewriting it
        #[arg(long)]
        check: bool,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

/// One reported problem, flattened for output
#[derive(Serialize)]
struct Finding {
    project: String,
    document: String,
    severity: Severity,
    code: String,
    text: String,
}

/// Code of findings for documents that could not be loaded
const LOAD_FAILED: &str = "LOAD_FAILED";

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli.command) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Commands) -> anyhow::Result<ExitCode> {
    match command {
        Commands::Validate {
            workspace,
            project,
            format,
        } => validate(&workspace, project.as_deref(), format),
        Commands::Hierarchy {
            workspace,
            project,
            type_name,
            subtypes,
        } => hierarchy(&workspace, &project, &type_name, subtypes),
        Commands::Candidates {
            workspace,
            project,
            type_name,
            abstract_only,
        } => candidates(&workspace, &project, &type_name, abstract_only),
        Commands::Fmt { file, check } => format_file(&file, check),
    }
}

fn component_kind() -> ObjectKind {
    ObjectKind::new(component::TAG, "ctype", ComponentType::boxed)
}

type LoadFailures = Vec<(String, modelkit_workspace::Error)>;

fn open_workspace(path: &Path) -> anyhow::Result<(Workspace, LoadFailures)> {
    let mut kinds = ObjectKindRegistry::new();
    kinds.register(component_kind())?;
    let mut workspace = Workspace::open(path, kinds)
        .with_context(|| format!("cannot open workspace {}", path.display()))?;
    let failures = workspace.load_all();
    for (document, e) in &failures {
        warn!(document = %document, error = %e, "Document not loaded");
    }
    Ok((workspace, failures))
}

fn validate(path: &Path, only: Option<&str>, format: Format) -> anyhow::Result<ExitCode> {
    let (workspace, failures) = open_workspace(path)?;
    let projects: Vec<String> = match only {
        Some(name) => vec![workspace.project(name)?.name().to_string()],
        None => workspace.projects().map(|p| p.name().to_string()).collect(),
    };

    let mut findings = Vec::new();
    for project in &projects {
        let members = workspace.project(project)?;
        for (document, e) in &failures {
            let unloaded = members
                .document(document)
                .is_ok_and(|d| d.loaded_root().is_none());
            if unloaded {
                findings.push(Finding {
                    project: project.clone(),
                    document: document.clone(),
                    severity: Severity::Error,
                    code: LOAD_FAILED.to_string(),
                    text: e.to_string(),
                });
            }
        }
        for (document, messages) in workspace.validate_project(project)? {
            debug!(project = %project, document = %document, messages = messages.len(), "Validated document");
            findings.extend(messages.into_iter().map(|message| Finding {
                project: project.clone(),
                document: document.clone(),
                severity: message.severity,
                code: message.code,
                text: message.text,
            }));
        }
    }

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&findings)?),
        Format::Text => {
            for finding in &findings {
                println!(
                    "{}/{}: {} [{}] {}",
                    finding.project, finding.document, finding.severity, finding.code, finding.text
                );
            }
            let errors = findings
                .iter()
                .filter(|f| f.severity == Severity::Error)
                .count();
            println!("{} message(s), {errors} error(s)", findings.len());
        }
    }

    if findings.iter().any(|f| f.severity == Severity::Error) {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn find_type<'a>(view: &'a ProjectView<'_>, name: &str) -> anyhow::Result<&'a ComponentType> {
    let Some(object) = view.find_object(name) else {
        bail!("type {name} not found from project {}", view.project_name());
    };
    object
        .downcast_ref::<ComponentType>()
        .with_context(|| format!("{name} is not a component type"))
}

fn hierarchy(path: &Path, project: &str, name: &str, subtypes: bool) -> anyhow::Result<ExitCode> {
    let (workspace, _) = open_workspace(path)?;
    let view = workspace.project_context(project)?;
    let lookup = ContextLookup::new(&view);
    let root = find_type(&view, name)?;

    let hierarchy = if subtypes {
        root.subtype_hierarchy(&lookup)
    } else {
        root.supertype_hierarchy(&lookup)
    };

    if subtypes {
        let mut printed = HashSet::new();
        print_subtypes(&hierarchy, root, 0, &mut printed);
    } else {
        println!("{}", root.core().qualified_name().unwrap_or(name));
        for (depth, supertype) in hierarchy.all_supertypes(root).into_iter().enumerate() {
            println!("{}{}", "  ".repeat(depth + 1), qualified_name(supertype));
        }
        // The chain only stops early at a reference that does not resolve.
        let last = hierarchy.all_supertypes_incl_self(root).last().copied();
        if let Some(reference) = last.and_then(ComponentType::supertype) {
            if !hierarchy.contains_cycle() {
                println!("(unresolved supertype {reference})");
            }
        }
    }
    if hierarchy.contains_cycle() {
        println!("(cycle)");
    }
    Ok(ExitCode::SUCCESS)
}

fn print_subtypes<'a>(
    hierarchy: &TypeHierarchy<'a, ComponentType>,
    ty: &'a ComponentType,
    depth: usize,
    printed: &mut HashSet<&'a str>,
) {
    let name = qualified_name(ty);
    println!("{}{name}", "  ".repeat(depth));
    if !printed.insert(name) {
        return;
    }
    for subtype in hierarchy.subtypes_of(ty) {
        print_subtypes(hierarchy, subtype, depth + 1, printed);
    }
}

fn qualified_name(ty: &ComponentType) -> &str {
    ty.core().qualified_name().unwrap_or_default()
}

fn candidates(path: &Path, project: &str, name: &str, abstract_only: bool) -> anyhow::Result<ExitCode> {
    let (workspace, _) = open_workspace(path)?;
    let view = workspace.project_context(project)?;
    let lookup = ContextLookup::new(&view);
    let root = find_type(&view, name)?;
    let hierarchy = root.supertype_hierarchy(&lookup);

    for method in hierarchy.override_candidates(root, abstract_only) {
        let marker = if method.is_abstract() { " abstract" } else { "" };
        println!("method {}{marker}", method.signature());
    }
    if !abstract_only {
        for attribute in hierarchy.override_attribute_candidates(root) {
            println!("attribute {}", TypeMember::name(attribute));
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn format_file(path: &Path, check: bool) -> anyhow::Result<ExitCode> {
    let kind = component_kind();
    if path.extension().is_none_or(|e| e != kind.extension()) {
        bail!("{} is not a .{} file", path.display(), kind.extension());
    }
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();
    let scope = Arc::new(DocumentScope::new(Arc::new(ExtensionPropertyRegistry::new())));
    let mut document = Document::new(name, kind, Arc::new(FileResource::new(path)), scope);
    document
        .ensure_loaded()
        .with_context(|| format!("cannot read {}", path.display()))?;

    let current = fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
    let canonical = modelkit_xml::save(document.root()?)?;
    if current == canonical {
        return Ok(ExitCode::SUCCESS);
    }
    if check {
        println!("{} is not canonical", path.display());
        return Ok(ExitCode::FAILURE);
    }
    document.save(false)?;
    println!("formatted {}", path.display());
    Ok(ExitCode::SUCCESS)
}
