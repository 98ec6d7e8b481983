//! Multi-unit orchestration.
//!
//! The driver discovers source files, parses and resolves them into one
//! program, optionally builds the call graph, then analyzes packages in
//! parallel. Each unit's pipeline is shape collection → parameter collection
//! → body classification → pairing; findings merge into the shared reporter,
//! which serializes writes internally.

use std::path::Path;

use rayon::prelude::*;
use walkdir::WalkDir;

use nilguard_syntax::{
    FileSet, Package, ParsedPackage, Program,
    ast::{Decl, IdentIds},
    parse_file, resolve_program,
};

use crate::{
    analyze::{self, FnContext},
    callgraph::{self, CallGraph},
    config::Config,
    params,
    report::{Marker, Reporter},
    shapes,
};

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("packages contain errors:\n{details}")]
    PackageLoad { details: String },
}

/// Analyzer options: an optional compiled configuration and the test-mode
/// switch. In test mode exclusions are not applied and findings surface as
/// position-anchored markers.
#[derive(Debug, Default)]
pub struct AnalysisOptions {
    pub config: Option<Config>,
    pub test_mode: bool,
}

/// One in-memory compilation unit.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    /// Slash-separated file name relative to the analysis root; its parent
    /// directory is the unit's package path.
    pub name: String,
    pub src: String,
}

/// The merged result of one analysis run.
#[derive(Debug)]
pub struct AnalysisOutcome {
    /// Number of use lines aggregated.
    pub violations: usize,
    /// Rendered production report.
    pub report: String,
    /// Test-mode markers, position-sorted; empty outside test mode.
    pub markers: Vec<Marker>,
    /// Units skipped because they failed to parse.
    pub syntax_errors: Vec<String>,
}

/// Walks `root` for `.go` files and analyzes them.
pub fn run_root(root: &Path, options: &AnalysisOptions) -> Result<AnalysisOutcome, DriverError> {
    let mut units = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|source| DriverError::Io {
            path: root.display().to_string(),
            source: source.into(),
        })?;
        if !entry.file_type().is_file() || entry.path().extension().is_none_or(|e| e != "go") {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let src = std::fs::read_to_string(entry.path()).map_err(|source| DriverError::Io {
            path: entry.path().display().to_string(),
            source,
        })?;
        units.push(SourceUnit { name: rel, src });
    }
    run_units(units, options)
}

/// Analyzes a set of in-memory units.
pub fn run_units(units: Vec<SourceUnit>, options: &AnalysisOptions) -> Result<AnalysisOutcome, DriverError> {
    let mut fset = FileSet::new();
    let mut ids = IdentIds::new();
    let mut syntax_errors = Vec::new();

    // Group parsed files into packages by their directory.
    let mut packages: Vec<ParsedPackage> = Vec::new();
    for unit in &units {
        let base = fset.add(&unit.name, &unit.src);
        let file = match parse_file(&unit.name, &unit.src, base, &mut ids) {
            Ok(file) => file,
            Err(err) => {
                let loc = fset.position(err.pos);
                syntax_errors.push(format!("{loc}: {err}"));
                continue;
            }
        };
        let dir = package_path(&unit.name);
        match packages.iter_mut().find(|p| p.path == dir) {
            Some(pkg) => pkg.files.push(file),
            None => packages.push(ParsedPackage {
                path: dir,
                files: vec![file],
            }),
        }
    }
    packages.sort_by(|a, b| a.path.cmp(&b.path));

    let callgraph_enabled = options.config.as_ref().is_some_and(|c| c.callgraph);
    if callgraph_enabled && !syntax_errors.is_empty() {
        // Whole-program construction needs every package to build.
        return Err(DriverError::PackageLoad {
            details: syntax_errors.join("\n"),
        });
    }

    let program = resolve_program(fset, packages);
    let callgraph: Option<CallGraph> = options
        .config
        .as_ref()
        .filter(|config| config.callgraph)
        .map(|config| callgraph::build(&program, config.max_path()));

    let reporter = Reporter::new(options.test_mode);
    program.packages.par_iter().for_each(|pkg| {
        analyze_package(&program, pkg, options, callgraph.as_ref(), &reporter);
    });

    let mut report = Vec::new();
    reporter
        .print(&mut report)
        .map_err(|source| DriverError::Io {
            path: String::from("<report>"),
            source,
        })?;

    Ok(AnalysisOutcome {
        violations: reporter.violation_count(),
        report: String::from_utf8_lossy(&report).into_owned(),
        markers: reporter.markers(),
        syntax_errors,
    })
}

fn analyze_package(
    program: &Program,
    pkg: &Package,
    options: &AnalysisOptions,
    callgraph: Option<&CallGraph>,
    reporter: &Reporter,
) {
    let shapes = shapes::collect(program, pkg);
    for file in &pkg.files {
        for decl in &file.decls {
            let Decl::Func(func) = decl else { continue };
            let Some(body) = &func.body else { continue };
            // Exclusion precedence is applied by the config; test runs see
            // every function.
            if !options.test_mode
                && let Some(config) = &options.config
                && config.is_excluded(&file.name, &pkg.name, &func.name.name)
            {
                continue;
            }
            let Some(&fn_obj) = program.info.defs.get(&func.name.id) else {
                continue;
            };
            let ctx = params::collect(program, &shapes, func);
            if ctx.params.is_empty() {
                continue;
            }
            tracing::debug!(function = %func.name.name, package = %pkg.name, "analyzing");
            let fcx = FnContext { program, ctx: &ctx };
            let violations = analyze::run_body(&fcx, body, fn_obj);
            if !violations.is_empty() {
                reporter.add_reports(program, callgraph, &violations);
            }
        }
    }
}

/// Directory component of a unit name, used as its package path.
fn package_path(name: &str) -> String {
    match name.rsplit_once('/') {
        Some((dir, _)) => dir.to_owned(),
        None => String::from("."),
    }
}
