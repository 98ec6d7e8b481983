//! Driver-level tests: configuration exclusions, call-graph enrichment,
//! production report shape, and filesystem discovery.

use nilguard::{AnalysisOptions, Config, SourceUnit, run_root, run_units};

fn units(list: &[(&str, &str)]) -> Vec<SourceUnit> {
    list.iter()
        .map(|(name, src)| SourceUnit {
            name: (*name).to_owned(),
            src: (*src).to_owned(),
        })
        .collect()
}

fn config_from(yaml: &str) -> Config {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.yml");
    std::fs::write(&path, yaml).expect("write config");
    Config::load(&path).expect("config loads")
}

const VIOLATING: &str = "package store\n\nfunc Open(p *int) {\n\tprint(*p)\n}\n";

#[test]
fn violations_surface_in_production_report() {
    let options = AnalysisOptions {
        config: None,
        test_mode: false,
    };
    let outcome = run_units(units(&[("store/open.go", VIOLATING)]), &options).expect("runs");
    assert_eq!(outcome.violations, 1);
    assert!(outcome.report.contains("Declared 'p'"));
    assert!(outcome.report.contains("Unsafely used 'p'"));
    assert!(outcome.report.contains("store/open.go:3"), "declaration location rendered");
    assert!(outcome.report.contains("store/open.go:4"), "use location rendered");
    assert!(outcome.report.contains("store.Open"), "full function name rendered");
}

#[test]
fn member_findings_name_the_root_parameter() {
    let options = AnalysisOptions {
        config: None,
        test_mode: false,
    };
    let src = "package store\n\ntype A struct {\n\tn *int\n}\n\ntype B struct {\n\ta *A\n}\n\nfunc Get(b B) {\n\tprint(b.a.n)\n}\n";
    let outcome = run_units(units(&[("store/get.go", src)]), &options).expect("runs");
    assert!(outcome.report.contains("Declared 'b'"));
    assert!(outcome.report.contains("(member: 'a')"));
}

#[test]
fn file_exclusion_skips_unit() {
    let options = AnalysisOptions {
        config: Some(config_from("files: [open.go]\n")),
        test_mode: false,
    };
    let outcome = run_units(units(&[("store/open.go", VIOLATING)]), &options).expect("runs");
    assert_eq!(outcome.violations, 0);
}

#[test]
fn wildcard_file_exclusion() {
    let options = AnalysisOptions {
        config: Some(config_from("files: ['*open.go']\n")),
        test_mode: false,
    };
    let outcome = run_units(units(&[("store/open.go", VIOLATING)]), &options).expect("runs");
    assert_eq!(outcome.violations, 0);
}

#[test]
fn package_exclusion_skips_all_functions() {
    let options = AnalysisOptions {
        config: Some(config_from("pkgs: [store]\n")),
        test_mode: false,
    };
    let outcome = run_units(units(&[("store/open.go", VIOLATING)]), &options).expect("runs");
    assert_eq!(outcome.violations, 0);
}

#[test]
fn function_exclusion_is_package_scoped() {
    let excluded = AnalysisOptions {
        config: Some(config_from("funcs:\n  - pkg: store\n    funcs: [Open]\n")),
        test_mode: false,
    };
    let outcome = run_units(units(&[("store/open.go", VIOLATING)]), &excluded).expect("runs");
    assert_eq!(outcome.violations, 0);

    let other_pkg = AnalysisOptions {
        config: Some(config_from("funcs:\n  - pkg: other\n    funcs: [Open]\n")),
        test_mode: false,
    };
    let outcome = run_units(units(&[("store/open.go", VIOLATING)]), &other_pkg).expect("runs");
    assert_eq!(outcome.violations, 1);
}

#[test]
fn callgraph_line_attached_when_enabled() {
    let options = AnalysisOptions {
        config: Some(config_from("callgraph: true\n")),
        test_mode: false,
    };
    let src = "package p\n\nfunc callee(p *int) {\n\tprint(*p)\n}\n\nfunc caller() {\n\tcallee(nil)\n}\n";
    let outcome = run_units(units(&[("a/b/c/main.go", src)]), &options).expect("runs");
    assert_eq!(outcome.violations, 1);
    assert!(
        outcome.report.contains("Feasible Callgraph path => [a/b/c.caller]"),
        "report: {}",
        outcome.report
    );
}

#[test]
fn callgraph_line_absent_for_uncalled_functions() {
    let options = AnalysisOptions {
        config: Some(config_from("callgraph: true\n")),
        test_mode: false,
    };
    let outcome = run_units(units(&[("a/b/c/main.go", VIOLATING)]), &options).expect("runs");
    assert_eq!(outcome.violations, 1);
    assert!(!outcome.report.contains("Feasible Callgraph path"));
}

#[test]
fn callgraph_build_fails_on_broken_units() {
    let options = AnalysisOptions {
        config: Some(config_from("callgraph: true\n")),
        test_mode: false,
    };
    let result = run_units(
        units(&[
            ("a/b/c/main.go", VIOLATING),
            ("a/b/c/broken.go", "package p\n\nfunc ???\n"),
        ]),
        &options,
    );
    assert!(result.is_err(), "whole-program build requires parseable packages");
}

#[test]
fn broken_unit_is_skipped_without_callgraph() {
    let options = AnalysisOptions {
        config: None,
        test_mode: false,
    };
    let outcome = run_units(
        units(&[
            ("store/open.go", VIOLATING),
            ("store/broken.go", "package store\n\nfunc ???\n"),
        ]),
        &options,
    )
    .expect("runs without callgraph");
    assert_eq!(outcome.syntax_errors.len(), 1);
    assert_eq!(outcome.violations, 1);
}

#[test]
fn run_root_discovers_go_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pkg_dir = dir.path().join("store");
    std::fs::create_dir_all(&pkg_dir).expect("mkdir");
    std::fs::write(pkg_dir.join("open.go"), VIOLATING).expect("write");
    std::fs::write(pkg_dir.join("notes.txt"), "not go").expect("write");

    let options = AnalysisOptions {
        config: None,
        test_mode: false,
    };
    let outcome = run_root(dir.path(), &options).expect("runs");
    assert_eq!(outcome.violations, 1);
    assert!(outcome.report.contains("store.Open"));
}
