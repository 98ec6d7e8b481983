//! Shared helpers for unit tests: parse-and-resolve small fixture programs.

use nilguard_syntax::{FileSet, ParsedPackage, Program, ast::IdentIds, parse_file, resolve_program};

/// Parses and resolves `(name, source)` units, grouping them into packages
/// by directory the same way the driver does.
pub(crate) fn resolve_units(units: &[(&str, &str)]) -> Program {
    let mut fset = FileSet::new();
    let mut ids = IdentIds::new();
    let mut packages: Vec<ParsedPackage> = Vec::new();
    for (name, src) in units {
        let base = fset.add(name, src);
        let file = parse_file(name, src, base, &mut ids).expect("fixture parses");
        let dir = match name.rsplit_once('/') {
            Some((dir, _)) => dir.to_owned(),
            None => String::from("."),
        };
        match packages.iter_mut().find(|p| p.path == dir) {
            Some(pkg) => pkg.files.push(file),
            None => packages.push(ParsedPackage {
                path: dir,
                files: vec![file],
            }),
        }
    }
    resolve_program(fset, packages)
}
