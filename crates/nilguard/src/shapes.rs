//! Record-shape collection.
//!
//! One pass over a package's top-level type declarations, recording every
//! named struct type as `owner object → field list`. Aliases carry no
//! distinct owner object and are skipped; imported types are opaque to the
//! resolver and never appear here.

use indexmap::IndexMap;
use nilguard_syntax::{FieldDef, ObjId, Package, Program, TypeKind, ast::Decl};

/// Struct shapes of one package, keyed by the declaring type-name object.
#[derive(Debug, Default)]
pub struct RecordShapes {
    by_owner: IndexMap<ObjId, Vec<FieldDef>>,
}

impl RecordShapes {
    pub fn iter(&self) -> impl Iterator<Item = (ObjId, &[FieldDef])> {
        self.by_owner.iter().map(|(owner, fields)| (*owner, fields.as_slice()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_owner.is_empty()
    }
}

/// Collects the named struct declarations of `pkg`.
#[must_use]
pub fn collect(program: &Program, pkg: &Package) -> RecordShapes {
    let mut shapes = RecordShapes::default();
    for file in &pkg.files {
        for decl in &file.decls {
            let Decl::Type(specs) = decl else { continue };
            for spec in specs {
                if spec.alias {
                    continue;
                }
                let Some(&owner) = program.info.defs.get(&spec.name.id) else {
                    continue;
                };
                let named = program.objects.get(owner).typ;
                let underlying = program.types.underlying(named);
                if let TypeKind::Struct { fields } = program.types.kind(underlying) {
                    shapes.by_owner.insert(owner, fields.clone());
                }
            }
        }
    }
    shapes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::resolve_units;

    #[test]
    fn collects_structs_and_skips_aliases() {
        let program = resolve_units(&[(
            "a.go",
            "package p\n\ntype A struct {\n\tn *int\n}\n\ntype Alias = A\n\ntype NotRecord int\n",
        )]);
        let shapes = collect(&program, &program.packages[0]);
        let owners: Vec<_> = shapes.iter().map(|(o, _)| program.objects.get(o).name.clone()).collect();
        assert_eq!(owners, vec!["A"]);
    }

    #[test]
    fn shape_fields_carry_declared_types() {
        let program = resolve_units(&[(
            "a.go",
            "package p\n\ntype B struct {\n\ta *int\n\tb []string\n}\n",
        )]);
        let shapes = collect(&program, &program.packages[0]);
        let (_, fields) = shapes.iter().next().expect("one shape");
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].name, "a");
        assert!(matches!(program.types.kind(fields[0].typ), TypeKind::Pointer(_)));
    }
}
